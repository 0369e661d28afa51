//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};
use crate::timing;

/// How `Simulation::step` advances the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteppingStrategy {
    /// Step every `Neuron` state machine; synapses act through fire hooks.
    #[default]
    PerNeuron,
    /// Decay / transfer / reset passes over the compiled soma graph.
    GraphBatched,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Steps per frame (see [`timing`]). Scales synaptic transfer in the graph model.
    pub time_resolution: u64,
    pub strategy: SteppingStrategy,
    /// Compile with soma reduction (`"<neuron>/soma"` node names).
    pub reduce: bool,
    /// Tolerance (mV) around the fire potential in the graph model.
    pub fire_epsilon: f64,
    /// Fraction of `V - V_rest` kept by the graph decay pass.
    pub leak_retention: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_resolution: timing::ms(0.5),
            strategy: SteppingStrategy::PerNeuron,
            reduce: true,
            fire_epsilon: 2.0,
            leak_retention: 0.62,
        }
    }
}

impl SimulationConfig {
    pub fn graph_batched() -> Self {
        Self { strategy: SteppingStrategy::GraphBatched, ..Self::default() }
    }

    pub fn with_strategy(mut self, strategy: SteppingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_time_resolution(mut self, time_resolution: u64) -> Self {
        self.time_resolution = time_resolution;
        self
    }

    pub fn validate(&self) -> NetworkResult<()> {
        if self.time_resolution == 0 {
            return Err(NetworkError::invalid("time_resolution", "must be at least one step"));
        }
        if !self.fire_epsilon.is_finite() || self.fire_epsilon < 0.0 {
            return Err(NetworkError::invalid("fire_epsilon", "must be finite and non-negative"));
        }
        if !(0.0..=1.0).contains(&self.leak_retention) {
            return Err(NetworkError::invalid("leak_retention", "must lie in [0, 1]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.time_resolution, 500);
        assert_eq!(cfg.strategy, SteppingStrategy::PerNeuron);
        assert!(cfg.validate().is_ok());
        assert_eq!(
            SimulationConfig::default().with_strategy(SteppingStrategy::GraphBatched),
            SimulationConfig::graph_batched()
        );
        assert!(SimulationConfig::graph_batched().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        let cfg = SimulationConfig::default().with_time_resolution(0);
        assert!(matches!(
            cfg.validate(),
            Err(NetworkError::InvalidParameter { name: "time_resolution", .. })
        ));

        let cfg = SimulationConfig { leak_retention: 1.5, ..SimulationConfig::default() };
        assert!(cfg.validate().is_err());

        let cfg = SimulationConfig { fire_epsilon: f64::NAN, ..SimulationConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: SimulationConfig =
            serde_json::from_str(r#"{"strategy":"graph_batched","time_resolution":1000}"#).unwrap();
        assert_eq!(cfg.strategy, SteppingStrategy::GraphBatched);
        assert_eq!(cfg.time_resolution, 1000);
        assert_eq!(cfg.fire_epsilon, 2.0);
        assert!(cfg.reduce);
    }
}
