//! Leaky integrate-and-fire point neuron.
//!
//! Update rule per step while outside the refractory window:
//!
//! ```text
//! V += ((V_rest - V + I*R) / tau) * dt        tau = R*C
//! if V >= V_threshold:
//!     V += spike_delta
//!     refractory_until = age + refractory_period
//!     notify fire observers (in registration order)
//! I *= current_decay
//! age += dt
//! ```
//!
//! Inside the refractory window the potential is held at rest; current still
//! leaks and age still advances.

use core::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::compiled::{SomaNode, SOMA};
use crate::error::{NetworkError, NetworkResult};
use crate::event_queue::SpikeOutbox;

/// Stable arena index of a neuron inside a [`NetworkGraph`](crate::NetworkGraph).
pub type NeuronId = u32;

/// Subscriber notified synchronously whenever a neuron fires.
pub trait FireObserver {
    /// `emitter` is the name of the neuron that fired. Any effect on other
    /// neurons must go through `outbox`.
    fn on_fire(&self, emitter: &str, outbox: &mut SpikeOutbox);
}

/// Biophysical constants, fixed for the lifetime of a neuron.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuronParams {
    pub resting_potential: f64,
    pub threshold_potential: f64,
    /// Peak potential of an action potential; the compiled graph snaps to it.
    pub fire_potential: f64,
    /// Added to V on the step the threshold is crossed.
    pub spike_delta: f64,
    pub resistance: f64,
    pub capacitance: f64,
    pub refractory_period: f64,
    pub time_step: f64,
    /// Geometric leak of the input current per step, in `[0, 1)`.
    pub current_decay: f64,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            resting_potential: 0.0,
            threshold_potential: 1.0,
            fire_potential: 1.5,
            spike_delta: 0.5,
            resistance: 1.0,
            capacitance: 10.0,
            refractory_period: 6.0,
            time_step: 0.12,
            current_decay: 0.9,
        }
    }
}

impl NeuronParams {
    /// Point-soma constants in millivolts (rest -75, threshold -53, peak 40).
    pub fn point_soma() -> Self {
        Self {
            resting_potential: -75.0,
            threshold_potential: -53.0,
            fire_potential: 40.0,
            ..Self::default()
        }
    }

    /// Membrane time constant `tau = R*C`.
    #[inline]
    pub fn time_constant(&self) -> f64 {
        self.resistance * self.capacitance
    }

    pub fn validate(&self) -> NetworkResult<()> {
        let fields = [
            ("resting_potential", self.resting_potential),
            ("threshold_potential", self.threshold_potential),
            ("fire_potential", self.fire_potential),
            ("spike_delta", self.spike_delta),
            ("resistance", self.resistance),
            ("capacitance", self.capacitance),
            ("refractory_period", self.refractory_period),
            ("time_step", self.time_step),
            ("current_decay", self.current_decay),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(NetworkError::invalid(name, format!("{} is not finite", value)));
            }
        }

        if self.resistance == 0.0 {
            return Err(NetworkError::DivisionByZero("resistance"));
        }
        if self.time_constant() == 0.0 {
            return Err(NetworkError::DivisionByZero("time_constant"));
        }
        if self.resistance < 0.0 {
            return Err(NetworkError::invalid("resistance", "must be positive"));
        }
        if self.capacitance < 0.0 {
            return Err(NetworkError::invalid("capacitance", "must be positive"));
        }
        if self.time_step <= 0.0 {
            return Err(NetworkError::invalid("time_step", "must be positive"));
        }
        // Forward Euler overshoots the equilibrium once dt/tau exceeds 1.
        if self.time_step > self.time_constant() {
            return Err(NetworkError::invalid(
                "time_step",
                format!("{} exceeds the time constant {}", self.time_step, self.time_constant()),
            ));
        }
        if self.refractory_period < 0.0 {
            return Err(NetworkError::invalid("refractory_period", "must not be negative"));
        }
        if !(0.0..1.0).contains(&self.current_decay) {
            return Err(NetworkError::invalid("current_decay", "must lie in [0, 1)"));
        }
        if self.fire_potential < self.threshold_potential {
            return Err(NetworkError::invalid(
                "fire_potential",
                "must not be below the threshold potential",
            ));
        }
        Ok(())
    }
}

/// A leaky integrate-and-fire point neuron.
#[derive(Clone)]
pub struct Neuron {
    name: String,
    params: NeuronParams,
    tau: f64,
    membrane: f64,
    input_current: f64,
    /// `None` until the first spike.
    refractory_until: Option<f64>,
    age: f64,
    fire_hooks: Vec<Rc<dyn FireObserver>>,
}

impl Neuron {
    /// Neuron with the default leaky integrate-and-fire constants.
    pub fn new(name: impl Into<String>) -> Self {
        let params = NeuronParams::default();
        Self::build(name.into(), params)
    }

    pub fn with_params(name: impl Into<String>, params: NeuronParams) -> NetworkResult<Self> {
        params.validate()?;
        Ok(Self::build(name.into(), params))
    }

    fn build(name: String, params: NeuronParams) -> Self {
        Self {
            name,
            tau: params.time_constant(),
            membrane: params.resting_potential,
            input_current: 0.0,
            refractory_until: None,
            age: 0.0,
            fire_hooks: Vec::new(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &NeuronParams {
        &self.params
    }

    /// Advance by one time step. Returns true if the neuron fired.
    ///
    /// Fires at most once per call; observers are notified before the
    /// current leak and age update.
    pub fn step(&mut self, outbox: &mut SpikeOutbox) -> bool {
        let mut fired = false;
        if self.is_active() {
            let p = &self.params;
            let drive = p.resting_potential - self.membrane + self.input_current * p.resistance;
            self.membrane += (drive / self.tau) * p.time_step;

            if self.membrane >= p.threshold_potential {
                self.membrane += p.spike_delta;
                self.refractory_until = Some(self.age + p.refractory_period);
                fired = true;
                self.fire(outbox);
            }
        } else {
            self.membrane = self.params.resting_potential;
        }

        self.input_current *= self.params.current_decay;
        self.age += self.params.time_step;
        fired
    }

    fn fire(&self, outbox: &mut SpikeOutbox) {
        for hook in &self.fire_hooks {
            hook.on_fire(&self.name, outbox);
        }
    }

    /// Register an observer. Duplicates are kept and notified once each.
    pub fn add_fire_hook(&mut self, hook: Rc<dyn FireObserver>) {
        self.fire_hooks.push(hook);
    }

    pub fn fire_hook_count(&self) -> usize {
        self.fire_hooks.len()
    }

    pub fn add_current(&mut self, delta: f64) {
        self.input_current += delta;
    }

    pub fn set_current(&mut self, value: f64) {
        self.input_current = value;
    }

    pub fn input_current(&self) -> f64 {
        self.input_current
    }

    /// Drive the membrane toward `target` by injecting the equivalent
    /// current. The potential itself is not touched; subsequent steps move it.
    pub fn set_membrane_potential(&mut self, target: f64) {
        self.input_current = (target - self.params.resting_potential) / self.params.resistance;
    }

    #[inline]
    pub fn get_membrane_potential(&self) -> f64 {
        self.membrane
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.refractory_until.map_or(true, |until| self.age > until)
    }

    pub fn is_refractory(&self) -> bool {
        !self.is_active()
    }

    /// Canonical single-node representation used by graph compilation.
    pub fn reduce(&self) -> SomaNode {
        SomaNode {
            name: format!("{}/{}", self.name, SOMA),
            mv: self.membrane,
            resting: self.params.resting_potential,
            threshold: self.params.threshold_potential,
            fire_potential: self.params.fire_potential,
        }
    }
}

impl fmt::Debug for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neuron")
            .field("name", &self.name)
            .field("membrane", &self.membrane)
            .field("input_current", &self.input_current)
            .field("refractory_until", &self.refractory_until)
            .field("age", &self.age)
            .field("fire_hooks", &self.fire_hooks.len())
            .finish()
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LIAF(name='{}', resting_potential={}, threshold_potential={}, fire_potential={})",
            self.name,
            self.params.resting_potential,
            self.params.threshold_potential,
            self.params.fire_potential
        )
    }
}
