// Backend abstraction for the TUI so the viewer does not depend on how the network is built.

use anyhow::Result;
use electrode_core::{
    Electrode, Neuron, Simulation, SimulationConfig, SpikeEvent, WeightedSynapse,
};

/// Potential the input neuron is pinned to while `[p]` is on.
pub const PIN_TARGET: f64 = 500.0;

/// Common interface for anything that can drive the TUI.
pub trait SimBackend {
    /// Advance the simulation by one tick and return the spikes of that tick.
    fn step(&mut self) -> Result<Vec<SpikeEvent>>;
    /// Number of neurons in the model (rows in the raster).
    fn neurons(&self) -> usize;
    /// Row label for neuron `row`.
    fn label(&self, row: usize) -> String {
        format!("n{:02}", row)
    }
    /// Latest electrode reading, if the backend has a probe.
    fn probe(&self) -> Option<f64> {
        None
    }
    /// Toggle the input pin; returns the new state. Default: no pin available.
    fn toggle_pin(&mut self) -> bool {
        false
    }
    fn pinned(&self) -> bool {
        false
    }
}

/// Three-neuron chain `A -> B -> C` driven per neuron, probed on `A`.
pub struct CoreBackend {
    sim: Simulation,
    electrode: Electrode,
    names: Vec<String>,
    pinned: bool,
}

impl CoreBackend {
    pub fn new() -> Result<Self> {
        let mut sim = Simulation::new(SimulationConfig::default())?;
        for name in ["A", "B", "C"] {
            sim.add_neuron(Neuron::new(name))?;
        }
        // Strong enough for a single presynaptic spike to fire the target.
        sim.add_synapse("A", "B", WeightedSynapse::with_potential(1.0, 120.0))?;
        sim.add_synapse("B", "C", WeightedSynapse::with_potential(1.0, 120.0))?;
        sim.compile()?;
        let electrode = sim.add_electrode("A")?;
        let names = sim.network().neurons().map(|(name, _)| name.to_string()).collect();

        Ok(Self { sim, electrode, names, pinned: false })
    }
}

impl SimBackend for CoreBackend {
    fn step(&mut self) -> Result<Vec<SpikeEvent>> {
        if self.pinned {
            self.sim.clamp(&self.electrode, PIN_TARGET, 1)?;
        }
        Ok(self.sim.step()?)
    }

    fn neurons(&self) -> usize {
        self.sim.network().len()
    }

    fn label(&self, row: usize) -> String {
        self.names.get(row).cloned().unwrap_or_else(|| format!("n{:02}", row))
    }

    fn probe(&self) -> Option<f64> {
        self.sim.measure(&self.electrode).ok()
    }

    fn toggle_pin(&mut self) -> bool {
        self.pinned = !self.pinned;
        self.pinned
    }

    fn pinned(&self) -> bool {
        self.pinned
    }
}
