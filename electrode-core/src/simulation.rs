//! Discrete-time engine. A `Simulation` owns its network and configuration;
//! there is no process-wide state.
//!
//! Both strategies are double-buffered: decisions within a tick read the
//! state left by the previous phase, and writes land after it.
//!
//! Per-neuron tick:
//! 1. step every neuron in insertion order; fire hooks queue deliveries in the outbox
//! 2. commit queued deliveries to the target current accumulators
//!
//! Graph-batched tick (all nodes in insertion order, each pass complete
//! before the next starts):
//! - A (decay): `V = (V - rest) * retention + rest`; `V >= threshold` snaps to the fire potential
//! - B (transfer): for each source with `V >= fire - eps` after A, every synapse edge sets
//!   `target.V = min(contribution * time_resolution, target.threshold)`
//! - C (reset): `V >= fire` resets to `rest - eps`

use crate::compiled::CompiledGraph;
use crate::config::{SimulationConfig, SteppingStrategy};
use crate::electrode::Electrode;
use crate::error::{NetworkError, NetworkResult};
use crate::event_queue::{SpikeEvent, SpikeOutbox};
use crate::network::NetworkGraph;
use crate::neuron::{Neuron, NeuronId};
use crate::synapse::Synapse;

/// A pin re-applied before each of the next `remaining` steps.
#[derive(Clone, Debug)]
struct Clamp {
    electrode: Electrode,
    value: f64,
    remaining: u64,
}

pub struct Simulation {
    network: NetworkGraph,
    config: SimulationConfig,
    tick: u64,
    outbox: SpikeOutbox,
    clamps: Vec<Clamp>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> NetworkResult<Self> {
        Self::with_network(NetworkGraph::new(), config)
    }

    pub fn with_network(network: NetworkGraph, config: SimulationConfig) -> NetworkResult<Self> {
        config.validate()?;
        Ok(Self { network, config, tick: 0, outbox: SpikeOutbox::new(), clamps: Vec::new() })
    }

    pub fn network(&self) -> &NetworkGraph {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut NetworkGraph {
        &mut self.network
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of completed steps.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn add_neuron(&mut self, neuron: Neuron) -> NetworkResult<NeuronId> {
        self.network.add_neuron(neuron)
    }

    pub fn add_synapse<S>(&mut self, source: &str, target: &str, synapse: S) -> NetworkResult<()>
    where
        S: Synapse + 'static,
    {
        self.network.add_synapse(source, target, synapse)
    }

    /// Compile with the configured reduction mode.
    pub fn compile(&mut self) -> NetworkResult<&CompiledGraph> {
        self.network.compile(self.config.reduce)
    }

    /// Electrode matching the configured strategy: a neuron electrode for
    /// per-neuron stepping, the neuron's soma node for graph stepping.
    pub fn add_electrode(&self, neuron: &str) -> NetworkResult<Electrode> {
        match self.config.strategy {
            SteppingStrategy::PerNeuron => Electrode::on_neuron(&self.network, neuron),
            SteppingStrategy::GraphBatched => {
                let key = {
                    let graph = self.network.get_graph()?;
                    let id = graph.neuron_node(neuron)?;
                    graph.node_by_id(id)?.name.clone()
                };
                Electrode::on_node(&self.network, &key)
            }
        }
    }

    pub fn measure(&self, electrode: &Electrode) -> NetworkResult<f64> {
        electrode.measure(&self.network)
    }

    pub fn pin(&mut self, electrode: &Electrode, target_v: f64) -> NetworkResult<()> {
        electrode.pin(&mut self.network, target_v)
    }

    /// Hold `electrode` at `target_v` for the next `cycles` steps.
    pub fn clamp(&mut self, electrode: &Electrode, target_v: f64, cycles: u64) -> NetworkResult<()> {
        // Validate the binding now rather than on the next step.
        electrode.measure(&self.network)?;
        if cycles > 0 {
            self.clamps.push(Clamp { electrode: electrode.clone(), value: target_v, remaining: cycles });
        }
        Ok(())
    }

    pub fn active_clamps(&self) -> usize {
        self.clamps.len()
    }

    /// Advance one tick with the configured strategy. Returns the spikes of
    /// this tick.
    pub fn step(&mut self) -> NetworkResult<Vec<SpikeEvent>> {
        if !self.network.is_compiled() {
            return Err(NetworkError::NotCompiled);
        }
        if self.config.strategy == SteppingStrategy::GraphBatched {
            // Reject unsupported edges before clamps or passes touch any potential.
            self.network.get_graph()?.check_synapse_only()?;
        }
        self.apply_clamps()?;

        let tick = self.tick;
        let fired = match self.config.strategy {
            SteppingStrategy::PerNeuron => step_neurons(&mut self.network, &mut self.outbox),
            SteppingStrategy::GraphBatched => step_graph(self.network.get_graph_mut()?, &self.config)?,
        };
        self.tick += 1;
        tracing::trace!(tick, strategy = ?self.config.strategy, spikes = fired.len(), "step");
        Ok(fired.into_iter().map(|neuron| SpikeEvent { neuron, tick }).collect())
    }

    /// Step exactly `n` times, stopping at the first failure.
    pub fn run(&mut self, n: u64) -> NetworkResult<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    fn apply_clamps(&mut self) -> NetworkResult<()> {
        for clamp in &mut self.clamps {
            clamp.electrode.pin(&mut self.network, clamp.value)?;
            clamp.remaining -= 1;
        }
        self.clamps.retain(|c| c.remaining > 0);
        Ok(())
    }
}

/// Per-neuron tick. Returns the ids of neurons that fired.
fn step_neurons(network: &mut NetworkGraph, outbox: &mut SpikeOutbox) -> Vec<NeuronId> {
    let neurons = network.neurons_slice_mut();
    let mut fired = Vec::new();
    for (id, neuron) in neurons.iter_mut().enumerate() {
        if neuron.step(outbox) {
            fired.push(id as NeuronId);
        }
    }
    for delivery in outbox.drain() {
        if let Some(target) = neurons.get_mut(delivery.target as usize) {
            target.add_current(delivery.amount);
        }
    }
    fired
}

/// Graph-batched tick. Returns the indices of nodes that were firing after
/// the decay pass.
fn step_graph(compiled: &mut CompiledGraph, config: &SimulationConfig) -> NetworkResult<Vec<NeuronId>> {
    let eps = config.fire_epsilon;
    let retention = config.leak_retention;
    let resolution = config.time_resolution as f64;

    compiled.check_synapse_only()?;

    let order: Vec<_> = compiled.node_ids().collect();

    // A: decay toward rest, snap to the fire potential past threshold.
    {
        let graph = compiled.graph_mut();
        for &idx in &order {
            let node = &mut graph[idx];
            node.mv = (node.mv - node.resting) * retention + node.resting;
            if node.mv >= node.threshold {
                node.mv = node.fire_potential;
            }
        }
    }

    // B: read the settled post-A state, then write.
    let firing: Vec<_> = order
        .iter()
        .copied()
        .filter(|&idx| {
            let node = &compiled.graph()[idx];
            node.mv >= node.fire_potential - eps
        })
        .collect();

    let mut writes = Vec::new();
    for &src in &firing {
        for (dst, edge) in compiled.outgoing(src) {
            if let Some(syn) = edge.synapse() {
                let threshold = compiled.graph()[dst].threshold;
                writes.push((dst, (syn.output_contribution() * resolution).min(threshold)));
            }
        }
    }
    {
        let graph = compiled.graph_mut();
        for (dst, mv) in writes {
            graph[dst].mv = mv;
        }
    }

    // C: reset anything at or above the fire potential.
    {
        let graph = compiled.graph_mut();
        for &idx in &order {
            let node = &mut graph[idx];
            if node.mv >= node.fire_potential {
                node.mv = node.resting - eps;
            }
        }
    }

    Ok(firing.into_iter().map(|idx| idx.index() as NeuronId).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::NeuronParams;
    use crate::synapse::{ConstantCurrentSynapse, WeightedSynapse};

    fn soma(name: &str) -> Neuron {
        Neuron::with_params(name, NeuronParams::point_soma()).unwrap()
    }

    #[test]
    fn step_requires_compile() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.add_neuron(Neuron::new("A")).unwrap();
        assert_eq!(sim.step(), Err(NetworkError::NotCompiled));
        assert_eq!(sim.run(3), Err(NetworkError::NotCompiled));
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = SimulationConfig::default().with_time_resolution(0);
        assert!(Simulation::new(cfg).is_err());
    }

    #[test]
    fn per_neuron_deliveries_land_after_the_pass() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.add_neuron(Neuron::new("A")).unwrap();
        sim.add_neuron(Neuron::new("B")).unwrap();
        sim.add_synapse("A", "B", ConstantCurrentSynapse::new(2.0)).unwrap();
        sim.compile().unwrap();

        sim.network_mut().neuron_mut("A").unwrap().set_current(500.0);
        let spikes = sim.step().unwrap();
        assert_eq!(spikes, vec![SpikeEvent { neuron: 0, tick: 0 }]);

        // B stepped before the delivery was committed: potential unchanged,
        // current present for the next tick.
        let b = sim.network().neuron("B").unwrap();
        assert_eq!(b.get_membrane_potential(), 0.0);
        assert_eq!(b.input_current(), 2.0);

        sim.step().unwrap();
        let b = sim.network().neuron("B").unwrap();
        assert!((b.get_membrane_potential() - 2.0 / 10.0 * 0.12).abs() < 1e-12);
    }

    #[test]
    fn order_of_insertion_does_not_change_result() {
        fn run(forward: bool) -> f64 {
            let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
            let names = if forward { ["A", "B"] } else { ["B", "A"] };
            for name in names {
                sim.add_neuron(Neuron::new(name)).unwrap();
            }
            sim.add_synapse("A", "B", ConstantCurrentSynapse::new(2.0)).unwrap();
            sim.compile().unwrap();
            sim.network_mut().neuron_mut("A").unwrap().set_current(500.0);
            sim.run(2).unwrap();
            sim.network().neuron("B").unwrap().get_membrane_potential()
        }
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn graph_step_decays_toward_rest() {
        let mut sim = Simulation::new(SimulationConfig::graph_batched()).unwrap();
        sim.add_neuron(soma("A")).unwrap();
        sim.compile().unwrap();
        sim.network_mut().get_graph_mut().unwrap().node_mut("A/soma").unwrap().mv = -60.0;

        sim.step().unwrap();
        let mv = sim.network().get_graph().unwrap().node("A/soma").unwrap().mv;
        // (-60 + 75) * 0.62 - 75
        assert!((mv - (-65.7)).abs() < 1e-9);
    }

    #[test]
    fn graph_step_transfers_and_resets() {
        let mut sim = Simulation::new(SimulationConfig::graph_batched()).unwrap();
        sim.add_neuron(soma("1")).unwrap();
        sim.add_neuron(soma("2")).unwrap();
        sim.add_synapse("1", "2", WeightedSynapse::new(1.0)).unwrap();
        sim.compile().unwrap();
        sim.network_mut().get_graph_mut().unwrap().node_mut("1/soma").unwrap().mv = 40.0;

        let spikes = sim.step().unwrap();
        assert_eq!(spikes, vec![SpikeEvent { neuron: 0, tick: 0 }]);
        let graph = sim.network().get_graph().unwrap();
        // Transfer is capped at the target threshold.
        assert_eq!(graph.node("2/soma").unwrap().mv, -53.0);
        assert_eq!(graph.node("1/soma").unwrap().mv, -77.0);
    }

    #[test]
    fn graph_step_rejects_couplings_untouched() {
        let mut sim = Simulation::new(SimulationConfig::graph_batched()).unwrap();
        sim.add_neuron(soma("A")).unwrap();
        sim.add_neuron(soma("B")).unwrap();
        sim.network_mut().add_coupling("A", "B").unwrap();
        sim.compile().unwrap();
        sim.network_mut().get_graph_mut().unwrap().node_mut("A/soma").unwrap().mv = 0.0;

        assert_eq!(
            sim.step(),
            Err(NetworkError::MultiCompartmentUnsupported { from: "A/soma".into(), to: "B/soma".into() })
        );
        assert_eq!(sim.network().get_graph().unwrap().node("A/soma").unwrap().mv, 0.0);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn failing_graph_step_keeps_clamps_pending() {
        let mut sim = Simulation::new(SimulationConfig::graph_batched()).unwrap();
        sim.add_neuron(soma("A")).unwrap();
        sim.add_neuron(soma("B")).unwrap();
        sim.network_mut().add_coupling("A", "B").unwrap();
        sim.compile().unwrap();
        let e = sim.add_electrode("A").unwrap();
        sim.clamp(&e, 12.0, 3).unwrap();

        assert!(matches!(sim.step(), Err(NetworkError::MultiCompartmentUnsupported { .. })));
        assert_eq!(sim.measure(&e).unwrap(), -75.0);
        assert_eq!(sim.active_clamps(), 1);
        assert_eq!(sim.tick(), 0);
    }

    #[test]
    fn per_neuron_step_ignores_couplings() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        sim.add_neuron(Neuron::new("A")).unwrap();
        sim.add_neuron(Neuron::new("B")).unwrap();
        sim.network_mut().add_coupling("A", "B").unwrap();
        sim.compile().unwrap();
        assert!(sim.run(5).is_ok());
        assert_eq!(sim.tick(), 5);
    }

    #[test]
    fn add_electrode_follows_strategy() {
        let mut sim = Simulation::new(SimulationConfig::graph_batched()).unwrap();
        sim.add_neuron(soma("A")).unwrap();
        assert_eq!(sim.add_electrode("A"), Err(NetworkError::NotCompiled));
        sim.compile().unwrap();
        let e = sim.add_electrode("A").unwrap();
        assert_eq!(e.label(), "A/soma");
        sim.pin(&e, 12.0).unwrap();
        assert_eq!(sim.measure(&e).unwrap(), 12.0);
    }

    #[test]
    fn clamp_holds_for_cycles() {
        let mut sim = Simulation::new(SimulationConfig::graph_batched()).unwrap();
        sim.add_neuron(soma("A")).unwrap();
        sim.compile().unwrap();
        let e = sim.add_electrode("A").unwrap();

        sim.clamp(&e, -60.0, 2).unwrap();
        assert_eq!(sim.active_clamps(), 1);
        sim.step().unwrap();
        let after_first = sim.measure(&e).unwrap();
        sim.step().unwrap();
        // Re-pinned before the second step, so the same decay applies again.
        assert_eq!(sim.measure(&e).unwrap(), after_first);
        assert_eq!(sim.active_clamps(), 0);

        sim.step().unwrap();
        assert!(sim.measure(&e).unwrap() < after_first);
    }
}
