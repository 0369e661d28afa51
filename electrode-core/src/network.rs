//! Network builder: neurons and synapse edges, plus the Building -> Compiled
//! lifecycle. Topology is frozen once compiled.

use std::collections::HashMap;
use std::rc::Rc;

use crate::compiled::CompiledGraph;
use crate::error::{NetworkError, NetworkResult};
use crate::neuron::{FireObserver, Neuron, NeuronId};
use crate::synapse::Synapse;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphState {
    Building,
    Compiled,
}

/// Payload of a builder edge.
#[derive(Clone)]
pub enum EdgeKind {
    Synapse(Rc<dyn Synapse>),
    /// Continuous link between compartments (no spike semantics).
    Coupling,
}

#[derive(Clone)]
pub struct NetworkEdge {
    pub source: NeuronId,
    pub target: NeuronId,
    pub kind: EdgeKind,
}

/// Directed multigraph of neurons keyed by name.
///
/// Neurons live in an arena indexed by [`NeuronId`] in insertion order, which
/// is also the iteration order used by the engine.
#[derive(Default)]
pub struct NetworkGraph {
    neurons: Vec<Neuron>,
    index: HashMap<String, NeuronId>,
    edges: Vec<NetworkEdge>,
    compiled: Option<CompiledGraph>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GraphState {
        if self.compiled.is_some() {
            GraphState::Compiled
        } else {
            GraphState::Building
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    fn ensure_building(&self, op: &'static str) -> NetworkResult<()> {
        if self.is_compiled() {
            return Err(NetworkError::GraphFrozen(op));
        }
        Ok(())
    }

    /// Register a neuron under its name.
    pub fn add_neuron(&mut self, neuron: Neuron) -> NetworkResult<NeuronId> {
        self.ensure_building("add_neuron")?;
        if self.index.contains_key(neuron.name()) {
            return Err(NetworkError::DuplicateNode(neuron.name().to_string()));
        }
        let id = self.neurons.len() as NeuronId;
        self.index.insert(neuron.name().to_string(), id);
        self.neurons.push(neuron);
        Ok(id)
    }

    /// Connect `source -> target` and subscribe the synapse to the source's
    /// fire events. Nothing is recorded unless every check passes.
    pub fn add_synapse<S>(&mut self, source: &str, target: &str, mut synapse: S) -> NetworkResult<()>
    where
        S: Synapse + 'static,
    {
        self.ensure_building("add_synapse")?;
        let pre = self.neuron_id(source)?;
        let post = self.neuron_id(target)?;
        synapse.connect(pre, post)?;

        let shared = Rc::new(synapse);
        let hook: Rc<dyn FireObserver> = shared.clone();
        self.neurons[pre as usize].add_fire_hook(hook);
        let model = shared.model_name();
        self.edges.push(NetworkEdge { source: pre, target: post, kind: EdgeKind::Synapse(shared) });
        tracing::trace!(source, target, model, "synapse added");
        Ok(())
    }

    /// Record a continuous (non-synaptic) edge between two compartments.
    pub fn add_coupling(&mut self, source: &str, target: &str) -> NetworkResult<()> {
        self.ensure_building("add_coupling")?;
        let pre = self.neuron_id(source)?;
        let post = self.neuron_id(target)?;
        self.edges.push(NetworkEdge { source: pre, target: post, kind: EdgeKind::Coupling });
        tracing::trace!(source, target, "coupling added");
        Ok(())
    }

    /// Freeze the topology and derive the runtime graph.
    ///
    /// With `reduce`, soma nodes are named `"<neuron>/soma"`; without it they
    /// take the bare neuron name. A second call returns the existing graph.
    pub fn compile(&mut self, reduce: bool) -> NetworkResult<&CompiledGraph> {
        if self.compiled.is_none() {
            let graph = CompiledGraph::from_network(self, reduce);
            tracing::debug!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                reduce,
                "network compiled"
            );
            self.compiled = Some(graph);
        } else {
            tracing::debug!("network already compiled");
        }
        self.get_graph()
    }

    pub fn get_graph(&self) -> NetworkResult<&CompiledGraph> {
        self.compiled.as_ref().ok_or(NetworkError::NotCompiled)
    }

    pub fn get_graph_mut(&mut self) -> NetworkResult<&mut CompiledGraph> {
        self.compiled.as_mut().ok_or(NetworkError::NotCompiled)
    }

    pub fn neuron_id(&self, name: &str) -> NetworkResult<NeuronId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode(name.to_string()))
    }

    pub fn neuron(&self, name: &str) -> NetworkResult<&Neuron> {
        let id = self.neuron_id(name)?;
        Ok(&self.neurons[id as usize])
    }

    pub fn neuron_mut(&mut self, name: &str) -> NetworkResult<&mut Neuron> {
        let id = self.neuron_id(name)?;
        Ok(&mut self.neurons[id as usize])
    }

    pub fn neuron_by_id(&self, id: NeuronId) -> NetworkResult<&Neuron> {
        self.neurons
            .get(id as usize)
            .ok_or_else(|| NetworkError::UnknownNode(format!("#{}", id)))
    }

    pub fn neuron_by_id_mut(&mut self, id: NeuronId) -> NetworkResult<&mut Neuron> {
        self.neurons
            .get_mut(id as usize)
            .ok_or_else(|| NetworkError::UnknownNode(format!("#{}", id)))
    }

    /// `(name, neuron)` pairs in insertion order.
    pub fn neurons(&self) -> impl Iterator<Item = (&str, &Neuron)> + '_ {
        self.neurons.iter().map(|n| (n.name(), n))
    }

    pub fn edges(&self) -> &[NetworkEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn neurons_slice_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synapse::{ConstantCurrentSynapse, WeightedSynapse};

    fn two() -> NetworkGraph {
        let mut net = NetworkGraph::new();
        net.add_neuron(Neuron::new("A")).unwrap();
        net.add_neuron(Neuron::new("B")).unwrap();
        net
    }

    #[test]
    fn add_neuron_assigns_ids_in_order() {
        let mut net = NetworkGraph::new();
        assert_eq!(net.add_neuron(Neuron::new("A")).unwrap(), 0);
        assert_eq!(net.add_neuron(Neuron::new("B")).unwrap(), 1);
        let names: Vec<_> = net.neurons().map(|(name, _)| name).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(net.state(), GraphState::Building);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut net = two();
        assert_eq!(
            net.add_neuron(Neuron::new("A")),
            Err(NetworkError::DuplicateNode("A".into()))
        );
        assert_eq!(net.len(), 2);
    }

    #[test]
    fn synapse_wires_fire_hook_on_source() {
        let mut net = two();
        net.add_synapse("A", "B", ConstantCurrentSynapse::default()).unwrap();
        assert_eq!(net.neuron("A").unwrap().fire_hook_count(), 1);
        assert_eq!(net.neuron("B").unwrap().fire_hook_count(), 0);
        assert_eq!(net.edge_count(), 1);
        assert_eq!(net.edges()[0].source, 0);
        assert_eq!(net.edges()[0].target, 1);
    }

    #[test]
    fn unknown_endpoint_leaves_graph_unchanged() {
        let mut net = two();
        assert_eq!(
            net.add_synapse("A", "Z", WeightedSynapse::new(1.0)),
            Err(NetworkError::UnknownNode("Z".into()))
        );
        assert_eq!(
            net.add_synapse("Z", "A", WeightedSynapse::new(1.0)),
            Err(NetworkError::UnknownNode("Z".into()))
        );
        assert_eq!(net.edge_count(), 0);
        assert_eq!(net.neuron("A").unwrap().fire_hook_count(), 0);
    }

    #[test]
    fn pre_connected_synapse_is_rejected() {
        let mut net = two();
        let mut syn = WeightedSynapse::new(1.0);
        syn.connect(0, 0).unwrap();
        assert_eq!(net.add_synapse("A", "B", syn), Err(NetworkError::SynapseAlreadyConnected));
        assert_eq!(net.edge_count(), 0);
    }

    #[test]
    fn compile_freezes_topology() {
        let mut net = two();
        net.add_synapse("A", "B", WeightedSynapse::new(1.0)).unwrap();
        assert_eq!(net.get_graph().err(), Some(NetworkError::NotCompiled));

        net.compile(true).unwrap();
        assert_eq!(net.state(), GraphState::Compiled);
        assert_eq!(
            net.add_neuron(Neuron::new("C")),
            Err(NetworkError::GraphFrozen("add_neuron"))
        );
        assert_eq!(
            net.add_synapse("A", "B", WeightedSynapse::new(1.0)),
            Err(NetworkError::GraphFrozen("add_synapse"))
        );
        assert_eq!(net.add_coupling("A", "B"), Err(NetworkError::GraphFrozen("add_coupling")));
        assert_eq!(net.len(), 2);
        assert_eq!(net.edge_count(), 1);
    }

    #[test]
    fn compile_twice_keeps_first_graph() {
        let mut net = two();
        net.compile(false).unwrap();
        let again = net.compile(true).unwrap();
        assert!(!again.is_reduced());
        assert_eq!(again.node_count(), 2);
    }
}
