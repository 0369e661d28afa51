//! Immutable-topology runtime graph produced by `NetworkGraph::compile`.
//!
//! Each neuron reduces to one soma node carrying flat potentials; synapse
//! edges are re-attached between soma nodes. Node payloads stay mutable
//! (potentials change every tick), the node/edge sets do not.

use std::collections::HashMap;
use std::rc::Rc;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};
use crate::network::{EdgeKind, NetworkGraph};
use crate::synapse::Synapse;

/// Segment name of the single node a point neuron reduces to.
pub const SOMA: &str = "soma";

/// Stable index of a node in a [`CompiledGraph`].
pub type NodeId = NodeIndex<u32>;

/// Flat per-node simulation state. Also the read-only snapshot record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SomaNode {
    pub name: String,
    pub mv: f64,
    pub resting: f64,
    pub threshold: f64,
    pub fire_potential: f64,
}

/// Edge payload of the compiled graph.
#[derive(Clone)]
pub enum CompiledEdge {
    Synapse(Rc<dyn Synapse>),
    /// Continuous compartment-to-compartment link.
    Continuous,
}

impl CompiledEdge {
    pub fn synapse(&self) -> Option<&Rc<dyn Synapse>> {
        match self {
            CompiledEdge::Synapse(syn) => Some(syn),
            CompiledEdge::Continuous => None,
        }
    }
}

/// `(source, target, weight)` tuple handed to reporting collaborators.
/// `weight` is `None` for continuous edges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub source: String,
    pub target: String,
    pub weight: Option<f64>,
}

pub struct CompiledGraph {
    graph: StableDiGraph<SomaNode, CompiledEdge>,
    by_name: HashMap<String, NodeId>,
    /// Neuron name -> its soma node, independent of naming mode.
    by_neuron: HashMap<String, NodeId>,
    reduced: bool,
}

impl CompiledGraph {
    pub(crate) fn from_network(network: &NetworkGraph, reduce: bool) -> Self {
        let mut graph = StableDiGraph::with_capacity(network.len(), network.edge_count());
        let mut by_name = HashMap::with_capacity(network.len());
        let mut by_neuron = HashMap::with_capacity(network.len());
        let mut soma_of = Vec::with_capacity(network.len());

        for (name, neuron) in network.neurons() {
            let mut soma = neuron.reduce();
            if !reduce {
                soma.name = name.to_string();
            }
            let key = soma.name.clone();
            let idx = graph.add_node(soma);
            by_name.insert(key, idx);
            by_neuron.insert(name.to_string(), idx);
            soma_of.push(idx);
        }

        for edge in network.edges() {
            let from = soma_of[edge.source as usize];
            let to = soma_of[edge.target as usize];
            let payload = match &edge.kind {
                EdgeKind::Synapse(syn) => CompiledEdge::Synapse(Rc::clone(syn)),
                EdgeKind::Coupling => CompiledEdge::Continuous,
            };
            graph.add_edge(from, to, payload);
        }

        Self { graph, by_name, by_neuron, reduced: reduce }
    }

    pub fn is_reduced(&self) -> bool {
        self.reduced
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    pub fn node_id(&self, key: &str) -> NetworkResult<NodeId> {
        self.by_name
            .get(key)
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode(key.to_string()))
    }

    /// Node id addressed as `(neuron, segment)`, e.g. `("A", "soma")`.
    pub fn segment_id(&self, neuron: &str, segment: &str) -> NetworkResult<NodeId> {
        if self.reduced {
            return self.node_id(&format!("{}/{}", neuron, segment));
        }
        if segment == SOMA {
            return self.node_id(neuron);
        }
        Err(NetworkError::UnknownNode(format!("{}/{}", neuron, segment)))
    }

    /// Soma node of the named neuron.
    pub fn neuron_node(&self, neuron: &str) -> NetworkResult<NodeId> {
        self.by_neuron
            .get(neuron)
            .copied()
            .ok_or_else(|| NetworkError::UnknownNode(neuron.to_string()))
    }

    pub fn node(&self, key: &str) -> NetworkResult<&SomaNode> {
        let idx = self.node_id(key)?;
        Ok(&self.graph[idx])
    }

    pub fn node_mut(&mut self, key: &str) -> NetworkResult<&mut SomaNode> {
        let idx = self.node_id(key)?;
        Ok(&mut self.graph[idx])
    }

    pub fn node_by_id(&self, id: NodeId) -> NetworkResult<&SomaNode> {
        self.graph
            .node_weight(id)
            .ok_or_else(|| NetworkError::UnknownNode(format!("#{}", id.index())))
    }

    pub fn node_by_id_mut(&mut self, id: NodeId) -> NetworkResult<&mut SomaNode> {
        self.graph
            .node_weight_mut(id)
            .ok_or_else(|| NetworkError::UnknownNode(format!("#{}", id.index())))
    }

    /// Outgoing edges of `id` as `(target, payload)`.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &CompiledEdge)> + '_ {
        self.graph.edges(id).map(|e| (e.target(), e.weight()))
    }

    /// Copy of every node's attributes, in node order.
    pub fn snapshot(&self) -> Vec<SomaNode> {
        self.graph.node_indices().map(|idx| self.graph[idx].clone()).collect()
    }

    pub fn edge_list(&self) -> Vec<EdgeSnapshot> {
        self.graph
            .edge_references()
            .map(|e| EdgeSnapshot {
                source: self.graph[e.source()].name.clone(),
                target: self.graph[e.target()].name.clone(),
                weight: e.weight().synapse().map(|syn| syn.output_contribution()),
            })
            .collect()
    }

    /// Fails on the first continuous edge; graph stepping supports synapses only.
    pub fn check_synapse_only(&self) -> NetworkResult<()> {
        match self.graph.edge_references().find(|e| e.weight().synapse().is_none()) {
            Some(edge) => Err(NetworkError::MultiCompartmentUnsupported {
                from: self.graph[edge.source()].name.clone(),
                to: self.graph[edge.target()].name.clone(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn graph(&self) -> &StableDiGraph<SomaNode, CompiledEdge> {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut StableDiGraph<SomaNode, CompiledEdge> {
        &mut self.graph
    }
}
