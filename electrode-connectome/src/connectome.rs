//! Editable wiring diagram with ablation.
//!
//! A [`Connectome`] holds two layers over the same node set: the *control*
//! wiring, which accumulates every node and edge ever added, and the *current*
//! wiring, which is the control minus whatever has been ablated since the last
//! [`Connectome::reset`]. Edges follow directed simple-graph rules: adding an
//! edge that already exists updates its weight, and naming an unknown endpoint
//! creates that node.

use std::collections::{BTreeMap, HashMap};

use electrode_core::{NetworkGraph, Neuron, NeuronParams, NetworkResult, WeightedSynapse};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};

use crate::error::{ConnectomeError, ConnectomeResult};

/// Free-form node annotations (cell class, neurotransmitter, ...).
pub type Attributes = BTreeMap<String, String>;

/// Weight used when an unweighted edge is realised as a synapse.
pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectomeNode {
    pub name: String,
    pub attributes: Attributes,
}

/// `StableDiGraph` reuses vacated slots, so iteration follows the explicit
/// insertion-order lists rather than the graph's index order.
#[derive(Clone, Debug, Default)]
struct Wiring {
    graph: StableDiGraph<ConnectomeNode, Option<f64>>,
    index: HashMap<String, NodeIndex>,
    node_order: Vec<NodeIndex>,
    edge_order: Vec<EdgeIndex>,
}

impl Wiring {
    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self
            .graph
            .add_node(ConnectomeNode { name: name.to_string(), attributes: Attributes::new() });
        self.index.insert(name.to_string(), idx);
        self.node_order.push(idx);
        idx
    }

    fn merge_attributes(&mut self, name: &str, attributes: &Attributes) {
        let idx = self.ensure_node(name);
        self.graph[idx].attributes.extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// An unweighted re-add keeps whatever weight the edge already carries.
    fn set_edge(&mut self, from: &str, to: &str, weight: Option<f64>) {
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        match self.graph.find_edge(a, b) {
            Some(e) => {
                if weight.is_some() {
                    self.graph[e] = weight;
                }
            }
            None => {
                let e = self.graph.add_edge(a, b, weight);
                self.edge_order.push(e);
            }
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        let Some(idx) = self.index.remove(name) else {
            return false;
        };
        if self.graph.remove_node(idx).is_none() {
            return false;
        }
        // Prune before any later insertion can reuse the vacated slots.
        self.node_order.retain(|&n| n != idx);
        let graph = &self.graph;
        self.edge_order.retain(|&e| graph.edge_weight(e).is_some());
        true
    }

    fn nodes(&self) -> impl Iterator<Item = &ConnectomeNode> + '_ {
        self.node_order.iter().map(move |&idx| &self.graph[idx])
    }

    fn edges(&self) -> impl Iterator<Item = (&str, &str, Option<f64>)> + '_ {
        self.edge_order.iter().filter_map(move |&e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((self.graph[a].name.as_str(), self.graph[b].name.as_str(), self.graph[e]))
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Connectome {
    current: Wiring,
    control: Wiring,
}

impl Connectome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from node tuples and `(source, target, weight)` edge tuples.
    pub fn from_parts<N, E, S>(nodes: N, edges: E) -> ConnectomeResult<Self>
    where
        N: IntoIterator<Item = (S, Attributes)>,
        E: IntoIterator<Item = (S, S, Option<f64>)>,
        S: AsRef<str>,
    {
        let mut connectome = Self::new();
        for (name, attributes) in nodes {
            connectome.add_node_with_attributes(name.as_ref(), attributes);
        }
        for (from, to, weight) in edges {
            let (from, to) = (from.as_ref(), to.as_ref());
            if let Some(w) = weight {
                check_weight(from, to, w)?;
            }
            connectome.each_layer(|layer| layer.set_edge(from, to, weight));
        }
        Ok(connectome)
    }

    fn each_layer(&mut self, mut f: impl FnMut(&mut Wiring)) {
        f(&mut self.current);
        f(&mut self.control);
    }

    pub fn add_nodes<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.each_layer(|layer| {
                layer.ensure_node(name.as_ref());
            });
        }
    }

    /// Add a node, merging `attributes` into any it already has.
    pub fn add_node_with_attributes(&mut self, name: &str, attributes: Attributes) {
        self.each_layer(|layer| layer.merge_attributes(name, &attributes));
    }

    /// Add unweighted edges; they realise with [`DEFAULT_WEIGHT`].
    pub fn add_edges<I, S>(&mut self, edges: I)
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        for (from, to) in edges {
            self.each_layer(|layer| layer.set_edge(from.as_ref(), to.as_ref(), None));
        }
    }

    /// Add weighted edges. Either every edge is added or, on a non-finite
    /// weight, none is.
    pub fn add_weighted_edges<I, S>(&mut self, edges: I) -> ConnectomeResult<()>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: AsRef<str>,
    {
        let edges: Vec<(S, S, f64)> = edges.into_iter().collect();
        for (from, to, weight) in &edges {
            check_weight(from.as_ref(), to.as_ref(), *weight)?;
        }
        for (from, to, weight) in &edges {
            self.each_layer(|layer| layer.set_edge(from.as_ref(), to.as_ref(), Some(*weight)));
        }
        Ok(())
    }

    /// Remove nodes (and their incident edges) from the current wiring.
    /// Returns how many were actually removed; absent names are skipped.
    pub fn ablate<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for name in names {
            let name = name.as_ref();
            if self.current.remove(name) {
                removed += 1;
            } else {
                tracing::warn!(node = name, "ablation target not present");
            }
        }
        tracing::debug!(
            removed,
            nodes = self.node_count(),
            edges = self.edge_count(),
            "connectome ablated"
        );
        removed
    }

    /// Undo every ablation.
    pub fn reset(&mut self) {
        self.current = self.control.clone();
        tracing::debug!(nodes = self.node_count(), edges = self.edge_count(), "connectome reset");
    }

    pub fn ablated_nodes(&self) -> Vec<&str> {
        self.control
            .nodes()
            .map(|n| n.name.as_str())
            .filter(|name| !self.current.index.contains_key(*name))
            .collect()
    }

    /// Control edges lost to ablation of either endpoint.
    pub fn ablated_edges(&self) -> Vec<(&str, &str)> {
        self.control
            .edges()
            .filter(|(a, b, _)| !self.contains(a) || !self.contains(b))
            .map(|(a, b, _)| (a, b))
            .collect()
    }

    pub fn nodes_by_attribute(&self, attribute: &str, value: &str) -> Vec<&str> {
        self.current
            .nodes()
            .filter(|n| n.attributes.get(attribute).map(String::as_str) == Some(value))
            .map(|n| n.name.as_str())
            .collect()
    }

    /// Attribute keys in first-seen order.
    pub fn possible_attributes(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for node in self.current.nodes() {
            for key in node.attributes.keys() {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Distinct values of `attribute` in first-seen order.
    pub fn attribute_values(&self, attribute: &str) -> Vec<&str> {
        let mut values: Vec<&str> = Vec::new();
        for value in self.current.nodes().filter_map(|n| n.attributes.get(attribute)) {
            if !values.contains(&value.as_str()) {
                values.push(value);
            }
        }
        values
    }

    pub fn contains(&self, name: &str) -> bool {
        self.current.index.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&ConnectomeNode> {
        self.current.index.get(name).map(|&idx| &self.current.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ConnectomeNode> + '_ {
        self.current.nodes()
    }

    /// `(source, target, weight)`; `None` marks an unweighted edge.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, Option<f64>)> + '_ {
        self.current.edges()
    }

    /// Weight the edge realises with, if it exists.
    pub fn edge_weight(&self, from: &str, to: &str) -> Option<f64> {
        let a = *self.current.index.get(from)?;
        let b = *self.current.index.get(to)?;
        let e = self.current.graph.find_edge(a, b)?;
        Some(self.current.graph[e].unwrap_or(DEFAULT_WEIGHT))
    }

    pub fn node_count(&self) -> usize {
        self.current.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.current.graph.edge_count()
    }

    /// Realise the current wiring: one neuron per node, parameterised by
    /// `params_for(name, attributes)`, and one [`WeightedSynapse`] per edge.
    /// The returned network is still in its building phase.
    pub fn build_network<F>(&self, mut params_for: F) -> ConnectomeResult<NetworkGraph>
    where
        F: FnMut(&str, &Attributes) -> NetworkResult<NeuronParams>,
    {
        let mut network = NetworkGraph::new();
        for node in self.current.nodes() {
            let params = params_for(&node.name, &node.attributes)?;
            network.add_neuron(Neuron::with_params(node.name.clone(), params)?)?;
        }
        for (from, to, weight) in self.current.edges() {
            network.add_synapse(from, to, WeightedSynapse::new(weight.unwrap_or(DEFAULT_WEIGHT)))?;
        }
        tracing::debug!(neurons = network.len(), synapses = network.edge_count(), "connectome realised");
        Ok(network)
    }

    /// [`Connectome::build_network`] with the same parameters for every neuron.
    pub fn build_uniform_network(&self, params: &NeuronParams) -> ConnectomeResult<NetworkGraph> {
        self.build_network(|_, _| Ok(*params))
    }
}

fn check_weight(from: &str, to: &str, weight: f64) -> ConnectomeResult<()> {
    if weight.is_finite() {
        Ok(())
    } else {
        Err(ConnectomeError::InvalidWeight { from: from.to_string(), to: to.to_string(), weight })
    }
}
