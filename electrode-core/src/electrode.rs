//! Probes bound to one neuron or one compiled node.
//!
//! The two bindings have different write contracts:
//! - a neuron electrode pins by current injection (`set_membrane_potential`),
//!   so the potential converges over later steps;
//! - a node electrode overwrites the node's `mv` immediately.

use crate::compiled::NodeId;
use crate::error::NetworkResult;
use crate::network::NetworkGraph;
use crate::neuron::NeuronId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectrodeTarget {
    Neuron(NeuronId),
    Node(NodeId),
}

/// Owned by the caller; holds only the binding, never a borrow of the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Electrode {
    label: String,
    target: ElectrodeTarget,
}

impl Electrode {
    /// Electrode on a neuron of the per-neuron model.
    pub fn on_neuron(network: &NetworkGraph, name: &str) -> NetworkResult<Self> {
        let id = network.neuron_id(name)?;
        Ok(Self { label: name.to_string(), target: ElectrodeTarget::Neuron(id) })
    }

    /// Electrode on a compiled node, addressed by its full key.
    pub fn on_node(network: &NetworkGraph, key: &str) -> NetworkResult<Self> {
        let id = network.get_graph()?.node_id(key)?;
        Ok(Self { label: key.to_string(), target: ElectrodeTarget::Node(id) })
    }

    /// Electrode on a compiled node, addressed as `(neuron, segment)`.
    pub fn on_segment(network: &NetworkGraph, neuron: &str, segment: &str) -> NetworkResult<Self> {
        let id = network.get_graph()?.segment_id(neuron, segment)?;
        Ok(Self { label: format!("{}/{}", neuron, segment), target: ElectrodeTarget::Node(id) })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn target(&self) -> ElectrodeTarget {
        self.target
    }

    /// Current membrane potential at the bound location.
    pub fn measure(&self, network: &NetworkGraph) -> NetworkResult<f64> {
        match self.target {
            ElectrodeTarget::Neuron(id) => Ok(network.neuron_by_id(id)?.get_membrane_potential()),
            ElectrodeTarget::Node(id) => Ok(network.get_graph()?.node_by_id(id)?.mv),
        }
    }

    /// Pin the bound location to `target_v` (see module docs for the two contracts).
    pub fn pin(&self, network: &mut NetworkGraph, target_v: f64) -> NetworkResult<()> {
        match self.target {
            ElectrodeTarget::Neuron(id) => {
                network.neuron_by_id_mut(id)?.set_membrane_potential(target_v);
            }
            ElectrodeTarget::Node(id) => {
                network.get_graph_mut()?.node_by_id_mut(id)?.mv = target_v;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::neuron::Neuron;

    #[test]
    fn neuron_electrode_measures_and_injects() {
        let mut net = NetworkGraph::new();
        net.add_neuron(Neuron::new("A")).unwrap();
        let e = Electrode::on_neuron(&net, "A").unwrap();
        assert_eq!(e.measure(&net).unwrap(), 0.0);

        e.pin(&mut net, 500.0).unwrap();
        // Pinning injects current; the potential has not moved yet.
        assert_eq!(e.measure(&net).unwrap(), 0.0);
        assert_eq!(net.neuron("A").unwrap().input_current(), 500.0);
    }

    #[test]
    fn node_electrode_overwrites_immediately() {
        let mut net = NetworkGraph::new();
        net.add_neuron(Neuron::new("A")).unwrap();
        assert_eq!(Electrode::on_node(&net, "A/soma").err(), Some(NetworkError::NotCompiled));

        net.compile(true).unwrap();
        let e = Electrode::on_segment(&net, "A", "soma").unwrap();
        assert_eq!(e.label(), "A/soma");
        e.pin(&mut net, 500.0).unwrap();
        assert_eq!(e.measure(&net).unwrap(), 500.0);
        // The neuron model is a separate state and is untouched.
        assert_eq!(net.neuron("A").unwrap().input_current(), 0.0);
    }

    #[test]
    fn unknown_locations() {
        let mut net = NetworkGraph::new();
        net.add_neuron(Neuron::new("A")).unwrap();
        net.compile(false).unwrap();
        assert_eq!(Electrode::on_neuron(&net, "B"), Err(NetworkError::UnknownNode("B".into())));
        assert_eq!(Electrode::on_node(&net, "A/soma"), Err(NetworkError::UnknownNode("A/soma".into())));
        assert!(Electrode::on_node(&net, "A").is_ok());
    }
}
