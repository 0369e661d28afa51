//! Synapse models. A synapse turns a presynaptic spike into postsynaptic
//! input; every model does this through `output_contribution`.

use crate::error::{NetworkError, NetworkResult};
use crate::event_queue::SpikeOutbox;
use crate::neuron::{FireObserver, NeuronId};

pub trait Synapse {
    /// Bind the synapse to its endpoints. Succeeds exactly once.
    fn connect(&mut self, pre: NeuronId, post: NeuronId) -> NetworkResult<()>;

    /// `(pre, post)` once connected.
    fn endpoints(&self) -> Option<(NeuronId, NeuronId)>;

    /// Current (or potential) handed to the postsynaptic side per spike.
    fn output_contribution(&self) -> f64;

    fn model_name(&self) -> &'static str;
}

// Every synapse subscribes to its presynaptic neuron as a fire observer.
impl<S: Synapse + ?Sized> FireObserver for S {
    fn on_fire(&self, _emitter: &str, outbox: &mut SpikeOutbox) {
        if let Some((_, post)) = self.endpoints() {
            outbox.deliver(post, self.output_contribution());
        }
    }
}

/// Set-once endpoint pair shared by the synapse models.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Link(Option<(NeuronId, NeuronId)>);

impl Link {
    fn set(&mut self, pre: NeuronId, post: NeuronId) -> NetworkResult<()> {
        if self.0.is_some() {
            return Err(NetworkError::SynapseAlreadyConnected);
        }
        self.0 = Some((pre, post));
        Ok(())
    }
}

/// Delivers a fixed current regardless of presynaptic state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantCurrentSynapse {
    current: f64,
    link: Link,
}

impl ConstantCurrentSynapse {
    pub fn new(current: f64) -> Self {
        Self { current, link: Link::default() }
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

impl Default for ConstantCurrentSynapse {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl Synapse for ConstantCurrentSynapse {
    fn connect(&mut self, pre: NeuronId, post: NeuronId) -> NetworkResult<()> {
        self.link.set(pre, post)
    }

    fn endpoints(&self) -> Option<(NeuronId, NeuronId)> {
        self.link.0
    }

    fn output_contribution(&self) -> f64 {
        self.current
    }

    fn model_name(&self) -> &'static str {
        "ConstantCurrent"
    }
}

/// Scales a fixed postsynaptic potential by a stored weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedSynapse {
    weight: f64,
    postsynaptic_potential: f64,
    link: Link,
}

impl WeightedSynapse {
    /// Unit postsynaptic potential, so the contribution equals the weight.
    pub fn new(weight: f64) -> Self {
        Self::with_potential(weight, 1.0)
    }

    pub fn with_potential(weight: f64, postsynaptic_potential: f64) -> Self {
        Self { weight, postsynaptic_potential, link: Link::default() }
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn postsynaptic_potential(&self) -> f64 {
        self.postsynaptic_potential
    }
}

impl Synapse for WeightedSynapse {
    fn connect(&mut self, pre: NeuronId, post: NeuronId) -> NetworkResult<()> {
        self.link.set(pre, post)
    }

    fn endpoints(&self) -> Option<(NeuronId, NeuronId)> {
        self.link.0
    }

    fn output_contribution(&self) -> f64 {
        self.weight * self.postsynaptic_potential
    }

    fn model_name(&self) -> &'static str {
        "Weighted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_current_ignores_weighting() {
        let syn = ConstantCurrentSynapse::default();
        assert_eq!(syn.output_contribution(), 1.5);
        assert_eq!(syn.endpoints(), None);
        assert_eq!(syn.model_name(), "ConstantCurrent");
    }

    #[test]
    fn weighted_scales_potential() {
        assert_eq!(WeightedSynapse::new(0.75).output_contribution(), 0.75);
        let syn = WeightedSynapse::with_potential(2.0, 3.5);
        assert_eq!(syn.output_contribution(), 7.0);
        assert_eq!(syn.postsynaptic_potential(), 3.5);
        assert_eq!(syn.model_name(), "Weighted");
    }

    #[test]
    fn connect_is_set_once() {
        let mut syn = WeightedSynapse::new(1.0);
        syn.connect(0, 1).unwrap();
        assert_eq!(syn.endpoints(), Some((0, 1)));
        assert_eq!(syn.connect(1, 0), Err(NetworkError::SynapseAlreadyConnected));
        assert_eq!(syn.endpoints(), Some((0, 1)));
    }

    #[test]
    fn fire_delivers_to_postsynaptic_neuron() {
        let mut syn = ConstantCurrentSynapse::new(2.5);
        let mut outbox = SpikeOutbox::new();

        // Unconnected synapses have nowhere to deliver.
        syn.on_fire("a", &mut outbox);
        assert!(outbox.is_empty());

        syn.connect(3, 7).unwrap();
        syn.on_fire("a", &mut outbox);
        let drained = outbox.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].target, 7);
        assert_eq!(drained[0].amount, 2.5);
    }
}
