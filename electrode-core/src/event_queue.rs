//! Spike events and the per-tick delivery outbox.

use crate::NeuronId;

/// A neuron (or soma node) that fired during `tick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpikeEvent {
    pub neuron: NeuronId,
    pub tick: u64,
}

/// Current scheduled for a postsynaptic neuron.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurrentDelivery {
    pub target: NeuronId,
    pub amount: f64,
}

/// Write side of the double buffer used by per-neuron stepping.
///
/// Fire observers push deliveries here while the tick is in progress; the
/// engine drains the outbox into the current accumulators once every neuron
/// has stepped, so no neuron sees input emitted during the same tick.
#[derive(Debug, Default)]
pub struct SpikeOutbox {
    deliveries: Vec<CurrentDelivery>,
}

impl SpikeOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn deliver(&mut self, target: NeuronId, amount: f64) {
        self.deliveries.push(CurrentDelivery { target, amount });
    }

    /// Deliveries in the order they were pushed. Leaves the outbox empty.
    pub fn drain(&mut self) -> Vec<CurrentDelivery> {
        core::mem::take(&mut self.deliveries)
    }

    pub fn pending(&self) -> &[CurrentDelivery] {
        &self.deliveries
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }
}
