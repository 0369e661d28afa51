//! electrode-core: discrete-time leaky integrate-and-fire networks with a
//! compiled graph view and electrode probes.
//!
//! Build a [`NetworkGraph`] (or drive one through a [`Simulation`]), call
//! `compile` to freeze the topology, then step with either strategy:
//! per-neuron state machines wired by synapse fire hooks, or batched passes
//! over the compiled soma graph.

pub mod config;
pub mod compiled;
pub mod electrode;
pub mod error;
pub mod event_queue;
pub mod network;
pub mod neuron;
pub mod simulation;
pub mod synapse;
pub mod timing;

// Re-exports
pub use config::{SimulationConfig, SteppingStrategy};
pub use compiled::{CompiledEdge, CompiledGraph, EdgeSnapshot, NodeId, SomaNode, SOMA};
pub use electrode::{Electrode, ElectrodeTarget};
pub use error::{NetworkError, NetworkResult};
pub use event_queue::{CurrentDelivery, SpikeEvent, SpikeOutbox};
pub use network::{EdgeKind, GraphState, NetworkEdge, NetworkGraph};
pub use neuron::{FireObserver, Neuron, NeuronId, NeuronParams};
pub use simulation::Simulation;
pub use synapse::{ConstantCurrentSynapse, Synapse, WeightedSynapse};
