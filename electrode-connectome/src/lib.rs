//! electrode-connectome: an editable wiring diagram (named nodes with
//! attributes, optionally weighted directed edges) supporting ablation
//! studies, realised as an `electrode_core::NetworkGraph` on demand.

pub mod connectome;
pub mod error;

pub use connectome::{Attributes, Connectome, ConnectomeNode, DEFAULT_WEIGHT};
pub use error::{ConnectomeError, ConnectomeResult};
