use thiserror::Error;

/// Construction and usage errors raised by the network and the engine.
///
/// None of these are transient: the caller has to fix the topology or the
/// parameters, retrying the same call fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("graph is frozen: cannot {0} after compile")]
    GraphFrozen(&'static str),
    #[error("graph has not been compiled")]
    NotCompiled,
    #[error("duplicate node: {0}")]
    DuplicateNode(String),
    #[error("multi-compartment edge {from} -> {to} is not supported")]
    MultiCompartmentUnsupported { from: String, to: String },
    #[error("division by zero: {0} must be non-zero")]
    DivisionByZero(&'static str),
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("synapse is already connected")]
    SynapseAlreadyConnected,
}

impl NetworkError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        NetworkError::InvalidParameter { name, reason: reason.into() }
    }
}

pub type NetworkResult<T, E = NetworkError> = core::result::Result<T, E>;
