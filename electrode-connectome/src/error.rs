use electrode_core::NetworkError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectomeError {
    /// Realising the connectome as a network failed.
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("edge {from} -> {to} has non-finite weight {weight}")]
    InvalidWeight { from: String, to: String, weight: f64 },
}

pub type ConnectomeResult<T, E = ConnectomeError> = core::result::Result<T, E>;
