use burn::record::RecorderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The value model produced an output that does not line up with the sampled slice.
    #[error("Value model output shape mismatch: expected {expected:?}, got {actual:?}")]
    ValueShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("No policy input derivation is configured for this trainer")]
    MissingPolicyInputs,

    #[error("Unable to share parameter prefix: {0}")]
    SharedPrefix(String),

    #[error("Trajectory memory has no trajectories to sample from")]
    EmptyMemory,

    #[error("Observation size mismatch: expected {expected}, got {actual}")]
    ObservationSize { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Batch stream ended after {0} steps")]
    StreamExhausted(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Recorder error: {0:?}")]
    Recorder(RecorderError),
}

pub type Result<T> = std::result::Result<T, Error>;
