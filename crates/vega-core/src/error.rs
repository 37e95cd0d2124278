use thiserror::Error;

#[derive(Error, Debug)]
pub enum VegaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Empty pixel selection")]
    EmptySelection,

    #[error("Sigma clipping rejected all {total} samples after {iterations} iterations")]
    InsufficientData { total: usize, iterations: usize },
}

pub type Result<T> = std::result::Result<T, VegaError>;
