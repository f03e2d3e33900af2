use thiserror::Error;

/// Main error type for the trainer
#[derive(Error, Debug)]
pub enum TraderError {
    // Data ingestion errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    Data(String),

    // Data precondition errors
    #[error("Insufficient history: {rows} rows, need at least {required} for the lookback window")]
    InsufficientHistory { rows: usize, required: usize },

    // Replay buffer errors
    #[error("Insufficient samples: requested {requested}, buffer holds {available}")]
    InsufficientSamples { requested: usize, available: usize },

    // Model persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    // Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for TraderError
pub type Result<T> = std::result::Result<T, TraderError>;
