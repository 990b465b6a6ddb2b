use thiserror::Error;

/// Errors an individual analyzer may return. The orchestrator never surfaces
/// these to its caller; a failing analyzer is replaced by a neutral signal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abort thesis generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThesisError {
    /// Subject was empty or malformed. Raised before any analyzer runs.
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// Internal invariant violated (bad weights, bad bands, non-finite output).
    #[error("Synthesis inconsistency: {0}")]
    SynthesisInconsistency(String),
}
