use async_trait::async_trait;
use crate::{AnalysisError, Signal};

/// A single analyzer capability (macro, fundamental or sentiment).
///
/// Implementations fetch whatever data they need and return one `Signal`
/// tagged with their own source. Errors are absorbed by the orchestrator.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, subject: &str) -> Result<Signal, AnalysisError>;
}

/// Current reference price for a subject, used to frame entry/exit levels
#[async_trait]
pub trait ReferencePriceSource: Send + Sync {
    async fn reference_price(&self, subject: &str) -> Result<f64, AnalysisError>;
}
