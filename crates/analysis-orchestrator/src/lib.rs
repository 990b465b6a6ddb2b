use analysis_core::{validate_subject, InvestmentThesis, ReferencePriceSource, ThesisError};
use std::sync::Arc;
use std::time::Duration;

pub mod assembler;
pub mod collector;
pub mod config;
pub mod detector;
pub mod resolver;
pub mod synthesizer;

#[cfg(test)]
mod tests;

pub use assembler::{ThesisAssembler, ThesisContext};
pub use collector::{AnalyzerSet, SignalCollector};
pub use config::{AssemblyPolicy, ConflictPolicy, EngineConfig, SourceWeights, ThesisBands};
pub use detector::ConflictDetector;
pub use resolver::ConflictResolver;
pub use synthesizer::SignalSynthesizer;

/// Multi-source thesis engine.
///
/// Fans out to the three analyzers concurrently, then runs detection,
/// resolution, synthesis and assembly synchronously. Holds no per-request
/// state: every call is independent.
pub struct ThesisOrchestrator {
    collector: SignalCollector,
    detector: ConflictDetector,
    resolver: ConflictResolver,
    synthesizer: SignalSynthesizer,
    assembler: ThesisAssembler,
    /// Optional collaborator for the current price used to frame levels
    price_source: Option<Arc<dyn ReferencePriceSource>>,
    price_timeout: Duration,
}

impl ThesisOrchestrator {
    pub fn new(config: EngineConfig, analyzers: AnalyzerSet) -> Result<Self, ThesisError> {
        config.validate()?;

        Ok(Self {
            collector: SignalCollector::new(analyzers, config.collect_timeout),
            detector: ConflictDetector::new(config.conflict_policy),
            resolver: ConflictResolver::new(config.weights),
            synthesizer: SignalSynthesizer::new(
                config.weights,
                config.bands,
                config.degraded_confidence_penalty,
            )?,
            assembler: ThesisAssembler::new(config.assembly),
            price_source: None,
            price_timeout: config.collect_timeout,
        })
    }

    /// Attach a reference price source
    pub fn with_price_source(mut self, source: Arc<dyn ReferencePriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    /// Run the full pipeline for `subject` over `horizon_days`.
    pub async fn generate_thesis(&self, subject: &str, horizon_days: u32) -> Result<InvestmentThesis, ThesisError> {
        let subject = validate_subject(subject)?;
        tracing::info!("Generating thesis for {} ({} day horizon)", subject, horizon_days);

        let (signals, price) = tokio::join!(self.collector.collect(&subject), self.lookup_price(&subject));
        let ctx = ThesisContext::new(horizon_days, price);
        self.run_pipeline(signals?, ctx)
    }

    /// Same as `generate_thesis`, with the reference price supplied by the caller.
    pub async fn generate_thesis_at_price(
        &self,
        subject: &str,
        horizon_days: u32,
        reference_price: f64,
    ) -> Result<InvestmentThesis, ThesisError> {
        let subject = validate_subject(subject)?;
        tracing::info!(
            "Generating thesis for {} ({} day horizon, reference price {:.4})",
            subject, horizon_days, reference_price
        );

        let signals = self.collector.collect(&subject).await?;
        let ctx = ThesisContext::new(horizon_days, Some(reference_price));
        self.run_pipeline(signals, ctx)
    }

    /// Pure stages: no I/O past this point.
    fn run_pipeline(&self, signals: analysis_core::SignalSet, ctx: ThesisContext) -> Result<InvestmentThesis, ThesisError> {
        if !signals.degraded_sources.is_empty() {
            tracing::warn!(
                "{} of 3 analyzers degraded for {}",
                signals.degraded_sources.len(),
                signals.subject
            );
        }

        let conflicts = self.detector.detect(&signals);
        if conflicts.is_empty() {
            tracing::info!("No conflicts between sources for {}", signals.subject);
        } else {
            tracing::info!("Detected {} conflict(s) for {}", conflicts.len(), signals.subject);
        }

        let resolutions = self.resolver.resolve(&conflicts, &signals);
        let synthesis = self.synthesizer.synthesize(&signals, &resolutions)?;

        Ok(self.assembler.assemble(&synthesis, &signals, &conflicts, &resolutions, &ctx))
    }

    /// Returns None on any error (levels then use the normalized basis).
    async fn lookup_price(&self, subject: &str) -> Option<f64> {
        let source = self.price_source.as_ref()?;
        match tokio::time::timeout(self.price_timeout, source.reference_price(subject)).await {
            Ok(Ok(price)) if price.is_finite() && price > 0.0 => Some(price),
            Ok(Ok(price)) => {
                tracing::warn!("Ignoring invalid reference price {} for {}", price, subject);
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("Reference price unavailable for {}: {}", subject, e);
                None
            }
            Err(_) => {
                tracing::warn!("Reference price lookup timed out for {}", subject);
                None
            }
        }
    }
}
