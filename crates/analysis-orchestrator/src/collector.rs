use analysis_core::{
    validate_subject, Analyzer, DegradationReason, DegradedSource, Signal, SignalSet, SignalSource,
    ThesisError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{self, JoinSet};
use tokio::time::{timeout_at, Instant};

/// The three analyzer capabilities, wired statically by source
#[derive(Clone)]
pub struct AnalyzerSet {
    pub macro_analyzer: Arc<dyn Analyzer>,
    pub fundamental: Arc<dyn Analyzer>,
    pub sentiment: Arc<dyn Analyzer>,
}

impl AnalyzerSet {
    pub fn get(&self, source: SignalSource) -> &Arc<dyn Analyzer> {
        match source {
            SignalSource::Macro => &self.macro_analyzer,
            SignalSource::Fundamental => &self.fundamental,
            SignalSource::Sentiment => &self.sentiment,
        }
    }
}

/// Runs all analyzers concurrently for one subject under a single deadline.
pub struct SignalCollector {
    analyzers: AnalyzerSet,
    timeout: Duration,
}

impl SignalCollector {
    pub fn new(analyzers: AnalyzerSet, timeout: Duration) -> Self {
        Self { analyzers, timeout }
    }

    /// Collect one signal per source. Never fails for an analyzer problem:
    /// failed, panicked or late analyzers are replaced by the neutral default.
    ///
    /// Tasks live in a `JoinSet`, so dropping this future (caller cancelled)
    /// aborts every analyzer still running.
    pub async fn collect(&self, subject: &str) -> Result<SignalSet, ThesisError> {
        let subject = validate_subject(subject)?;
        let deadline = Instant::now() + self.timeout;

        let mut tasks = JoinSet::new();
        let mut task_sources: HashMap<task::Id, SignalSource> = HashMap::new();
        for source in SignalSource::ALL {
            let analyzer = Arc::clone(self.analyzers.get(source));
            let subject = subject.clone();
            let handle = tasks.spawn(async move { (source, analyzer.analyze(&subject).await) });
            task_sources.insert(handle.id(), source);
        }

        let mut outcomes: HashMap<SignalSource, Result<Signal, DegradationReason>> = HashMap::new();
        loop {
            let next = timeout_at(deadline, tasks.join_next()).await;
            match next {
                Ok(Some(Ok((source, Ok(signal))))) if signal.source == source => {
                    outcomes.insert(source, Ok(signal.sanitized()));
                }
                Ok(Some(Ok((source, Ok(signal))))) => {
                    outcomes.insert(source, Err(DegradationReason::SourceMismatch(signal.source)));
                }
                Ok(Some(Ok((source, Err(e))))) => {
                    outcomes.insert(source, Err(DegradationReason::Failed(e.to_string())));
                }
                Ok(Some(Err(join_err))) => {
                    if let Some(&source) = task_sources.get(&join_err.id()) {
                        tracing::error!("{} analyzer task for {} aborted: {}", source, subject, join_err);
                        outcomes.insert(source, Err(DegradationReason::Panicked));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tasks.abort_all();
                    break;
                }
            }
        }

        let mut signals: Vec<Signal> = Vec::with_capacity(3);
        let mut degraded: Vec<DegradedSource> = Vec::new();

        // Slots are filled in SignalSource::ALL order regardless of completion order.
        for source in SignalSource::ALL {
            match outcomes.remove(&source).unwrap_or(Err(DegradationReason::TimedOut)) {
                Ok(signal) => {
                    tracing::debug!(
                        "{} signal for {}: {} (confidence {:.2}, score {:.1})",
                        source, subject, signal.directional_call, signal.confidence, signal.score
                    );
                    signals.push(signal);
                }
                Err(reason) => {
                    tracing::warn!("{} analyzer degraded for {} ({}), using neutral default", source, subject, reason);
                    signals.push(Signal::neutral_default(source));
                    degraded.push(DegradedSource { source, reason });
                }
            }
        }

        let mut it = signals.into_iter();
        let (Some(macro_signal), Some(fundamental), Some(sentiment)) = (it.next(), it.next(), it.next()) else {
            return Err(ThesisError::SynthesisInconsistency(
                "collector produced fewer than three signals".to_string(),
            ));
        };

        let mut set = SignalSet::new(subject, macro_signal, fundamental, sentiment);
        set.degraded_sources = degraded;
        Ok(set)
    }
}
