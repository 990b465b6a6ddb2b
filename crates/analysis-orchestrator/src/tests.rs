#[cfg(test)]
mod orchestrator_tests {
    use crate::{AnalyzerSet, EngineConfig, ThesisOrchestrator};
    use analysis_core::{
        AnalysisError, Analyzer, ConflictType, DegradationReason, DirectionalCall, PriceBasis, Recommendation,
        ReferencePriceSource, ResolutionStrategy, Severity, Signal, SignalSource, ThesisError, ThesisType,
    };
    use approx::assert_abs_diff_eq;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Analyzer returning a fixed call, optionally after a delay
    struct FixedAnalyzer {
        source: SignalSource,
        call: DirectionalCall,
        confidence: f64,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl FixedAnalyzer {
        fn new(source: SignalSource, call: DirectionalCall, confidence: f64) -> Arc<Self> {
            Arc::new(Self {
                source,
                call,
                confidence,
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn hanging(source: SignalSource) -> Arc<Self> {
            Arc::new(Self {
                source,
                call: DirectionalCall::StrongBullish,
                confidence: 0.9,
                delay: Some(Duration::from_secs(600)),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(&self, _subject: &str) -> Result<Signal, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Signal::new(self.source, self.call, self.confidence, self.call.normalized_score())
                .with_detail(serde_json::json!({ "fixture": true })))
        }
    }

    struct FixedPrice(Result<f64, AnalysisError>);

    #[async_trait]
    impl ReferencePriceSource for FixedPrice {
        async fn reference_price(&self, _subject: &str) -> Result<f64, AnalysisError> {
            self.0.clone()
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            collect_timeout: Duration::from_millis(500),
            ..EngineConfig::default()
        }
    }

    fn orchestrator(m: Arc<FixedAnalyzer>, f: Arc<FixedAnalyzer>, s: Arc<FixedAnalyzer>) -> ThesisOrchestrator {
        ThesisOrchestrator::new(
            config(),
            AnalyzerSet {
                macro_analyzer: m,
                fundamental: f,
                sentiment: s,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_all_strong_bullish() {
        let engine = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::StrongBullish, 0.9),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::StrongBullish, 0.9),
            FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::StrongBullish, 0.9),
        )
        .with_price_source(Arc::new(FixedPrice(Ok(40_000.0))));

        let thesis = engine.generate_thesis("BTC", 30).await.unwrap();

        assert_abs_diff_eq!(thesis.weighted_score, 100.0, epsilon = 1e-9);
        assert_eq!(thesis.thesis_type, ThesisType::StrongBullish);
        assert_eq!(thesis.recommendation, Recommendation::StrongBuy);
        assert!(thesis.conflicts.is_empty());
        assert!(thesis.resolutions.is_empty());
        assert!(thesis.conflicts_resolved);
        assert!(thesis.degraded_sources.is_empty());
        assert_abs_diff_eq!(thesis.confidence, 0.9, epsilon = 1e-12);
        assert_eq!(thesis.price_basis, PriceBasis::Market);
        assert_eq!(thesis.reference_price, 40_000.0);
        assert!(thesis.position.fraction <= 0.20);
        assert_abs_diff_eq!(thesis.position.fraction, 0.18, epsilon = 1e-9);
        assert_eq!(thesis.signals[0].supporting_detail["fixture"], true);
    }

    #[tokio::test]
    async fn test_macro_fundamental_standoff() {
        let engine = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::StrongBullish, 0.9),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::StrongBearish, 0.9),
            FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Neutral, 0.5),
        );

        let thesis = engine.generate_thesis("BTC", 30).await.unwrap();

        // Spread 0.9 - 0.5 sits exactly on the mismatch threshold, so only the
        // directional conflict is reported.
        assert_eq!(thesis.conflicts.len(), 1);
        assert_eq!(thesis.resolutions.len(), 1);

        let directional: Vec<_> = thesis
            .conflicts
            .iter()
            .filter(|c| c.conflict_type.is_directional())
            .collect();
        assert_eq!(directional.len(), 1);
        assert_eq!(directional[0].conflict_type, ConflictType::MacroVsFundamental);
        assert_eq!(directional[0].severity, Severity::Major);

        let deference = thesis
            .resolutions
            .iter()
            .find(|r| r.resolution_strategy == ResolutionStrategy::WeightedDeference)
            .unwrap();
        assert_eq!(deference.dominant_source, Some(SignalSource::Fundamental));

        assert_abs_diff_eq!(thesis.weighted_score, 47.5, epsilon = 1e-9);
        assert!(thesis.weighted_score < 50.0);
        assert_eq!(thesis.recommendation, Recommendation::Hold);
        assert!(thesis.risk_assessment.score > 25.0);
        // No price source configured.
        assert_eq!(thesis.price_basis, PriceBasis::Normalized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades_one_source() {
        let full = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Bullish, 0.9),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Bullish, 0.9),
            FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Bullish, 0.9),
        )
        .generate_thesis("ETH", 30)
        .await
        .unwrap();

        let partial = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Bullish, 0.9),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Bullish, 0.9),
            FixedAnalyzer::hanging(SignalSource::Sentiment),
        )
        .generate_thesis("ETH", 30)
        .await
        .unwrap();

        assert_eq!(partial.degraded_sources.len(), 1);
        assert_eq!(partial.degraded_sources[0].source, SignalSource::Sentiment);
        assert_eq!(partial.degraded_sources[0].reason, DegradationReason::TimedOut);

        let substitute = partial
            .signals
            .iter()
            .find(|s| s.source == SignalSource::Sentiment)
            .unwrap();
        assert_eq!(substitute.directional_call, DirectionalCall::Neutral);
        assert_eq!(substitute.score, 50.0);
        assert_eq!(substitute.confidence, 0.5);

        assert!(partial.confidence < full.confidence);
        assert!(partial.entry_range.width_pct > full.entry_range.width_pct);
        assert!(partial.risk_assessment.score > full.risk_assessment.score);
    }

    #[tokio::test]
    async fn test_empty_subject_rejected_before_any_analyzer() {
        let m = FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Bullish, 0.9);
        let f = FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Bullish, 0.9);
        let s = FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Bullish, 0.9);
        let engine = orchestrator(m.clone(), f.clone(), s.clone());

        for bad in ["", "   ", "BTC USD"] {
            let result = engine.generate_thesis(bad, 30).await;
            assert!(matches!(result, Err(ThesisError::InvalidSubject(_))));
        }
        assert_eq!(m.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
        assert_eq!(s.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_neutral_baseline() {
        let engine = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Neutral, 0.7),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Neutral, 0.7),
            FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Neutral, 0.7),
        );
        let thesis = engine.generate_thesis_at_price("AAPL", 90, 180.0).await.unwrap();

        assert_eq!(thesis.weighted_score, 50.0);
        assert_eq!(thesis.thesis_type, ThesisType::Neutral);
        assert_eq!(thesis.recommendation, Recommendation::Hold);
        assert_eq!(thesis.position.fraction, 0.0);
        assert!(thesis.stop_loss.price < thesis.entry_range.low);
        assert!(!thesis.stop_loss.reason.is_empty());
    }

    #[tokio::test]
    async fn test_failed_price_lookup_falls_back_to_normalized() {
        let engine = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Bearish, 0.6),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Bearish, 0.7),
            FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Neutral, 0.6),
        )
        .with_price_source(Arc::new(FixedPrice(Err(AnalysisError::DataSource(
            "quote feed down".to_string(),
        )))));

        let thesis = engine.generate_thesis("SOL", 14).await.unwrap();
        assert_eq!(thesis.price_basis, PriceBasis::Normalized);
        assert_eq!(thesis.reference_price, 1.0);
        assert_eq!(thesis.thesis_type, ThesisType::Bearish);
        assert_eq!(thesis.recommendation, Recommendation::Sell);
        assert!(thesis.stop_loss.price > thesis.entry_range.high);
        assert!(thesis.exit_targets.iter().all(|t| t.price < 1.0));
        assert!(thesis.executive_summary.contains("relative to current price"));
    }

    #[tokio::test]
    async fn test_thesis_serializes_with_action_tokens() {
        let engine = orchestrator(
            FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Bullish, 0.8),
            FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Bullish, 0.8),
            FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Neutral, 0.8),
        );
        let thesis = engine.generate_thesis("BTC", 30).await.unwrap();
        let json = serde_json::to_value(&thesis).unwrap();

        assert_eq!(json["recommendation"], "BUY");
        assert_eq!(json["thesis_type"], "bullish");
        assert!(json["stop_loss"]["price"].is_number());
        assert!(json["stop_loss"]["reason"].is_string());
    }

    #[test]
    fn test_rejects_inconsistent_config() {
        let mut bad = EngineConfig::default();
        bad.weights.sentiment_weight = 0.5;
        let result = ThesisOrchestrator::new(
            bad,
            AnalyzerSet {
                macro_analyzer: FixedAnalyzer::new(SignalSource::Macro, DirectionalCall::Neutral, 0.5),
                fundamental: FixedAnalyzer::new(SignalSource::Fundamental, DirectionalCall::Neutral, 0.5),
                sentiment: FixedAnalyzer::new(SignalSource::Sentiment, DirectionalCall::Neutral, 0.5),
            },
        );
        assert!(matches!(result, Err(ThesisError::SynthesisInconsistency(_))));
    }
}
