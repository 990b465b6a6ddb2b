use analysis_core::{
    ConfidenceMethod, Recommendation, Resolution, ResolutionStrategy, SignalSet, SignalSource,
    SynthesisResult, ThesisError, ThesisType,
};

use crate::config::{SourceWeights, ThesisBands};

/// Combines the three signals into one weighted decision.
pub struct SignalSynthesizer {
    weights: SourceWeights,
    bands: ThesisBands,
    degraded_penalty: f64,
}

impl SignalSynthesizer {
    /// Fails with `SynthesisInconsistency` when the weights or bands are unusable.
    pub fn new(weights: SourceWeights, bands: ThesisBands, degraded_penalty: f64) -> Result<Self, ThesisError> {
        weights.validate()?;
        bands.validate()?;
        if !degraded_penalty.is_finite() || !(0.0..1.0 / 3.0).contains(&degraded_penalty) {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "degraded confidence penalty out of range: {}",
                degraded_penalty
            )));
        }
        Ok(Self {
            weights,
            bands,
            degraded_penalty,
        })
    }

    pub fn synthesize(&self, signals: &SignalSet, resolutions: &[Resolution]) -> Result<SynthesisResult, ThesisError> {
        let weighted_score = self.weighted_score(signals)?;
        let (confidence, confidence_method) = self.confidence(signals, resolutions)?;
        let thesis_type = self.thesis_type(weighted_score)?;
        let recommendation = Recommendation::from_thesis(thesis_type);
        let dominant_source = dominant_source(resolutions);

        let reasoning = self.reasoning(
            signals,
            thesis_type,
            weighted_score,
            confidence,
            confidence_method,
            dominant_source,
        );

        tracing::info!(
            "Synthesized {} for {}: score {:.1}, confidence {:.2}, {}",
            thesis_type,
            signals.subject,
            weighted_score,
            confidence,
            recommendation
        );

        Ok(SynthesisResult {
            thesis_type,
            recommendation,
            weighted_score,
            confidence,
            confidence_method,
            reasoning,
            dominant_source,
        })
    }

    /// Σ (polarity × 25 + 50) × weight over all sources
    fn weighted_score(&self, signals: &SignalSet) -> Result<f64, ThesisError> {
        let score: f64 = SignalSource::ALL
            .iter()
            .map(|s| signals.get(*s).directional_call.normalized_score() * self.weights.weight(*s))
            .sum();

        if !score.is_finite() {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "weighted score is not finite for {}",
                signals.subject
            )));
        }
        Ok(score.clamp(0.0, 100.0))
    }

    fn confidence(&self, signals: &SignalSet, resolutions: &[Resolution]) -> Result<(f64, ConfidenceMethod), ThesisError> {
        let dampened = resolutions
            .iter()
            .any(|r| r.resolution_strategy == ResolutionStrategy::ConfidenceDampening);

        let (raw, method) = if dampened {
            let min = signals
                .iter()
                .map(|s| s.confidence)
                .fold(f64::INFINITY, f64::min);
            (min, ConfidenceMethod::DampenedMinimum)
        } else {
            let mean = signals.iter().map(|s| s.confidence).sum::<f64>() / SignalSource::ALL.len() as f64;
            (mean, ConfidenceMethod::Average)
        };

        let discount = 1.0 - self.degraded_penalty * signals.degraded_count() as f64;
        let confidence = raw * discount;

        if !confidence.is_finite() {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "confidence is not finite for {}",
                signals.subject
            )));
        }
        Ok((confidence.clamp(0.0, 1.0), method))
    }

    /// Band lookup over [0, 100]. Every in-range score maps to exactly one type.
    pub fn thesis_type(&self, score: f64) -> Result<ThesisType, ThesisError> {
        let b = &self.bands;
        match score {
            s if !(0.0..=100.0).contains(&s) => Err(ThesisError::SynthesisInconsistency(format!(
                "weighted score {} is outside [0, 100]",
                s
            ))),
            s if s >= b.strong_bullish_from => Ok(ThesisType::StrongBullish),
            s if s >= b.bullish_from => Ok(ThesisType::Bullish),
            s if s >= b.neutral_from => Ok(ThesisType::Neutral),
            s if s >= b.bearish_from => Ok(ThesisType::Bearish),
            _ => Ok(ThesisType::StrongBearish),
        }
    }

    fn reasoning(
        &self,
        signals: &SignalSet,
        thesis_type: ThesisType,
        weighted_score: f64,
        confidence: f64,
        method: ConfidenceMethod,
        dominant: Option<SignalSource>,
    ) -> String {
        let calls = SignalSource::ALL
            .iter()
            .map(|s| {
                let sig = signals.get(*s);
                let marker = if signals.is_degraded(*s) { ", substituted" } else { "" };
                format!(
                    "{} {} (weight {:.2}, confidence {:.2}{})",
                    s,
                    sig.directional_call,
                    self.weights.weight(*s),
                    sig.confidence,
                    marker
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        let method_note = match method {
            ConfidenceMethod::Average => "average",
            ConfidenceMethod::DampenedMinimum => "minimum after confidence mismatch",
        };

        let mut reasoning = format!(
            "{} thesis: weighted score {:.1}/100 from {}. Confidence {:.2} ({}).",
            thesis_type, weighted_score, calls, confidence, method_note
        );
        if let Some(source) = dominant {
            reasoning.push_str(&format!(
                " Directional conflict resolved in favour of {} ({}).",
                source,
                signals.get(source).directional_call
            ));
        }
        if signals.degraded_count() > 0 {
            reasoning.push_str(&format!(
                " {} of 3 sources substituted with neutral defaults.",
                signals.degraded_count()
            ));
        }
        reasoning
    }
}

/// Dominant source of the most severe directional resolution
fn dominant_source(resolutions: &[Resolution]) -> Option<SignalSource> {
    resolutions
        .iter()
        .filter(|r| r.resolution_strategy == ResolutionStrategy::WeightedDeference)
        .max_by_key(|r| r.severity)
        .and_then(|r| r.dominant_source)
}
