use analysis_core::{Conflict, ConflictType, Severity, SignalSet, SignalSource};

use crate::config::ConflictPolicy;

/// Largest possible distance on the five-point polarity scale
const MAX_POLARITY_DISTANCE: i32 = 4;

/// Float slack so a spread that equals the threshold is not a mismatch
const SPREAD_EPSILON: f64 = 1e-9;

/// Pairs compared for directional divergence, one per conflict type
const SOURCE_PAIRS: [(SignalSource, SignalSource); 3] = [
    (SignalSource::Macro, SignalSource::Fundamental),
    (SignalSource::Fundamental, SignalSource::Sentiment),
    (SignalSource::Sentiment, SignalSource::Macro),
];

pub struct ConflictDetector {
    policy: ConflictPolicy,
}

impl ConflictDetector {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Pairwise directional check plus one set-wide confidence check.
    /// Agreement yields an empty list.
    pub fn detect(&self, signals: &SignalSet) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for (a, b) in SOURCE_PAIRS {
            if let Some(conflict) = self.directional_conflict(signals, a, b) {
                tracing::debug!("{} conflict for {}: {}", conflict.conflict_type, signals.subject, conflict.description);
                conflicts.push(conflict);
            }
        }

        if let Some(conflict) = self.confidence_conflict(signals) {
            tracing::debug!("confidence mismatch for {}: {}", signals.subject, conflict.description);
            conflicts.push(conflict);
        }

        conflicts
    }

    fn directional_conflict(&self, signals: &SignalSet, a: SignalSource, b: SignalSource) -> Option<Conflict> {
        let sig_a = signals.get(a);
        let sig_b = signals.get(b);
        let distance = sig_a.directional_call.distance(&sig_b.directional_call);

        if distance < self.policy.directional_threshold {
            return None;
        }

        let severity = if distance >= MAX_POLARITY_DISTANCE {
            Severity::Major
        } else {
            Severity::Moderate
        };

        Some(Conflict {
            conflict_type: ConflictType::between(a, b)?,
            severity,
            description: format!(
                "{} is {} (confidence {:.2}) while {} is {} (confidence {:.2}); polarity gap {} of {}",
                a,
                sig_a.directional_call,
                sig_a.confidence,
                b,
                sig_b.directional_call,
                sig_b.confidence,
                distance,
                MAX_POLARITY_DISTANCE
            ),
            sources: vec![a, b],
        })
    }

    fn confidence_conflict(&self, signals: &SignalSet) -> Option<Conflict> {
        let most = signals
            .iter()
            .max_by(|x, y| x.confidence.total_cmp(&y.confidence))?;
        let least = signals
            .iter()
            .min_by(|x, y| x.confidence.total_cmp(&y.confidence))?;
        let spread = most.confidence - least.confidence;

        if spread <= self.policy.confidence_spread_threshold + SPREAD_EPSILON {
            return None;
        }

        Some(Conflict {
            conflict_type: ConflictType::ConfidenceMismatch,
            severity: Severity::Minor,
            description: format!(
                "confidence spread {:.2} exceeds {:.2}: {} at {:.2} vs {} at {:.2}",
                spread,
                self.policy.confidence_spread_threshold,
                most.source,
                most.confidence,
                least.source,
                least.confidence
            ),
            sources: vec![most.source, least.source],
        })
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(ConflictPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{DirectionalCall, Signal};
    use DirectionalCall::*;

    fn set(calls: [(DirectionalCall, f64); 3]) -> SignalSet {
        let [m, f, s] = calls;
        SignalSet::new(
            "BTC",
            Signal::new(SignalSource::Macro, m.0, m.1, m.0.normalized_score()),
            Signal::new(SignalSource::Fundamental, f.0, f.1, f.0.normalized_score()),
            Signal::new(SignalSource::Sentiment, s.0, s.1, s.0.normalized_score()),
        )
    }

    #[test]
    fn test_agreement_is_empty() {
        let detector = ConflictDetector::default();
        let calls = [StrongBullish, Bullish, Neutral, Bearish, StrongBearish];
        for call in calls {
            for conf in [0.0, 0.3, 0.5, 0.9, 1.0] {
                assert!(detector.detect(&set([(call, conf); 3])).is_empty());
            }
        }
    }

    #[test]
    fn test_max_distance_is_major() {
        let detector = ConflictDetector::default();
        let conflicts = detector.detect(&set([
            (StrongBullish, 0.9),
            (StrongBearish, 0.9),
            (Neutral, 0.5),
        ]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::MacroVsFundamental);
        assert_eq!(conflicts[0].severity, Severity::Major);
        assert!(conflicts[0].description.contains("strong_bullish"));
        assert!(conflicts[0].description.contains("strong_bearish"));
    }

    #[test]
    fn test_three_point_gap_is_moderate() {
        let detector = ConflictDetector::default();
        let conflicts = detector.detect(&set([(Bullish, 0.7), (Bullish, 0.7), (StrongBearish, 0.7)]));
        let types: Vec<ConflictType> = conflicts.iter().map(|c| c.conflict_type).collect();
        assert_eq!(types, vec![ConflictType::FundamentalVsSentiment, ConflictType::SentimentVsMacro]);
        assert!(conflicts.iter().all(|c| c.severity == Severity::Moderate));
    }

    #[test]
    fn test_two_point_gap_is_tolerated() {
        let detector = ConflictDetector::default();
        assert!(detector.detect(&set([(Bullish, 0.6), (Bearish, 0.6), (Neutral, 0.6)])).is_empty());
    }

    #[test]
    fn test_confidence_spread() {
        let detector = ConflictDetector::default();
        let conflicts = detector.detect(&set([(Bullish, 0.95), (Bullish, 0.5), (Bullish, 0.3)]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ConfidenceMismatch);
        assert_eq!(conflicts[0].severity, Severity::Minor);
        assert_eq!(conflicts[0].sources, vec![SignalSource::Macro, SignalSource::Sentiment]);

        // Exactly at the threshold is not a mismatch.
        assert!(detector.detect(&set([(Bullish, 0.9), (Bullish, 0.5), (Bullish, 0.7)])).is_empty());
    }

    #[test]
    fn test_axes_coexist() {
        let detector = ConflictDetector::default();
        let conflicts = detector.detect(&set([
            (StrongBullish, 0.95),
            (StrongBearish, 0.9),
            (Bearish, 0.2),
        ]));
        let types: Vec<ConflictType> = conflicts.iter().map(|c| c.conflict_type).collect();
        assert_eq!(
            types,
            vec![
                ConflictType::MacroVsFundamental,
                ConflictType::SentimentVsMacro,
                ConflictType::ConfidenceMismatch
            ]
        );
    }

    #[test]
    fn test_custom_threshold() {
        let detector = ConflictDetector::new(ConflictPolicy {
            directional_threshold: 2,
            confidence_spread_threshold: 0.4,
        });
        let conflicts = detector.detect(&set([(Bullish, 0.6), (Bearish, 0.6), (Bullish, 0.6)]));
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts.iter().all(|c| c.severity == Severity::Moderate));
    }
}
