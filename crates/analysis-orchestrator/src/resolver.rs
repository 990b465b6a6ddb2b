use analysis_core::{Conflict, ConflictType, Resolution, ResolutionStrategy, SignalSet, SignalSource};

use crate::config::SourceWeights;

/// Turns detected conflicts into advisory resolutions for the synthesizer.
/// The signal set itself is never modified.
pub struct ConflictResolver {
    weights: SourceWeights,
}

impl ConflictResolver {
    pub fn new(weights: SourceWeights) -> Self {
        Self { weights }
    }

    pub fn resolve(&self, conflicts: &[Conflict], signals: &SignalSet) -> Vec<Resolution> {
        conflicts
            .iter()
            .filter_map(|conflict| {
                let resolution = match conflict.conflict_type {
                    ConflictType::ConfidenceMismatch => self.dampen_confidence(conflict, signals),
                    ConflictType::NoConflict => return None,
                    _ => self.defer_to_weight(conflict, signals)?,
                };
                tracing::debug!(
                    "resolved {} for {} via {}: {}",
                    conflict.conflict_type,
                    signals.subject,
                    resolution.resolution_strategy.as_str(),
                    resolution.final_decision
                );
                Some(resolution)
            })
            .collect()
    }

    fn defer_to_weight(&self, conflict: &Conflict, signals: &SignalSet) -> Option<Resolution> {
        let (a, b) = match conflict.sources.as_slice() {
            [a, b, ..] => (*a, *b),
            _ => pair_for(conflict.conflict_type)?,
        };
        let dominant = self.dominant(a, b, signals);
        let other = if dominant == a { b } else { a };

        let dom_signal = signals.get(dominant);
        let other_signal = signals.get(other);
        let dom_weight = self.weights.weight(dominant);
        let other_weight = self.weights.weight(other);

        let rationale = if (dom_weight - other_weight).abs() > f64::EPSILON {
            format!(
                "{} carries weight {:.2} vs {} at {:.2}; the {:.2} weight advantage makes it the tie-breaker",
                dominant,
                dom_weight,
                other,
                other_weight,
                dom_weight - other_weight
            )
        } else {
            format!(
                "{} and {} share weight {:.2}; {} wins on confidence ({:.2} vs {:.2})",
                dominant, other, dom_weight, dominant, dom_signal.confidence, other_signal.confidence
            )
        };

        Some(Resolution {
            conflict_type: conflict.conflict_type,
            description: conflict.description.clone(),
            severity: conflict.severity,
            resolution_strategy: ResolutionStrategy::WeightedDeference,
            final_decision: format!(
                "{} call ({}) dominates {} call ({})",
                dominant, dom_signal.directional_call, other, other_signal.directional_call
            ),
            rationale,
            dominant_source: Some(dominant),
        })
    }

    fn dampen_confidence(&self, conflict: &Conflict, signals: &SignalSet) -> Resolution {
        let least = signals
            .iter()
            .min_by(|x, y| x.confidence.total_cmp(&y.confidence))
            .unwrap_or(&signals.sentiment);

        Resolution {
            conflict_type: conflict.conflict_type,
            description: conflict.description.clone(),
            severity: conflict.severity,
            resolution_strategy: ResolutionStrategy::ConfidenceDampening,
            final_decision: format!(
                "use minimum confidence {:.2} ({}) instead of the average",
                least.confidence, least.source
            ),
            rationale: "sources disagree on certainty; the disagreement is not averaged away, so the \
                        least certain source bounds overall confidence"
                .to_string(),
            dominant_source: None,
        }
    }

    /// Higher weight wins; equal weights fall back to confidence, then fixed
    /// precedence fundamental > macro > sentiment.
    fn dominant(&self, a: SignalSource, b: SignalSource, signals: &SignalSet) -> SignalSource {
        let key = |s: SignalSource| {
            let precedence = match s {
                SignalSource::Fundamental => 2,
                SignalSource::Macro => 1,
                SignalSource::Sentiment => 0,
            };
            (self.weights.weight(s), signals.get(s).confidence, precedence)
        };
        let (wa, ca, pa) = key(a);
        let (wb, cb, pb) = key(b);
        let a_wins = wa
            .total_cmp(&wb)
            .then(ca.total_cmp(&cb))
            .then(pa.cmp(&pb))
            .is_gt();
        if a_wins {
            a
        } else {
            b
        }
    }
}

fn pair_for(conflict_type: ConflictType) -> Option<(SignalSource, SignalSource)> {
    match conflict_type {
        ConflictType::MacroVsFundamental => Some((SignalSource::Macro, SignalSource::Fundamental)),
        ConflictType::FundamentalVsSentiment => Some((SignalSource::Fundamental, SignalSource::Sentiment)),
        ConflictType::SentimentVsMacro => Some((SignalSource::Sentiment, SignalSource::Macro)),
        _ => None,
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(SourceWeights::default())
    }
}
