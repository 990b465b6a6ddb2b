use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Neutral midpoint used whenever an analyzer cannot produce a real opinion.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Which analyzer produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Macro,
    Fundamental,
    Sentiment,
}

impl SignalSource {
    /// Fixed processing order for every stage of the pipeline.
    pub const ALL: [SignalSource; 3] = [
        SignalSource::Macro,
        SignalSource::Fundamental,
        SignalSource::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Macro => "macro",
            SignalSource::Fundamental => "fundamental",
            SignalSource::Sentiment => "sentiment",
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five-point directional polarity scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionalCall {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl DirectionalCall {
    /// Signed polarity: strong_bearish = -2 ... strong_bullish = +2
    pub fn polarity(&self) -> i32 {
        match self {
            DirectionalCall::StrongBullish => 2,
            DirectionalCall::Bullish => 1,
            DirectionalCall::Neutral => 0,
            DirectionalCall::Bearish => -1,
            DirectionalCall::StrongBearish => -2,
        }
    }

    /// Polarity mapped onto [0, 100] (polarity * 25 + 50).
    pub fn normalized_score(&self) -> f64 {
        self.polarity() as f64 * 25.0 + 50.0
    }

    /// Absolute polarity distance between two calls (0..=4).
    pub fn distance(&self, other: &DirectionalCall) -> i32 {
        (self.polarity() - other.polarity()).abs()
    }

    /// Map a raw analyzer score (0-100) onto a call using 20-point bands.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => DirectionalCall::StrongBullish,
            s if s >= 60.0 => DirectionalCall::Bullish,
            s if s >= 40.0 => DirectionalCall::Neutral,
            s if s >= 20.0 => DirectionalCall::Bearish,
            s if s >= 0.0 => DirectionalCall::StrongBearish,
            // NaN or negative never reaches here after clamping; stay neutral.
            _ => DirectionalCall::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionalCall::StrongBullish => "strong_bullish",
            DirectionalCall::Bullish => "bullish",
            DirectionalCall::Neutral => "neutral",
            DirectionalCall::Bearish => "bearish",
            DirectionalCall::StrongBearish => "strong_bearish",
        }
    }
}

impl std::fmt::Display for DirectionalCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analyzer's opinion about one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source: SignalSource,
    pub directional_call: DirectionalCall,
    pub confidence: f64, // 0.0 to 1.0
    pub score: f64,      // 0.0 to 100.0
    /// Domain-specific fields. Passed through untouched.
    pub supporting_detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(source: SignalSource, directional_call: DirectionalCall, confidence: f64, score: f64) -> Self {
        Self {
            source,
            directional_call,
            confidence: sanitize(confidence, NEUTRAL_CONFIDENCE, 0.0, 1.0),
            score: sanitize(score, NEUTRAL_SCORE, 0.0, 100.0),
            supporting_detail: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.supporting_detail = detail;
        self
    }

    /// Stand-in for an analyzer that failed or timed out.
    pub fn neutral_default(source: SignalSource) -> Self {
        Self::new(source, DirectionalCall::Neutral, NEUTRAL_CONFIDENCE, NEUTRAL_SCORE)
            .with_detail(serde_json::json!({ "substituted": true }))
    }

    /// Re-apply the range invariants (fields are public, so callers may have
    /// built a signal by hand).
    pub fn sanitized(mut self) -> Self {
        self.confidence = sanitize(self.confidence, NEUTRAL_CONFIDENCE, 0.0, 1.0);
        self.score = sanitize(self.score, NEUTRAL_SCORE, 0.0, 100.0);
        self
    }
}

fn sanitize(value: f64, fallback: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Why a source was replaced with the neutral default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum DegradationReason {
    Failed(String),
    TimedOut,
    Panicked,
    SourceMismatch(SignalSource),
}

impl std::fmt::Display for DegradationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradationReason::Failed(msg) => write!(f, "failed: {}", msg),
            DegradationReason::TimedOut => f.write_str("timed out"),
            DegradationReason::Panicked => f.write_str("panicked"),
            DegradationReason::SourceMismatch(got) => {
                write!(f, "returned a signal tagged '{}'", got)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedSource {
    pub source: SignalSource,
    pub reason: DegradationReason,
}

/// The three signals for one subject, one fixed slot per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub subject: String,
    #[serde(rename = "macro")]
    pub macro_signal: Signal,
    pub fundamental: Signal,
    pub sentiment: Signal,
    #[serde(default)]
    pub degraded_sources: Vec<DegradedSource>,
}

impl SignalSet {
    pub fn new(subject: impl Into<String>, macro_signal: Signal, fundamental: Signal, sentiment: Signal) -> Self {
        Self {
            subject: subject.into(),
            macro_signal,
            fundamental,
            sentiment,
            degraded_sources: Vec::new(),
        }
    }

    pub fn get(&self, source: SignalSource) -> &Signal {
        match source {
            SignalSource::Macro => &self.macro_signal,
            SignalSource::Fundamental => &self.fundamental,
            SignalSource::Sentiment => &self.sentiment,
        }
    }

    /// Signals in fixed source order (macro, fundamental, sentiment).
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        SignalSource::ALL.into_iter().map(move |s| self.get(s))
    }

    pub fn is_degraded(&self, source: SignalSource) -> bool {
        self.degraded_sources.iter().any(|d| d.source == source)
    }

    pub fn degraded_count(&self) -> usize {
        self.degraded_sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_polarity_scale() {
        assert_eq!(DirectionalCall::StrongBearish.polarity(), -2);
        assert_eq!(DirectionalCall::StrongBullish.polarity(), 2);
        assert_eq!(DirectionalCall::Neutral.normalized_score(), 50.0);
        assert_eq!(DirectionalCall::StrongBullish.normalized_score(), 100.0);
        assert_eq!(DirectionalCall::StrongBearish.normalized_score(), 0.0);
        assert_eq!(DirectionalCall::StrongBullish.distance(&DirectionalCall::StrongBearish), 4);
    }

    #[test]
    fn test_from_score_bands() {
        assert_eq!(DirectionalCall::from_score(0.0), DirectionalCall::StrongBearish);
        assert_eq!(DirectionalCall::from_score(19.99), DirectionalCall::StrongBearish);
        assert_eq!(DirectionalCall::from_score(20.0), DirectionalCall::Bearish);
        assert_eq!(DirectionalCall::from_score(50.0), DirectionalCall::Neutral);
        assert_eq!(DirectionalCall::from_score(60.0), DirectionalCall::Bullish);
        assert_eq!(DirectionalCall::from_score(100.0), DirectionalCall::StrongBullish);
        assert_eq!(DirectionalCall::from_score(f64::NAN), DirectionalCall::Neutral);
    }

    #[test]
    fn test_signal_values_always_populated() {
        let s = Signal::new(SignalSource::Macro, DirectionalCall::Bullish, f64::NAN, 250.0);
        assert_eq!(s.confidence, NEUTRAL_CONFIDENCE);
        assert_eq!(s.score, 100.0);

        let mut raw = Signal::new(SignalSource::Macro, DirectionalCall::Bullish, 0.7, 70.0);
        raw.confidence = -3.0;
        raw.score = f64::INFINITY;
        let fixed = raw.sanitized();
        assert_eq!(fixed.confidence, 0.0);
        assert_eq!(fixed.score, NEUTRAL_SCORE);
    }

    #[test]
    fn test_in_range_values_pass_through() {
        let s = Signal::new(SignalSource::Fundamental, DirectionalCall::Bullish, 0.73, 61.25);
        assert_abs_diff_eq!(s.confidence, 0.73, epsilon = 1e-12);
        assert_abs_diff_eq!(s.score, 61.25, epsilon = 1e-12);
        assert_abs_diff_eq!(DirectionalCall::Bullish.normalized_score(), 75.0, epsilon = 1e-12);
        assert_abs_diff_eq!(DirectionalCall::Bearish.normalized_score(), 25.0, epsilon = 1e-12);

        let resanitized = s.clone().sanitized();
        assert_abs_diff_eq!(resanitized.confidence, s.confidence, epsilon = 1e-12);
        assert_abs_diff_eq!(resanitized.score, s.score, epsilon = 1e-12);
    }

    #[test]
    fn test_neutral_default() {
        let s = Signal::neutral_default(SignalSource::Sentiment);
        assert_eq!(s.directional_call, DirectionalCall::Neutral);
        assert_eq!(s.confidence, 0.5);
        assert_eq!(s.score, 50.0);
    }

    #[test]
    fn test_signal_set_lookup_is_by_source() {
        let set = SignalSet::new(
            "BTC",
            Signal::new(SignalSource::Macro, DirectionalCall::Bullish, 0.8, 70.0),
            Signal::new(SignalSource::Fundamental, DirectionalCall::Bearish, 0.6, 30.0),
            Signal::new(SignalSource::Sentiment, DirectionalCall::Neutral, 0.5, 50.0),
        );
        assert_eq!(set.get(SignalSource::Fundamental).directional_call, DirectionalCall::Bearish);
        let order: Vec<SignalSource> = set.iter().map(|s| s.source).collect();
        assert_eq!(order, SignalSource::ALL.to_vec());
        assert!(!set.is_degraded(SignalSource::Macro));
    }

    #[test]
    fn test_serde_tokens() {
        let json = serde_json::to_string(&DirectionalCall::StrongBearish).unwrap();
        assert_eq!(json, "\"strong_bearish\"");
        let json = serde_json::to_string(&SignalSource::Fundamental).unwrap();
        assert_eq!(json, "\"fundamental\"");
    }
}
