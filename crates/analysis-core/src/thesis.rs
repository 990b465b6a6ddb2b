use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DegradedSource, Signal, SignalSource};

/// Disagreement categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    MacroVsFundamental,
    FundamentalVsSentiment,
    SentimentVsMacro,
    ConfidenceMismatch,
    /// Part of the taxonomy only. Agreement is an empty conflict list.
    NoConflict,
}

impl ConflictType {
    /// Directional conflict type for a pair of sources (order-insensitive).
    pub fn between(a: SignalSource, b: SignalSource) -> Option<Self> {
        use SignalSource::*;
        match (a, b) {
            (Macro, Fundamental) | (Fundamental, Macro) => Some(ConflictType::MacroVsFundamental),
            (Fundamental, Sentiment) | (Sentiment, Fundamental) => Some(ConflictType::FundamentalVsSentiment),
            (Sentiment, Macro) | (Macro, Sentiment) => Some(ConflictType::SentimentVsMacro),
            _ => None,
        }
    }

    pub fn is_directional(&self) -> bool {
        matches!(
            self,
            ConflictType::MacroVsFundamental
                | ConflictType::FundamentalVsSentiment
                | ConflictType::SentimentVsMacro
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::MacroVsFundamental => "macro_vs_fundamental",
            ConflictType::FundamentalVsSentiment => "fundamental_vs_sentiment",
            ConflictType::SentimentVsMacro => "sentiment_vs_macro",
            ConflictType::ConfidenceMismatch => "confidence_mismatch",
            ConflictType::NoConflict => "no_conflict",
        }
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: Severity,
    pub description: String,
    /// Signals involved in the disagreement
    pub sources: Vec<SignalSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Higher-weighted source breaks the tie
    WeightedDeference,
    /// Use the minimum confidence instead of the average
    ConfidenceDampening,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::WeightedDeference => "weighted_deference",
            ResolutionStrategy::ConfidenceDampening => "confidence_dampening",
        }
    }
}

/// Advisory interpretation of one conflict. Never alters signal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub conflict_type: ConflictType,
    pub description: String,
    pub severity: Severity,
    pub resolution_strategy: ResolutionStrategy,
    pub final_decision: String,
    pub rationale: String,
    #[serde(default)]
    pub dominant_source: Option<SignalSource>,
}

/// Discrete banding of the weighted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThesisType {
    StrongBearish,
    Bearish,
    Neutral,
    Bullish,
    StrongBullish,
}

impl ThesisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThesisType::StrongBearish => "strong_bearish",
            ThesisType::Bearish => "bearish",
            ThesisType::Neutral => "neutral",
            ThesisType::Bullish => "bullish",
            ThesisType::StrongBullish => "strong_bullish",
        }
    }
}

impl std::fmt::Display for ThesisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actionable recommendation. Always one of five tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub fn from_thesis(thesis: ThesisType) -> Self {
        match thesis {
            ThesisType::StrongBullish => Recommendation::StrongBuy,
            ThesisType::Bullish => Recommendation::Buy,
            ThesisType::Neutral => Recommendation::Hold,
            ThesisType::Bearish => Recommendation::Sell,
            ThesisType::StrongBearish => Recommendation::StrongSell,
        }
    }

    /// Parse an action token. Unknown tokens fall back to HOLD.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "STRONG_BUY" => Recommendation::StrongBuy,
            "BUY" => Recommendation::Buy,
            "SELL" => Recommendation::Sell,
            "STRONG_SELL" => Recommendation::StrongSell,
            _ => Recommendation::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "STRONG_BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
            Recommendation::StrongSell => "STRONG_SELL",
        }
    }
}

// Lenient: stored theses with an unrecognized action read back as HOLD.
impl<'de> Deserialize<'de> for Recommendation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(Recommendation::from_token(&token))
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceMethod {
    Average,
    /// Minimum confidence, applied after a confidence mismatch
    DampenedMinimum,
}

/// Output of the synthesis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub thesis_type: ThesisType,
    pub recommendation: Recommendation,
    pub weighted_score: f64,
    pub confidence: f64,
    pub confidence_method: ConfidenceMethod,
    pub reasoning: String,
    /// Dominant source of the most severe directional resolution, if any
    #[serde(default)]
    pub dominant_source: Option<SignalSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// Levels are real prices from a reference price source
    Market,
    /// No price available; levels are multiples of 1.0
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeHorizon {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeHorizon {
    pub fn from_days(days: u32) -> Self {
        match days {
            0..=14 => TimeHorizon::ShortTerm,
            15..=90 => TimeHorizon::MediumTerm,
            _ => TimeHorizon::LongTerm,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeHorizon::ShortTerm => "short_term",
            TimeHorizon::MediumTerm => "medium_term",
            TimeHorizon::LongTerm => "long_term",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRange {
    pub low: f64,
    pub high: f64,
    /// Total band width as a fraction of the reference price
    pub width_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitTarget {
    pub price: f64,
    /// Signed move from the reference price (0.10 = +10%)
    pub move_pct: f64,
    pub label: String,
}

/// Stop-loss level with its explanation. Never a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLoss {
    pub price: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Flat,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizing {
    /// Fraction of portfolio (0.0 to the configured cap)
    pub fraction: f64,
    pub side: PositionSide,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 25.0 => RiskLevel::Low,
            s if s < 50.0 => RiskLevel::Medium,
            s if s < 75.0 => RiskLevel::High,
            _ => RiskLevel::VeryHigh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very_high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// 0 (lowest) to 100 (highest)
    pub score: f64,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringTriggers {
    pub buy_trigger: String,
    pub sell_trigger: String,
    pub regime_change: String,
}

/// Final artifact of one orchestration call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentThesis {
    pub subject: String,
    pub horizon_days: u32,
    pub time_horizon: TimeHorizon,
    pub thesis_type: ThesisType,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub confidence_method: ConfidenceMethod,
    pub weighted_score: f64,
    pub reasoning: String,
    pub reference_price: f64,
    pub price_basis: PriceBasis,
    pub entry_range: EntryRange,
    pub exit_targets: Vec<ExitTarget>,
    pub stop_loss: StopLoss,
    pub position: PositionSizing,
    pub risk_assessment: RiskAssessment,
    pub entry_strategy: String,
    pub exit_strategy: String,
    pub key_drivers: Vec<String>,
    pub key_risks: Vec<String>,
    pub monitoring_triggers: MonitoringTriggers,
    pub executive_summary: String,
    pub signals: Vec<Signal>,
    pub conflicts: Vec<Conflict>,
    pub resolutions: Vec<Resolution>,
    pub conflicts_resolved: bool,
    pub degraded_sources: Vec<DegradedSource>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_type_pairs() {
        use SignalSource::*;
        assert_eq!(ConflictType::between(Macro, Fundamental), Some(ConflictType::MacroVsFundamental));
        assert_eq!(ConflictType::between(Fundamental, Macro), Some(ConflictType::MacroVsFundamental));
        assert_eq!(ConflictType::between(Sentiment, Fundamental), Some(ConflictType::FundamentalVsSentiment));
        assert_eq!(ConflictType::between(Macro, Sentiment), Some(ConflictType::SentimentVsMacro));
        assert_eq!(ConflictType::between(Macro, Macro), None);
    }

    #[test]
    fn test_recommendation_lookup() {
        assert_eq!(Recommendation::from_thesis(ThesisType::StrongBullish), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_thesis(ThesisType::Neutral), Recommendation::Hold);
        assert_eq!(Recommendation::from_thesis(ThesisType::StrongBearish), Recommendation::StrongSell);
        assert_eq!(Recommendation::from_token("strong buy"), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_token("accumulate"), Recommendation::Hold);
        assert_eq!(Recommendation::from_token("bullish"), Recommendation::Hold);
    }

    #[test]
    fn test_recommendation_serializes_as_action_token() {
        let json = serde_json::to_string(&Recommendation::StrongSell).unwrap();
        assert_eq!(json, "\"STRONG_SELL\"");
        let json = serde_json::to_string(&ThesisType::StrongBearish).unwrap();
        assert_eq!(json, "\"strong_bearish\"");
    }

    #[test]
    fn test_recommendation_deserializes_leniently() {
        let parsed: Recommendation = serde_json::from_str("\"STRONG_BUY\"").unwrap();
        assert_eq!(parsed, Recommendation::StrongBuy);
        let parsed: Recommendation = serde_json::from_str("\"strong-sell\"").unwrap();
        assert_eq!(parsed, Recommendation::StrongSell);
        let parsed: Recommendation = serde_json::from_str("\"ACCUMULATE\"").unwrap();
        assert_eq!(parsed, Recommendation::Hold);
    }

    #[test]
    fn test_ordering() {
        assert!(ThesisType::StrongBearish < ThesisType::Bearish);
        assert!(ThesisType::Bullish < ThesisType::StrongBullish);
        assert!(Severity::Minor < Severity::Major);
        assert!(RiskLevel::Low < RiskLevel::VeryHigh);
    }

    #[test]
    fn test_time_horizon_buckets() {
        assert_eq!(TimeHorizon::from_days(7), TimeHorizon::ShortTerm);
        assert_eq!(TimeHorizon::from_days(30), TimeHorizon::MediumTerm);
        assert_eq!(TimeHorizon::from_days(365), TimeHorizon::LongTerm);
    }
}
