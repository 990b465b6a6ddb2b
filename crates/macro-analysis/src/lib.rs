use analysis_core::{AnalysisError, Analyzer, DirectionalCall, Signal, SignalSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStance {
    Hawkish,
    Neutral,
    Dovish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSentiment {
    RiskOn,
    Neutral,
    RiskOff,
}

/// Macro regime label carried in supporting detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroRegime {
    RiskOn,
    RiskOff,
    Transition,
    Neutral,
}

/// Macro inputs for one subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroSnapshot {
    pub fed_policy: PolicyStance,
    pub risk_sentiment: RiskSentiment,
    /// Net institutional flow over the last week, USD millions
    pub net_institutional_flow_musd: f64,
    /// VIX-style volatility index
    pub volatility_index: Option<f64>,
}

/// External collaborator supplying macro data
#[async_trait]
pub trait MacroDataSource: Send + Sync {
    async fn macro_snapshot(&self, subject: &str) -> Result<MacroSnapshot, AnalysisError>;
}

pub struct MacroAnalysisEngine {
    data: Arc<dyn MacroDataSource>,
}

impl MacroAnalysisEngine {
    pub fn new(data: Arc<dyn MacroDataSource>) -> Self {
        Self { data }
    }

    /// Score a snapshot into a signal. Each factor votes in [-1, 1].
    pub fn analyze_snapshot(&self, snapshot: &MacroSnapshot) -> Result<Signal, AnalysisError> {
        if !snapshot.net_institutional_flow_musd.is_finite() {
            return Err(AnalysisError::InvalidData("institutional flow is not a number".to_string()));
        }

        let fed_vote = match snapshot.fed_policy {
            PolicyStance::Dovish => 1.0,
            PolicyStance::Neutral => 0.0,
            PolicyStance::Hawkish => -1.0,
        };
        let risk_vote = match snapshot.risk_sentiment {
            RiskSentiment::RiskOn => 1.0,
            RiskSentiment::Neutral => 0.0,
            RiskSentiment::RiskOff => -1.0,
        };
        // $500M/week either way saturates the vote.
        let flow_vote = (snapshot.net_institutional_flow_musd / 500.0).clamp(-1.0, 1.0);
        let vol_vote = match snapshot.volatility_index {
            Some(v) if v.is_finite() && v < 15.0 => 0.5,
            Some(v) if v.is_finite() && v > 30.0 => -1.0,
            Some(v) if v.is_finite() && v > 22.0 => -0.5,
            _ => 0.0,
        };

        let mut votes = vec![(fed_vote, 0.30), (risk_vote, 0.30), (flow_vote, 0.25)];
        if snapshot.volatility_index.is_some() {
            votes.push((vol_vote, 0.15));
        }
        let total_weight: f64 = votes.iter().map(|(_, w)| w).sum();
        let composite = votes.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight;

        let score = 50.0 + composite * 50.0;
        let call = DirectionalCall::from_score(score);

        // Agreement: share of non-zero votes pointing the same way as the composite.
        let directional: Vec<f64> = votes.iter().map(|(v, _)| *v).filter(|v| v.abs() > 0.1).collect();
        let agreeing = directional
            .iter()
            .filter(|v| v.signum() == composite.signum())
            .count();
        let agreement = if directional.is_empty() {
            0.0
        } else {
            agreeing as f64 / directional.len() as f64
        };
        let coverage = if snapshot.volatility_index.is_some() { 1.0 } else { 0.85 };
        let confidence = ((0.4 + 0.5 * agreement) * coverage).clamp(0.0, 1.0);

        let regime = classify_regime(snapshot.risk_sentiment, composite, agreement);

        Ok(Signal::new(SignalSource::Macro, call, confidence, score).with_detail(json!({
            "regime": regime,
            "fed_policy": snapshot.fed_policy,
            "risk_sentiment": snapshot.risk_sentiment,
            "net_institutional_flow_musd": snapshot.net_institutional_flow_musd,
            "volatility_index": snapshot.volatility_index,
            "composite": composite,
            "factor_agreement": agreement,
        })))
    }
}

fn classify_regime(risk: RiskSentiment, composite: f64, agreement: f64) -> MacroRegime {
    if agreement < 0.6 && composite.abs() > 0.1 {
        MacroRegime::Transition
    } else if composite > 0.2 && risk != RiskSentiment::RiskOff {
        MacroRegime::RiskOn
    } else if composite < -0.2 && risk != RiskSentiment::RiskOn {
        MacroRegime::RiskOff
    } else {
        MacroRegime::Neutral
    }
}

#[async_trait]
impl Analyzer for MacroAnalysisEngine {
    async fn analyze(&self, subject: &str) -> Result<Signal, AnalysisError> {
        let snapshot = self.data.macro_snapshot(subject).await?;
        let signal = self.analyze_snapshot(&snapshot)?;
        tracing::info!(
            "Macro analysis for {}: {} (score {:.1}, confidence {:.2})",
            subject, signal.directional_call, signal.score, signal.confidence
        );
        Ok(signal)
    }
}
