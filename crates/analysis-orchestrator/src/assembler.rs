use analysis_core::{
    Conflict, EntryRange, ExitTarget, InvestmentThesis, MonitoringTriggers, PositionSide, PositionSizing,
    PriceBasis, Resolution, RiskAssessment, RiskLevel, Severity, SignalSet, SignalSource, StopLoss,
    SynthesisResult, ThesisType, TimeHorizon,
};
use chrono::Utc;

use crate::config::AssemblyPolicy;

/// Horizon the stop/target percentages are calibrated for
const BASE_HORIZON_DAYS: f64 = 30.0;
const MAX_STOP_DISTANCE: f64 = 0.5;
const MAX_KEY_RISKS: usize = 5;

/// Caller-supplied framing for one thesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThesisContext {
    pub horizon_days: u32,
    pub reference_price: f64,
    pub price_basis: PriceBasis,
}

impl ThesisContext {
    pub fn new(horizon_days: u32, reference_price: Option<f64>) -> Self {
        match reference_price.filter(|p| p.is_finite() && *p > 0.0) {
            Some(price) => Self {
                horizon_days: horizon_days.max(1),
                reference_price: price,
                price_basis: PriceBasis::Market,
            },
            None => Self {
                horizon_days: horizon_days.max(1),
                reference_price: 1.0,
                price_basis: PriceBasis::Normalized,
            },
        }
    }

    /// sqrt(horizon / 30), clamped to [0.5, 3.0]
    fn horizon_factor(&self) -> f64 {
        (self.horizon_days as f64 / BASE_HORIZON_DAYS).sqrt().clamp(0.5, 3.0)
    }
}

pub struct ThesisAssembler {
    policy: AssemblyPolicy,
}

impl ThesisAssembler {
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self { policy }
    }

    pub fn assemble(
        &self,
        synthesis: &SynthesisResult,
        signals: &SignalSet,
        conflicts: &[Conflict],
        resolutions: &[Resolution],
        ctx: &ThesisContext,
    ) -> InvestmentThesis {
        let side = position_side(synthesis.weighted_score);
        let entry_range = self.entry_range(synthesis.confidence, ctx);
        let stop_loss = self.stop_loss(&entry_range, side, synthesis.thesis_type, ctx);
        let exit_targets = self.exit_targets(side, ctx);
        let position = self.position_size(synthesis.confidence, synthesis.weighted_score);
        let risk_assessment = risk_assessment(synthesis.confidence, conflicts, signals);
        let time_horizon = TimeHorizon::from_days(ctx.horizon_days);

        let entry_strategy = entry_strategy(synthesis.thesis_type, risk_assessment.level);
        let exit_strategy = exit_strategy(synthesis.thesis_type, risk_assessment.level, time_horizon);
        let key_drivers = key_drivers(signals, synthesis.dominant_source);
        let key_risks = key_risks(conflicts, signals, synthesis.confidence);
        let monitoring_triggers = monitoring_triggers(&entry_range, &stop_loss, signals, synthesis.dominant_source, ctx);

        let conflicts_resolved = conflicts.len() == resolutions.len()
            && conflicts
                .iter()
                .all(|c| resolutions.iter().any(|r| r.conflict_type == c.conflict_type));

        let executive_summary = executive_summary(
            signals,
            synthesis,
            &entry_range,
            &stop_loss,
            &position,
            &risk_assessment,
            conflicts.len(),
            ctx,
        );

        tracing::info!(
            "Assembled thesis for {}: {} {} ({} risk, position {:.1}%)",
            signals.subject,
            synthesis.thesis_type,
            synthesis.recommendation,
            risk_assessment.level.as_str(),
            position.fraction * 100.0
        );

        InvestmentThesis {
            subject: signals.subject.clone(),
            horizon_days: ctx.horizon_days,
            time_horizon,
            thesis_type: synthesis.thesis_type,
            recommendation: synthesis.recommendation,
            confidence: synthesis.confidence,
            confidence_method: synthesis.confidence_method,
            weighted_score: synthesis.weighted_score,
            reasoning: synthesis.reasoning.clone(),
            reference_price: ctx.reference_price,
            price_basis: ctx.price_basis,
            entry_range,
            exit_targets,
            stop_loss,
            position,
            risk_assessment,
            entry_strategy,
            exit_strategy,
            key_drivers,
            key_risks,
            monitoring_triggers,
            executive_summary,
            signals: signals.iter().cloned().collect(),
            conflicts: conflicts.to_vec(),
            resolutions: resolutions.to_vec(),
            conflicts_resolved,
            degraded_sources: signals.degraded_sources.clone(),
            generated_at: Utc::now(),
        }
    }

    /// Band width proportional to (1 - confidence), floored at `min_entry_band`
    pub fn entry_range(&self, confidence: f64, ctx: &ThesisContext) -> EntryRange {
        let width_pct = (self.policy.entry_band_scale * (1.0 - confidence.clamp(0.0, 1.0)))
            .max(self.policy.min_entry_band);
        let price = ctx.reference_price;
        EntryRange {
            low: price * (1.0 - width_pct / 2.0),
            high: price * (1.0 + width_pct / 2.0),
            width_pct,
        }
    }

    /// Monotone in confidence and in distance from neutral; never above the cap.
    pub fn position_size(&self, confidence: f64, weighted_score: f64) -> PositionSizing {
        let cap = self.policy.max_position_fraction;
        let conviction = ((weighted_score - 50.0).abs() / 50.0).clamp(0.0, 1.0);
        let confidence = confidence.clamp(0.0, 1.0);
        let raw = cap * confidence * conviction;
        let fraction = if raw.is_finite() { raw.clamp(0.0, cap) } else { 0.0 };
        let side = position_side(weighted_score);

        let rationale = match side {
            PositionSide::Flat => "weighted score at neutral; no directional exposure".to_string(),
            _ => format!(
                "{:.1}% = cap {:.0}% x confidence {:.2} x conviction {:.2} (|score - 50| / 50)",
                fraction * 100.0,
                cap * 100.0,
                confidence,
                conviction
            ),
        };

        PositionSizing {
            fraction,
            side,
            rationale,
        }
    }

    pub fn stop_loss(&self, entry: &EntryRange, side: PositionSide, thesis: ThesisType, ctx: &ThesisContext) -> StopLoss {
        let distance = (self.policy.stop_loss_pct * ctx.horizon_factor()).min(MAX_STOP_DISTANCE);
        match side {
            PositionSide::Short => StopLoss {
                price: entry.high * (1.0 + distance),
                reason: format!(
                    "{:.1}% above entry range high {:.2}: a rally through this level invalidates the {} thesis over {} days",
                    distance * 100.0,
                    entry.high,
                    thesis,
                    ctx.horizon_days
                ),
            },
            PositionSide::Long | PositionSide::Flat => StopLoss {
                price: entry.low * (1.0 - distance),
                reason: format!(
                    "{:.1}% below entry range low {:.2}: a decline through this level invalidates the {} thesis over {} days",
                    distance * 100.0,
                    entry.low,
                    thesis,
                    ctx.horizon_days
                ),
            },
        }
    }

    pub fn exit_targets(&self, side: PositionSide, ctx: &ThesisContext) -> Vec<ExitTarget> {
        let step = self.policy.target_step_pct * ctx.horizon_factor();
        let direction = if side == PositionSide::Short { -1.0 } else { 1.0 };
        let labels = ["first target", "second target", "final target"];

        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                // Downside targets stay above zero however large the step.
                let move_pct = (direction * step * (i + 1) as f64).max(-0.95);
                ExitTarget {
                    price: ctx.reference_price * (1.0 + move_pct),
                    move_pct,
                    label: label.to_string(),
                }
            })
            .collect()
    }
}

impl Default for ThesisAssembler {
    fn default() -> Self {
        Self::new(AssemblyPolicy::default())
    }
}

fn position_side(weighted_score: f64) -> PositionSide {
    if weighted_score > 50.0 {
        PositionSide::Long
    } else if weighted_score < 50.0 {
        PositionSide::Short
    } else {
        PositionSide::Flat
    }
}

fn severity_points(severity: Severity) -> f64 {
    match severity {
        Severity::Major => 25.0,
        Severity::Moderate => 15.0,
        Severity::Minor => 5.0,
    }
}

/// Risk grows with uncertainty, with every conflict and with every degraded source.
pub fn risk_assessment(confidence: f64, conflicts: &[Conflict], signals: &SignalSet) -> RiskAssessment {
    let mut factors = Vec::new();
    let mut score = (1.0 - confidence.clamp(0.0, 1.0)) * 50.0;

    factors.extend(low_confidence_factor(confidence));

    for conflict in conflicts {
        score += severity_points(conflict.severity);
        factors.push(format!("{} {} conflict", conflict.severity.as_str(), conflict.conflict_type));
    }

    for degraded in &signals.degraded_sources {
        score += 10.0;
        factors.push(format!("{} analyzer {}", degraded.source, degraded.reason));
    }

    let score = score.clamp(0.0, 100.0);
    RiskAssessment {
        level: RiskLevel::from_score(score),
        score,
        factors,
    }
}

fn entry_strategy(thesis: ThesisType, risk: RiskLevel) -> String {
    match thesis {
        ThesisType::StrongBullish | ThesisType::Bullish if risk <= RiskLevel::Medium => {
            "Enter within the entry range; scale in on dips toward the low end".to_string()
        }
        ThesisType::StrongBullish | ThesisType::Bullish => {
            "Dollar-cost average over 2-4 weeks while conflicts persist".to_string()
        }
        ThesisType::Neutral => "Wait for clearer signals or accumulate only at the entry range low".to_string(),
        ThesisType::Bearish | ThesisType::StrongBearish => {
            "Avoid new long entries; wait for a regime change".to_string()
        }
    }
}

fn exit_strategy(thesis: ThesisType, risk: RiskLevel, horizon: TimeHorizon) -> String {
    match thesis {
        ThesisType::StrongBullish | ThesisType::Bullish => format!(
            "Scale out at the exit targets over the {} horizon; honour the stop-loss{}",
            horizon.as_str().replace('_', " "),
            if risk >= RiskLevel::High { " and tighten it on any new conflict" } else { "" }
        ),
        ThesisType::Neutral => "Keep the stop-loss in place and exit if the thesis deteriorates".to_string(),
        ThesisType::Bearish => "Reduce exposure on the next rally toward the entry range high".to_string(),
        ThesisType::StrongBearish => "Exit existing positions promptly".to_string(),
    }
}

fn key_drivers(signals: &SignalSet, dominant: Option<SignalSource>) -> Vec<String> {
    let mut drivers: Vec<String> = signals
        .iter()
        .map(|s| {
            format!(
                "{}: {} (score {:.0}/100, confidence {:.0}%{})",
                s.source,
                s.directional_call,
                s.score,
                s.confidence * 100.0,
                if signals.is_degraded(s.source) { ", neutral substitute" } else { "" }
            )
        })
        .collect();
    if let Some(source) = dominant {
        drivers.push(format!("{} view prevails in directional conflicts", source));
    }
    drivers
}

fn low_confidence_factor(confidence: f64) -> Option<String> {
    (confidence < 0.5).then(|| format!("Low overall confidence ({:.0}%)", confidence * 100.0))
}

/// Conflicts and degraded sources are listed by their own descriptions, so
/// only the confidence factor is taken from the risk assessment.
fn key_risks(conflicts: &[Conflict], signals: &SignalSet, confidence: f64) -> Vec<String> {
    let mut risks: Vec<String> = low_confidence_factor(confidence).into_iter().collect();
    risks.extend(conflicts.iter().map(|c| c.description.clone()));
    risks.extend(
        signals
            .degraded_sources
            .iter()
            .map(|d| format!("{} signal unavailable ({}); neutral default used", d.source, d.reason)),
    );
    risks.truncate(MAX_KEY_RISKS);
    risks
}

fn monitoring_triggers(
    entry: &EntryRange,
    stop: &StopLoss,
    signals: &SignalSet,
    dominant: Option<SignalSource>,
    ctx: &ThesisContext,
) -> MonitoringTriggers {
    let unit = match ctx.price_basis {
        PriceBasis::Market => "",
        PriceBasis::Normalized => "x reference ",
    };
    let watched = dominant.unwrap_or(SignalSource::Fundamental);
    MonitoringTriggers {
        buy_trigger: format!("Price at or below {}{:.2} (entry range low)", unit, entry.low),
        sell_trigger: format!("Price breaches stop-loss at {}{:.2}", unit, stop.price),
        regime_change: format!(
            "{} call moves away from {}",
            watched,
            signals.get(watched).directional_call
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn executive_summary(
    signals: &SignalSet,
    synthesis: &SynthesisResult,
    entry: &EntryRange,
    stop: &StopLoss,
    position: &PositionSizing,
    risk: &RiskAssessment,
    conflict_count: usize,
    ctx: &ThesisContext,
) -> String {
    let basis = match ctx.price_basis {
        PriceBasis::Market => String::new(),
        PriceBasis::Normalized => " (levels relative to current price = 1.00)".to_string(),
    };
    format!(
        "{} Investment Thesis: {} ({:.0}% confidence)\n\
         Recommendation: {} with {:.1}% position ({:?})\n\
         Weighted score: {:.1}/100 | Macro: {} | Fundamental: {} | Sentiment: {}\n\
         Entry: {:.2} - {:.2}{} | Stop-loss: {:.2}\n\
         Risk: {} ({:.0}/100), {} conflict(s), {} degraded source(s)",
        signals.subject,
        synthesis.thesis_type.as_str().to_uppercase(),
        synthesis.confidence * 100.0,
        synthesis.recommendation,
        position.fraction * 100.0,
        position.side,
        synthesis.weighted_score,
        signals.macro_signal.directional_call,
        signals.fundamental.directional_call,
        signals.sentiment.directional_call,
        entry.low,
        entry.high,
        basis,
        stop.price,
        risk.level.as_str(),
        risk.score,
        conflict_count,
        signals.degraded_count(),
    )
}
