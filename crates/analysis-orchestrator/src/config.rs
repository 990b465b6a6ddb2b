use analysis_core::{SignalSource, ThesisError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Tolerance for the weights-sum-to-one check
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Fixed domain weights for synthesis (must sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    pub macro_weight: f64,       // 0.35
    pub fundamental_weight: f64, // 0.40
    pub sentiment_weight: f64,   // 0.25
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            macro_weight: 0.35,
            fundamental_weight: 0.40,
            sentiment_weight: 0.25,
        }
    }
}

impl SourceWeights {
    pub fn new(macro_weight: f64, fundamental_weight: f64, sentiment_weight: f64) -> Result<Self, ThesisError> {
        let weights = Self {
            macro_weight,
            fundamental_weight,
            sentiment_weight,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn weight(&self, source: SignalSource) -> f64 {
        match source {
            SignalSource::Macro => self.macro_weight,
            SignalSource::Fundamental => self.fundamental_weight,
            SignalSource::Sentiment => self.sentiment_weight,
        }
    }

    pub fn validate(&self) -> Result<(), ThesisError> {
        for source in SignalSource::ALL {
            let w = self.weight(source);
            if !w.is_finite() || w < 0.0 {
                return Err(ThesisError::SynthesisInconsistency(format!(
                    "{} weight must be a non-negative number, got {}",
                    source, w
                )));
            }
        }
        let sum: f64 = SignalSource::ALL.iter().map(|s| self.weight(*s)).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "source weights must sum to 1.0, got {:.6}",
                sum
            )));
        }
        Ok(())
    }
}

/// Thresholds for the conflict detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConflictPolicy {
    /// Minimum polarity distance (0-4) that counts as a directional conflict
    pub directional_threshold: i32,
    /// Confidence spread above which a confidence mismatch is emitted
    pub confidence_spread_threshold: f64,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            directional_threshold: 3,
            confidence_spread_threshold: 0.4,
        }
    }
}

impl ConflictPolicy {
    pub fn validate(&self) -> Result<(), ThesisError> {
        if !(1..=4).contains(&self.directional_threshold) {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "directional threshold must be within 1..=4, got {}",
                self.directional_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_spread_threshold) {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "confidence spread threshold must be within [0, 1], got {}",
                self.confidence_spread_threshold
            )));
        }
        Ok(())
    }
}

/// Lower edges of the upper four thesis bands on the 0-100 score scale.
/// Scores below `bearish_from` are strong_bearish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThesisBands {
    pub bearish_from: f64,        // 20
    pub neutral_from: f64,        // 40
    pub bullish_from: f64,        // 60
    pub strong_bullish_from: f64, // 80
}

impl Default for ThesisBands {
    fn default() -> Self {
        Self {
            bearish_from: 20.0,
            neutral_from: 40.0,
            bullish_from: 60.0,
            strong_bullish_from: 80.0,
        }
    }
}

impl ThesisBands {
    pub fn validate(&self) -> Result<(), ThesisError> {
        let edges = [
            0.0,
            self.bearish_from,
            self.neutral_from,
            self.bullish_from,
            self.strong_bullish_from,
            100.0,
        ];
        if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "thesis bands must be strictly increasing inside (0, 100): {:?}",
                &edges[1..5]
            )));
        }
        Ok(())
    }
}

/// Entry/exit/position parameters for the assembler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssemblyPolicy {
    /// Hard cap on position size as a fraction of portfolio
    pub max_position_fraction: f64, // 0.20
    /// Entry band width at zero confidence (fraction of price)
    pub entry_band_scale: f64, // 0.20
    /// Entry band never collapses below this width
    pub min_entry_band: f64, // 0.01
    /// Stop distance at a 30-day horizon (fraction of price)
    pub stop_loss_pct: f64, // 0.15
    /// First exit target distance at a 30-day horizon
    pub target_step_pct: f64, // 0.10
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            max_position_fraction: 0.20,
            entry_band_scale: 0.20,
            min_entry_band: 0.01,
            stop_loss_pct: 0.15,
            target_step_pct: 0.10,
        }
    }
}

impl AssemblyPolicy {
    pub fn validate(&self) -> Result<(), ThesisError> {
        let checks = [
            ("max_position_fraction", self.max_position_fraction, 1.0),
            ("entry_band_scale", self.entry_band_scale, 1.0),
            ("min_entry_band", self.min_entry_band, 1.0),
            ("stop_loss_pct", self.stop_loss_pct, 0.5),
            ("target_step_pct", self.target_step_pct, 1.0),
        ];
        for (name, value, max) in checks {
            if !value.is_finite() || value <= 0.0 || value > max {
                return Err(ThesisError::SynthesisInconsistency(format!(
                    "{} must be within (0, {}], got {}",
                    name, max, value
                )));
            }
        }
        Ok(())
    }
}

/// Complete engine configuration. Immutable once the orchestrator is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub weights: SourceWeights,
    pub conflict_policy: ConflictPolicy,
    pub bands: ThesisBands,
    pub assembly: AssemblyPolicy,
    /// Single deadline for the whole analyzer fan-out
    pub collect_timeout: Duration,
    /// Confidence discount per substituted source (multiplicative, 1 - n * penalty)
    pub degraded_confidence_penalty: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: SourceWeights::default(),
            conflict_policy: ConflictPolicy::default(),
            bands: ThesisBands::default(),
            assembly: AssemblyPolicy::default(),
            collect_timeout: Duration::from_secs(10),
            degraded_confidence_penalty: 0.10,
        }
    }
}

impl EngineConfig {
    /// Load from `THESIS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            weights: SourceWeights {
                macro_weight: env_or("THESIS_WEIGHT_MACRO", defaults.weights.macro_weight)?,
                fundamental_weight: env_or("THESIS_WEIGHT_FUNDAMENTAL", defaults.weights.fundamental_weight)?,
                sentiment_weight: env_or("THESIS_WEIGHT_SENTIMENT", defaults.weights.sentiment_weight)?,
            },
            conflict_policy: ConflictPolicy {
                directional_threshold: env_or(
                    "THESIS_DIRECTIONAL_THRESHOLD",
                    defaults.conflict_policy.directional_threshold,
                )?,
                confidence_spread_threshold: env_or(
                    "THESIS_CONFIDENCE_SPREAD",
                    defaults.conflict_policy.confidence_spread_threshold,
                )?,
            },
            bands: defaults.bands,
            assembly: AssemblyPolicy {
                max_position_fraction: env_or(
                    "THESIS_MAX_POSITION",
                    defaults.assembly.max_position_fraction,
                )?,
                ..defaults.assembly
            },
            collect_timeout: Duration::from_millis(env_or(
                "THESIS_COLLECT_TIMEOUT_MS",
                defaults.collect_timeout.as_millis() as u64,
            )?),
            degraded_confidence_penalty: env_or(
                "THESIS_DEGRADED_PENALTY",
                defaults.degraded_confidence_penalty,
            )?,
        };

        config.validate().context("invalid thesis engine configuration")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ThesisError> {
        self.weights.validate()?;
        self.conflict_policy.validate()?;
        self.bands.validate()?;
        self.assembly.validate()?;
        if self.collect_timeout.is_zero() {
            return Err(ThesisError::SynthesisInconsistency(
                "collect timeout must be non-zero".to_string(),
            ));
        }
        // Three degraded sources must still leave a positive confidence.
        if !(0.0..1.0 / 3.0).contains(&self.degraded_confidence_penalty) {
            return Err(ThesisError::SynthesisInconsistency(format!(
                "degraded confidence penalty must be within [0, 0.333), got {}",
                self.degraded_confidence_penalty
            )));
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{} is not a valid value", key))
}
