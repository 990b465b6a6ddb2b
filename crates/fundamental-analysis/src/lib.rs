use analysis_core::{AnalysisError, Analyzer, DirectionalCall, Signal, SignalSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Latest fundamentals for one subject. Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub price: Option<f64>,
    pub eps: Option<f64>,
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shareholders_equity: Option<f64>,
    /// Year-over-year revenue growth, percent
    pub revenue_growth_pct: Option<f64>,
}

/// External collaborator supplying fundamentals
#[async_trait]
pub trait FundamentalDataSource: Send + Sync {
    async fn fundamentals(&self, subject: &str) -> Result<FundamentalSnapshot, AnalysisError>;
}

pub struct FundamentalAnalysisEngine {
    data: Arc<dyn FundamentalDataSource>,
}

impl FundamentalAnalysisEngine {
    pub fn new(data: Arc<dyn FundamentalDataSource>) -> Self {
        Self { data }
    }

    fn calculate_pe_ratio(&self, price: f64, eps: f64) -> Option<f64> {
        if eps > 0.0 {
            Some(price / eps)
        } else {
            None
        }
    }

    fn calculate_debt_to_equity(&self, liabilities: f64, equity: f64) -> Option<f64> {
        if equity > 0.0 {
            Some(liabilities / equity)
        } else {
            None
        }
    }

    fn calculate_roe(&self, net_income: f64, equity: f64) -> Option<f64> {
        if equity > 0.0 {
            Some((net_income / equity) * 100.0)
        } else {
            None
        }
    }

    fn calculate_margin(&self, numerator: f64, revenue: f64) -> Option<f64> {
        if revenue > 0.0 {
            Some((numerator / revenue) * 100.0)
        } else {
            None
        }
    }

    /// Point-based scoring: each available metric adds or removes points,
    /// and confidence grows with the number of metrics evaluated.
    pub fn analyze_snapshot(&self, f: &FundamentalSnapshot) -> Result<Signal, AnalysisError> {
        let mut points = 0.0;
        let mut evaluated = 0usize;
        let mut reasons: Vec<String> = Vec::new();

        let pe = match (f.price, f.eps) {
            (Some(price), Some(eps)) => self.calculate_pe_ratio(price, eps),
            _ => None,
        };
        if let Some(pe) = pe {
            evaluated += 1;
            if pe < 15.0 {
                points += 2.0;
                reasons.push(format!("Attractive P/E ({:.1})", pe));
            } else if pe < 25.0 {
                points += 1.0;
            } else if pe > 40.0 {
                points -= 2.0;
                reasons.push(format!("Rich P/E ({:.1})", pe));
            }
        } else if matches!(f.eps, Some(eps) if eps <= 0.0) {
            evaluated += 1;
            points -= 1.0;
            reasons.push("Negative earnings".to_string());
        }

        let debt_to_equity = match (f.total_liabilities, f.shareholders_equity) {
            (Some(l), Some(e)) => self.calculate_debt_to_equity(l, e),
            _ => None,
        };
        if let Some(de) = debt_to_equity {
            evaluated += 1;
            if de < 0.5 {
                points += 1.0;
                reasons.push(format!("Low leverage (D/E {:.2})", de));
            } else if de > 2.0 {
                points -= 2.0;
                reasons.push(format!("High leverage (D/E {:.2})", de));
            }
        }

        let roe = match (f.net_income, f.shareholders_equity) {
            (Some(ni), Some(e)) => self.calculate_roe(ni, e),
            _ => None,
        };
        if let Some(roe) = roe {
            evaluated += 1;
            if roe > 15.0 {
                points += 2.0;
                reasons.push(format!("Strong ROE ({:.1}%)", roe));
            } else if roe < 0.0 {
                points -= 2.0;
                reasons.push(format!("Negative ROE ({:.1}%)", roe));
            }
        }

        let net_margin = match (f.net_income, f.revenue) {
            (Some(ni), Some(rev)) => self.calculate_margin(ni, rev),
            _ => None,
        };
        if let Some(margin) = net_margin {
            evaluated += 1;
            if margin > 20.0 {
                points += 2.0;
            } else if margin > 10.0 {
                points += 1.0;
            } else if margin < 0.0 {
                points -= 2.0;
                reasons.push(format!("Unprofitable (net margin {:.1}%)", margin));
            }
        }

        let gross_margin = match (f.gross_profit, f.revenue) {
            (Some(gp), Some(rev)) => self.calculate_margin(gp, rev),
            _ => None,
        };
        let operating_margin = match (f.operating_income, f.revenue) {
            (Some(oi), Some(rev)) => self.calculate_margin(oi, rev),
            _ => None,
        };
        if let Some(om) = operating_margin {
            evaluated += 1;
            if om > 15.0 {
                points += 1.0;
            } else if om < 0.0 {
                points -= 1.0;
            }
        }

        if let Some(growth) = f.revenue_growth_pct.filter(|g| g.is_finite()) {
            evaluated += 1;
            if growth > 20.0 {
                points += 2.0;
                reasons.push(format!("Revenue growing {:.0}% YoY", growth));
            } else if growth > 5.0 {
                points += 1.0;
            } else if growth < -5.0 {
                points -= 2.0;
                reasons.push(format!("Revenue shrinking {:.0}% YoY", growth));
            }
        }

        if evaluated == 0 {
            return Err(AnalysisError::InsufficientData(
                "no fundamental metrics could be computed".to_string(),
            ));
        }

        // Max +/-2 points per metric; scale into 0-100 around 50.
        let max_points = evaluated as f64 * 2.0;
        let score = 50.0 + (points / max_points) * 50.0;
        let call = DirectionalCall::from_score(score);
        let confidence = (0.35 + 0.1 * evaluated as f64).min(0.95);

        Ok(Signal::new(SignalSource::Fundamental, call, confidence, score).with_detail(json!({
            "pe_ratio": pe,
            "debt_to_equity": debt_to_equity,
            "roe": roe,
            "net_margin": net_margin,
            "gross_margin": gross_margin,
            "operating_margin": operating_margin,
            "revenue_growth_pct": f.revenue_growth_pct,
            "metrics_evaluated": evaluated,
            "points": points,
            "reasons": reasons,
        })))
    }
}

#[async_trait]
impl Analyzer for FundamentalAnalysisEngine {
    async fn analyze(&self, subject: &str) -> Result<Signal, AnalysisError> {
        let snapshot = self.data.fundamentals(subject).await?;
        let signal = self.analyze_snapshot(&snapshot)?;
        tracing::info!(
            "Fundamental analysis for {}: {} (score {:.1}, confidence {:.2})",
            subject, signal.directional_call, signal.score, signal.confidence
        );
        Ok(signal)
    }
}
