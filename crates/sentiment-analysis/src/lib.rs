use analysis_core::{AnalysisError, Analyzer, DirectionalCall, Signal, SignalSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

// Component weights, renormalized over whichever components are present.
const NEWS_WEIGHT: f64 = 0.5;
const FEAR_GREED_WEIGHT: f64 = 0.3;
const SOCIAL_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Sentiment inputs for one subject
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    /// 0 = extreme fear, 100 = extreme greed
    pub fear_greed_index: Option<u8>,
    /// Aggregate social tone in [-1, 1]
    pub social_score: Option<f64>,
    #[serde(default)]
    pub headlines: Vec<Headline>,
}

/// External collaborator supplying sentiment data
#[async_trait]
pub trait SentimentDataSource: Send + Sync {
    async fn sentiment_snapshot(&self, subject: &str) -> Result<SentimentSnapshot, AnalysisError>;
}

/// News event type with importance weight
#[derive(Debug, Clone, Copy)]
enum NewsEventType {
    Earnings,
    MergersAcq,
    Regulatory,
    AnalystAction,
    Legal,
    Macro,
    General,
}

impl NewsEventType {
    fn importance_weight(&self) -> f64 {
        match self {
            NewsEventType::Earnings => 2.0,
            NewsEventType::MergersAcq => 2.5,
            NewsEventType::Regulatory => 2.0,
            NewsEventType::AnalystAction => 1.5,
            NewsEventType::Legal => 1.5,
            NewsEventType::Macro => 0.8,
            NewsEventType::General => 1.0,
        }
    }
}

fn classify_event(title: &str, description: Option<&str>) -> NewsEventType {
    let text = format!("{} {}", title, description.unwrap_or("")).to_lowercase();

    if text.contains("earnings") || text.contains("quarterly") || text.contains("guidance") || text.contains("eps") {
        NewsEventType::Earnings
    } else if text.contains("acqui") || text.contains("merger") || text.contains("buyout") || text.contains("takeover") {
        NewsEventType::MergersAcq
    } else if text.contains("sec ") || text.contains("regulat") || text.contains("approval") || text.contains("etf") {
        NewsEventType::Regulatory
    } else if text.contains("upgrade") || text.contains("downgrade") || text.contains("price target")
        || text.contains("analyst") || text.contains("rating") {
        NewsEventType::AnalystAction
    } else if text.contains("lawsuit") || text.contains("litigation") || text.contains("settlement") || text.contains("sued") {
        NewsEventType::Legal
    } else if text.contains("fed ") || text.contains("federal reserve") || text.contains("interest rate")
        || text.contains("inflation") {
        NewsEventType::Macro
    } else {
        NewsEventType::General
    }
}

pub struct SentimentAnalysisEngine {
    data: Arc<dyn SentimentDataSource>,
    positive_words: HashSet<&'static str>,
    negative_words: HashSet<&'static str>,
}

impl SentimentAnalysisEngine {
    pub fn new(data: Arc<dyn SentimentDataSource>) -> Self {
        Self {
            data,
            positive_words: [
                "bullish", "rally", "surge", "gain", "profit", "growth", "beat",
                "upgrade", "outperform", "strong", "positive", "rise", "increase",
                "breakthrough", "innovation", "success", "exceed", "momentum",
                "buy", "recommend", "optimistic", "record", "high", "advance",
                // Financial-specific terms
                "dividend", "buyback", "repurchase", "accretive", "upside",
                "recovery", "rebound", "expansion", "robust", "accelerating",
                "overweight", "raised", "upgraded", "inflows", "adoption",
                "outpacing", "tailwind",
            ]
            .into_iter()
            .collect(),
            negative_words: [
                "bearish", "decline", "loss", "fall", "plunge", "crash", "miss",
                "downgrade", "underperform", "weak", "negative", "drop", "decrease",
                "concern", "risk", "fail", "disappoint", "slump", "sell",
                "warning", "pessimistic", "low", "retreat", "fear", "trouble",
                // Financial-specific terms
                "dilution", "dilutive", "headwind", "lawsuit", "litigation",
                "hack", "investigation", "probe", "default", "bankruptcy",
                "restructuring", "layoff", "downside", "overvalued", "bubble",
                "underweight", "lowered", "outflows", "suspended",
            ]
            .into_iter()
            .collect(),
        }
    }

    /// Word-list score with a short negation window: a negator up to
    /// NEGATION_WINDOW words before a sentiment word flips it.
    pub fn analyze_text(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '.' || c == '!' || c == '?')
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| NEGATION_WORDS.contains(w))
            .map(|(i, _)| i)
            .collect();

        let mut score: i32 = 0;
        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive_words.contains(*word);
            let is_negative = self.negative_words.contains(*word);
            if !is_positive && !is_negative {
                continue;
            }

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            if is_positive {
                score += if negated { -1 } else { 1 };
            } else {
                score += if negated { 1 } else { -1 };
            }
        }

        score as f64
    }

    fn analyze_headline(&self, headline: &Headline) -> f64 {
        // Titles count double.
        let mut total = self.analyze_text(&headline.title) * 2.0;
        if let Some(desc) = &headline.description {
            total += self.analyze_text(desc);
        }
        total
    }

    /// Event-weighted headline tone squashed into [-1, 1]
    fn news_component(&self, headlines: &[Headline]) -> Option<(f64, HashMap<String, u32>)> {
        if headlines.is_empty() {
            return None;
        }

        let mut total_score = 0.0;
        let mut total_weight = 0.0;
        let mut event_counts: HashMap<String, u32> = HashMap::new();
        for headline in headlines {
            let event = classify_event(&headline.title, headline.description.as_deref());
            *event_counts.entry(format!("{:?}", event)).or_insert(0) += 1;
            let weight = event.importance_weight();
            total_score += self.analyze_headline(headline) * weight;
            total_weight += weight;
        }

        let avg = total_score / total_weight;
        Some(((avg / 3.0).tanh(), event_counts))
    }

    pub fn analyze_snapshot(&self, snapshot: &SentimentSnapshot) -> Result<Signal, AnalysisError> {
        if let Some(fg) = snapshot.fear_greed_index {
            if fg > 100 {
                return Err(AnalysisError::InvalidData(format!("fear/greed index {} out of range", fg)));
            }
        }
        let social = match snapshot.social_score {
            Some(s) if !s.is_finite() => {
                return Err(AnalysisError::InvalidData("social score is not a number".to_string()));
            }
            Some(s) => Some(s.clamp(-1.0, 1.0)),
            None => None,
        };

        let news = self.news_component(&snapshot.headlines);
        // Contrarian: extreme fear reads bullish, extreme greed bearish.
        let fear_greed = snapshot.fear_greed_index.map(|fg| (50.0 - fg as f64) / 50.0);

        let mut components: Vec<(f64, f64)> = Vec::new();
        if let Some((tone, _)) = &news {
            components.push((*tone, NEWS_WEIGHT));
        }
        if let Some(contrarian) = fear_greed {
            components.push((contrarian, FEAR_GREED_WEIGHT));
        }
        if let Some(s) = social {
            components.push((s, SOCIAL_WEIGHT));
        }

        if components.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "no headlines, fear/greed reading or social score".to_string(),
            ));
        }

        let total_weight: f64 = components.iter().map(|(_, w)| w).sum();
        let composite = components.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight;
        let score = 50.0 + composite * 50.0;
        let call = DirectionalCall::from_score(score);

        let coverage = components.len() as f64 / 3.0;
        let volume = (snapshot.headlines.len() as f64 / 10.0).min(1.0);
        let aligned = components
            .iter()
            .filter(|(v, _)| v.abs() < 0.05 || v.signum() == composite.signum())
            .count() as f64
            / components.len() as f64;
        let confidence = (0.1 + coverage * 0.4 + volume * 0.2 + aligned * 0.25).min(0.95);

        let (news_tone, event_breakdown) = match news {
            Some((tone, events)) => (Some(tone), events),
            None => (None, HashMap::new()),
        };

        Ok(Signal::new(SignalSource::Sentiment, call, confidence, score).with_detail(json!({
            "news_tone": news_tone,
            "fear_greed_index": snapshot.fear_greed_index,
            "fear_greed_contrarian": fear_greed,
            "social_score": social,
            "total_headlines": snapshot.headlines.len(),
            "event_breakdown": event_breakdown,
            "composite": composite,
        })))
    }
}

#[async_trait]
impl Analyzer for SentimentAnalysisEngine {
    async fn analyze(&self, subject: &str) -> Result<Signal, AnalysisError> {
        let snapshot = self.data.sentiment_snapshot(subject).await?;
        let signal = self.analyze_snapshot(&snapshot)?;
        tracing::info!(
            "Sentiment analysis for {}: {} (score {:.1}, confidence {:.2}, {} headlines)",
            subject,
            signal.directional_call,
            signal.score,
            signal.confidence,
            snapshot.headlines.len()
        );
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct StaticSentiment(SentimentSnapshot);

    #[async_trait]
    impl SentimentDataSource for StaticSentiment {
        async fn sentiment_snapshot(&self, _subject: &str) -> Result<SentimentSnapshot, AnalysisError> {
            Ok(self.0.clone())
        }
    }

    fn engine() -> SentimentAnalysisEngine {
        SentimentAnalysisEngine::new(Arc::new(StaticSentiment(SentimentSnapshot::default())))
    }

    fn headline(title: &str) -> Headline {
        Headline {
            title: title.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_negation_flips_polarity() {
        let e = engine();
        assert_eq!(e.analyze_text("strong rally"), 2.0);
        assert_eq!(e.analyze_text("not bullish"), -1.0);
        assert_eq!(e.analyze_text("no sign of crash"), 1.0);
        // Beyond the window the negator no longer applies.
        assert_eq!(e.analyze_text("not that we think this is bullish"), 1.0);
    }

    #[tokio::test]
    async fn test_positive_headlines_are_bullish() {
        let snapshot = SentimentSnapshot {
            fear_greed_index: Some(50),
            social_score: Some(0.4),
            headlines: vec![
                headline("Analysts upgrade ACME as earnings beat, strong growth"),
                headline("ACME shares rally to record high"),
            ],
        };
        let e = SentimentAnalysisEngine::new(Arc::new(StaticSentiment(snapshot)));
        let signal = e.analyze("ACME").await.unwrap();
        assert_eq!(signal.source, SignalSource::Sentiment);
        assert!(signal.directional_call.polarity() > 0);
        assert_eq!(signal.supporting_detail["total_headlines"], 2);
    }

    #[test]
    fn test_fear_greed_is_contrarian() {
        let e = engine();
        let fear = e
            .analyze_snapshot(&SentimentSnapshot {
                fear_greed_index: Some(5),
                ..SentimentSnapshot::default()
            })
            .unwrap();
        let greed = e
            .analyze_snapshot(&SentimentSnapshot {
                fear_greed_index: Some(95),
                ..SentimentSnapshot::default()
            })
            .unwrap();
        assert_eq!(fear.directional_call, DirectionalCall::StrongBullish);
        assert_eq!(greed.directional_call, DirectionalCall::StrongBearish);
        assert_abs_diff_eq!(fear.score, 95.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sparse_inputs_lower_confidence() {
        let e = engine();
        let sparse = e
            .analyze_snapshot(&SentimentSnapshot {
                social_score: Some(0.5),
                ..SentimentSnapshot::default()
            })
            .unwrap();
        let full = e
            .analyze_snapshot(&SentimentSnapshot {
                fear_greed_index: Some(30),
                social_score: Some(0.5),
                headlines: (0..10).map(|_| headline("Robust demand drives strong gain")).collect(),
            })
            .unwrap();
        assert!(sparse.confidence < full.confidence);
    }

    #[test]
    fn test_empty_snapshot_is_insufficient() {
        let result = engine().analyze_snapshot(&SentimentSnapshot::default());
        assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_rejects_out_of_range_fear_greed() {
        let result = engine().analyze_snapshot(&SentimentSnapshot {
            fear_greed_index: Some(140),
            ..SentimentSnapshot::default()
        });
        assert!(matches!(result, Err(AnalysisError::InvalidData(_))));
    }
}
