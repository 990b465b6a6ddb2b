use analysis_core::{AnalysisError, ReferencePriceSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fundamental_analysis::{FundamentalDataSource, FundamentalSnapshot};
use macro_analysis::{MacroDataSource, MacroSnapshot};
use sentiment_analysis::{SentimentDataSource, SentimentSnapshot};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Everything known about one subject. Missing sections make the matching
/// analyzer fail, which the engine records as a degraded source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectFixture {
    pub price: Option<f64>,
    #[serde(rename = "macro")]
    pub macro_snapshot: Option<MacroSnapshot>,
    pub fundamental: Option<FundamentalSnapshot>,
    pub sentiment: Option<SentimentSnapshot>,
}

/// JSON-backed data store serving every analyzer and the price lookup
#[derive(Debug, Default)]
pub struct FixtureStore {
    subjects: HashMap<String, SubjectFixture>,
}

impl FixtureStore {
    pub fn from_json(raw: &str) -> Result<Self> {
        let subjects: HashMap<String, SubjectFixture> =
            serde_json::from_str(raw).context("failed to parse fixture JSON")?;
        let subjects = subjects
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        Ok(Self { subjects })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture file {}", path.display()))?;
        let store = Self::from_json(&raw)?;
        tracing::info!("Loaded fixtures for {} subject(s) from {}", store.subjects.len(), path.display());
        Ok(store)
    }

    fn subject(&self, subject: &str) -> Result<&SubjectFixture, AnalysisError> {
        self.subjects
            .get(&subject.to_uppercase())
            .ok_or_else(|| AnalysisError::Unavailable(format!("no fixture for {}", subject)))
    }
}

#[async_trait]
impl MacroDataSource for FixtureStore {
    async fn macro_snapshot(&self, subject: &str) -> Result<MacroSnapshot, AnalysisError> {
        self.subject(subject)?
            .macro_snapshot
            .clone()
            .ok_or_else(|| AnalysisError::Unavailable(format!("no macro data for {}", subject)))
    }
}

#[async_trait]
impl FundamentalDataSource for FixtureStore {
    async fn fundamentals(&self, subject: &str) -> Result<FundamentalSnapshot, AnalysisError> {
        self.subject(subject)?
            .fundamental
            .clone()
            .ok_or_else(|| AnalysisError::Unavailable(format!("no fundamentals for {}", subject)))
    }
}

#[async_trait]
impl SentimentDataSource for FixtureStore {
    async fn sentiment_snapshot(&self, subject: &str) -> Result<SentimentSnapshot, AnalysisError> {
        self.subject(subject)?
            .sentiment
            .clone()
            .ok_or_else(|| AnalysisError::Unavailable(format!("no sentiment data for {}", subject)))
    }
}

#[async_trait]
impl ReferencePriceSource for FixtureStore {
    async fn reference_price(&self, subject: &str) -> Result<f64, AnalysisError> {
        self.subject(subject)?
            .price
            .ok_or_else(|| AnalysisError::Unavailable(format!("no price for {}", subject)))
    }
}
