use std::sync::Arc;

use analysis_orchestrator::{AnalyzerSet, ThesisOrchestrator};
use anyhow::{Context, Result};
use fundamental_analysis::FundamentalAnalysisEngine;
use macro_analysis::MacroAnalysisEngine;
use sentiment_analysis::SentimentAnalysisEngine;

mod config;
mod fixture;

use config::{AgentConfig, CliArgs};
use fixture::FixtureStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    // Logs go to stderr so stdout carries only the thesis JSON.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    // 2. Arguments and configuration
    let args = CliArgs::parse(std::env::args().skip(1))?;
    let config = AgentConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!(
        "  Weights: macro {:.2}, fundamental {:.2}, sentiment {:.2}",
        config.engine.weights.macro_weight,
        config.engine.weights.fundamental_weight,
        config.engine.weights.sentiment_weight
    );
    tracing::info!("  Collect timeout: {}ms", config.engine.collect_timeout.as_millis());

    // 3. Data store and analyzers
    let store = Arc::new(FixtureStore::load(&config.fixture_path)?);
    let analyzers = AnalyzerSet {
        macro_analyzer: Arc::new(MacroAnalysisEngine::new(store.clone())),
        fundamental: Arc::new(FundamentalAnalysisEngine::new(store.clone())),
        sentiment: Arc::new(SentimentAnalysisEngine::new(store.clone())),
    };

    let orchestrator = ThesisOrchestrator::new(config.engine.clone(), analyzers)
        .context("failed to build thesis engine")?
        .with_price_source(store);

    // 4. Generate and print
    let horizon = args.horizon_days.unwrap_or(config.default_horizon_days);
    let thesis = orchestrator.generate_thesis(&args.subject, horizon).await?;
    tracing::info!(
        "{}: {} / {} (score {:.1}, confidence {:.0}%)",
        thesis.subject,
        thesis.thesis_type,
        thesis.recommendation,
        thesis.weighted_score,
        thesis.confidence * 100.0
    );

    println!("{}", serde_json::to_string_pretty(&thesis)?);
    Ok(())
}
