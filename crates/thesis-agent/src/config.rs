use analysis_orchestrator::EngineConfig;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub fixture_path: PathBuf,
    pub default_horizon_days: u32,
    pub engine: EngineConfig,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        let fixture_path = env::var("THESIS_FIXTURE_PATH")
            .map(PathBuf::from)
            .context("THESIS_FIXTURE_PATH must be set")?;

        let default_horizon_days = env::var("THESIS_HORIZON_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("Invalid THESIS_HORIZON_DAYS")?;

        let config = Self {
            fixture_path,
            default_horizon_days,
            engine: EngineConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.default_horizon_days == 0 {
            bail!("THESIS_HORIZON_DAYS must be at least 1");
        }
        if self.default_horizon_days > 3650 {
            bail!("THESIS_HORIZON_DAYS must be at most 3650 (ten years)");
        }
        Ok(())
    }
}

/// Command line: `thesis-agent <SUBJECT> [HORIZON_DAYS]`
#[derive(Debug, PartialEq)]
pub struct CliArgs {
    pub subject: String,
    pub horizon_days: Option<u32>,
}

impl CliArgs {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let subject = match args.next() {
            Some(s) => s,
            None => bail!("usage: thesis-agent <SUBJECT> [HORIZON_DAYS]"),
        };
        let horizon_days = args
            .next()
            .map(|h| h.parse::<u32>().with_context(|| format!("invalid horizon '{}'", h)))
            .transpose()?;
        if let Some(extra) = args.next() {
            bail!("unexpected argument '{}'", extra);
        }
        Ok(Self { subject, horizon_days })
    }
}
