use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::render::OutputFormat;

/// One `--set key=value` config override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for ConfigOverride {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = s.split_once('=') else {
            return Err(anyhow!("expected KEY=VALUE, got: {s}"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("override is missing a key: {s}"));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "weekgrid",
    version,
    about = "Lays out a week of appointments and schedule blocks on a time grid"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Schedule config TOML; defaults to $WEEKGRID_CONFIG or the user config dir.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<ConfigOverride>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<ConfigOverride>,

    /// Weeks relative to the current one.
    #[arg(long = "week-offset", default_value_t = 0, allow_negative_numbers = true)]
    pub week_offset: i64,

    /// Anchor date (YYYY-MM-DD) instead of the clock.
    #[arg(long = "today")]
    pub today: Option<NaiveDate>,

    /// Only show entries for these resources.
    #[arg(long = "resource", action = ArgAction::Append)]
    pub resources: Vec<String>,

    /// Entry id to render with hover focus applied.
    #[arg(long = "focus")]
    pub focus: Option<String>,

    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// JSON array of entries, or `-` for stdin.
    pub entries: PathBuf,
}

/// Default filter for the `-v`/`-q` counts; quiet wins over verbose.
fn default_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

/// Logs to stderr so stdout stays clean for the rendered week.
/// `RUST_LOG` takes precedence over the flag counts.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level(verbose, quiet))
            .map_err(|e| anyhow!("invalid log filter: {e}"))?,
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
    if let Err(err) = installed {
        debug!(error = %err, "tracing subscriber already installed");
    }
    Ok(())
}
