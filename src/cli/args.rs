//! Command line arguments for docrules.
//!
//! Parsed with clap derive; environment fallbacks (`DOCRULES_FORMAT`,
//! `NO_COLOR`) are applied by clap's `env` support.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::document::DocumentSource;
use crate::engine::orchestrator::OrchestratorConfig;
use crate::profile::{Profile, ProfileError, RunConfig};
use crate::RuleId;

/// Top-level CLI
#[derive(Debug, Parser)]
#[command(
    name = "docrules",
    about = "Conformance validation for published technical specification documents",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter (e.g. `debug`, `docrules=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

/// Command to execute
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a document against a profile
    Validate(ValidateArgs),
    /// Extract document metadata without running rules
    Metadata(MetadataArgs),
    /// List built-in rules and profiles
    List,
    /// Print version information
    Version,
}

/// Exactly one document source
#[derive(Debug, Clone, ClapArgs)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Local document path
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Remote document URL
    #[arg(long)]
    pub url: Option<Url>,
}

impl SourceArgs {
    pub fn source(&self) -> Option<DocumentSource> {
        match (&self.file, &self.url) {
            (Some(path), _) => Some(DocumentSource::File(path.clone())),
            (None, Some(url)) => Some(DocumentSource::Url(url.clone())),
            (None, None) => None,
        }
    }
}

/// Options of `docrules metadata`
#[derive(Debug, Clone, ClapArgs)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format (`junit` renders as JSON)
    #[arg(long, value_enum, env = "DOCRULES_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Options of `docrules validate`
#[derive(Debug, Clone, ClapArgs)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Built-in profile name, path to a JSON profile, or `auto`
    #[arg(long, default_value = "auto")]
    pub profile: String,

    /// Run only these rules (repeatable, `category/name`)
    #[arg(long = "rule")]
    pub rules: Vec<RuleId>,

    /// Configuration override `key=value` (repeatable, camelCase keys)
    #[arg(long = "set", value_parser = parse_setting)]
    pub settings: Vec<(String, String)>,

    /// Output format
    #[arg(long, value_enum, env = "DOCRULES_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Run-wide timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Longest redirect chain followed per link
    #[arg(long, default_value_t = 10)]
    pub max_redirects: usize,

    /// Compare findings against a JSON report from an earlier run
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Write this run's findings as a baseline file
    #[arg(long)]
    pub save_baseline: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Only print findings, no passing rules
    #[arg(short, long)]
    pub quiet: bool,

    /// Include finding details
    #[arg(short, long)]
    pub verbose: bool,
}

impl ValidateArgs {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            max_redirects: self.max_redirects,
            ..OrchestratorConfig::default()
        }
    }

    /// Profile named by `--profile`, with `--rule` and `--set` applied.
    ///
    /// `auto` is resolved against the detected document status by the
    /// caller; here it yields `None`.
    pub fn explicit_profile(&self) -> Result<Option<Profile>, ProfileError> {
        if self.profile.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        Profile::load(&self.profile).and_then(|p| self.customize(p)).map(Some)
    }

    /// Apply `--rule` and `--set` to a profile
    pub fn customize(&self, profile: Profile) -> Result<Profile, ProfileError> {
        let mut config: RunConfig = profile.config.clone();
        for (key, value) in &self.settings {
            config.set(key, value)?;
        }
        let profile = profile.with_config(config);
        if self.rules.is_empty() {
            Ok(profile)
        } else {
            Ok(profile.with_rules(self.rules.clone()))
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
    /// JUnit XML for CI/CD integration
    Junit,
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
