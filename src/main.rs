//! docrules CLI entry point
//!
//! Conformance validation for published technical specification documents.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use docrules::cli::args::{Args, Command, MetadataArgs, ValidateArgs};
use docrules::cli::output::{exit_code, format_comparison, format_metadata, get_formatter};
use docrules::document::DocumentSource;
use docrules::engine::orchestrator::{OrchestratorConfig, Validator};
use docrules::engine::result::{load_baseline, save_as_baseline};
use docrules::engine::sink::Sink;
use docrules::profile::{Profile, BUILTIN_PROFILES};
use docrules::rules::RuleRegistry;
use docrules::version::get_build_info;
use docrules::{DocrulesError, ValidationRequest};

const EXIT_RUNTIME_ERROR: u8 = 3;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    match args.command {
        Command::Version => {
            println!("{}", get_build_info());
            ExitCode::SUCCESS
        }
        Command::List => {
            print_rule_list();
            ExitCode::SUCCESS
        }
        Command::Metadata(metadata) => block_on(run_metadata(metadata)),
        Command::Validate(validate) => block_on(run_validate(validate)),
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn block_on<F>(future: F) -> ExitCode
where
    F: std::future::Future<Output = Result<u8, DocrulesError>>,
{
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    match runtime.block_on(future) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn print_rule_list() {
    let registry = RuleRegistry::builtin();
    println!("Available rules:");
    println!();

    let mut category = "";
    for (id, description) in registry.describe() {
        if id.category() != category {
            category = id.category();
            println!("{}:", category.to_uppercase());
        }
        println!("  {:<28} {}", id.to_string(), description);
    }

    println!();
    println!("Built-in profiles: {}, auto", BUILTIN_PROFILES.join(", "));
}

/// Source named on the command line; clap enforces exactly one
fn source_of(source: Option<DocumentSource>) -> Result<DocumentSource, DocrulesError> {
    source.ok_or_else(|| DocrulesError::Parse {
        context: "arguments".to_string(),
        message: "one of --file or --url is required".to_string(),
    })
}

async fn run_metadata(args: MetadataArgs) -> Result<u8, DocrulesError> {
    let source = source_of(args.source.source())?;
    let validator = Validator::new(OrchestratorConfig::default())?;
    let report = validator
        .extract_metadata(source, Arc::new(Sink::new()))
        .await?;

    if let Some(model) = &report.metadata {
        println!("{}", format_metadata(model, &args.format));
    }
    Ok(0)
}

async fn run_validate(args: ValidateArgs) -> Result<u8, DocrulesError> {
    let source = source_of(args.source.source())?;
    let validator = Validator::new(args.orchestrator_config())?;

    let profile = match args.explicit_profile()? {
        Some(profile) => profile,
        None => args.customize(detect_profile(&validator, &source).await?)?,
    };
    tracing::debug!(profile = %profile.name, rules = profile.rules.len(), "profile selected");

    let report = validator
        .validate(ValidationRequest { source, profile }, Arc::new(Sink::new()))
        .await?;

    let formatter = get_formatter(&args.format, args.no_color, args.verbose, args.quiet);
    println!("{}", formatter.format(&report));

    if let Some(path) = &args.baseline {
        let baseline = load_baseline(path)?;
        let comparison = report.compare_to_baseline(&baseline);
        eprint!("{}", format_comparison(&comparison));
    }
    if let Some(path) = &args.save_baseline {
        save_as_baseline(&report, path)?;
    }

    Ok(exit_code(&report))
}

/// Catalogue profile for the status the document declares
async fn detect_profile(
    validator: &Validator,
    source: &DocumentSource,
) -> Result<Profile, DocrulesError> {
    let probe = validator
        .extract_metadata(source.clone(), Arc::new(Sink::new()))
        .await?;
    let status = probe.metadata.as_ref().and_then(|m| m.profile);
    Ok(match status {
        Some(status) => Profile::for_status(status),
        None => Profile::builtin("minimal")?,
    })
}
