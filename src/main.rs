// src/main.rs
use anyhow::{bail, Context};
use clap::Parser;
use docimport::config::{Command, CommandLineInput, ImportConfig};
use docimport::converter::notion::NotionConverter;
use docimport::converter::{ConverterRegistry, ImportRequest, ProgressTracker};
use docimport::reconcile::MemoryStore;
use docimport::service::{ImportOutcome, ImportService};
use docimport::{validate_token, TokenStatus};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("docimport.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    // stdout carries the JSON result
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn registry(workers: Option<usize>) -> ConverterRegistry {
    let notion = match workers {
        Some(n) => NotionConverter::new().with_workers(n),
        None => NotionConverter::new(),
    };
    ConverterRegistry::with_defaults().register(Arc::new(notion))
}

/// Runs one import against an in-memory store and returns its outcome.
async fn run_import(request: ImportRequest, workers: Option<usize>) -> ImportOutcome {
    let store = Arc::new(MemoryStore::new());
    let service = ImportService::new(registry(workers), store.clone(), store);

    let tracker = Arc::new(ProgressTracker::new());
    let on_interrupt = Arc::clone(&tracker);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, cancelling import");
            on_interrupt.cancel();
        }
    });

    let outcome = service.import(&request, tracker.as_ref()).await;
    interrupt.abort();
    log::debug!(
        "progress {}/{} ({})",
        tracker.done(),
        tracker.total(),
        tracker.message()
    );
    if let Some(report) = &outcome.report {
        log::info!("reconciliation: {:?}", report);
    }
    outcome
}

fn write_response(outcome: &ImportOutcome, config: &ImportConfig) -> anyhow::Result<()> {
    let Some(response) = &outcome.response else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(response).context("cannot serialize snapshots")?;
    match &config.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!(
                "✓ {} snapshots written to {}",
                response.snapshots.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = ImportConfig::resolve(cli)?;

    match &config.command {
        Command::ValidateToken(key) => {
            let status = validate_token(key).await;
            println!("{}", status);
            if status != TokenStatus::Ok {
                bail!("token check failed: {}", status);
            }
        }
        Command::Import(request) => {
            let outcome = run_import(request.clone(), config.workers).await;
            write_response(&outcome, &config)?;
            if let Some(error) = outcome.error {
                bail!(error);
            }
        }
    }

    Ok(())
}
