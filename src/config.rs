// src/config.rs
use crate::converter::{ImportFormat, ImportMode, ImportRequest};
use crate::error::AppError;
use crate::types::ApiKey;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Name of the environment variable holding the Notion integration token.
pub const API_KEY_VAR: &str = "NOTION_API_KEY";

/// Source formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Html,
    Markdown,
    Notion,
}

impl From<FormatArg> for ImportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => ImportFormat::Html,
            FormatArg::Markdown => ImportFormat::Markdown,
            FormatArg::Notion => ImportFormat::Notion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeArg {
    #[default]
    AllOrNothing,
    IgnoreErrors,
}

impl From<ModeArg> for ImportMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::AllOrNothing => ImportMode::AllOrNothing,
            ModeArg::IgnoreErrors => ImportMode::IgnoreErrors,
        }
    }
}

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Files, directories or zip archives to import (html and markdown)
    pub paths: Vec<PathBuf>,

    /// Source format of the import
    #[arg(short, long, value_enum, default_value_t = FormatArg::Markdown)]
    pub format: FormatArg,

    /// What a single failed item does to the whole run
    #[arg(short, long, value_enum, default_value_t = ModeArg::AllOrNothing)]
    pub mode: ModeArg,

    /// Write the resulting snapshots as JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent Notion page workers (default: CPU count, 4 to 8)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Only check whether NOTION_API_KEY is accepted by Notion
    #[arg(long, default_value_t = false)]
    pub validate_token: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// What the binary has been asked to do.
#[derive(Debug, Clone)]
pub enum Command {
    Import(ImportRequest),
    ValidateToken(ApiKey),
}

/// Resolved configuration, validated and ready to run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub command: Command,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub verbose: bool,
}

impl ImportConfig {
    /// Resolves the configuration from CLI input and the environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let key = std::env::var(API_KEY_VAR).ok();
        Self::resolve_with(cli, key)
    }

    /// Same as [`ImportConfig::resolve`] with the API key passed in.
    pub fn resolve_with(cli: CommandLineInput, api_key: Option<String>) -> Result<Self, AppError> {
        let needs_key = cli.validate_token || cli.format == FormatArg::Notion;
        let api_key = if needs_key {
            let raw = api_key.ok_or_else(|| {
                AppError::MissingConfiguration(format!("{} environment variable not set", API_KEY_VAR))
            })?;
            Some(ApiKey::new(raw)?)
        } else {
            None
        };

        let command = match (cli.validate_token, api_key) {
            (true, Some(key)) => Command::ValidateToken(key),
            (false, Some(key)) => Command::Import(ImportRequest::notion(cli.mode.into(), key)),
            (_, None) => {
                if cli.paths.is_empty() {
                    return Err(AppError::MissingConfiguration(
                        "at least one path is required for html and markdown imports".into(),
                    ));
                }
                Command::Import(ImportRequest::paths(
                    cli.format.into(),
                    cli.mode.into(),
                    cli.paths,
                ))
            }
        };

        Ok(ImportConfig {
            command,
            output: cli.output,
            workers: cli.workers.filter(|n| *n > 0),
            verbose: cli.verbose,
        })
    }
}
