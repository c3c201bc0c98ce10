//! Sleuth CLI — diagnose bugs from error messages and stack traces.
//!
//! ## Commands
//!
//! - `diagnose`: send an error message to the model and render the diagnosis
//! - `schema`: print the JSON Schema of a diagnosis
//! - `prompt`: print the system prompt sent to the model
//! - `config`: show or update ~/.sleuth/settings.json

mod config;
mod render;
mod view;

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sleuth_core::{contract, BugInput, Credential, Verdict};
use tracing::Level;

use crate::config::{Overrides, SettingsUpdate};
use crate::view::View;

/// Exit status for input the model declined as not being a bug report.
const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "sleuth")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diagnose bugs from error messages and stack traces", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an error message, stack trace, or bug description
    Diagnose {
        /// The error text. Read from --file or stdin when omitted.
        message: Option<String>,

        /// Read the error text from a file
        #[arg(short, long, conflicts_with = "message")]
        file: Option<PathBuf>,

        /// Print the diagnosis as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the JSON Schema of a diagnosis
    Schema,

    /// Print the system prompt sent to the model
    Prompt,

    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective settings and whether the API key is set
    Show,
    /// Update persisted settings
    Set(SettingsUpdate),
}

#[tokio::main]
async fn main() -> ExitCode {
    sleuth_core::load_env();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    sleuth_core::telemetry::init_tracing(cli.log_json, level);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprint!("{}", render::failure(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Diagnose {
            message,
            file,
            json,
            overrides,
        } => {
            let text = read_input(message, file)?;
            let settings = overrides.apply(sleuth_core::read_settings());
            diagnose(text, &settings, json).await
        }
        Commands::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&sleuth_core::diagnosis_schema())?
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::Prompt => {
            println!("# prompt version {}\n", contract::PROMPT_VERSION);
            println!("{}", contract::SYSTEM_PROMPT);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            let path = sleuth_core::settings_path();
            match action {
                ConfigAction::Show => {
                    let settings = sleuth_core::read_settings_from(&path);
                    let credential = Credential::from_env();
                    print!("{}", config::describe(&settings, &path, credential.as_ref()));
                }
                ConfigAction::Set(update) => {
                    if update.is_empty() {
                        bail!("nothing to set; pass at least one of --model, --endpoint, --referer, --title, --timeout");
                    }
                    let settings = update.apply(sleuth_core::read_settings_from(&path));
                    sleuth_core::write_settings_to(&path, &settings)
                        .context("failed to save settings")?;
                    println!("Saved {}", path.display());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn diagnose(text: String, settings: &sleuth_core::AiSettings, json: bool) -> Result<ExitCode> {
    let Some(input) = BugInput::new(text) else {
        bail!("the error message is empty; paste an error log, stack trace, or bug description");
    };

    let mut view = View::default();
    view.submit()?;

    let spinner = spinner();
    let outcome = sleuth_diagnose::analyze(&input, settings).await;
    if let Err(e) = &outcome {
        tracing::debug!(kind = %e.kind(), status = ?e.status(), "analysis failed");
    }
    view.resolve(outcome);
    spinner.finish_and_clear();

    match view {
        View::Result(result) => {
            let rejected = result.is_unrelated();
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match result.verdict() {
                    Verdict::Rejected { explanation } => print!("{}", render::rejection(explanation)),
                    Verdict::Diagnosed(result) => print!("{}", render::diagnosis(result)),
                }
            }
            Ok(if rejected {
                ExitCode::from(EXIT_REJECTED)
            } else {
                ExitCode::SUCCESS
            })
        }
        View::Error(message) => {
            if json {
                eprintln!("{}", serde_json::json!({ "error": message }));
            } else {
                eprint!("{}", render::failure(&message));
            }
            Ok(ExitCode::FAILURE)
        }
        View::Idle | View::Loading => bail!("analysis did not complete"),
    }
}

fn read_input(message: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(message) = message {
        return Ok(message);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()));
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Paste the error output, then press Ctrl-D:");
    }
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Reading your stack trace, identifying the root cause, and formulating a fix...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
