//! questflow command-line tool.
//!
//! Runs a survey in the terminal, keeps the completed answers in the local
//! offline queue and pushes them to the configured endpoint when possible.
//!
//! Usage:
//!   questflow run                       # bundled transport survey
//!   questflow run surveys/custom.json --surveyor "Maël"
//!   questflow sync
//!   questflow status
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=questflow_offline=debug`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, Subcommand};
use questflow::{SurveyDefinition, collect};
use questflow_offline::{
    FileStore, HttpSink, SaveOutcome, Submission, SubmissionSink, SyncConfig, SyncCoordinator,
};
use questflow_wizard_dialoguer::DialoguerWizard;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "questflow")]
#[command(about = "Run conditional surveys in the terminal and sync them when online")]
struct Cli {
    /// Config file (defaults to <config dir>/questflow/config.toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a survey and save the answers
    Run {
        /// Survey file (JSON). The bundled transport survey when omitted.
        survey: Option<PathBuf>,

        /// Name recorded with the answers (overrides the config)
        #[arg(long, short)]
        surveyor: Option<String>,

        /// Keep the answers local, do not try to send them
        #[arg(long)]
        offline: bool,

        /// Plain prompts without colors
        #[arg(long)]
        plain: bool,
    },

    /// Send every pending survey now
    Sync,

    /// Show the offline queue
    Status,

    /// Delete every locally stored survey
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

/// The configured endpoint, or nothing when the config has none.
enum Remote {
    Http(HttpSink),
    Unconfigured,
}

#[async_trait]
impl SubmissionSink for Remote {
    type Error = anyhow::Error;

    async fn submit(&self, submission: &Submission) -> Result<String, Self::Error> {
        match self {
            Remote::Http(sink) => Ok(sink.submit(submission).await?),
            Remote::Unconfigured => bail!("no endpoint configured"),
        }
    }
}

async fn coordinator(
    config: &SyncConfig,
    force_offline: bool,
) -> Result<SyncCoordinator<FileStore, Remote>> {
    let store = FileStore::open(&config.data_dir)
        .await
        .with_context(|| format!("Failed to open data directory {:?}", config.data_dir))?;
    let remote = match &config.endpoint {
        Some(endpoint) => Remote::Http(
            HttpSink::new(endpoint, config.request_timeout())
                .context("Failed to build HTTP client")?,
        ),
        None => Remote::Unconfigured,
    };
    let online = config.assume_online && !force_offline && matches!(remote, Remote::Http(_));
    debug!(online, data_dir = ?config.data_dir, "sync coordinator ready");
    Ok(SyncCoordinator::new(store, remote, online))
}

fn load_survey(path: Option<&Path>) -> Result<SurveyDefinition> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read survey file {path:?}"))?;
            SurveyDefinition::from_json(&json)
                .with_context(|| format!("Invalid survey file {path:?}"))
        }
        None => example_surveys::mobility().context("Bundled survey is invalid"),
    }
}

async fn run_survey(
    config: &SyncConfig,
    survey_path: Option<PathBuf>,
    surveyor: Option<String>,
    offline: bool,
    plain: bool,
) -> Result<()> {
    let survey = load_survey(survey_path.as_deref())?;
    let coordinator = coordinator(config, offline).await?;
    let surveyor = surveyor.unwrap_or_else(|| config.surveyor_name.clone());

    let started_at = Utc::now();
    let collected = tokio::task::spawn_blocking(move || -> Result<Option<_>> {
        let mut wizard = if plain {
            DialoguerWizard::plain()
        } else {
            DialoguerWizard::new()
        };
        let surveyor = if surveyor.is_empty() {
            match wizard.ask_surveyor_name()? {
                Some(name) => name,
                None => return Ok(None),
            }
        } else {
            surveyor
        };

        println!("{}", survey.title);
        if let Some(welcome) = &survey.welcome_message {
            println!("{welcome}");
        }
        println!();

        match collect(&survey, &mut wizard) {
            Ok(answers) => Ok(Some((surveyor, answers))),
            Err(e) if e.is_cancelled() => Ok(None),
            Err(e) => Err(e.into()),
        }
    })
    .await
    .context("Survey prompt task failed")??;

    let Some((surveyor, answers)) = collected else {
        println!("Survey cancelled, nothing saved.");
        return Ok(());
    };

    info!(answers = answers.len(), "survey completed");
    let outcome = coordinator
        .save_survey(answers, surveyor, Some(started_at))
        .await;
    println!("{}", outcome.message());
    if let SaveOutcome::Failed { reason } = outcome {
        bail!("answers could not be stored: {reason}");
    }
    Ok(())
}

async fn print_status(config: &SyncConfig) -> Result<()> {
    let coordinator = coordinator(config, false).await?;
    let status = coordinator.status().await;
    let stats = coordinator
        .stats()
        .await
        .context("Failed to read offline queue")?;

    println!("Data directory: {}", config.data_dir.display());
    println!(
        "Endpoint:       {}",
        config.endpoint.as_deref().unwrap_or("(none)")
    );
    println!("Pending:        {}", status.pending_count);
    println!("Stored:         {}", stats.total_records);
    match status.last_sync_attempt {
        Some(at) => println!("Last sync:      {}", at.to_rfc3339()),
        None => println!("Last sync:      never"),
    }
    Ok(())
}

async fn sync_now(config: &SyncConfig) -> Result<()> {
    let coordinator = coordinator(config, false).await?;
    if !coordinator.is_online() {
        bail!("cannot sync: no endpoint configured or assume_online is false");
    }
    let ok = coordinator.force_sync().await;
    let pending = coordinator.status().await.pending_count;
    if !ok {
        bail!("sync failed, {pending} survey(s) still pending");
    }
    println!("Sync done, {pending} survey(s) still pending");
    Ok(())
}

async fn clear(config: &SyncConfig, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("refusing to delete stored surveys without --yes");
    }
    let coordinator = coordinator(config, true).await?;
    coordinator
        .clear_offline_data()
        .await
        .context("Failed to clear offline data")?;
    println!("Offline data cleared");
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config =
        SyncConfig::load_or_default(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Command::Run {
            survey,
            surveyor,
            offline,
            plain,
        } => run_survey(&config, survey, surveyor, offline, plain).await,
        Command::Sync => sync_now(&config).await,
        Command::Status => print_status(&config).await,
        Command::Clear { yes } => clear(&config, yes).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
