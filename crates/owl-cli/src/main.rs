mod notifier;
mod transport;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use owl_core::habitica::DEFAULT_API_URL;
use owl_core::models::{CoreError, CoreErrorKind};
use owl_core::persistence::{CredentialStore, LocalState, LocalTaskStore, SettingsStore};
use owl_core::sqlite::SqliteStore;
use owl_core::workflows::{
    CompletionOutcome, ConversionOutcome, ImportOutcome, SyncOutcome, WorkflowRuntime,
    WorkflowServices, parse_accumulator, parse_conversion_rate,
};
use tracing_subscriber::EnvFilter;

use crate::notifier::TerminalNotifier;
use crate::transport::UreqTransport;

/// Owl - sync local tasks to Habitica and trade gold for vacation time
#[derive(Parser, Debug)]
#[command(name = "owl")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG        Log filter for diagnostics on stderr (overrides --verbose)")]
pub struct Cli {
    /// SQLite file holding credentials, tasks and settings
    #[arg(long, env = "OWL_DATABASE", default_value = "owl.sqlite3")]
    pub database: PathBuf,

    /// Habitica API base URL
    #[arg(long, env = "OWL_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Log workflow steps to stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create Habitica todos for local tasks that are not there yet
    SyncTasks,

    /// Convert the whole gold balance into vacation minutes
    SyncCoins,

    /// List Habitica todos carrying the Owl tag
    ImportTodos {
        /// List every todo instead of only tagged ones
        #[arg(long)]
        all: bool,
    },

    /// Mark a Habitica task as done
    Complete {
        /// Habitica task id
        task_id: String,
    },

    /// Store settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage the local task list
    #[command(subcommand)]
    Tasks(TasksCommand),

    /// Show stored settings and balances
    Status,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    /// Store the Habitica user id and API token
    Credentials { user_id: String, api_token: String },

    /// Store the conversion rate in coins per vacation minute
    Rate { rate: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TasksCommand {
    /// Replace the local task list with a JSON array file
    Load { file: PathBuf },

    /// Print the local task list
    Show,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(
                kind = ?error.kind,
                workflow = ?error.workflow,
                message = %error.message,
                "command failed"
            );
            eprintln!("owl: {}", error.message);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "owl=debug,owl_core=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode, CoreError> {
    let store = Arc::new(SqliteStore::new(&cli.database));
    store.migrate_to_latest()?;
    tracing::debug!(database = %store.database_path().display(), "local state ready");

    match cli.command {
        Command::Config(ConfigCommand::Credentials { user_id, api_token }) => {
            store.save_credentials(&user_id, &api_token)?;
            println!("Saved Habitica credentials for {}.", user_id.trim());
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(ConfigCommand::Rate { rate }) => {
            if parse_conversion_rate(Some(rate.as_str())).is_none() {
                return Err(CoreError::new(
                    CoreErrorKind::InvalidInput,
                    format!("'{}' is not a positive number of coins per minute", rate.trim()),
                ));
            }
            store.set_conversion_rate(&rate)?;
            println!("Conversion rate set to {} coins per minute.", rate.trim());
            Ok(ExitCode::SUCCESS)
        }
        Command::Tasks(TasksCommand::Load { file }) => {
            let raw = fs::read_to_string(&file).map_err(|error| {
                CoreError::new(
                    CoreErrorKind::InvalidInput,
                    format!("failed to read '{}': {error}", file.display()),
                )
            })?;
            store.replace_local_tasks(&raw)?;
            let count = store.local_tasks()?.map(|tasks| tasks.len()).unwrap_or(0);
            println!("Loaded {count} local tasks.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Tasks(TasksCommand::Show) => {
            let tasks = store.local_tasks()?.unwrap_or_default();
            if tasks.is_empty() {
                println!("No local tasks.");
            }
            for (index, task) in tasks.iter().enumerate() {
                match task.resolved_text() {
                    Some(text) => println!("{}. {text}", index + 1),
                    None => println!("{}. (no text)", index + 1),
                }
                for subtask in task.subtasks.iter().filter_map(|s| s.resolved_text()) {
                    println!("   - {subtask}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            print_status(store.as_ref())?;
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let services = WorkflowServices::new(
                LocalState::from_store(store),
                Arc::new(UreqTransport::default()),
                Arc::new(TerminalNotifier),
            )
            .with_api_base_url(cli.api_url);
            run_workflow(WorkflowRuntime::new(services), command)
        }
    }
}

fn run_workflow(runtime: WorkflowRuntime, command: Command) -> Result<ExitCode, CoreError> {
    let tokio_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            CoreError::new(
                CoreErrorKind::Internal,
                format!("failed to create tokio runtime: {error}"),
            )
        })?;

    tokio_runtime.block_on(async move {
        let code = match command {
            Command::SyncTasks => sync_exit_code(&runtime.sync_tasks().await?),
            Command::SyncCoins => conversion_exit_code(&runtime.sync_coins().await?),
            Command::ImportTodos { all } => {
                let outcome = runtime
                    .import_todos(move |selection| {
                        let listed = if all { &selection.all } else { &selection.tagged };
                        if listed.is_empty() {
                            println!("No matching todos.");
                        }
                        for task in listed {
                            let done = if task.completed { "x" } else { " " };
                            println!("[{done}] {}\t{}", task.id, task.text);
                        }
                    })
                    .await?;
                import_exit_code(&outcome)
            }
            Command::Complete { task_id } => {
                completion_exit_code(&runtime.complete_task(task_id).await?)
            }
            Command::Config(_) | Command::Tasks(_) | Command::Status => ExitCode::SUCCESS,
        };
        Ok::<_, CoreError>(code)
    })
}

fn print_status(store: &SqliteStore) -> Result<(), CoreError> {
    match store.credentials()? {
        Some(credentials) => println!("Habitica user:   {}", credentials.user_id()),
        None => println!("Habitica user:   not configured"),
    }
    match store.conversion_rate()? {
        Some(rate) if parse_conversion_rate(Some(rate.as_str())).is_some() => {
            println!("Conversion rate: {rate} coins per minute")
        }
        Some(rate) => println!("Conversion rate: invalid ({rate})"),
        None => println!("Conversion rate: not configured"),
    }
    let minutes = parse_accumulator(store.vacation_time()?.as_deref());
    println!("Vacation time:   {minutes:.2} minutes");
    let tasks = store.local_tasks()?.map(|tasks| tasks.len()).unwrap_or(0);
    println!("Local tasks:     {tasks}");
    Ok(())
}

fn sync_exit_code(outcome: &SyncOutcome) -> ExitCode {
    match outcome {
        SyncOutcome::NothingToSync => ExitCode::SUCCESS,
        SyncOutcome::Completed(report) if report.failed.is_empty() => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn conversion_exit_code(outcome: &ConversionOutcome) -> ExitCode {
    match outcome {
        ConversionOutcome::Converted(_) | ConversionOutcome::NoBalance => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn import_exit_code(outcome: &ImportOutcome) -> ExitCode {
    match outcome {
        ImportOutcome::Delivered => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn completion_exit_code(outcome: &CompletionOutcome) -> ExitCode {
    match outcome {
        CompletionOutcome::Completed(_) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use owl_core::workflows::{ConversionSummary, SyncReport, TaskFailure};

    #[test]
    fn parses_workflow_commands() {
        let cli = Cli::try_parse_from(["owl", "sync-coins"]).unwrap();
        assert_eq!(cli.command, Command::SyncCoins);
        assert_eq!(cli.api_url, DEFAULT_API_URL);
        assert!(!cli.verbose);

        let cli = Cli::try_parse_from(["owl", "import-todos", "--all"]).unwrap();
        assert_eq!(cli.command, Command::ImportTodos { all: true });

        let cli = Cli::try_parse_from(["owl", "complete", "abc-123"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Complete {
                task_id: "abc-123".to_string()
            }
        );
    }

    #[test]
    fn parses_config_and_global_options() {
        let cli = Cli::try_parse_from([
            "owl",
            "--database",
            "/tmp/owl-test.sqlite3",
            "--api-url",
            "http://localhost:3000/api/v3/",
            "-v",
            "config",
            "credentials",
            "user-1",
            "token-1",
        ])
        .unwrap();

        assert_eq!(cli.database, PathBuf::from("/tmp/owl-test.sqlite3"));
        assert_eq!(cli.api_url, "http://localhost:3000/api/v3/");
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Config(ConfigCommand::Credentials {
                user_id: "user-1".to_string(),
                api_token: "token-1".to_string(),
            })
        );
    }

    #[test]
    fn missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["owl"]).is_err());
        assert!(Cli::try_parse_from(["owl", "config"]).is_err());
    }

    #[test]
    fn exit_codes_follow_outcomes() {
        assert_eq!(sync_exit_code(&SyncOutcome::NothingToSync), ExitCode::SUCCESS);
        assert_eq!(
            sync_exit_code(&SyncOutcome::MissingCredentials),
            ExitCode::FAILURE
        );

        let mut report = SyncReport::default();
        assert_eq!(
            sync_exit_code(&SyncOutcome::Completed(report.clone())),
            ExitCode::SUCCESS
        );
        report.failed.push(TaskFailure {
            text: "x".to_string(),
            error: CoreError::new(CoreErrorKind::Api, "rejected"),
        });
        assert_eq!(
            sync_exit_code(&SyncOutcome::Completed(report)),
            ExitCode::FAILURE
        );

        let summary = ConversionSummary {
            coins: 1.0,
            minutes_added: 1.0,
            total_minutes: 1.0,
        };
        assert_eq!(
            conversion_exit_code(&ConversionOutcome::Converted(summary)),
            ExitCode::SUCCESS
        );
        assert_eq!(
            conversion_exit_code(&ConversionOutcome::InvalidRate),
            ExitCode::FAILURE
        );
    }
}
