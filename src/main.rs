//! waymark: resumable demo job over a file of integer ids.
//!
//! Resumes after the id stored in the exit checkpoint, logs even ids as
//! successes and odd ids as failures, and checkpoints after every record.
//! SIGINT/SIGTERM stop the run at the next record with a summary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use waymark::codec::leading_integer;
use waymark::error::Error;
use waymark::shutdown::interrupt_token;
use waymark::{Config, ExitMode, Logger};

/// Resumable record processing demo.
#[derive(Parser, Debug)]
#[command(name = "waymark")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data file to process.
    data_file: PathBuf,

    /// Path to a YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the checkpoint logs (overrides the config file).
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Checkpoint log prefix (overrides the config file).
    #[arg(long)]
    prefix: Option<String>,

    /// Record encoding: integer, structured or flat.
    #[arg(long)]
    data_kind: Option<String>,

    /// Redirect stdout and stderr to the configured file.
    #[arg(long)]
    redirect: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// How a run ended.
enum RunEnd {
    Completed,
    Interrupted,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let mut logger = match Logger::new(config) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if logger.config().redirect
        && let Err(e) = logger.redirect_output()
    {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let interrupt = interrupt_token();

    match run(&mut logger, &args, &interrupt).await {
        Ok(RunEnd::Completed) => {
            if logger.config().redirect {
                print!("{}", logger.diagnostics());
            }
            logger.display_summary(Some("demo"));
            logger.close();
            ExitCode::SUCCESS
        }
        Ok(RunEnd::Interrupted) => {
            logger.handle_interrupt();
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", snafu::Report::from_error(e));
            print!("{}", logger.diagnostics());
            logger.display_summary(Some("demo"));
            ExitCode::FAILURE
        }
    }
}

/// Build configuration from the config file and command-line overrides.
fn build_config(args: &Args) -> Result<Config, String> {
    let mut config = match (&args.config, &args.log_dir, &args.prefix) {
        (Some(path), _, _) => Config::from_file(path)
            .map_err(|e| snafu::Report::from_error(e).to_string())?,
        (None, Some(log_dir), Some(prefix)) => {
            Config::new(log_dir.clone(), prefix.clone(), "integer")
        }
        _ => return Err("either --config or both --log-dir and --prefix are required".into()),
    };

    if let Some(log_dir) = &args.log_dir {
        config.log_dir = log_dir.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(kind) = &args.data_kind {
        config.data_kind = kind.clone();
    }
    config.redirect |= args.redirect;
    Ok(config)
}

async fn run(
    logger: &mut Logger,
    args: &Args,
    interrupt: &CancellationToken,
) -> Result<RunEnd, Error> {
    let start = logger
        .last_exit_data()?
        .map(|raw| leading_integer(&raw))
        .unwrap_or(1);
    info!("Resuming after id {}", start);

    let mode = logger.config().read.mode;
    loop {
        let batch = logger.read_data_file(&args.data_file, mode);
        if batch.is_empty() {
            break;
        }

        for record in batch {
            if interrupt.is_cancelled() {
                return Ok(RunEnd::Interrupted);
            }

            let id = record.as_integer();
            if id <= start {
                debug!("Skipping already processed id {}", id);
                continue;
            }
            if id % 2 == 0 {
                logger.record_success(&record)?;
            } else {
                logger.record_failure(&record)?;
            }
            logger.record_exit(&record, ExitMode::Marker)?;
        }

        tokio::task::yield_now().await;
    }

    if interrupt.is_cancelled() {
        return Ok(RunEnd::Interrupted);
    }
    Ok(RunEnd::Completed)
}
