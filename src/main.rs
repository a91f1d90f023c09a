//! plistwire binary: CLI parsing, logging setup, and mode dispatch.
//!
//! Runs either the framed bridge over stdin/stdout (default) or a one-shot
//! transcode of stdin (`-j` / `-p`). Diagnostics go to stderr or to the
//! file named by `--log-file`; stdout belongs exclusively to the framed
//! protocol.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use plistwire::backend::EchoBackend;
use plistwire::standalone::{run_standalone, ParseMode};
use plistwire::Bridge;

#[derive(Parser, Debug)]
#[command(name = "plistwire", version, about = "plist <-> JSON stdio bridge")]
struct Cli {
    /// Parse JSON from stdin, print plist, and exit.
    #[arg(short = 'j', long = "json", conflicts_with = "plist")]
    json: bool,

    /// Parse plist from stdin, print JSON, and exit.
    #[arg(short = 'p', long = "plist")]
    plist: bool,

    /// Log to FILE instead of stderr.
    #[arg(short = 'l', long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Verbosity level (0 = errors only, 5 = trace).
    #[arg(short = 'v', long = "verbosity", default_value_t = 5)]
    verbosity: u8,
}

fn init_logging(cli: &Cli) -> std::io::Result<()> {
    let level = match cli.verbosity {
        0 => "error",
        1 => "warn",
        2 | 3 => "info",
        4 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plistwire={level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            builder.with_writer(std::sync::Mutex::new(file)).init();
        }
        None => {
            builder.with_writer(std::io::stderr).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli) {
        eprintln!("plistwire: cannot open log file: {err}");
        return std::process::ExitCode::FAILURE;
    }

    let result = if cli.json {
        run_standalone(ParseMode::JsonToPlist, tokio::io::stdin(), tokio::io::stdout()).await
    } else if cli.plist {
        run_standalone(ParseMode::PlistToJson, tokio::io::stdin(), tokio::io::stdout()).await
    } else {
        run_bridge().await
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "exiting");
            std::process::ExitCode::FAILURE
        }
    }
}

/// Run the framed bridge until end of input or SIGHUP.
///
/// The editor sends HUP when its associated buffer is killed; it is a
/// graceful-stop request, not a kill.
async fn run_bridge() -> plistwire::Result<()> {
    let backend = Arc::new(EchoBackend::new());
    let bridge = Bridge::builder(backend).start(tokio::io::stdout());

    #[cfg(unix)]
    {
        let hangup = bridge.hangup_handle();
        let mut stream =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;
        tokio::spawn(async move {
            if stream.recv().await.is_some() {
                hangup.hangup();
            }
        });
    }

    bridge.run(tokio::io::stdin()).await
}
