use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use imagerelay::config::Settings;
use imagerelay::{logging, pipeline};

const DEFAULT_CONFIG: &str = "config.ini";

#[derive(Parser, Debug)]
#[command(
    name = "imagerelay",
    about = "Post images from RSS feeds to a Telegram chat"
)]
struct Args {
    /// Path to configuration file. Relative paths are resolved against the
    /// executable's directory, not the working directory (default: config.ini)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Resolve the config path against the executable's directory.
fn config_path(args: &Args) -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let dir = exe
        .parent()
        .context("Executable path has no parent directory")?;
    Ok(resolve_config(args.config.as_deref(), dir))
}

/// `explicit` if absolute, otherwise joined onto `exe_dir`; `config.ini`
/// when no path was given.
fn resolve_config(explicit: Option<&Path>, exe_dir: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => exe_dir.join(path),
        None => exe_dir.join(DEFAULT_CONFIG),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config_path = config_path(args)?;
    let settings = Settings::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    let _log = logging::init(&settings.log_file)?;

    let result = relay(&settings);
    if let Err(e) = &result {
        tracing::error!("Fatal error: {e:#}");
    }
    result
}

fn relay(settings: &Settings) -> Result<()> {
    // Single logical thread: the log subscriber is installed for this thread only.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(pipeline::run(settings))?;
    Ok(())
}
