//! Vocaotology splash-screen preloader.
//!
//! Loads the assets the game needs before its first screen, printing the
//! same progress a splash screen would show. A failed `--required` asset
//! aborts startup; anything else is logged and skipped.

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use exn::ResultExt;
use futures::StreamExt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use rust_embed::Embed;
use tracing_subscriber::EnvFilter;
use voca_assets::error::ErrorKind as AssetErrorKind;
use voca_assets::{AssetKey, AssetKind, BatchReport, LoadCoordinator, Loader, ProgressEvent};
use voca_config::Config;
use voca_storage::backend::{EmbeddedStore, LocalStore};
use voca_storage::{AssetStore, StoreHandle};

type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open the asset store")]
    Store,
    #[display("could not start the asset loader")]
    Loader,
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Directory holding the packaged assets
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Read assets from the bundle compiled into this executable
    #[arg(long, global = true, conflicts_with = "root")]
    bundled: bool,
    /// Number of loader threads
    #[arg(long, global = true, value_name = "N")]
    workers: Option<NonZeroUsize>,
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load assets as one batch and report progress
    Preload {
        /// Asset that must load for startup to continue (repeatable)
        #[arg(long = "required", value_name = "NAME")]
        required: Vec<String>,
        /// Assets that may be missing
        #[arg(value_name = "NAME")]
        optional: Vec<String>,
    },
    /// List packaged assets with their kind
    List { prefix: Option<PathBuf> },
}

/// Resources compiled into the executable for `--bundled`.
#[derive(Embed)]
#[folder = "resources/"]
struct Bundled;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).compact().init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(root) = cli.root {
        config.assets.root = Some(root);
    }
    if let Some(workers) = cli.workers {
        config.loader.workers = Some(workers.get());
    }
    let store: StoreHandle = if cli.bundled {
        tracing::debug!("using the bundled asset store");
        Arc::new(EmbeddedStore::<Bundled>::new("bundled"))
    } else {
        open_store(&config)?
    };
    match cli.command {
        Command::Preload { required, optional } => preload(store, &config, &required, &optional),
        Command::List { prefix } => list(store, prefix.as_deref()),
    }
}

fn open_store(config: &Config) -> Result<StoreHandle> {
    let root = match &config.assets.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().or_raise(|| ErrorKind::Store)?,
    };
    let root = std::fs::canonicalize(&root).or_raise(|| ErrorKind::Store)?;
    tracing::debug!(root = %root.display(), "opening asset store");
    let store = LocalStore::new("resources", root).or_raise(|| ErrorKind::Store)?;
    Ok(Arc::new(store))
}

fn infer_keys(names: &[String]) -> Result<Vec<AssetKey>> {
    names
        .iter()
        .map(|name| AssetKey::infer(name).or_raise(|| ErrorKind::Usage(format!("cannot tell what kind of asset {name:?} is"))))
        .collect()
}

fn preload(store: StoreHandle, config: &Config, required: &[String], optional: &[String]) -> Result<ExitCode> {
    let required = infer_keys(required)?;
    let optional = infer_keys(optional)?;
    if required.is_empty() && optional.is_empty() {
        exn::bail!(ErrorKind::Usage("nothing to preload".to_string()));
    }

    let loader = Loader::new(store, config.layout());
    let coordinator = LoadCoordinator::new(loader, &config.pool()).or_raise(|| ErrorKind::Loader)?;
    let mut batch = coordinator.request_batch(required.iter().chain(&optional).cloned());
    while let Some(event) = batch.blocking_next_event() {
        match event {
            ProgressEvent::Settled { progress, success, .. } => {
                let percent = (progress.fraction() * 100.0).round() as u32;
                let status = if success { "ok" } else { "failed" };
                println!("[{percent:>3}%] {} ({status})", progress.message());
            },
            ProgressEvent::Complete(progress) => {
                println!("loaded {} of {} assets", progress.completed - progress.failed, progress.total);
            },
        }
    }

    let report = batch.blocking_wait();
    let code = check_required(&report, &required);
    coordinator.shutdown();
    Ok(code)
}

fn check_required(report: &BatchReport, required: &[AssetKey]) -> ExitCode {
    let mut code = ExitCode::SUCCESS;
    for (key, err) in report.failed() {
        let kind: &AssetErrorKind = err;
        if required.contains(key) {
            tracing::error!(%key, error = %kind, "required asset unavailable");
            code = ExitCode::FAILURE;
        } else {
            tracing::warn!(%key, error = %kind, "optional asset unavailable, continuing");
        }
    }
    code
}

fn list(store: StoreHandle, prefix: Option<&Path>) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().or_raise(|| ErrorKind::Store)?;
    runtime.block_on(async {
        let mut files = store.list_stream(prefix);
        while let Some(file) = files.next().await {
            let file = file.or_raise(|| ErrorKind::Store)?;
            let kind = file.path.to_str().and_then(AssetKind::from_name).map_or("-", |kind| kind.as_str());
            println!("{kind:<6} {:>10} {}", file.size, file.path.display());
        }
        Ok::<_, exn::Exn<ErrorKind>>(ExitCode::SUCCESS)
    })
}
