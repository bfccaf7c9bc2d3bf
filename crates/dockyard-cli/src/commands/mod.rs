//! CLI command definitions and dispatch.

pub mod images;
pub mod info;
pub mod inspect;
pub mod port;
pub mod ps;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use dockyard_common::config::DockyardConfig;
use dockyard_common::constants::{APP_NAME, CONFIG_FILE, DATA_DIR_ENV};
use dockyard_store::repositories::Repositories;
use dockyard_store::store::RecordStore;

/// Dockyard: inspect container and image records.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Data directory holding the records.
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to `dockyard.json` in the data directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List containers.
    Ps(ps::PsArgs),
    /// List images.
    Images(images::ImagesArgs),
    /// Show the full record of a container or image.
    Inspect(inspect::InspectArgs),
    /// Show the public ports of a container.
    Port(port::PortArgs),
    /// Show daemon-wide information.
    Info(info::InfoArgs),
}

/// Everything a command needs to read records.
#[derive(Debug)]
pub struct Context {
    /// Effective configuration.
    pub config: DockyardConfig,
    /// Record store under the configured data directory.
    pub store: RecordStore,
    /// Print JSON instead of tables.
    pub json: bool,
}

impl Context {
    /// Resolves the configuration and opens the store.
    ///
    /// `--data-dir` wins over the configuration file, which wins over the
    /// built-in default.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the store
    /// cannot be opened.
    pub fn open(data_dir: Option<PathBuf>, config: Option<PathBuf>, json: bool) -> anyhow::Result<Self> {
        let base = data_dir
            .clone()
            .unwrap_or_else(|| dockyard_common::constants::data_dir().clone());
        let config_path = config.unwrap_or_else(|| base.join(CONFIG_FILE));
        let mut config = DockyardConfig::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        let store = RecordStore::open(config.data_dir.clone())
            .with_context(|| format!("opening {}", config.data_dir.display()))?;
        tracing::debug!(data_dir = %config.data_dir.display(), driver = %config.driver, "context ready");
        Ok(Self { config, store, json })
    }

    /// Loads the repository tag index.
    ///
    /// # Errors
    ///
    /// Returns an error if `repositories.json` exists but is unreadable.
    pub fn repositories(&self) -> anyhow::Result<Repositories> {
        Ok(Repositories::load(self.store.root())?)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    let ctx = Context::open(cli.data_dir, cli.config, cli.json)?;
    match cli.command {
        Command::Ps(args) => ps::execute(&ctx, &args, out),
        Command::Images(args) => images::execute(&ctx, &args, out),
        Command::Inspect(args) => inspect::execute(&ctx, &args, out),
        Command::Port(args) => port::execute(&ctx, &args, out),
        Command::Info(args) => info::execute(&ctx, &args, out),
    }
}
