//! rattendance library root.
//! Exposes the CLI parser, the high-level run() function and the attendance
//! components: QR codec and scanner lifecycle, offline queue and sync,
//! server-side attendance and reconciliation services.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod offline;
pub mod rpc;
pub mod scanner;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use tracing_subscriber::EnvFilter;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Roster { .. } => cli::commands::roster::handle(&cli.command, cfg),
        Commands::Qr { .. } => cli::commands::qr::handle(&cli.command),
        Commands::CheckIn { .. } | Commands::CheckOut { .. } => {
            cli::commands::attendance::handle(&cli.command, cfg)
        }
        Commands::ForceCheckout { .. }
        | Commands::ForceAll { .. }
        | Commands::Edit { .. }
        | Commands::Entries { .. }
        | Commands::Summary { .. } => cli::commands::reconcile::handle(&cli.command, cfg),
        Commands::Queue { .. } | Commands::Sync => cli::commands::queue::handle(&cli.command, cfg),
        Commands::Scan { .. } => cli::commands::scan::handle(&cli.command, cfg),
        Commands::Serve { .. } => cli::commands::serve::handle(&cli.command, cfg),
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `--verbose`.
pub fn setup_tracing(verbose: bool) {
    let default = if verbose {
        "rattendance=debug,tower_http=debug"
    } else {
        "rattendance=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    // config is loaded once; `init` creates it
    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }
    if let Some(queue_db) = &cli.queue_db {
        cfg.queue_database = queue_db.clone();
    }

    tracing::debug!(database = %cfg.database, queue = %cfg.queue_database, "configuration loaded");

    dispatch(&cli, &cfg)
}
