use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::log::ttlog_quiet;
use crate::db::open_initialized;
use crate::errors::AppResult;
use crate::offline::OfflineQueue;

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file (skipped in test mode)
///  - the server SQLite database with all pending migrations
///  - the offline queue database
pub fn handle(cli: &Cli) -> AppResult<()> {
    let mut cfg = Config::init_all(cli.db.clone(), cli.test)?;
    if let Some(q) = &cli.queue_db {
        cfg.queue_database = q.clone();
    }

    println!("⚙️  Initializing rattendance…");
    println!("📄 Config file : {}", Config::config_file().display());
    println!("🗄️  Database   : {}", &cfg.database);
    println!("📥 Queue      : {}", &cfg.queue_database);

    let pool = open_initialized(&cfg.database)?;
    println!("✅ Database initialized at {}", &cfg.database);

    OfflineQueue::open(&cfg.queue_database)?;

    ttlog_quiet(
        &pool.conn,
        "init",
        "Database initialized",
        &format!("Database initialized at {}", &cfg.database),
    );

    println!("🎉 rattendance initialization completed!");
    Ok(())
}
