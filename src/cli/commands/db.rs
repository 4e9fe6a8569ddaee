use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::migrate::{applied_count, known_migrations, run_pending_migrations};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, RED, RESET};

fn print_db_info(pool: &DbPool, path: &str) -> AppResult<()> {
    let count = |table: &str| -> AppResult<i64> {
        Ok(pool
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
    };

    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("🗄️  Database   : {}", path);
    println!("   Size       : {} KiB", size / 1024);
    println!(
        "   Migrations : {}/{}",
        applied_count(&pool.conn)?,
        known_migrations()
    );
    println!("   Students   : {}", count("students")?);
    println!("   Events     : {}", count("events")?);
    println!("   Activities : {}", count("activities")?);
    println!("   Entries    : {}", count("time_entries")?);
    println!(
        "   Open       : {}",
        pool.conn.query_row(
            "SELECT COUNT(*) FROM time_entries WHERE check_out_time IS NULL",
            [],
            |r| r.get::<_, i64>(0)
        )?
    );
    println!("   Changes    : {}\n", count("change_log")?);
    Ok(())
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        vacuum,
        info,
    } = cmd
    {
        let pool = DbPool::new(&cfg.database)?;

        //
        // 1) MIGRATE
        //
        if *migrate {
            println!("{}▶ Running migrations…{}", CYAN, RESET);
            run_pending_migrations(&pool.conn)?;
            println!("{}✔ Migration completed.{}\n", GREEN, RESET);
        }

        //
        // 2) INFO
        //
        if *info {
            run_pending_migrations(&pool.conn)?;
            print_db_info(&pool, &cfg.database)?;
        }

        //
        // 3) CHECK
        //
        if *check {
            println!("{}▶ Running integrity check…{}", CYAN, RESET);

            let integrity: String = pool
                .conn
                .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

            if integrity == "ok" {
                println!("{}✔ Integrity check passed.{}\n", GREEN, RESET);
            } else {
                println!("{}✘ Integrity check failed:{} {}\n", RED, RESET, integrity);
            }
        }

        //
        // 4) VACUUM
        //
        if *vacuum {
            println!("{}▶ Running VACUUM…{}", CYAN, RESET);
            pool.conn.execute_batch("VACUUM;")?;
            println!("{}✔ Vacuum completed.{}\n", GREEN, RESET);
        }
    }

    Ok(())
}
