use super::open_db;
use crate::cli::parser::{Commands, RosterAction};
use crate::config::Config;
use crate::core::roster::RosterLogic;
use crate::db::queries::{list_events, list_students};
use crate::errors::AppResult;
use crate::ui::messages::{info, success};
use std::path::Path;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Roster { action } = cmd else {
        return Ok(());
    };
    let mut pool = open_db(cfg)?;

    match action {
        RosterAction::Import { file } => {
            let stats = RosterLogic::import_file(&mut pool, Path::new(file))?;
            success(format!(
                "Imported {} students, {} events, {} activities",
                stats.students, stats.events, stats.activities
            ));
        }
        RosterAction::Student { id, name } => {
            RosterLogic::add_student(&mut pool, id, name)?;
            success(format!("Student {} ({}) saved", id, name));
        }
        RosterAction::Event {
            id,
            name,
            start,
            end,
        } => {
            RosterLogic::add_event(&mut pool, id, name, start, end)?;
            success(format!("Event {} ({}) saved", id, name));
        }
        RosterAction::Activity {
            event,
            id,
            name,
            start,
            end,
        } => {
            RosterLogic::add_activity(&mut pool, event, id, name, start, end)?;
            success(format!("Activity {}/{} ({}) saved", event, id, name));
        }
        RosterAction::List => {
            let students = list_students(&pool.conn)?;
            let events = list_events(&pool.conn)?;
            if students.is_empty() && events.is_empty() {
                info("Roster is empty.");
                return Ok(());
            }

            println!("👥 Students:");
            for s in &students {
                println!("   {:<12} {}", s.id, s.name);
            }
            println!("\n📅 Events:");
            for ev in &events {
                println!(
                    "   {:<12} {} ({}-{})",
                    ev.id,
                    ev.name,
                    ev.start_time.format("%H:%M"),
                    ev.end_time.format("%H:%M")
                );
                for a in &ev.activities {
                    println!(
                        "      └ {:<10} {} ({}-{})",
                        a.id,
                        a.name,
                        a.start_time.format("%H:%M"),
                        a.end_time.format("%H:%M")
                    );
                }
            }
        }
    }

    Ok(())
}
