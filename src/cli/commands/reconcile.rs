use super::{api, open_db, runtime};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::reconcile::ReconcileLogic;
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{
    EditEntryRequest, ForceAllRequest, ForceCheckOutRequest, SummaryRequest,
};
use crate::models::time_entry::{TimeEntry, flags_to_db};
use crate::ui::messages::{info, success, warning};
use crate::utils::colors::{RESET, color_for_entry, colorize_optional};
use crate::utils::date::{date_str, parse_date_or_today};
use crate::utils::time::format_datetime;

fn print_entries(event: &str, day: &str, entries: &[TimeEntry]) {
    if entries.is_empty() {
        info(format!("No entries for {} on {}", event, day));
        return;
    }

    println!("📋 Entries for {} on {}:\n", event, day);
    println!(
        "{:>5}  {:<12} {:<10} {:<19}  {:<19}  {:>5}  {}",
        "ID", "STUDENT", "ACTIVITY", "IN", "OUT", "HOURS", "FLAGS"
    );
    for e in entries {
        let color = color_for_entry(!e.flags.is_empty(), e.is_open());
        let out = e.check_out_time.as_ref().map(format_datetime);
        let hours = e
            .hours_worked
            .map(|h| format!("{:.1}", h))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}{:>5}  {:<12} {:<10} {:<19}{}  {:<19}  {:>5}  {}",
            color,
            e.id,
            e.student_id,
            e.activity_id,
            format_datetime(&e.check_in_time),
            RESET,
            colorize_optional(out.as_deref()),
            hours,
            flags_to_db(&e.flags)
        );
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let actor = cfg.actor.clone();

    match cmd {
        Commands::ForceCheckout {
            entry_id,
            at,
            reason,
            remote,
        } => {
            let req = ForceCheckOutRequest {
                entry_id: *entry_id,
                check_out_time: at.clone(),
                reason: reason.clone(),
            };
            let resp = runtime()?
                .block_on(async { api(cfg, *remote)?.force_check_out(&actor, req).await })?;
            if resp.success {
                success(format!(
                    "{} checked out by {}: {:.1} h",
                    resp.student_name, actor, resp.hours_worked
                ));
            } else {
                warning(format!(
                    "Entry {} ({}) left unchanged: {}",
                    entry_id,
                    resp.student_name,
                    resp.error.as_deref().unwrap_or("check-out rejected")
                ));
            }
        }

        Commands::ForceAll {
            event,
            date,
            reason,
            remote,
        } => {
            let day = parse_date_or_today(date.as_deref())?;
            let req = ForceAllRequest {
                event_id: event.clone(),
                date: date_str(&day),
                reason: reason.clone().unwrap_or_default(),
            };
            let resp = runtime()?
                .block_on(async { api(cfg, *remote)?.force_all_check_out(&actor, req).await })?;
            success(format!(
                "{} open entries closed for {} on {}",
                resp.checked_out_count,
                event,
                date_str(&day)
            ));
        }

        Commands::Edit {
            entry_id,
            check_in,
            check_out,
            reason,
        } => {
            let mut pool = open_db(cfg)?;
            let logic = ReconcileLogic::new(cfg.flag_policy());
            let entry = logic.edit_entry(
                &mut pool,
                &EditEntryRequest {
                    entry_id: *entry_id,
                    check_in_time: check_in.clone(),
                    check_out_time: check_out.clone(),
                    reason: reason.clone(),
                },
                &actor,
            )?;
            success(format!(
                "Entry {} updated: {} → {} ({} h)",
                entry.id,
                format_datetime(&entry.check_in_time),
                entry
                    .check_out_time
                    .as_ref()
                    .map(format_datetime)
                    .unwrap_or_else(|| "open".to_string()),
                entry
                    .hours_worked
                    .map(|h| format!("{:.1}", h))
                    .unwrap_or_else(|| "-".to_string())
            ));
        }

        Commands::Entries {
            event,
            date,
            changes,
            json,
        } => {
            let mut pool = open_db(cfg)?;
            let logic = ReconcileLogic::new(cfg.flag_policy());

            if let Some(id) = changes {
                let records = logic.change_log(&mut pool, *id)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&records).map_err(|e| AppError::Other(e.to_string()))?);
                } else if records.is_empty() {
                    info(format!("No changes recorded for entry {}", id));
                } else {
                    println!("🧾 Change log of entry {}:\n", id);
                    for r in &records {
                        println!(
                            "   {}  {:<15} by {:<12} {} ({})",
                            format_datetime(&r.timestamp),
                            r.change_type.to_db_str(),
                            r.actor,
                            r.reason,
                            r.details
                        );
                    }
                }
                return Ok(());
            }

            let event = event
                .as_deref()
                .ok_or_else(|| AppError::MissingFields("event".to_string()))?;
            let day = parse_date_or_today(date.as_deref())?;
            let entries = logic.list_daily_entries(&mut pool, event, &day)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&entries).map_err(|e| AppError::Other(e.to_string()))?);
            } else {
                print_entries(event, &date_str(&day), &entries);
            }
        }

        Commands::Summary {
            event,
            date,
            remote,
        } => {
            let day = parse_date_or_today(date.as_deref())?;
            let req = SummaryRequest {
                event_id: event.clone(),
                date: date_str(&day),
            };
            let s = runtime()?
                .block_on(async { api(cfg, *remote)?.get_daily_review_summary(&actor, req).await })?
                .summary;

            println!("📊 Review summary for {} on {}:", event, date_str(&day));
            println!("   Total       : {}", s.total);
            println!("   Flagged     : {}", s.flagged);
            println!("   No checkout : {}", s.no_checkout);
            println!("   Modified    : {}", s.modified);
        }

        _ => {}
    }

    Ok(())
}
