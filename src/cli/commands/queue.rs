use super::runtime;
use crate::cli::parser::{Commands, QueueKind};
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::intent_kind::IntentKind;
use crate::offline::{OfflineQueue, SyncCoordinator};
use crate::rpc::client::HttpAttendanceApi;
use crate::ui::messages::{info, success, warning};
use crate::utils::time::format_datetime;
use std::sync::Arc;

fn kinds(k: QueueKind) -> &'static [IntentKind] {
    match k {
        QueueKind::In => &[IntentKind::CheckIn],
        QueueKind::Out => &[IntentKind::CheckOut],
        QueueKind::All => &[IntentKind::CheckIn, IntentKind::CheckOut],
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Queue { list, clear } => {
            let queue = OfflineQueue::open(&cfg.queue_database)?;

            if let Some(k) = clear {
                let mut removed = 0;
                for kind in kinds(*k) {
                    removed += queue.clear(*kind)?;
                }
                warning(format!("Removed {} pending intents", removed));
            }

            let counts = queue.counts()?;
            println!(
                "📥 Offline queue: {} check-ins, {} check-outs ({} total)",
                counts.check_ins, counts.check_outs, counts.total
            );

            if *list {
                for kind in [IntentKind::CheckIn, IntentKind::CheckOut] {
                    for p in queue.list_pending(kind)? {
                        println!(
                            "   #{:<4} {:<9} {:<12} {:<12} {:<10} by {:<10} at {}",
                            p.local_id,
                            kind.ik_as_str(),
                            p.subject_id,
                            p.event_id,
                            p.activity_id.as_deref().unwrap_or("-"),
                            p.scanned_by,
                            format_datetime(&p.enqueued_at)
                        );
                    }
                }
            }
        }

        Commands::Sync => {
            let report = runtime()?.block_on(async {
                let queue = Arc::new(OfflineQueue::open(&cfg.queue_database)?);
                if queue.counts()?.total == 0 {
                    return Ok(None);
                }

                let client = HttpAttendanceApi::from_config(&cfg.server)?;
                let online = match client.health().await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!(error = %e, "health probe failed");
                        false
                    }
                };
                let sync = SyncCoordinator::new(Arc::new(client), queue, online);
                sync.sync_pending().await.map(Some)
            })?;

            let Some(report) = report else {
                info("Nothing to sync.");
                return Ok(());
            };

            if report.skipped {
                warning(format!(
                    "Server {} unreachable, intents kept in the offline queue",
                    cfg.server.endpoint
                ));
                return Ok(());
            }

            if report.success {
                success(format!("Synced {} intents", report.synced_count));
            } else {
                warning(format!(
                    "Synced {} intents, {} still pending",
                    report.synced_count,
                    report.errors.len()
                ));
                for e in &report.errors {
                    println!("   #{} {} {}: {}", e.local_id, e.kind, e.subject_id, e.message);
                }
            }
        }

        _ => {}
    }

    Ok(())
}
