use super::attendance::report_submission;
use super::{api, coordinator, operator, runtime};
use crate::cli::parser::{Commands, ScanMode};
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::intent_kind::IntentKind;
use crate::models::pending_intent::NewIntent;
use crate::offline::sync::deliver;
use crate::scanner::camera::CaptureConfig;
use crate::scanner::line_camera::LineCameraBackend;
use crate::scanner::{ScanEvent, ScannerController};
use crate::ui::messages::{error, info, warning};
use std::sync::Arc;
use std::time::Duration;

const TARGET: &str = "stdin";

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Scan {
        mode,
        activity,
        event,
        scanned_by,
        remote,
    } = cmd
    else {
        return Ok(());
    };

    let kind = match mode {
        ScanMode::In => IntentKind::CheckIn,
        ScanMode::Out => IntentKind::CheckOut,
    };
    let operator = operator(cfg, scanned_by);

    runtime()?.block_on(async {
        let sync = if *remote { Some(coordinator(cfg)?) } else { None };
        let local = if *remote { None } else { Some(api(cfg, false)?) };

        let (scanner, mut events) = ScannerController::new(
            Arc::new(LineCameraBackend::stdin()),
            CaptureConfig::from(&cfg.scanner),
        );
        tokio::time::sleep(Duration::from_millis(cfg.scanner.start_delay_ms)).await;
        scanner.start(TARGET).await?;
        info(format!("Scanning badges for {} (one payload per line, Ctrl-D to end)", kind));

        loop {
            let next = tokio::select! {
                ev = events.recv() => ev,
                _ = tokio::signal::ctrl_c() => None,
            };

            let Some(ev) = next else { break };
            match ev {
                ScanEvent::Success(payload) => {
                    if let Some(only) = event
                        && *only != payload.event_id
                    {
                        warning(format!(
                            "Badge for event {} ignored (scanning {})",
                            payload.event_id, only
                        ));
                        continue;
                    }

                    let intent = NewIntent::new(
                        payload.subject_id.as_str(),
                        payload.event_id.as_str(),
                        activity.clone(),
                        operator.as_str(),
                    );
                    let outcome = match (&local, &sync) {
                        (Some(api), _) => deliver(api.as_ref(), kind, &intent).await,
                        (None, Some(sync)) => sync.submit(kind, intent).await,
                        (None, None) => continue,
                    };
                    match outcome {
                        Ok(sub) => report_submission(kind, &sub),
                        Err(e) => error(e),
                    }
                }
                ScanEvent::Error(msg) => warning(msg),
                ScanEvent::FrameError(msg) => tracing::debug!(%msg, "frame error"),
                ScanEvent::Closed => break,
            }

            if let Some(err) = scanner.status().error {
                error(&err);
                scanner.clear_error();
            }
        }

        scanner.dispose().await;
        Ok(())
    })
}
