use super::{api, coordinator, operator, runtime};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::attendance::{CheckInResponse, CheckOutResponse};
use crate::models::intent_kind::IntentKind;
use crate::models::pending_intent::NewIntent;
use crate::models::time_entry::{FlagSet, flags_to_db};
use crate::offline::Submission;
use crate::offline::sync::deliver;
use crate::ui::messages::{queued, success, warning};

fn describe_flags(flags: &FlagSet) -> String {
    if flags.is_empty() {
        String::new()
    } else {
        format!(" [flagged: {}]", flags_to_db(flags))
    }
}

pub(crate) fn report_check_in(resp: &CheckInResponse) {
    if resp.success {
        success(format!(
            "{} checked in (entry {}){}",
            resp.student_name.as_deref().unwrap_or("?"),
            resp.entry_id.unwrap_or_default(),
            describe_flags(&resp.flags)
        ));
    } else {
        warning(resp.error.as_deref().unwrap_or("Check-in rejected"));
    }
}

pub(crate) fn report_check_out(resp: &CheckOutResponse) {
    if resp.success {
        success(format!(
            "{} checked out: {:.1} h{}",
            resp.student_name.as_deref().unwrap_or("?"),
            resp.hours_worked.unwrap_or_default(),
            describe_flags(&resp.flags)
        ));
    } else {
        warning(resp.error.as_deref().unwrap_or("Check-out rejected"));
    }
}

pub(crate) fn report_submission(kind: IntentKind, sub: &Submission) {
    match sub {
        Submission::CheckedIn(resp) => report_check_in(resp),
        Submission::CheckedOut(resp) => report_check_out(resp),
        Submission::Queued(id) => queued(format!(
            "Server unreachable: {} saved offline (#{}), run `rattendance sync` later",
            kind, id
        )),
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let (kind, intent, remote) = match cmd {
        Commands::CheckIn {
            student,
            event,
            activity,
            scanned_by,
            remote,
        } => (
            IntentKind::CheckIn,
            NewIntent::new(
                student.as_str(),
                event.as_str(),
                Some(activity.clone()),
                operator(cfg, scanned_by),
            ),
            *remote,
        ),
        Commands::CheckOut {
            student,
            event,
            scanned_by,
            remote,
        } => (
            IntentKind::CheckOut,
            NewIntent::new(
                student.as_str(),
                event.as_str(),
                None,
                operator(cfg, scanned_by),
            ),
            *remote,
        ),
        _ => return Ok(()),
    };

    let rt = runtime()?;
    rt.block_on(async {
        let submission = if remote {
            coordinator(cfg)?.submit(kind, intent).await?
        } else {
            deliver(api(cfg, false)?.as_ref(), kind, &intent).await?
        };
        report_submission(kind, &submission);
        Ok(())
    })
}
