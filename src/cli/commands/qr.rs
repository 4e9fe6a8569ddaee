use crate::cli::parser::{Commands, QrAction};
use crate::errors::{AppError, AppResult};
use crate::scanner::payload::{decode, encode};
use crate::ui::messages::success;

pub fn handle(cmd: &Commands) -> AppResult<()> {
    let Commands::Qr { action } = cmd else {
        return Ok(());
    };

    match action {
        QrAction::Encode { student, event } => {
            println!("{}", encode(student, event)?);
        }
        QrAction::Decode { payload } => {
            let decoded = decode(payload);
            match decoded.error {
                None => success(format!(
                    "Valid badge: student {} / event {}",
                    decoded.subject_id, decoded.event_id
                )),
                Some(err) => return Err(AppError::InvalidPayload(err.to_string())),
            }
        }
    }

    Ok(())
}
