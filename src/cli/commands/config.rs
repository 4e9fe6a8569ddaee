use crate::cli::parser::Commands;
use crate::config::Config;
use crate::config::migrate::{migrate_config_file, missing_keys};
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{info, success, warning};
use std::process::Command;

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        check,
        migrate,
        edit_config,
        editor,
    } = cmd
    {
        let path = Config::config_file();

        // ---- PRINT CONFIG ----
        if *print_config {
            println!("📄 Current configuration:\n");
            let yaml = serde_yaml::to_string(cfg).map_err(|e| AppError::Config(e.to_string()))?;
            println!("{}", yaml);
        }

        // ---- CHECK ----
        if *check {
            if !path.exists() {
                warning(format!("No configuration file at {}", path.display()));
            } else {
                let missing = missing_keys(&path)?;
                if missing.is_empty() {
                    success("Configuration file is complete.");
                } else {
                    warning(format!("Missing keys: {}", missing.join(", ")));
                    info("Run `rattendance config --migrate` to add them with defaults.");
                }
            }
        }

        // ---- MIGRATE ----
        if *migrate {
            if !path.exists() {
                warning(format!("No configuration file at {}", path.display()));
            } else {
                let added = migrate_config_file(&path)?;
                if added.is_empty() {
                    success("Configuration already up to date.");
                } else {
                    success(format!("Added keys: {}", added.join(", ")));
                }
            }
        }

        // ---- EDIT CONFIG ----
        if *edit_config {
            let default_editor = std::env::var("EDITOR")
                .or_else(|_| std::env::var("VISUAL"))
                .unwrap_or_else(|_| {
                    if cfg!(target_os = "windows") {
                        "notepad".to_string()
                    } else {
                        "nano".to_string()
                    }
                });

            let editor_to_use = editor.clone().unwrap_or_else(|| default_editor.clone());

            match Command::new(&editor_to_use).arg(&path).status() {
                Ok(s) if s.success() => {
                    success(format!(
                        "Configuration file edited successfully using '{}'",
                        editor_to_use
                    ));
                }
                Ok(_) | Err(_) => {
                    warning(format!(
                        "Editor '{}' not available, falling back to '{}'",
                        editor_to_use, default_editor
                    ));

                    match Command::new(&default_editor).arg(&path).status() {
                        Ok(s) if s.success() => success(format!(
                            "Configuration file edited successfully using fallback '{}'",
                            default_editor
                        )),
                        Ok(_) | Err(_) => {
                            return Err(AppError::Config(format!(
                                "failed to edit configuration file using '{}'",
                                default_editor
                            )));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
