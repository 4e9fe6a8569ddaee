//! Configuration file upgrades: older files lack keys added in later
//! releases. Missing keys are filled from defaults, existing values are
//! never overwritten.

use super::Config;
use crate::errors::{AppError, AppResult};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

fn defaults_as_value() -> AppResult<Value> {
    serde_yaml::to_value(Config::default()).map_err(|e| AppError::Config(e.to_string()))
}

fn read_mapping(path: &Path) -> AppResult<Mapping> {
    let content = fs::read_to_string(path)?;
    let value: Value =
        serde_yaml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))?;
    match value {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(AppError::Config(format!(
            "{}: top level is not a mapping",
            path.display()
        ))),
    }
}

/// Recursively add keys of `defaults` missing from `target`.
/// Returns the dotted names of the keys that were added.
fn merge_missing(target: &mut Mapping, defaults: &Mapping, prefix: &str, added: &mut Vec<String>) {
    for (k, dv) in defaults {
        let name = match k.as_str() {
            Some(s) if prefix.is_empty() => s.to_string(),
            Some(s) => format!("{}.{}", prefix, s),
            None => continue,
        };

        match target.get_mut(k) {
            None => {
                target.insert(k.clone(), dv.clone());
                added.push(name);
            }
            Some(Value::Mapping(inner)) => {
                if let Value::Mapping(dinner) = dv {
                    merge_missing(inner, dinner, &name, added);
                }
            }
            Some(_) => {}
        }
    }
}

/// Keys present in the default configuration but absent from the file.
pub fn missing_keys(path: &Path) -> AppResult<Vec<String>> {
    let mut current = read_mapping(path)?;
    let mut added = Vec::new();
    if let Value::Mapping(defaults) = defaults_as_value()? {
        merge_missing(&mut current, &defaults, "", &mut added);
    }
    Ok(added)
}

/// Fill missing keys in place. Returns the keys written (empty → no change).
pub fn migrate_config_file(path: &Path) -> AppResult<Vec<String>> {
    let mut current = read_mapping(path)?;
    let mut added = Vec::new();
    if let Value::Mapping(defaults) = defaults_as_value()? {
        merge_missing(&mut current, &defaults, "", &mut added);
    }

    if !added.is_empty() {
        let yaml = serde_yaml::to_string(&Value::Mapping(current))
            .map_err(|_| AppError::ConfigSave)?;
        fs::write(path, yaml)?;
        tracing::info!(keys = ?added, "configuration file upgraded");
    }

    Ok(added)
}
