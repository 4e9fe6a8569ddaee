use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub mod migrate;

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "RATTENDANCE_HOME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerConfig {
    /// Decode attempts per second requested from the camera primitive
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Side of the square detection box, in pixels
    #[serde(default = "default_detection_box")]
    pub detection_box: u32,
    /// Delay before a deferred scanner start, in milliseconds
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Address the `serve` command binds to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Base URL clients use to reach the RPC endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout for the HTTP client, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_queue_database")]
    pub queue_database: String,
    #[serde(default = "default_grace")]
    pub early_arrival_grace_minutes: i64,
    #[serde(default = "default_grace")]
    pub late_stay_grace_minutes: i64,
    #[serde(default = "default_check_in_method")]
    pub default_check_in_method: String,
    /// Identity recorded as `scannedBy` / admin actor by this installation
    #[serde(default = "default_actor")]
    pub actor: String,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_fps() -> u32 {
    10
}
fn default_detection_box() -> u32 {
    250
}
fn default_start_delay_ms() -> u64 {
    100
}
fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}
fn default_endpoint() -> String {
    "http://127.0.0.1:8787".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_queue_database() -> String {
    Config::queue_file().to_string_lossy().to_string()
}
fn default_grace() -> i64 {
    crate::core::calculator::flags::DEFAULT_GRACE_MINUTES
}
fn default_check_in_method() -> String {
    crate::models::time_entry::DEFAULT_CHECK_IN_METHOD.to_string()
}
fn default_actor() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "operator".to_string())
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            detection_box: default_detection_box(),
            start_delay_ms: default_start_delay_ms(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            queue_database: default_queue_database(),
            early_arrival_grace_minutes: default_grace(),
            late_stay_grace_minutes: default_grace(),
            default_check_in_method: default_check_in_method(),
            actor: default_actor(),
            scanner: ScannerConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Return the configuration directory: `$RATTENDANCE_HOME`, else `~/.rattendance`
    pub fn config_dir() -> PathBuf {
        if let Ok(dir) = env::var(CONFIG_DIR_ENV)
            && !dir.trim().is_empty()
        {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rattendance")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rattendance.conf")
    }

    /// Return the full path of the server SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rattendance.sqlite")
    }

    /// Return the full path of the client-side offline queue
    pub fn queue_file() -> PathBuf {
        Self::config_dir().join("offline-queue.sqlite")
    }

    pub fn flag_policy(&self) -> crate::core::calculator::flags::FlagPolicy {
        crate::core::calculator::flags::FlagPolicy::new(
            self.early_arrival_grace_minutes,
            self.late_stay_grace_minutes,
        )
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> AppResult<()> {
        let yaml = serde_yaml::to_string(self).map_err(|_| AppError::ConfigSave)?;
        fs::create_dir_all(Self::config_dir())?;
        let mut file = fs::File::create(Self::config_file())?;
        file.write_all(yaml.as_bytes())?;
        Ok(())
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> io::Result<Config> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;

        // DB name: user provided or default
        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            let yaml = serde_yaml::to_string(&config).map_err(io::Error::other)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        if !db_path.exists() {
            fs::File::create(&db_path)?;
        }

        Ok(config)
    }
}
