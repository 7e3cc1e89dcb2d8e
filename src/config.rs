use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.zeabur.com";
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1000;

/// Environment override for the API base URL
pub const API_URL_ENV: &str = "ZEABUR_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployConfig {
    #[serde(rename = "apiBaseUrl", default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout for the upload calls; none by default
    #[serde(rename = "requestTimeoutSecs", default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(rename = "relayTimeoutSecs", default = "default_relay_timeout_secs")]
    pub relay_timeout_secs: u64,
    #[serde(rename = "openBrowser", default = "default_open_browser")]
    pub open_browser: bool,
    #[serde(rename = "redirectDelayMs", default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_relay_timeout_secs() -> u64 {
    DEFAULT_RELAY_TIMEOUT_SECS
}

fn default_open_browser() -> bool {
    true
}

fn default_redirect_delay_ms() -> u64 {
    DEFAULT_REDIRECT_DELAY_MS
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: None,
            relay_timeout_secs: default_relay_timeout_secs(),
            open_browser: default_open_browser(),
            redirect_delay_ms: default_redirect_delay_ms(),
        }
    }
}

impl DeployConfig {
    /// Config pointing at a specific API base (tests, self-hosted endpoints)
    pub fn with_api_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    /// Apply `ZEABUR_API_URL` if set and non-empty
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }
}

pub fn get_config_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(home_dir) = dirs::home_dir() {
        Ok(home_dir.join(".zeabur-deploy"))
    } else {
        Err("Could not find home directory".into())
    }
}

pub fn get_config_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn get_logs_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(get_config_dir()?.join("logs"))
}

/// Create a directory with owner-only permissions if it does not exist yet
fn ensure_private_dir(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;

        // Set permissions to 700 (read/write/execute for owner only) on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(dir)?;
            let mut permissions = metadata.permissions();
            permissions.set_mode(0o700);
            fs::set_permissions(dir, permissions)?;
        }
    }
    Ok(())
}

pub fn ensure_config_dir() -> Result<(), Box<dyn std::error::Error>> {
    ensure_private_dir(&get_config_dir()?)
}

pub fn ensure_logs_dir() -> Result<(), Box<dyn std::error::Error>> {
    ensure_private_dir(&get_logs_dir()?)
}

/// Load config from an explicit file; a missing file yields defaults
pub fn load_config_from(config_file: &Path) -> Result<DeployConfig, Box<dyn std::error::Error>> {
    if config_file.exists() {
        let content = fs::read_to_string(config_file)?;
        let config: DeployConfig = serde_json::from_str(&content)?;
        Ok(config)
    } else {
        Ok(DeployConfig::default())
    }
}

pub fn save_config_to(
    config_file: &Path,
    config: &DeployConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = config_file.parent() {
        ensure_private_dir(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_file, content)?;

    // Set permissions to 600 (read/write for owner only) on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(config_file)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(config_file, permissions)?;
    }

    Ok(())
}

pub fn load_config() -> Result<DeployConfig, Box<dyn std::error::Error>> {
    ensure_config_dir()?;
    let config = load_config_from(&get_config_file_path()?)?;
    Ok(config.apply_env_overrides())
}

pub fn save_config(config: &DeployConfig) -> Result<(), Box<dyn std::error::Error>> {
    save_config_to(&get_config_file_path()?, config)
}

pub fn clear_config() -> Result<(), Box<dyn std::error::Error>> {
    save_config(&DeployConfig::default())
}
