//! Settings and session files in the platform config directory.
//!
//! `settings.toml` holds the backend URL, where output goes and document
//! defaults. `session.toml` holds the bearer token and the active shop.

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::calc::Rates;

pub const API_URL_ENV: &str = "GST_DESK_API_URL";
pub const TOKEN_ENV: &str = "GST_DESK_TOKEN";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    pub api_url: String,
    pub data_root: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_estimate_prefix")]
    pub estimate_prefix: String,
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    #[serde(default = "default_half_rate")]
    pub default_cgst: f64,
    #[serde(default = "default_half_rate")]
    pub default_sgst: f64,
}

fn default_timeout() -> u64 {
    30
}

fn default_estimate_prefix() -> String {
    "EST".to_string()
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

fn default_half_rate() -> f64 {
    9.0
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.example.com".to_string(),
            data_root: "~/Documents/GST Desk".to_string(),
            timeout_secs: default_timeout(),
            estimate_prefix: default_estimate_prefix(),
            invoice_prefix: default_invoice_prefix(),
            default_cgst: default_half_rate(),
            default_sgst: default_half_rate(),
        }
    }
}

impl AppSettings {
    pub fn default_rates(&self) -> Rates {
        Rates {
            cgst_percent: self.default_cgst,
            sgst_percent: self.default_sgst,
            ..Rates::default()
        }
    }

    /// Data root with `~` expanded.
    pub fn root(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub shop_id: Option<i64>,
}

impl Session {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.token = Some(token);
            }
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("in", "gst-desk", "gst-desk") {
        return proj_dirs.config_dir().to_path_buf();
    }
    PathBuf::from(".")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn session_path() -> PathBuf {
    config_dir().join("session.toml")
}

pub fn log_dir() -> PathBuf {
    config_dir().join("logs")
}

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

fn save_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let toml_str = toml::to_string_pretty(value)?;
    fs::write(path, toml_str).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_settings(path: &Path) -> Result<Option<AppSettings>> {
    load_toml(path)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    save_toml(path, settings)
}

pub fn load_session(path: &Path) -> Result<Session> {
    Ok(load_toml(path)?.unwrap_or_default())
}

pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    save_toml(path, session)
}

pub fn clear_session(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
