use crate::error::{Result, ResultExt as _, SheetpilotError};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "SHEETPILOT_API_URL";
pub const TOKEN_ENV: &str = "SHEETPILOT_TOKEN";

const SETTINGS_FILE: &str = "settings.json";
const MAX_RECENT_FLOWS: usize = 10;
const MAX_ACTIVITY_ENTRIES: usize = 500;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
}

/// Bounded, in-memory history of user-visible actions.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ActivityLog {
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, action: impl Into<String>, details: impl Into<String>) {
        self.entries.push(ActivityEntry {
            timestamp: Utc::now(),
            action: action.into(),
            details: details.into(),
        });

        if self.entries.len() > MAX_ACTIVITY_ENTRIES {
            self.entries
                .drain(0..self.entries.len() - MAX_ACTIVITY_ENTRIES);
        }
    }

    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppSettings {
    /// Base URL of the backend, without the `/api` suffix
    pub api_base_url: String,
    /// Maximum number of rows rendered in preview tables
    pub preview_row_limit: usize,
    /// Where exported files are written; `None` means the platform download dir
    pub download_dir: Option<PathBuf>,
    /// Most recently opened flow ids, newest first
    pub recent_flow_ids: Vec<i64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_owned(),
            preview_row_limit: 100,
            download_dir: None,
            recent_flow_ids: Vec::new(),
        }
    }
}

impl AppSettings {
    /// Location of the settings file: `<config dir>/sheetpilot/settings.json`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| SheetpilotError::Config("No config directory available".to_owned()))?;
        Ok(base.join("sheetpilot").join(SETTINGS_FILE))
    }

    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .map_err(|e| SheetpilotError::Config(format!("{}: {e}", path.display())))?;
        Ok(settings)
    }

    /// Loads settings from the default location and applies env overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::default_path()?)?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
    }

    /// Resolved export directory.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn remember_flow(&mut self, flow_id: i64) {
        self.recent_flow_ids.retain(|id| *id != flow_id);
        self.recent_flow_ids.insert(0, flow_id);
        self.recent_flow_ids.truncate(MAX_RECENT_FLOWS);
    }
}

/// Reads the bearer token from the environment. The token is never written
/// to the settings file.
pub fn token_from_env() -> Option<SecretString> {
    std::env::var(TOKEN_ENV)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
}
