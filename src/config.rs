use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::recorder::mime::{DEFAULT_MIME_PREFERENCES, FALLBACK_MIME};
use crate::recorder::RecordingSettings;
use crate::rtc::{PeerConfig, DEFAULT_STUN_SERVER};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub ice: IceConfig,
    pub recording: RecordingConfig,
    pub downloads: DownloadsConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    pub servers: Vec<String>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            servers: vec![DEFAULT_STUN_SERVER.to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub timeslice_ms: u64,
    pub mime_preferences: Vec<String>,
    pub fallback_mime: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            timeslice_ms: 1000,
            mime_preferences: DEFAULT_MIME_PREFERENCES.iter().map(|m| m.to_string()).collect(),
            fallback_mime: FALLBACK_MIME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub dir: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: "~/Downloads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl Config {
    /// Load `path` (any extension the `config` crate knows, optional) with
    /// `PEERCALL_<SECTION>__<KEY>` environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PEERCALL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn peer_config(&self) -> PeerConfig {
        PeerConfig::from_urls(&self.ice.servers)
    }

    pub fn recording_settings(&self) -> RecordingSettings {
        RecordingSettings {
            mime_preferences: self.recording.mime_preferences.clone(),
            fallback_mime: self.recording.fallback_mime.clone(),
            timeslice: Duration::from_millis(self.recording.timeslice_ms),
        }
    }

    /// Download directory with `~` and environment variables expanded
    pub fn downloads_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.downloads.dir)
            .with_context(|| format!("Cannot expand downloads dir {}", self.downloads.dir))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.bind, self.http.port)
    }
}
