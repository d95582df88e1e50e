use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const INTERVAL_MS_RANGE: (u64, u64) = (200, 2000);
pub const TIMEOUT_S_RANGE: (f64, f64) = (0.2, 3.0);
pub const COLUMNS_RANGE: (usize, usize) = (1, 4);

/// User-controlled refresh and layout settings. Lives for the session only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_ms: u64,
    pub timeout_s: f64,
    pub columns: usize,
    pub show_meta: bool,
    pub show_links: bool,
    pub running: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            timeout_s: 0.7,
            columns: 2,
            show_meta: true,
            show_links: false,
            running: true,
        }
    }
}

impl RefreshConfig {
    /// Pull every numeric field back into its allowed range.
    pub fn clamped(mut self) -> Self {
        self.interval_ms = self.interval_ms.clamp(INTERVAL_MS_RANGE.0, INTERVAL_MS_RANGE.1);
        self.timeout_s = if self.timeout_s.is_nan() {
            RefreshConfig::default().timeout_s
        } else {
            self.timeout_s.clamp(TIMEOUT_S_RANGE.0, TIMEOUT_S_RANGE.1)
        };
        self.columns = self.columns.clamp(COLUMNS_RANGE.0, COLUMNS_RANGE.1);
        self
    }

    pub fn apply(&self, patch: &RefreshConfigPatch) -> Self {
        RefreshConfig {
            interval_ms: patch.interval_ms.unwrap_or(self.interval_ms),
            timeout_s: patch.timeout_s.unwrap_or(self.timeout_s),
            columns: patch.columns.unwrap_or(self.columns),
            show_meta: patch.show_meta.unwrap_or(self.show_meta),
            show_links: patch.show_links.unwrap_or(self.show_links),
            running: patch.running.unwrap_or(self.running),
        }
        .clamped()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_s)
    }
}

/// Partial update sent by the control panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshConfigPatch {
    pub interval_ms: Option<u64>,
    pub timeout_s: Option<f64>,
    pub columns: Option<usize>,
    pub show_meta: Option<bool>,
    pub show_links: Option<bool>,
    pub running: Option<bool>,
}

/// Startup settings, read from `dashboard.json` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub web_port: u16,
    pub base_url: String,
    /// How many catalog entries are selected right after discovery.
    pub default_selection: usize,
    pub refresh: RefreshConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web_port: 8090,
            base_url: "http://localhost:8080".to_string(),
            default_selection: 2,
            refresh: RefreshConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("{} not found, using default configuration", path.display());
            return Ok(AppConfig::default());
        }

        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Self::from_json(&config_str).with_context(|| format!("failed parsing {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: AppConfig = serde_json::from_str(raw)?;
        config.refresh = config.refresh.clamped();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_control_panel() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval_ms, 500);
        assert_eq!(config.timeout_s, 0.7);
        assert_eq!(config.columns, 2);
        assert!(config.show_meta);
        assert!(!config.show_links);
        assert!(config.running);
    }

    #[test]
    fn test_clamping() {
        let config = RefreshConfig {
            interval_ms: 50,
            timeout_s: 10.0,
            columns: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(config.interval_ms, 200);
        assert_eq!(config.timeout_s, 3.0);
        assert_eq!(config.columns, 1);

        let config = RefreshConfig {
            interval_ms: 9000,
            timeout_s: 0.01,
            columns: 12,
            ..Default::default()
        }
        .clamped();
        assert_eq!(config.interval_ms, 2000);
        assert_eq!(config.timeout_s, 0.2);
        assert_eq!(config.columns, 4);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let base = RefreshConfig::default();
        let patched = base.apply(&RefreshConfigPatch {
            columns: Some(3),
            running: Some(false),
            ..Default::default()
        });

        assert_eq!(patched.columns, 3);
        assert!(!patched.running);
        assert_eq!(patched.interval_ms, base.interval_ms);
        assert_eq!(patched.show_meta, base.show_meta);
    }

    #[test]
    fn test_app_config_partial_file() {
        let config = AppConfig::from_json(
            r#"{ "base_url": "http://cams:9000", "refresh": { "columns": 7 } }"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://cams:9000");
        assert_eq!(config.web_port, 8090);
        assert_eq!(config.refresh.columns, 4);
        assert_eq!(config.refresh.interval_ms, 500);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("does-not-exist/dashboard.json").unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.default_selection, 2);
    }
}
