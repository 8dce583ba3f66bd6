//! Process configuration: storage location and the audit side-channel.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};

const ENV_DB_PATH: &str = "WORKPULSE_DB_PATH";
const ENV_AUDIT_ENABLED: &str = "WORKPULSE_AUDIT_ENABLED";
const ENV_AUDIT_ENDPOINT: &str = "WORKPULSE_AUDIT_ENDPOINT";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub audit: AuditConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Audit side-channel configuration. The audit log is best-effort and
/// independently disableable; when `enabled` is false (or no endpoint is
/// configured) the process falls back to the no-op implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "workpulse.sqlite".to_string(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_seconds: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file is absent. Environment variables override either source.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                serde_json::from_str(&raw)
                    .map_err(|err| AppError::config(format!("配置文件解析失败: {err}")))?
            }
            _ => AppConfig::default(),
        };

        config.apply_env_overrides();
        info!(
            target: "app::config",
            db_path = %config.database.path,
            audit_enabled = config.audit.enabled,
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var(ENV_DB_PATH) {
            if !value.trim().is_empty() {
                self.database.path = value;
            }
        }
        if let Ok(value) = env::var(ENV_AUDIT_ENABLED) {
            self.audit.enabled = matches!(value.trim(), "1" | "true" | "yes");
        }
        if let Ok(value) = env::var(ENV_AUDIT_ENDPOINT) {
            if !value.trim().is_empty() {
                self.audit.endpoint = Some(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_audit() {
        let config = AppConfig::default();
        assert!(!config.audit.enabled);
        assert!(config.audit.endpoint.is_none());
        assert_eq!(config.database.path, "workpulse.sqlite");
    }

    #[test]
    fn parses_json_config() {
        let raw = r#"{
            "database": { "path": "/tmp/hr.sqlite" },
            "audit": { "enabled": true, "endpoint": "http://localhost:9000/events", "timeout_seconds": 5 }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).expect("parse config");
        assert!(config.audit.enabled);
        assert_eq!(config.database.path, "/tmp/hr.sqlite");
        assert_eq!(config.audit.timeout_seconds, 5);
    }
}
