//! Best-effort audit side-channel. Task completion publishes an event to an
//! external gateway; the primary workflow never awaits or depends on the
//! outcome. Disabled deployments get the no-op variant.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuditConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub employee_id: String,
    pub task_id: String,
    pub action: String,
    pub occurred_at: String,
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record one event. Implementations swallow their own failures; callers
    /// fire-and-forget via `tokio::spawn`.
    async fn record(&self, event: AuditEvent);
}

/// Active implementation: POSTs events as JSON to the configured gateway.
pub struct HttpAuditLog {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAuditLog {
    pub fn new(endpoint: String, timeout: StdDuration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::config(format!("审计客户端初始化失败: {err}")))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl AuditLog for HttpAuditLog {
    async fn record(&self, event: AuditEvent) {
        let task_id = event.task_id.clone();
        match self.client.post(&self.endpoint).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(target: "app::audit", %task_id, "audit event recorded");
            }
            Ok(response) => {
                warn!(
                    target: "app::audit",
                    %task_id,
                    status = %response.status(),
                    "audit gateway rejected event"
                );
            }
            Err(err) => {
                warn!(target: "app::audit", %task_id, error = %err, "audit event submission failed");
            }
        }
    }
}

/// Disabled variant: logs and drops the event.
pub struct NoopAuditLog;

#[async_trait]
impl AuditLog for NoopAuditLog {
    async fn record(&self, event: AuditEvent) {
        debug!(target: "app::audit", task_id = %event.task_id, "audit disabled, event dropped");
    }
}

/// Select the audit implementation once at process start.
pub fn from_config(config: &AuditConfig) -> AppResult<Arc<dyn AuditLog>> {
    match (&config.endpoint, config.enabled) {
        (Some(endpoint), true) => {
            let timeout = StdDuration::from_secs(config.timeout_seconds);
            Ok(Arc::new(HttpAuditLog::new(endpoint.clone(), timeout)?))
        }
        _ => Ok(Arc::new(NoopAuditLog)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_selects_noop() {
        let config = AuditConfig {
            enabled: false,
            endpoint: Some("http://localhost:1/events".into()),
            timeout_seconds: 5,
        };
        assert!(from_config(&config).is_ok());
    }

    #[test]
    fn enabled_without_endpoint_selects_noop() {
        let config = AuditConfig {
            enabled: true,
            endpoint: None,
            timeout_seconds: 5,
        };
        assert!(from_config(&config).is_ok());
    }
}
