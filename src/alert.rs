//! User-facing alerts
//!
//! The connector only decides *what* to tell the user. Displaying it is up to
//! whoever implements [`AlertSink`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }
}

/// Fire-and-forget alert destination
pub trait AlertSink: Send + Sync {
    fn open_alert(&self, alert: Alert);
}

/// Writes alerts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn open_alert(&self, alert: Alert) {
        match alert.severity {
            Severity::Error => tracing::error!(alert = %alert.message, "Alert raised"),
            Severity::Warning => tracing::warn!(alert = %alert.message, "Alert raised"),
        }
    }
}

/// Forwards alerts to a channel, e.g. for a UI task to render
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelAlertSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlertSink {
    fn open_alert(&self, alert: Alert) {
        if self.tx.send(alert).is_err() {
            tracing::debug!("Alert receiver dropped");
        }
    }
}
