//! Notification sinks
//!
//! Webhook delivery of tick outcomes as Discord-style embeds, plus a
//! log-only fallback for installations without a webhook. Both are
//! best-effort: nothing here ever fails outward.

use crate::domain::ports::NotificationSink;
use crate::domain::value_objects::{EventKind, Notification};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Posts each notification to a webhook URL as a single embed.
pub struct WebhookNotificationSink {
    url: String,
    title: String,
    retry_attempts: u32,
}

impl WebhookNotificationSink {
    pub fn new(url: impl Into<String>, title: impl Into<String>, retry_attempts: u32) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            retry_attempts,
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn send(&self, notification: &Notification) {
        let payload = embed_payload(&self.title, notification);
        let attempts = self.retry_attempts.max(1);

        for attempt in 1..=attempts {
            let url = self.url.clone();
            let body = payload.clone();
            let result = tokio::task::spawn_blocking(move || post_json(&url, &body)).await;

            match result {
                Ok(Ok(())) => {
                    debug!(event = %notification.event_kind, "webhook delivered");
                    return;
                }
                Ok(Err(message)) => {
                    warn!(event = %notification.event_kind, attempt, %message, "webhook delivery failed");
                }
                Err(join_err) => {
                    warn!(attempt, error = %join_err, "webhook delivery task failed");
                }
            }
            if attempt < attempts {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
        warn!(event = %notification.event_kind, "giving up on webhook delivery");
    }
}

fn post_json(url: &str, body: &serde_json::Value) -> Result<(), String> {
    let agent = ureq::AgentBuilder::new().timeout(DELIVERY_TIMEOUT).build();
    match agent.post(url).send_json(body.clone()) {
        Ok(_) => Ok(()),
        Err(ureq::Error::Status(code, _)) => Err(format!("HTTP status {}", code)),
        Err(e) => Err(e.to_string()),
    }
}

/// Build the embed document for one notification.
fn embed_payload(title: &str, notification: &Notification) -> serde_json::Value {
    let subjects = if notification.subjects.is_empty() {
        "-".to_string()
    } else {
        notification
            .subjects
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let description = match notification.event_kind {
        EventKind::NoDrift => "No updates detected.".to_string(),
        EventKind::Applied => format!("Updates applied, server restarted: {}", subjects),
        EventKind::ApplyFailed => format!("Update failed for: {}", subjects),
        EventKind::StartupTimeout => "Server did not come back up; will retry.".to_string(),
        EventKind::Crashed => "Server crashed — restarting.".to_string(),
        EventKind::Recovered => "Server is back up.".to_string(),
    };

    serde_json::json!({
        "content": null,
        "embeds": [{
            "title": title,
            "description": description,
            "color": embed_color(notification.event_kind),
            "timestamp": notification.timestamp.to_rfc3339(),
        }]
    })
}

fn embed_color(kind: EventKind) -> u32 {
    match kind {
        EventKind::NoDrift => 9807270,        // grey
        EventKind::Applied => 2067276,        // green
        EventKind::Recovered => 3066993,      // bright green
        EventKind::ApplyFailed => 10038562,   // dark red
        EventKind::Crashed => 11027200,       // orange-red
        EventKind::StartupTimeout => 15158332, // red
    }
}

/// Fallback sink that reports through the log stream only.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &Notification) {
        info!(
            event = %notification.event_kind,
            subjects = ?notification.subjects,
            "tick outcome"
        );
    }
}
