//! Optional Slack notifications for sync events.

use chrono::Utc;
use relaysync_types::NotifyConfig;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::sync::CycleOutcome;

const TIMEOUT_SECS: u64 = 10;
const TITLE: &str = "Postfix Relay Allow-list";

/// Attachment colour class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn color(self) -> &'static str {
        match self {
            Severity::Info => "#0099cc",
            Severity::Success => "#00ff00",
            Severity::Warning => "#ffaa00",
            Severity::Error => "#ff0000",
        }
    }
}

#[derive(Serialize)]
struct SlackPayload<'a> {
    attachments: [Attachment<'a>; 1],
}

#[derive(Serialize)]
struct Attachment<'a> {
    color: &'static str,
    title: &'a str,
    text: &'a str,
    ts: i64,
}

/// Posts attachments to a Slack incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| CoreError::Notify(format!("failed to create client: {e}")))?;
        Ok(Self { client, webhook_url: webhook_url.into() })
    }

    /// `None` when no webhook is configured.
    pub fn from_config(config: &NotifyConfig) -> CoreResult<Option<Self>> {
        match config.slack_webhook_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::new(url).map(Some),
            None => Ok(None),
        }
    }

    pub async fn post(&self, severity: Severity, text: &str) -> CoreResult<()> {
        let payload = SlackPayload {
            attachments: [Attachment {
                color: severity.color(),
                title: TITLE,
                text,
                ts: Utc::now().timestamp(),
            }],
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::Notify(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CoreError::Notify(format!("webhook returned HTTP {}", response.status())));
        }
        Ok(())
    }

    /// Fire-and-forget variant of [`post`](Self::post).
    pub async fn send(&self, severity: Severity, text: &str) {
        match self.post(severity, text).await {
            Ok(()) => tracing::info!("[Notify] Slack notification sent: {}", text),
            Err(e) => tracing::warn!("[Notify] Failed to send Slack notification: {}", e),
        }
    }
}

/// Message for a cycle outcome, if it is worth announcing.
///
/// `first_failure` is true when this failure starts a new streak; later
/// failures in the same streak stay quiet.
pub fn outcome_message(outcome: &CycleOutcome, first_failure: bool) -> Option<(Severity, String)> {
    match outcome {
        CycleOutcome::Unchanged { .. } => None,
        CycleOutcome::Applied { ranges, added, removed, reload_ok: true } => Some((
            Severity::Success,
            format!(
                "Updated relay allow-list with {ranges} IP ranges (+{added} -{removed}) \
                 and reloaded Postfix"
            ),
        )),
        CycleOutcome::Applied { ranges, reload_ok: false, .. } => Some((
            Severity::Warning,
            format!(
                "Updated relay allow-list with {ranges} IP ranges but failed to reload Postfix"
            ),
        )),
        CycleOutcome::Failed { kind, message } if first_failure => {
            Some((Severity::Error, format!("Sync failed ({kind}): {message}")))
        },
        CycleOutcome::Failed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaysync_types::SyncErrorKind;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "attachments": [{ "color": "#ff0000", "title": TITLE, "text": "boom" }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(server.uri()).unwrap();
        notifier.post(Severity::Error, "boom").await.unwrap();
    }

    #[tokio::test]
    async fn test_post_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let notifier = SlackNotifier::new(server.uri()).unwrap();
        let err = notifier.post(Severity::Info, "hi").await.unwrap_err();
        assert!(matches!(err, CoreError::Notify(_)));
        // send() never surfaces the error
        notifier.send(Severity::Info, "hi").await;
    }

    #[test]
    fn test_from_config() {
        assert!(SlackNotifier::from_config(&NotifyConfig::default()).unwrap().is_none());
        let config = NotifyConfig { slack_webhook_url: Some("https://hooks.example/x".into()) };
        assert!(SlackNotifier::from_config(&config).unwrap().is_some());
    }

    #[test]
    fn test_outcome_messages() {
        assert!(outcome_message(&CycleOutcome::Unchanged { ranges: 3 }, false).is_none());

        let applied = CycleOutcome::Applied { ranges: 3, added: 1, removed: 2, reload_ok: true };
        let (severity, text) = outcome_message(&applied, false).unwrap();
        assert_eq!(severity, Severity::Success);
        assert!(text.contains("+1 -2"));

        let reload_failed =
            CycleOutcome::Applied { ranges: 3, added: 0, removed: 1, reload_ok: false };
        assert_eq!(outcome_message(&reload_failed, false).unwrap().0, Severity::Warning);

        let failed = CycleOutcome::Failed { kind: SyncErrorKind::Fetch, message: "timeout".into() };
        assert_eq!(outcome_message(&failed, true).unwrap().0, Severity::Error);
        assert!(outcome_message(&failed, false).is_none());
    }
}
