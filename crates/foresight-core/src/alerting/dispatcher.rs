//! Notification delivery for triggered alerts
//!
//! One sender per channel kind; a channel whose kind has no registered
//! sender is skipped, not failed. Delivery failures are isolated per
//! channel and never stop the remaining channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    ChannelDeliveryResult, ChannelKind, ChannelTarget, DeliveryStatus, NotificationChannel,
    Severity,
};

/// Delivery content for one triggered alert
///
/// Built once per trigger and shared across every channel of the rule.
#[derive(Debug, Clone, Serialize)]
pub struct AlertContent {
    /// Rule that fired
    pub rule_id: Uuid,

    /// Rule name
    pub rule_name: String,

    /// Metric the rule watches
    pub metric: String,

    /// Human-readable message
    pub message: String,

    /// Severity of the rule
    pub severity: Severity,

    /// Predicted value that satisfied the condition
    pub trigger_value: f64,

    /// Threshold that was crossed
    pub threshold_value: f64,

    /// Day the triggering prediction is for
    pub predicted_for: DateTime<Utc>,

    /// When the rule fired
    pub triggered_at: DateTime<Utc>,
}

/// Errors a channel sender can produce
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// HTTP transport failure or non-success response
    #[error("http error: {0}")]
    Http(String),

    /// Channel target does not match the sender
    #[error("misconfigured channel: {0}")]
    Config(String),
}

/// Receipt from a successful delivery
#[derive(Debug, Clone, Default)]
pub struct SendReceipt {
    /// Identifier assigned by the external service, when it reported one
    pub external_id: Option<String>,
}

/// Delivers alert content through one kind of channel
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Attempt delivery to the channel's target
    async fn send(
        &self,
        target: &ChannelTarget,
        content: &AlertContent,
    ) -> std::result::Result<SendReceipt, SendError>;
}

/// Dispatches a triggered alert to its channels
pub struct NotificationDispatcher {
    senders: HashMap<ChannelKind, Arc<dyn ChannelSender>>,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher with no senders registered
    pub fn new() -> Self {
        Self {
            senders: HashMap::new(),
        }
    }

    /// Register a sender for a channel kind
    pub fn with_sender(mut self, kind: ChannelKind, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(kind, sender);
        self
    }

    /// Deliver content to every channel, one result per channel
    ///
    /// Results are in channel list order. A failing channel is recorded and
    /// does not stop the rest.
    pub async fn dispatch(
        &self,
        channels: &[NotificationChannel],
        content: &AlertContent,
    ) -> Vec<ChannelDeliveryResult> {
        let mut results = Vec::with_capacity(channels.len());

        for channel in channels {
            let kind = channel.target.kind();

            if !channel.enabled {
                results.push(ChannelDeliveryResult {
                    channel_type: kind,
                    status: DeliveryStatus::Skipped,
                    external_id: None,
                    error: Some("channel disabled".to_string()),
                });
                continue;
            }

            let Some(sender) = self.senders.get(&kind) else {
                results.push(ChannelDeliveryResult {
                    channel_type: kind,
                    status: DeliveryStatus::Skipped,
                    external_id: None,
                    error: Some(format!("no sender configured for channel '{kind}'")),
                });
                continue;
            };

            match sender.send(&channel.target, content).await {
                Ok(receipt) => {
                    info!(rule_id = %content.rule_id, channel = %kind, "notification sent");
                    results.push(ChannelDeliveryResult {
                        channel_type: kind,
                        status: DeliveryStatus::Sent,
                        external_id: receipt.external_id,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(
                        rule_id = %content.rule_id,
                        channel = %kind,
                        error = %e,
                        "notification delivery failed"
                    );
                    results.push(ChannelDeliveryResult {
                        channel_type: kind,
                        status: DeliveryStatus::Failed,
                        external_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        results
    }
}

/// Generic webhook sender
pub struct WebhookSender {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    rule_id: String,
    rule_name: &'a str,
    metric: &'a str,
    severity: Severity,
    message: &'a str,
    trigger_value: f64,
    threshold_value: f64,
    predicted_for: DateTime<Utc>,
    triggered_at: DateTime<Utc>,
}

impl WebhookSender {
    /// Create a sender with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChannelSender for WebhookSender {
    async fn send(
        &self,
        target: &ChannelTarget,
        content: &AlertContent,
    ) -> std::result::Result<SendReceipt, SendError> {
        let ChannelTarget::Webhook { url, headers } = target else {
            return Err(SendError::Config(
                "webhook sender received a non-webhook channel".to_string(),
            ));
        };

        let payload = WebhookPayload {
            rule_id: content.rule_id.to_string(),
            rule_name: &content.rule_name,
            metric: &content.metric,
            severity: content.severity,
            message: &content.message,
            trigger_value: content.trigger_value,
            threshold_value: content.threshold_value,
            predicted_for: content.predicted_for,
            triggered_at: content.triggered_at,
        };

        let mut request = self.client.post(url).json(&payload);

        if let Some(headers_obj) = headers.as_ref().and_then(|h| h.as_object()) {
            for (key, value) in headers_obj {
                if let Some(value_str) = value.as_str() {
                    request = request.header(key, value_str);
                }
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| SendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Http(format!("webhook returned {status}: {body}")));
        }

        Ok(SendReceipt::default())
    }
}

/// Slack incoming-webhook sender
pub struct SlackSender {
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    username: String,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    color: String,
    title: String,
    text: String,
    fields: Vec<SlackField>,
    ts: i64,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}

impl SlackSender {
    /// Create a sender with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChannelSender for SlackSender {
    async fn send(
        &self,
        target: &ChannelTarget,
        content: &AlertContent,
    ) -> std::result::Result<SendReceipt, SendError> {
        let ChannelTarget::Slack {
            webhook_url,
            channel,
        } = target
        else {
            return Err(SendError::Config(
                "slack sender received a non-slack channel".to_string(),
            ));
        };

        let color = match content.severity {
            Severity::Critical => "#dc3545",
            Severity::Warning => "#ffc107",
            Severity::Info => "#17a2b8",
        };

        let payload = SlackPayload {
            channel: channel.clone(),
            username: "Foresight".to_string(),
            attachments: vec![SlackAttachment {
                color: color.to_string(),
                title: format!("Alert: {}", content.rule_name),
                text: content.message.clone(),
                fields: vec![
                    SlackField {
                        title: "Metric".to_string(),
                        value: content.metric.clone(),
                        short: true,
                    },
                    SlackField {
                        title: "Forecast Value".to_string(),
                        value: format!("{:.2}", content.trigger_value),
                        short: true,
                    },
                    SlackField {
                        title: "Threshold".to_string(),
                        value: format!("{:.2}", content.threshold_value),
                        short: true,
                    },
                    SlackField {
                        title: "Severity".to_string(),
                        value: format!("{:?}", content.severity),
                        short: true,
                    },
                ],
                ts: content.triggered_at.timestamp(),
            }],
        };

        let response = self
            .client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Http(format!("slack returned {status}: {body}")));
        }

        Ok(SendReceipt::default())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::models::EventStatus;

    use super::*;

    fn content() -> AlertContent {
        AlertContent {
            rule_id: Uuid::new_v4(),
            rule_name: "mrr drop".to_string(),
            metric: "mrr".to_string(),
            message: "mrr forecast fell below threshold of 1000.00".to_string(),
            severity: Severity::Critical,
            trigger_value: 900.0,
            threshold_value: 1000.0,
            predicted_for: Utc::now(),
            triggered_at: Utc::now(),
        }
    }

    struct OkSender {
        external_id: Option<String>,
    }

    #[async_trait]
    impl ChannelSender for OkSender {
        async fn send(
            &self,
            _target: &ChannelTarget,
            _content: &AlertContent,
        ) -> std::result::Result<SendReceipt, SendError> {
            Ok(SendReceipt {
                external_id: self.external_id.clone(),
            })
        }
    }

    struct FailingSender;

    #[async_trait]
    impl ChannelSender for FailingSender {
        async fn send(
            &self,
            _target: &ChannelTarget,
            _content: &AlertContent,
        ) -> std::result::Result<SendReceipt, SendError> {
            Err(SendError::Http("connection refused".to_string()))
        }
    }

    fn email_channel() -> NotificationChannel {
        NotificationChannel::new(ChannelTarget::Email {
            to: vec!["ops@example.com".to_string()],
        })
    }

    fn webhook_channel(url: &str) -> NotificationChannel {
        NotificationChannel::new(ChannelTarget::Webhook {
            url: url.to_string(),
            headers: None,
        })
    }

    fn slack_channel() -> NotificationChannel {
        NotificationChannel::new(ChannelTarget::Slack {
            webhook_url: "https://hooks.slack.example.com/T000/B000".to_string(),
            channel: None,
        })
    }

    #[tokio::test]
    async fn isolates_failures_and_skips_unregistered_kinds() {
        let dispatcher = NotificationDispatcher::new()
            .with_sender(
                ChannelKind::Email,
                Arc::new(OkSender {
                    external_id: Some("msg-42".to_string()),
                }),
            )
            .with_sender(ChannelKind::Webhook, Arc::new(FailingSender));

        let channels = vec![
            email_channel(),
            webhook_channel("https://example.com/hook"),
            slack_channel(),
        ];
        let results = dispatcher.dispatch(&channels, &content()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, DeliveryStatus::Sent);
        assert_eq!(results[0].external_id.as_deref(), Some("msg-42"));
        assert_eq!(results[1].status, DeliveryStatus::Failed);
        assert!(results[1].error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(results[2].status, DeliveryStatus::Skipped);

        assert_eq!(EventStatus::from_results(&results), EventStatus::Sent);
    }

    #[tokio::test]
    async fn all_attempts_failing_is_failed_not_queued() {
        let dispatcher =
            NotificationDispatcher::new().with_sender(ChannelKind::Webhook, Arc::new(FailingSender));

        let results = dispatcher
            .dispatch(&[webhook_channel("https://example.com/hook")], &content())
            .await;

        assert_eq!(EventStatus::from_results(&results), EventStatus::Failed);
    }

    #[tokio::test]
    async fn no_transport_at_all_leaves_the_event_queued() {
        let dispatcher = NotificationDispatcher::new();
        let results = dispatcher
            .dispatch(&[email_channel(), slack_channel()], &content())
            .await;

        assert!(results.iter().all(|r| r.status == DeliveryStatus::Skipped));
        assert_eq!(EventStatus::from_results(&results), EventStatus::Queued);
    }

    #[tokio::test]
    async fn disabled_channels_are_skipped() {
        let dispatcher = NotificationDispatcher::new().with_sender(
            ChannelKind::Email,
            Arc::new(OkSender { external_id: None }),
        );

        let mut channel = email_channel();
        channel.enabled = false;

        let results = dispatcher.dispatch(&[channel], &content()).await;
        assert_eq!(results[0].status, DeliveryStatus::Skipped);
        assert_eq!(results[0].error.as_deref(), Some("channel disabled"));
    }

    #[tokio::test]
    async fn webhook_sender_posts_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "metric": "mrr",
                "severity": "critical",
            })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let sender = WebhookSender::new(Duration::from_secs(5)).unwrap();
        let target = ChannelTarget::Webhook {
            url: format!("{}/hook", server.uri()),
            headers: Some(serde_json::json!({"X-Token": "abc"})),
        };

        sender.send(&target, &content()).await.unwrap();
    }

    #[tokio::test]
    async fn webhook_sender_surfaces_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("kaput"))
            .mount(&server)
            .await;

        let sender = WebhookSender::new(Duration::from_secs(5)).unwrap();
        let target = ChannelTarget::Webhook {
            url: format!("{}/hook", server.uri()),
            headers: None,
        };

        let err = sender.send(&target, &content()).await.unwrap_err();
        assert!(matches!(err, SendError::Http(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn slack_sender_posts_attachment() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/T000/B000"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let sender = SlackSender::new(Duration::from_secs(5)).unwrap();
        let target = ChannelTarget::Slack {
            webhook_url: format!("{}/services/T000/B000", server.uri()),
            channel: Some("#alerts".to_string()),
        };

        sender.send(&target, &content()).await.unwrap();
    }
}
