//! Alert data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
}

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Warning
    #[default]
    Warning,
    /// Critical
    Critical,
}

/// When an alert rule triggers
///
/// The single internal representation of a condition. External input in the
/// legacy `{direction, threshold}` shape is normalized here, at the
/// deserialization boundary (`above` becomes `gt`, `below` becomes `lt`), so
/// evaluation never has to branch on the input shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertCondition {
    /// Comparison operator
    pub operator: Operator,

    /// Threshold value
    pub value: f64,
}

impl AlertCondition {
    /// Create a condition
    pub fn new(operator: Operator, value: f64) -> Self {
        Self { operator, value }
    }

    /// Whether a predicted value satisfies this condition
    pub fn matches(&self, value: f64) -> bool {
        match self.operator {
            Operator::Gt => value > self.value,
            Operator::Gte => value >= self.value,
            Operator::Lt => value < self.value,
            Operator::Lte => value <= self.value,
        }
    }
}

/// Legacy condition direction
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Above,
    Below,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionForm {
    Modern { operator: Operator, value: f64 },
    Legacy { direction: Direction, threshold: f64 },
}

impl<'de> Deserialize<'de> for AlertCondition {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let condition = match ConditionForm::deserialize(deserializer)? {
            ConditionForm::Modern { operator, value } => Self { operator, value },
            ConditionForm::Legacy { direction, threshold } => {
                let operator = match direction {
                    Direction::Above => Operator::Gt,
                    Direction::Below => Operator::Lt,
                };
                Self {
                    operator,
                    value: threshold,
                }
            }
        };

        Ok(condition)
    }
}

/// Kind of notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Email notification
    Email,
    /// Generic webhook
    Webhook,
    /// Slack incoming webhook
    Slack,
    /// PagerDuty event
    PagerDuty,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Email => "email",
            Self::Webhook => "webhook",
            Self::Slack => "slack",
            Self::PagerDuty => "pagerduty",
        };
        f.write_str(name)
    }
}

/// Channel-specific delivery target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelTarget {
    /// Email recipients
    Email {
        /// Recipient addresses
        to: Vec<String>,
    },
    /// Generic webhook
    Webhook {
        /// URL the payload is posted to
        url: String,
        /// Extra request headers
        headers: Option<serde_json::Value>,
    },
    /// Slack incoming webhook
    Slack {
        /// Incoming webhook URL
        webhook_url: String,
        /// Channel override
        channel: Option<String>,
    },
    /// PagerDuty event
    PagerDuty {
        /// Events API routing key
        routing_key: String,
    },
}

impl ChannelTarget {
    /// The kind of channel this target belongs to
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Email { .. } => ChannelKind::Email,
            Self::Webhook { .. } => ChannelKind::Webhook,
            Self::Slack { .. } => ChannelKind::Slack,
            Self::PagerDuty { .. } => ChannelKind::PagerDuty,
        }
    }
}

/// Notification channel configuration
///
/// A rule may carry several channels, each independently enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    /// Where the notification goes
    #[serde(flatten)]
    pub target: ChannelTarget,

    /// Whether this channel is active
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl NotificationChannel {
    /// Create an enabled channel
    pub fn new(target: ChannelTarget) -> Self {
        Self {
            target,
            enabled: true,
        }
    }
}

/// An alert rule definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique identifier
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// Metric whose forecast the rule watches
    pub metric: String,

    /// When the rule triggers
    pub condition: AlertCondition,

    /// How many days of the forecast to consider
    pub horizon_days: u32,

    /// Where triggered alerts are delivered
    pub channels: Vec<NotificationChannel>,

    /// Alert severity
    #[serde(default)]
    pub severity: Severity,

    /// Whether the rule is evaluated at all
    pub enabled: bool,
}

/// Outcome of one channel delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// The sender accepted the notification
    Sent,
    /// Delivery was attempted and failed
    Failed,
    /// Delivery was not attempted (disabled channel, no sender registered)
    Skipped,
}

/// Result of delivering to one channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelDeliveryResult {
    /// Kind of channel
    pub channel_type: ChannelKind,

    /// What happened
    pub status: DeliveryStatus,

    /// Identifier assigned by the external service, when it reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Why delivery failed or was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall delivery status of an alert event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// At least one channel succeeded
    Sent,
    /// Delivery was attempted on some channel and every attempt failed
    Failed,
    /// No delivery was attempted at all
    Queued,
}

impl EventStatus {
    /// Derive the overall status from per-channel results
    ///
    /// Distinguishes "tried and failed" from "never tried": with no
    /// attempted deliveries at all the event stays queued.
    pub fn from_results(results: &[ChannelDeliveryResult]) -> Self {
        if results
            .iter()
            .any(|r| r.status == DeliveryStatus::Sent)
        {
            Self::Sent
        } else if results
            .iter()
            .any(|r| r.status == DeliveryStatus::Failed)
        {
            Self::Failed
        } else {
            Self::Queued
        }
    }
}

/// A triggered alert
///
/// Created fresh on every trigger; re-fire suppression is the evaluator's
/// policy, not a property of the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique identifier
    pub id: Uuid,

    /// The rule that triggered this alert
    pub rule_id: Uuid,

    /// When the alert was triggered
    pub triggered_at: DateTime<Utc>,

    /// The predicted value that satisfied the condition
    pub trigger_value: f64,

    /// The threshold that was crossed
    pub threshold_value: f64,

    /// Human-readable message
    pub message: String,

    /// Severity inherited from the rule
    pub severity: Severity,

    /// Per-channel delivery outcomes, in channel list order
    pub channel_results: Vec<ChannelDeliveryResult>,

    /// Overall delivery status
    pub overall_status: EventStatus,
}

/// Result of evaluating one alert rule
///
/// Evaluation is a batch operation: one of these per input rule, always.
/// Soft failures are recorded in `error` and never abort the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Rule that was evaluated
    pub rule_id: Uuid,

    /// Metric the rule watches
    pub metric: String,

    /// Whether the rule fired
    pub triggered: bool,

    /// Whether a breach was withheld by the re-fire suppression window
    #[serde(default)]
    pub suppressed: bool,

    /// First predicted value that satisfied the condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_value: Option<f64>,

    /// The event created for a triggered rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<AlertEvent>,

    /// Soft failure recorded for this rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Operator::Gt, 100.0, 100.5, true)]
    #[case(Operator::Gt, 100.0, 100.0, false)]
    #[case(Operator::Gte, 100.0, 100.0, true)]
    #[case(Operator::Lt, 10.0, 9.9, true)]
    #[case(Operator::Lt, 10.0, 10.0, false)]
    #[case(Operator::Lte, 10.0, 10.0, true)]
    fn condition_matches(
        #[case] operator: Operator,
        #[case] threshold: f64,
        #[case] value: f64,
        #[case] expected: bool,
    ) {
        let condition = AlertCondition::new(operator, threshold);
        assert_eq!(condition.matches(value), expected);
    }

    #[test]
    fn modern_condition_deserializes() {
        let condition: AlertCondition =
            serde_json::from_str(r#"{"operator": "gte", "value": 42.0}"#).unwrap();
        assert_eq!(condition, AlertCondition::new(Operator::Gte, 42.0));
    }

    #[rstest]
    #[case("above", Operator::Gt)]
    #[case("below", Operator::Lt)]
    fn legacy_condition_normalizes(#[case] direction: &str, #[case] expected: Operator) {
        let json = format!(r#"{{"direction": "{direction}", "threshold": 100.0}}"#);
        let condition: AlertCondition = serde_json::from_str(&json).unwrap();
        assert_eq!(condition, AlertCondition::new(expected, 100.0));
    }

    #[test]
    fn channel_enabled_defaults_to_true() {
        let channel: NotificationChannel =
            serde_json::from_str(r#"{"type": "webhook", "url": "https://example.com/hook", "headers": null}"#)
                .unwrap();
        assert!(channel.enabled);
        assert_eq!(channel.target.kind(), ChannelKind::Webhook);
    }

    #[test]
    fn overall_status_derivation() {
        let sent = ChannelDeliveryResult {
            channel_type: ChannelKind::Email,
            status: DeliveryStatus::Sent,
            external_id: None,
            error: None,
        };
        let failed = ChannelDeliveryResult {
            channel_type: ChannelKind::Webhook,
            status: DeliveryStatus::Failed,
            external_id: None,
            error: Some("boom".to_string()),
        };
        let skipped = ChannelDeliveryResult {
            channel_type: ChannelKind::Slack,
            status: DeliveryStatus::Skipped,
            external_id: None,
            error: Some("no sender".to_string()),
        };

        assert_eq!(
            EventStatus::from_results(&[sent.clone(), failed.clone(), skipped.clone()]),
            EventStatus::Sent
        );
        assert_eq!(
            EventStatus::from_results(&[failed, skipped.clone()]),
            EventStatus::Failed
        );
        assert_eq!(EventStatus::from_results(&[skipped]), EventStatus::Queued);
        assert_eq!(EventStatus::from_results(&[]), EventStatus::Queued);
    }
}
