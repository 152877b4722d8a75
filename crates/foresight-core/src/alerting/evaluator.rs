//! Alert rule evaluation
//!
//! Scans alert rules against the latest forecasts. Evaluation is a batch
//! operation with per-rule isolation: every input rule yields exactly one
//! result, and a failure in one rule never aborts the others.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AlertingConfig;
use crate::error::Result;
use crate::models::{
    AlertEvent, AlertRule, EvaluationResult, EventStatus, ForecastPrediction, Operator,
};
use crate::store::ForecastStore;

use super::dispatcher::{AlertContent, NotificationDispatcher};

/// Evaluates alert rules against forecasts and dispatches triggered alerts
///
/// Re-fire suppression is an explicit policy: a rule that fired within
/// [`AlertingConfig::suppression_window_minutes`] reports the breach as
/// `suppressed` instead of creating a second event. The last-fired map is
/// process-local; a window of zero disables suppression and fires on every
/// evaluation pass.
pub struct AlertEvaluator {
    forecasts: Arc<dyn ForecastStore>,
    dispatcher: NotificationDispatcher,
    config: AlertingConfig,
    last_fired: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl AlertEvaluator {
    /// Create an evaluator
    pub fn new(
        forecasts: Arc<dyn ForecastStore>,
        dispatcher: NotificationDispatcher,
        config: AlertingConfig,
    ) -> Self {
        Self {
            forecasts,
            dispatcher,
            config,
            last_fired: RwLock::new(HashMap::new()),
        }
    }

    /// Evaluate every rule, in order, one result per rule
    pub async fn evaluate(&self, rules: &[AlertRule]) -> Vec<EvaluationResult> {
        debug!(count = rules.len(), "evaluating alert rules");

        let mut results = Vec::with_capacity(rules.len());
        for rule in rules {
            let result = match self.evaluate_rule(rule).await {
                Ok(result) => result,
                Err(e) => {
                    error!(rule_id = %rule.id, error = %e, "rule evaluation failed");
                    let mut failed = untriggered(rule);
                    failed.error = Some(e.to_string());
                    failed
                }
            };
            results.push(result);
        }

        results
    }

    /// Evaluate a single rule
    async fn evaluate_rule(&self, rule: &AlertRule) -> Result<EvaluationResult> {
        if !rule.enabled {
            return Ok(untriggered(rule));
        }

        let Some(forecast) = self.forecasts.latest_forecast(&rule.metric).await? else {
            debug!(rule_id = %rule.id, metric = %rule.metric, "no forecast for metric");
            let mut result = untriggered(rule);
            result.error = Some(format!("no forecast available for metric '{}'", rule.metric));
            return Ok(result);
        };

        let horizon_days = if rule.horizon_days == 0 {
            self.config.default_horizon_days
        } else {
            rule.horizon_days
        };

        let now = Utc::now();
        let horizon_end = now + Duration::days(i64::from(horizon_days));
        let in_horizon: Vec<&ForecastPrediction> = forecast
            .predictions
            .iter()
            .filter(|p| p.timestamp >= now && p.timestamp <= horizon_end)
            .collect();

        if in_horizon.is_empty() {
            let mut result = untriggered(rule);
            result.error = Some(format!(
                "no predictions within the next {horizon_days} day(s)"
            ));
            return Ok(result);
        }

        // first qualifying prediction wins; later, possibly more extreme
        // ones are not considered
        let Some(hit) = in_horizon
            .iter()
            .find(|p| rule.condition.matches(p.predicted_value))
        else {
            return Ok(untriggered(rule));
        };

        if self.config.suppression_window_minutes > 0 {
            let window = Duration::minutes(self.config.suppression_window_minutes as i64);
            let last = self.last_fired.read().await.get(&rule.id).copied();
            if let Some(previous) = last {
                if now - previous < window {
                    debug!(
                        rule_id = %rule.id,
                        last_fired = %previous,
                        "breach within suppression window, not re-firing"
                    );
                    let mut result = untriggered(rule);
                    result.suppressed = true;
                    result.trigger_value = Some(hit.predicted_value);
                    return Ok(result);
                }
            }
        }

        let content = AlertContent {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            metric: rule.metric.clone(),
            message: format_message(rule, hit),
            severity: rule.severity,
            trigger_value: hit.predicted_value,
            threshold_value: rule.condition.value,
            predicted_for: hit.timestamp,
            triggered_at: now,
        };

        let channel_results = self.dispatcher.dispatch(&rule.channels, &content).await;
        let overall_status = EventStatus::from_results(&channel_results);

        let event = AlertEvent {
            id: Uuid::new_v4(),
            rule_id: rule.id,
            triggered_at: now,
            trigger_value: hit.predicted_value,
            threshold_value: rule.condition.value,
            message: content.message.clone(),
            severity: rule.severity,
            channel_results,
            overall_status,
        };

        info!(
            rule_id = %rule.id,
            event_id = %event.id,
            trigger_value = hit.predicted_value,
            status = ?overall_status,
            "alert triggered"
        );

        self.last_fired.write().await.insert(rule.id, now);

        Ok(EvaluationResult {
            rule_id: rule.id,
            metric: rule.metric.clone(),
            triggered: true,
            suppressed: false,
            trigger_value: Some(hit.predicted_value),
            event: Some(event),
            error: None,
        })
    }
}

fn untriggered(rule: &AlertRule) -> EvaluationResult {
    EvaluationResult {
        rule_id: rule.id,
        metric: rule.metric.clone(),
        triggered: false,
        suppressed: false,
        trigger_value: None,
        event: None,
        error: None,
    }
}

fn format_message(rule: &AlertRule, prediction: &ForecastPrediction) -> String {
    let verb = match rule.condition.operator {
        Operator::Gt => "exceeded",
        Operator::Gte => "reached or exceeded",
        Operator::Lt => "fell below",
        Operator::Lte => "fell to or below",
    };

    format!(
        "{} forecast {} threshold of {:.2} (predicted {:.2} on {})",
        rule.metric,
        verb,
        rule.condition.value,
        prediction.predicted_value,
        prediction.timestamp.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::alerting::dispatcher::{ChannelSender, SendError, SendReceipt};
    use crate::error::Error;
    use crate::models::{
        AlertCondition, ChannelKind, ChannelTarget, Forecast, ModelInfo, NotificationChannel,
        Severity,
    };
    use crate::store::InMemoryForecastStore;

    use super::*;

    struct CountingSender {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl ChannelSender for CountingSender {
        async fn send(
            &self,
            _target: &ChannelTarget,
            _content: &AlertContent,
        ) -> std::result::Result<SendReceipt, SendError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(SendReceipt::default())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ForecastStore for FailingStore {
        async fn save_forecast(&self, _forecast: &Forecast) -> Result<Uuid> {
            Err(Error::storage("write refused"))
        }

        async fn latest_forecast(&self, _metric: &str) -> Result<Option<Forecast>> {
            Err(Error::storage("read timed out"))
        }
    }

    fn forecast(metric: &str, values: &[f64]) -> Forecast {
        let now = Utc::now();
        Forecast {
            metric: metric.to_string(),
            predictions: values
                .iter()
                .enumerate()
                .map(|(i, &value)| ForecastPrediction {
                    timestamp: now + Duration::days(i as i64 + 1),
                    predicted_value: value,
                    confidence_lower: value - 1.0,
                    confidence_upper: value + 1.0,
                })
                .collect(),
            model_info: ModelInfo {
                name: "sma".to_string(),
                version: "test".to_string(),
                parameters: serde_json::json!({}),
            },
            generated_at: now,
        }
    }

    fn rule(metric: &str, condition: AlertCondition) -> AlertRule {
        AlertRule {
            id: Uuid::new_v4(),
            name: format!("{metric} watch"),
            metric: metric.to_string(),
            condition,
            horizon_days: 7,
            channels: vec![NotificationChannel::new(ChannelTarget::Email {
                to: vec!["ops@example.com".to_string()],
            })],
            severity: Severity::Warning,
            enabled: true,
        }
    }

    fn evaluator(store: Arc<dyn ForecastStore>, window_minutes: u64) -> AlertEvaluator {
        AlertEvaluator::new(
            store,
            NotificationDispatcher::new(),
            AlertingConfig {
                suppression_window_minutes: window_minutes,
                default_horizon_days: 7,
            },
        )
    }

    #[tokio::test]
    async fn first_qualifying_prediction_triggers() {
        let store = Arc::new(InMemoryForecastStore::new());
        store
            .save_forecast(&forecast("mrr", &[90.0, 95.0, 105.0, 120.0]))
            .await
            .unwrap();

        let evaluator = evaluator(store, 0);
        let rules = vec![rule("mrr", AlertCondition::new(Operator::Gt, 100.0))];
        let results = evaluator.evaluate(&rules).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].triggered);
        // first qualifying point, not the maximum
        assert_eq!(results[0].trigger_value, Some(105.0));

        let event = results[0].event.as_ref().unwrap();
        assert_eq!(event.threshold_value, 100.0);
        // the rule's email channel has no registered sender
        assert_eq!(event.overall_status, EventStatus::Queued);
        assert_eq!(event.channel_results.len(), 1);
    }

    #[tokio::test]
    async fn missing_forecast_is_recorded_without_stopping_siblings() {
        let store = Arc::new(InMemoryForecastStore::new());
        store
            .save_forecast(&forecast("churn", &[5.0, 12.0]))
            .await
            .unwrap();

        let evaluator = evaluator(store, 0);
        let rules = vec![
            rule("mrr", AlertCondition::new(Operator::Gt, 100.0)),
            rule("churn", AlertCondition::new(Operator::Gte, 10.0)),
        ];
        let results = evaluator.evaluate(&rules).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].triggered);
        assert!(results[0].error.as_deref().unwrap().contains("no forecast"));
        assert!(results[1].triggered);
        assert_eq!(results[1].trigger_value, Some(12.0));
    }

    #[tokio::test]
    async fn disabled_rules_are_skipped_cleanly() {
        let store = Arc::new(InMemoryForecastStore::new());
        store
            .save_forecast(&forecast("mrr", &[500.0]))
            .await
            .unwrap();

        let evaluator = evaluator(store, 0);
        let mut disabled = rule("mrr", AlertCondition::new(Operator::Gt, 100.0));
        disabled.enabled = false;

        let results = evaluator.evaluate(&[disabled]).await;
        assert!(!results[0].triggered);
        assert!(results[0].error.is_none());
        assert!(results[0].event.is_none());
    }

    #[tokio::test]
    async fn predictions_outside_horizon_are_a_soft_failure() {
        let store = Arc::new(InMemoryForecastStore::new());
        let mut distant = forecast("mrr", &[500.0]);
        distant.predictions[0].timestamp = Utc::now() + Duration::days(30);
        store.save_forecast(&distant).await.unwrap();

        let evaluator = evaluator(store, 0);
        let results = evaluator
            .evaluate(&[rule("mrr", AlertCondition::new(Operator::Gt, 100.0))])
            .await;

        assert!(!results[0].triggered);
        assert!(results[0].error.as_deref().unwrap().contains("no predictions"));
    }

    #[tokio::test]
    async fn storage_errors_stay_per_rule() {
        let evaluator = evaluator(Arc::new(FailingStore), 0);
        let results = evaluator
            .evaluate(&[rule("mrr", AlertCondition::new(Operator::Gt, 100.0))])
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].triggered);
        assert!(results[0].error.as_deref().unwrap().contains("read timed out"));
    }

    #[tokio::test]
    async fn suppression_window_withholds_refire() {
        let store = Arc::new(InMemoryForecastStore::new());
        store
            .save_forecast(&forecast("mrr", &[150.0]))
            .await
            .unwrap();

        let sender = Arc::new(CountingSender {
            sends: AtomicUsize::new(0),
        });
        let dispatcher =
            NotificationDispatcher::new().with_sender(ChannelKind::Email, sender.clone());
        let evaluator = AlertEvaluator::new(
            store,
            dispatcher,
            AlertingConfig {
                suppression_window_minutes: 15,
                default_horizon_days: 7,
            },
        );

        let rules = vec![rule("mrr", AlertCondition::new(Operator::Gt, 100.0))];

        let first = evaluator.evaluate(&rules).await;
        assert!(first[0].triggered);
        assert!(!first[0].suppressed);

        let second = evaluator.evaluate(&rules).await;
        assert!(!second[0].triggered);
        assert!(second[0].suppressed);
        assert_eq!(second[0].trigger_value, Some(150.0));

        // only the first pass delivered anything
        assert_eq!(sender.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_window_fires_on_every_pass() {
        let store = Arc::new(InMemoryForecastStore::new());
        store
            .save_forecast(&forecast("mrr", &[150.0]))
            .await
            .unwrap();

        let evaluator = evaluator(store, 0);
        let rules = vec![rule("mrr", AlertCondition::new(Operator::Gt, 100.0))];

        assert!(evaluator.evaluate(&rules).await[0].triggered);
        assert!(evaluator.evaluate(&rules).await[0].triggered);
    }

    #[tokio::test]
    async fn condition_not_met_is_quietly_untriggered() {
        let store = Arc::new(InMemoryForecastStore::new());
        store
            .save_forecast(&forecast("mrr", &[10.0, 20.0]))
            .await
            .unwrap();

        let evaluator = evaluator(store, 0);
        let results = evaluator
            .evaluate(&[rule("mrr", AlertCondition::new(Operator::Gt, 100.0))])
            .await;

        assert!(!results[0].triggered);
        assert!(results[0].error.is_none());
    }
}
