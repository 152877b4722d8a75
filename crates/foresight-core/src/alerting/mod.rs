//! Alerting system for Foresight
//!
//! Evaluates alert rules against forecasts and delivers triggered alerts
//! through per-channel senders with failure isolation.

mod dispatcher;
mod evaluator;

pub use dispatcher::{
    AlertContent, ChannelSender, NotificationDispatcher, SendError, SendReceipt, SlackSender,
    WebhookSender,
};
pub use evaluator::AlertEvaluator;
