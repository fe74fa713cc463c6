//! Chat routing policy: turns a classifier prediction into a routing
//! decision (skip generation, annotate risk, cache an answer) and records
//! the savings.

mod metrics;
mod policy;

pub use metrics::{TokenMetrics, TokenMetricsSnapshot};
pub use policy::{ChatMessage, ChatRole, RiskLevel, RoutingDecision, augment_chat_context, route_chat};
