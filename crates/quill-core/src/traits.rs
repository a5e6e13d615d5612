use crate::{
    error::QuillError,
    event::TypingEvent,
    insight::{GeneratedInsight, InsightRequest},
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Semantic Oracle trait — the external text-understanding service.
///
/// Both calls are synchronous from the caller's perspective, may be slow,
/// and may fail or return malformed payloads. Callers treat any
/// non-well-formed response as an error, never a crash.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Human-readable oracle name.
    fn name(&self) -> &str;

    /// Reduce a sentence to a short canonical intent label. Two sentences
    /// meaning the same thing must yield the same label.
    async fn canonicalize(&self, sentence: &str) -> Result<String, QuillError>;

    /// Generate a personalized insight from assembled context.
    async fn generate(&self, request: &InsightRequest) -> Result<GeneratedInsight, QuillError>;

    /// Check if the oracle is reachable and ready.
    async fn is_available(&self) -> bool;
}

/// Notification sink — fire-and-forget push delivery.
///
/// Delivery transport (FCM etc.) lives outside this core; failures are
/// logged by callers, never propagated.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<(), QuillError>;
}

/// A usage metric emitted by the core pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageMetric {
    /// A fragment row was inserted or its frequency bumped.
    FragmentRecorded,
    /// An existing fragment absorbed a longer continuation.
    FragmentAbsorbed,
    /// A scheduled insight was generated and persisted.
    InsightGenerated,
}

/// Insight accumulator sink — aggregates usage metrics downstream of both
/// the ingestion engine and the dispatcher.
#[async_trait]
pub trait InsightSink: Send + Sync {
    async fn record(&self, user_id: &str, metric: UsageMetric) -> Result<(), QuillError>;
}

/// Event source trait — where typing events come from.
///
/// Every transport (WebSocket relay, stdin feed, test harness) implements
/// this to hand events to the ingestion engine.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    /// Start producing events. Returns a receiver that yields them in
    /// arrival order.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<TypingEvent>, QuillError>;
}
