//! Schedule Dispatcher — minute-tick evaluation and idempotent firing.
//!
//! Each tick scans every schedule, decides due-ness per schedule (errors
//! isolated), and runs one firing task per due schedule. The firing claim
//! (`last_fired_at`) is committed durably before any generation work, so
//! a slow or crashing Oracle call can never cause a double fire — a
//! missed firing is acceptable, a duplicate is not.

use chrono::{DateTime, Local, NaiveTime, Utc};
use chrono_tz::Tz;
use quill_core::{
    config::{DispatcherConfig, MemoryConfig},
    error::QuillError,
    insight::{GeneratedInsight, InsightRequest},
    traits::{InsightSink, NotificationSink, Oracle, UsageMetric},
};
use quill_memory::{Schedule, Store};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};


/// The schedule dispatcher.
pub struct Dispatcher {
    store: Store,
    oracle: Arc<dyn Oracle>,
    notifier: Arc<dyn NotificationSink>,
    sink: Arc<dyn InsightSink>,
    config: DispatcherConfig,
    memory_config: MemoryConfig,
}

impl Dispatcher {
    pub fn new(
        store: Store,
        oracle: Arc<dyn Oracle>,
        notifier: Arc<dyn NotificationSink>,
        sink: Arc<dyn InsightSink>,
        config: DispatcherConfig,
        memory_config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            notifier,
            sink,
            config,
            memory_config,
        }
    }

    /// Background task: tick forever.
    pub async fn run(self: Arc<Self>) {
        info!(
            "dispatcher running | tick every {}s | oracle: {}",
            self.config.tick_secs,
            self.oracle.name()
        );
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(self.config.tick_secs)).await;
            self.tick(Utc::now()).await;
        }
    }

    /// Evaluate one tick at the given instant.
    ///
    /// Due firings run concurrently; the tick waits for them so a slow
    /// Oracle call delays only its own schedule, never the next scan.
    pub async fn tick(self: &Arc<Self>, now: DateTime<Utc>) {
        let schedules = match self.store.all_schedules().await {
            Ok(s) => s,
            Err(e) => {
                error!("tick: failed to load schedules: {e}");
                return;
            }
        };

        let mut firings = Vec::new();
        for schedule in schedules {
            match is_due(&schedule, now) {
                Ok(true) => {
                    let dispatcher = Arc::clone(self);
                    firings.push(tokio::spawn(async move {
                        dispatcher.fire(schedule, now).await;
                    }));
                }
                Ok(false) => {}
                Err(e) => {
                    // Misconfigured schedules must not poison the tick.
                    warn!("schedule {} treated as not due: {e}", schedule.id);
                }
            }
        }

        for handle in firings {
            let _ = handle.await;
        }
    }

    /// Fire one due schedule: claim the minute, then generate, persist,
    /// and notify. Nothing after the claim is ever rolled back.
    async fn fire(&self, schedule: Schedule, now: DateTime<Utc>) {
        match self.store.claim_firing(&schedule.id, now).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("schedule {} already claimed this minute", schedule.id);
                return;
            }
            Err(e) => {
                error!("schedule {}: claim failed, not firing: {e}", schedule.id);
                return;
            }
        }

        info!(
            "firing schedule '{}' ({}) for user {}",
            schedule.title, schedule.id, schedule.user_id
        );

        let request = self.gather_context(&schedule).await;
        let insight = match self.oracle.generate(&request).await {
            Ok(insight) => insight,
            Err(e) => {
                warn!(
                    "schedule {}: generation failed, storing placeholder: {e}",
                    schedule.id
                );
                GeneratedInsight::standing_by(&schedule.title)
            }
        };

        let source_tag = format!("scheduler_{}", schedule.id);
        let memory_id = match self
            .store
            .store_memory(&schedule.user_id, &insight.full_result, &source_tag)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // last_fired_at stays committed: a lost firing, not a double one.
                error!("schedule {}: failed to persist insight: {e}", schedule.id);
                return;
            }
        };

        if let Err(e) = self
            .sink
            .record(&schedule.user_id, UsageMetric::InsightGenerated)
            .await
        {
            debug!("usage metric dropped: {e}");
        }

        let data = HashMap::from([
            ("type".to_string(), "scheduled_insight".to_string()),
            ("memory_id".to_string(), memory_id),
            ("title".to_string(), insight.title.clone()),
            ("description".to_string(), insight.short_description.clone()),
        ]);

        if let Err(e) = self
            .notifier
            .notify(
                &schedule.user_id,
                &insight.title,
                &insight.short_description,
                &data,
            )
            .await
        {
            warn!("schedule {}: notification failed: {e}", schedule.id);
        }
    }

    /// Gather the bounded context windows for generation. A failed read
    /// degrades to an empty window.
    async fn gather_context(&self, schedule: &Schedule) -> InsightRequest {
        let user = &schedule.user_id;

        let fragments = self
            .store
            .recent_fragments(user, self.memory_config.context_fragments)
            .await
            .unwrap_or_else(|e| {
                warn!("context: typing history unavailable: {e}");
                Vec::new()
            });
        let memories = self
            .store
            .recent_memories(user, self.memory_config.context_memories)
            .await
            .unwrap_or_else(|e| {
                warn!("context: memories unavailable: {e}");
                Vec::new()
            });
        let actions = self
            .store
            .recent_actions(user, self.memory_config.context_actions)
            .await
            .unwrap_or_else(|e| {
                warn!("context: action history unavailable: {e}");
                Vec::new()
            });

        InsightRequest {
            action_description: schedule.action_description.clone(),
            typing_history: fragments
                .iter()
                .map(|f| format!("{} (Logged on {})", f.content, f.updated_at))
                .collect(),
            memories: memories
                .iter()
                .map(|m| format!("{} (Logged on {})", m.content, m.created_at))
                .collect(),
            action_history: actions
                .iter()
                .map(|a| {
                    format!(
                        "{}: {} at {}",
                        a.decision.to_uppercase(),
                        a.context.as_deref().unwrap_or(&a.action_id),
                        a.created_at
                    )
                })
                .collect(),
            current_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Decide whether a schedule is due at `now_utc`.
///
/// Checked in order: the same-minute double-fire guard, the local
/// time-of-day match, then recurrence (Everyday, weekday name, calendar
/// date — first match wins). Bad timezone or time-of-day values surface
/// as `ScheduleConfig` errors for the caller to isolate.
pub fn is_due(schedule: &Schedule, now_utc: DateTime<Utc>) -> Result<bool, QuillError> {
    // 1. Minute-granularity double-fire guard.
    if let Some(last) = &schedule.last_fired_at {
        let current_minute = now_utc.format("%Y-%m-%d %H:%M").to_string();
        if last.starts_with(&current_minute) {
            return Ok(false);
        }
    }

    // 2. Local time must match HH:mm exactly.
    let tz: Tz = if schedule.timezone.trim().is_empty() {
        Tz::UTC
    } else {
        schedule.timezone.parse().map_err(|_| {
            QuillError::ScheduleConfig(format!("unknown timezone '{}'", schedule.timezone))
        })?
    };

    NaiveTime::parse_from_str(&schedule.time_of_day, "%H:%M").map_err(|_| {
        QuillError::ScheduleConfig(format!("unparseable time_of_day '{}'", schedule.time_of_day))
    })?;

    let local = now_utc.with_timezone(&tz);
    if local.format("%H:%M").to_string() != schedule.time_of_day {
        return Ok(false);
    }

    // 3. Recurrence, first match wins.
    if schedule.recurrence == "Everyday" {
        return Ok(true);
    }
    if schedule.recurrence == local.format("%A").to_string() {
        return Ok(true);
    }
    if schedule.recurrence == local.format("%Y-%m-%d").to_string() {
        return Ok(true);
    }

    Ok(false)
}
