//! Context Ingestion Engine — raw text events in, deduplicated intent
//! history out.
//!
//! Events for the same `(user_id, app_context)` are processed in arrival
//! order on a dedicated worker, never overlapping; different keys run
//! fully in parallel. The ordering invariant is structural (one bounded
//! queue per key), not incidental.

use quill_core::{
    atomizer::{atomize, scrub_pii},
    config::IngestConfig,
    event::TypingEvent,
    traits::{InsightSink, UsageMetric},
};
use quill_memory::Store;
use quill_oracle::Fingerprinter;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

#[cfg(test)]
mod tests;

/// The ingestion engine. Cheap to share behind an `Arc`.
pub struct IngestEngine {
    store: Store,
    fingerprinter: Arc<Fingerprinter>,
    sink: Arc<dyn InsightSink>,
    absorption_window_secs: i64,
    queue_capacity: usize,
    /// One live sender per `(user_id, app_context)` key.
    workers: Mutex<HashMap<String, mpsc::Sender<TypingEvent>>>,
}

impl IngestEngine {
    pub fn new(
        store: Store,
        fingerprinter: Arc<Fingerprinter>,
        sink: Arc<dyn InsightSink>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            fingerprinter,
            sink,
            absorption_window_secs: config.absorption_window_secs,
            queue_capacity: config.queue_capacity,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Hand an event to its per-key worker. Fire-and-forget: the caller's
    /// response path never waits on persistence.
    pub async fn submit(self: &Arc<Self>, event: TypingEvent) {
        let key = event.ingest_key();

        let tx = {
            let mut workers = self.workers.lock().await;
            workers
                .entry(key.clone())
                .or_insert_with(|| self.spawn_worker(key.clone()))
                .clone()
        };

        if let Err(e) = tx.send(event).await {
            // The worker died with its queue; replace it and retry once.
            warn!("ingest worker for {key} was gone, respawning: {e}");
            let tx = {
                let mut workers = self.workers.lock().await;
                let tx = self.spawn_worker(key.clone());
                workers.insert(key.clone(), tx.clone());
                tx
            };
            if let Err(e) = tx.send(e.0).await {
                error!("ingest: dropping event for {key}: {e}");
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, key: String) -> mpsc::Sender<TypingEvent> {
        let (tx, mut rx) = mpsc::channel::<TypingEvent>(self.queue_capacity);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                engine.process_event(&event).await;
            }
            debug!("ingest worker for {key} stopped");
        });
        tx
    }

    /// Process one event: atomize, scrub, absorb-or-upsert.
    ///
    /// Runs atoms strictly in order so the absorption lookup always sees
    /// the effects of earlier atoms in the same event. A storage failure
    /// on one atom is logged and skipped; the rest still run.
    pub async fn process_event(&self, event: &TypingEvent) {
        if event.is_full_snapshot {
            // Full-window snapshots feed analysis reads only.
            debug!("[{}] full snapshot skipped", event.ingest_key());
            return;
        }

        let atoms = atomize(&event.text);
        if atoms.is_empty() {
            return;
        }
        let last = atoms.len() - 1;

        for (i, atom) in atoms.iter().enumerate() {
            let cleaned = scrub_pii(atom);

            if i == last && self.try_absorb(event, &cleaned).await {
                continue;
            }

            let Some(fp) = self.fingerprinter.fingerprint(&cleaned).await else {
                debug!("[{}] atom yielded no fingerprint, skipped", event.ingest_key());
                continue;
            };

            match self
                .store
                .upsert_fragment(&event.user_id, &event.app_context, &cleaned, &fp.hash)
                .await
            {
                Ok(()) => {
                    self.record_metric(&event.user_id, UsageMetric::FragmentRecorded)
                        .await
                }
                Err(e) => {
                    error!(
                        "[{}] fragment write failed, atom skipped: {e}",
                        event.ingest_key()
                    );
                }
            }
        }
    }

    /// Expansion absorption for the last atom of an event.
    ///
    /// Returns `true` when the atom was handled here — absorbed into the
    /// most recent fragment, or lost to a write error that must not turn
    /// into a duplicate insert.
    async fn try_absorb(&self, event: &TypingEvent, cleaned: &str) -> bool {
        let candidate = match self
            .store
            .absorption_candidate(
                &event.user_id,
                &event.app_context,
                self.absorption_window_secs,
            )
            .await
        {
            Ok(c) => c,
            Err(e) => {
                // Degrade to the normal upsert path; one missed merge
                // beats a stalled pipeline.
                warn!("[{}] absorption lookup failed: {e}", event.ingest_key());
                return false;
            }
        };

        let Some(fragment) = candidate else {
            return false;
        };

        // Strict prefix only: the new atom must be the same thought, longer.
        if cleaned.len() <= fragment.content.len() || !cleaned.starts_with(&fragment.content) {
            return false;
        }

        let fp = self.fingerprinter.fingerprint(cleaned).await;
        match self
            .store
            .absorb_fragment(&fragment.id, cleaned, fp.as_ref().map(|f| f.hash.as_str()))
            .await
        {
            Ok(()) => {
                debug!(
                    "[{}] absorbed '{}' into fragment {}",
                    event.ingest_key(),
                    cleaned,
                    fragment.id
                );
                self.record_metric(&event.user_id, UsageMetric::FragmentAbsorbed)
                    .await;
                true
            }
            Err(e) => {
                error!(
                    "[{}] absorption write failed, atom skipped: {e}",
                    event.ingest_key()
                );
                true
            }
        }
    }

    async fn record_metric(&self, user_id: &str, metric: UsageMetric) {
        if let Err(e) = self.sink.record(user_id, metric).await {
            debug!("usage metric dropped: {e}");
        }
    }
}
