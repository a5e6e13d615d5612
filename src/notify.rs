//! Log-only notification sink.
//!
//! Push delivery (FCM etc.) is an external collaborator; this sink keeps
//! the dispatcher's contract exercised by logging the full payload.

use async_trait::async_trait;
use quill_core::{error::QuillError, traits::NotificationSink};
use std::collections::HashMap;
use tracing::info;

pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<(), QuillError> {
        info!("notify [{user_id}] {title}: {body} | data: {data:?}");
        Ok(())
    }
}
