//! Stdin event source — JSON lines in, typing events out.
//!
//! One event per line: `{"user_id": "...", "app_context": "...",
//! "text": "...", "is_full_snapshot": false}`. Malformed lines are
//! logged and skipped; EOF stops the source.

use async_trait::async_trait;
use quill_core::{error::QuillError, event::TypingEvent, traits::EventSource};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct StdinSource;

#[async_trait]
impl EventSource for StdinSource {
    fn name(&self) -> &str {
        "stdin"
    }

    async fn start(&self) -> Result<mpsc::Receiver<TypingEvent>, QuillError> {
        let (tx, rx) = mpsc::channel::<TypingEvent>(256);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let mut lines = BufReader::new(stdin).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<TypingEvent>(line) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("stdin: skipping malformed event: {e}"),
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed, event source stopping");
                        break;
                    }
                    Err(e) => {
                        error!("stdin read failed: {e}");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }
}
