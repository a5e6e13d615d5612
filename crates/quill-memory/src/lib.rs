//! # quill-memory
//!
//! Persistent store for Quill (SQLite-backed): deduplicated typing
//! fragments, schedules, memories, user actions, and usage counters.

pub mod store;

pub use store::fragments::TypingFragment;
pub use store::schedules::Schedule;
pub use store::Store;
