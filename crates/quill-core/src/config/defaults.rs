//! Default values for config fields.

pub(super) fn default_name() -> String {
    "quill".to_string()
}

pub(super) fn default_data_dir() -> String {
    "~/.quill".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_oracle_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub(super) fn default_db_path() -> String {
    "~/.quill/data/quill.db".to_string()
}

pub(super) fn default_context_fragments() -> u32 {
    30
}

pub(super) fn default_context_memories() -> u32 {
    20
}

pub(super) fn default_context_actions() -> u32 {
    15
}

pub(super) fn default_absorption_window() -> i64 {
    60
}

pub(super) fn default_queue_capacity() -> usize {
    256
}

pub(super) fn default_tick_secs() -> u64 {
    60
}

pub(super) fn default_true() -> bool {
    true
}
