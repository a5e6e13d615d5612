use super::*;

#[test]
fn test_defaults_when_sections_missing() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.quill.name, "quill");
    assert_eq!(cfg.ingest.absorption_window_secs, 60);
    assert_eq!(cfg.dispatcher.tick_secs, 60);
    assert!(cfg.dispatcher.enabled);
    assert_eq!(cfg.memory.context_fragments, 30);
    assert_eq!(cfg.memory.context_memories, 20);
    assert_eq!(cfg.memory.context_actions, 15);
}

#[test]
fn test_partial_section_fills_defaults() {
    let toml_str = r#"
        [ingest]
        absorption_window_secs = 120
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.ingest.absorption_window_secs, 120);
    assert_eq!(cfg.ingest.queue_capacity, 256);
}

#[test]
fn test_dispatcher_can_be_disabled() {
    let toml_str = r#"
        [dispatcher]
        enabled = false
        tick_secs = 30
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert!(!cfg.dispatcher.enabled);
    assert_eq!(cfg.dispatcher.tick_secs, 30);
}

#[test]
fn test_oracle_section() {
    let toml_str = r#"
        [oracle]
        api_key = "AIza-test"
        model = "gemini-2.5-pro"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.oracle.api_key, "AIza-test");
    assert_eq!(cfg.oracle.model, "gemini-2.5-pro");
}

#[test]
fn test_shellexpand_home() {
    std::env::set_var("HOME", "/home/tester");
    assert_eq!(shellexpand("~/data/quill.db"), "/home/tester/data/quill.db");
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
