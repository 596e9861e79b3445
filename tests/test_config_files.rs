//! Checks that the bundled config, prompt and knowledge files stay usable.

use std::fs;
use std::path::Path;

use obat_bot::config::{self, Overrides};
use obat_bot::engine::Priority;
use obat_bot::knowledge::KnowledgeStore;

#[test]
fn test_medical_prompt_file_exists() {
    let text = fs::read_to_string("config/prompts/medical_assistant.txt")
        .expect("medical_assistant.txt prompt file missing");
    assert!(text.contains("asisten medis"));
}

#[test]
fn test_default_config_loads() {
    let cfg = config::load_from(Path::new(config::DEFAULT_CONFIG_PATH), &Overrides::default()).unwrap();
    assert_eq!(cfg.router.priority, Priority::KbFirst);
    assert_eq!(cfg.llm.provider, "ollama");
    assert!(cfg.load_system_prompt().unwrap().is_some());
}

#[test]
fn test_bundled_knowledge_base_loads() {
    let store = KnowledgeStore::from_file(Path::new("config/knowledge_base.json")).unwrap();
    let names: Vec<&str> = store.categories().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["diabetes", "kolesterol", "hipertensi"]);
    assert_eq!(store.entry_count(), 3);
}
