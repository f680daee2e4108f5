//! Tests for memory and file rule storage

use live_config::{OutputterConfig, RemoteWriteSettings};
use tempfile::TempDir;

use super::*;

fn rule(org_id: OrgId, pattern: &str) -> ChannelRuleConfig {
    ChannelRuleConfig::new(org_id, pattern).with_output(OutputterConfig::managed_stream())
}

fn backend(org_id: OrgId, uid: &str, endpoint: &str) -> RemoteWriteBackend {
    RemoteWriteBackend {
        org_id,
        uid: uid.to_string(),
        settings: RemoteWriteSettings {
            endpoint: endpoint.to_string(),
            user: None,
            password: None,
        },
    }
}

/// CRUD behavior every storage must have
async fn exercise_crud(storage: &dyn RuleStorage) {
    storage.create_channel_rule(rule(1, "stream/a/b")).await.unwrap();
    storage.create_channel_rule(rule(1, "stream/a/c")).await.unwrap();
    storage.create_channel_rule(rule(2, "stream/a/b")).await.unwrap();

    let err = storage.create_channel_rule(rule(1, "stream/a/b")).await.unwrap_err();
    assert!(matches!(err, PipelineError::RuleExists { org_id: 1, .. }));

    let org1 = storage.list_channel_rules(1).await.unwrap();
    assert_eq!(org1.len(), 2);
    assert_eq!(storage.list_channel_rules(2).await.unwrap().len(), 1);
    assert!(storage.list_channel_rules(3).await.unwrap().is_empty());

    let updated = rule(1, "stream/a/c").with_output(OutputterConfig::local_subscribers());
    storage.update_channel_rule(updated.clone()).await.unwrap();
    let org1 = storage.list_channel_rules(1).await.unwrap();
    assert!(org1.contains(&updated));

    let err = storage.update_channel_rule(rule(1, "stream/x/y")).await.unwrap_err();
    assert!(matches!(err, PipelineError::RuleNotFound { .. }));

    storage.delete_channel_rule(1, "stream/a/b").await.unwrap();
    assert_eq!(storage.list_channel_rules(1).await.unwrap().len(), 1);
    assert_eq!(storage.list_channel_rules(2).await.unwrap().len(), 1);

    let err = storage.delete_channel_rule(1, "stream/a/b").await.unwrap_err();
    assert!(matches!(err, PipelineError::RuleNotFound { .. }));
}

// =============================================================================
// Memory
// =============================================================================

#[tokio::test]
async fn test_memory_crud() {
    exercise_crud(&MemoryRuleStorage::new()).await;
}

#[tokio::test]
async fn test_memory_backends_are_org_scoped() {
    let storage = MemoryRuleStorage::new();
    storage.put_backend(backend(1, "prom", "http://a"));
    storage.put_backend(backend(2, "prom", "http://b"));
    storage.put_backend(backend(1, "prom", "http://c"));

    let org1 = storage.list_remote_write_backends(1).await.unwrap();
    assert_eq!(org1.len(), 1);
    assert_eq!(org1[0].settings.endpoint, "http://c");
    assert_eq!(storage.document().remote_write_backends.len(), 2);
}

// =============================================================================
// File
// =============================================================================

#[tokio::test]
async fn test_file_crud() {
    let dir = TempDir::new().unwrap();
    let storage = FileRuleStorage::open(dir.path().join("rules.json")).await.unwrap();
    exercise_crud(&storage).await;
}

#[tokio::test]
async fn test_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    let storage = FileRuleStorage::open(&path).await.unwrap();

    assert!(storage.list_channel_rules(1).await.unwrap().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_changes_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.json");

    let storage = FileRuleStorage::open(&path).await.unwrap();
    storage.create_channel_rule(rule(1, "stream/a/b")).await.unwrap();
    storage.create_channel_rule(rule(1, "stream/a/c")).await.unwrap();
    storage.delete_channel_rule(1, "stream/a/c").await.unwrap();
    drop(storage);

    let reopened = FileRuleStorage::open(&path).await.unwrap();
    assert_eq!(reopened.path(), path.as_path());
    let rules = reopened.list_channel_rules(1).await.unwrap();
    assert_eq!(rules, vec![rule(1, "stream/a/b")]);

    let doc = RulesDocument::from_file(&path).unwrap();
    assert_eq!(doc.rules.len(), 1);
    assert!(!dir.path().join("rules.json.tmp").exists());
}

#[tokio::test]
async fn test_reads_existing_document_with_backends() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.json");
    let doc = RulesDocument {
        rules: vec![rule(1, "stream/a/b")],
        remote_write_backends: vec![backend(1, "prom", "http://prom/write")],
    };
    std::fs::write(&path, doc.to_json_pretty().unwrap()).unwrap();

    let storage = FileRuleStorage::open(&path).await.unwrap();
    assert_eq!(storage.list_channel_rules(1).await.unwrap().len(), 1);
    let backends = storage.list_remote_write_backends(1).await.unwrap();
    assert_eq!(backends[0].uid, "prom");
    assert!(storage.list_remote_write_backends(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_file_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.json");
    std::fs::write(&path, b"{not json").unwrap();

    let err = FileRuleStorage::open(&path).await.unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn test_failed_write_leaves_state_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing-dir").join("rules.json");
    let storage = FileRuleStorage::open(&path).await.unwrap();

    let err = storage.create_channel_rule(rule(1, "stream/a/b")).await.unwrap_err();
    assert!(matches!(err, PipelineError::Storage { .. }));
    assert!(storage.list_channel_rules(1).await.unwrap().is_empty());
}
