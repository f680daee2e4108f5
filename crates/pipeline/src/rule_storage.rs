//! Rule storage - where channel rules and remote write backends live
//!
//! Two implementations share one document model (`RulesDocument`):
//! `MemoryRuleStorage` for tests and embedding, `FileRuleStorage` for a JSON
//! file rewritten atomically (temp file + rename) on every change.
//!
//! Storage does not validate; the pipeline validates and test-builds a
//! rule before handing it to storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use live_config::{ChannelRuleConfig, OrgId, RemoteWriteBackend, RulesDocument};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{PipelineError, Result};

#[cfg(test)]
#[path = "rule_storage_test.rs"]
mod tests;

/// Persistence for channel rules, keyed by (org, pattern)
#[async_trait]
pub trait RuleStorage: Send + Sync {
    async fn list_channel_rules(&self, org_id: OrgId) -> Result<Vec<ChannelRuleConfig>>;

    async fn list_remote_write_backends(&self, org_id: OrgId) -> Result<Vec<RemoteWriteBackend>>;

    /// Fails with `RuleExists` if the org already has a rule for the pattern
    async fn create_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig>;

    /// Fails with `RuleNotFound` if there is nothing to replace
    async fn update_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig>;

    async fn delete_channel_rule(&self, org_id: OrgId, pattern: &str) -> Result<()>;
}

fn position(doc: &RulesDocument, org_id: OrgId, pattern: &str) -> Option<usize> {
    doc.rules
        .iter()
        .position(|r| r.org_id == org_id && r.pattern == pattern)
}

fn insert_rule(doc: &mut RulesDocument, rule: ChannelRuleConfig) -> Result<()> {
    if position(doc, rule.org_id, &rule.pattern).is_some() {
        return Err(PipelineError::RuleExists {
            org_id: rule.org_id,
            pattern: rule.pattern,
        });
    }
    doc.rules.push(rule);
    Ok(())
}

fn replace_rule(doc: &mut RulesDocument, rule: ChannelRuleConfig) -> Result<()> {
    match position(doc, rule.org_id, &rule.pattern) {
        Some(i) => {
            doc.rules[i] = rule;
            Ok(())
        }
        None => Err(PipelineError::RuleNotFound {
            org_id: rule.org_id,
            pattern: rule.pattern,
        }),
    }
}

fn remove_rule(doc: &mut RulesDocument, org_id: OrgId, pattern: &str) -> Result<()> {
    match position(doc, org_id, pattern) {
        Some(i) => {
            doc.rules.remove(i);
            Ok(())
        }
        None => Err(PipelineError::RuleNotFound {
            org_id,
            pattern: pattern.to_string(),
        }),
    }
}

// =============================================================================
// Memory
// =============================================================================

/// In-memory rule storage
#[derive(Debug, Default)]
pub struct MemoryRuleStorage {
    doc: RwLock<RulesDocument>,
}

impl MemoryRuleStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: RulesDocument) -> Self {
        Self {
            doc: RwLock::new(doc),
        }
    }

    /// Add or replace a remote write backend
    pub fn put_backend(&self, backend: RemoteWriteBackend) {
        let mut doc = self.doc.write();
        doc.remote_write_backends
            .retain(|b| !(b.org_id == backend.org_id && b.uid == backend.uid));
        doc.remote_write_backends.push(backend);
    }

    /// Copy of the whole document
    pub fn document(&self) -> RulesDocument {
        self.doc.read().clone()
    }
}

#[async_trait]
impl RuleStorage for MemoryRuleStorage {
    async fn list_channel_rules(&self, org_id: OrgId) -> Result<Vec<ChannelRuleConfig>> {
        Ok(self.doc.read().rules_for(org_id).cloned().collect())
    }

    async fn list_remote_write_backends(&self, org_id: OrgId) -> Result<Vec<RemoteWriteBackend>> {
        Ok(self.doc.read().backends_for(org_id).cloned().collect())
    }

    async fn create_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig> {
        insert_rule(&mut self.doc.write(), rule.clone())?;
        Ok(rule)
    }

    async fn update_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig> {
        replace_rule(&mut self.doc.write(), rule.clone())?;
        Ok(rule)
    }

    async fn delete_channel_rule(&self, org_id: OrgId, pattern: &str) -> Result<()> {
        remove_rule(&mut self.doc.write(), org_id, pattern)
    }
}

// =============================================================================
// File
// =============================================================================

/// Rule storage backed by a single JSON document on disk
///
/// The document is loaded once; every change is written to disk before it
/// becomes visible, so a failed write leaves both file and memory unchanged.
#[derive(Debug)]
pub struct FileRuleStorage {
    path: PathBuf,
    doc: Mutex<RulesDocument>,
}

impl FileRuleStorage {
    /// Load the document at `path`; a missing file is an empty document
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(data) => RulesDocument::from_slice(&data)?,
            Err(e) if e.kind() == ErrorKind::NotFound => RulesDocument::default(),
            Err(e) => return Err(storage_error(&path, e)),
        };
        debug!(path = %path.display(), rules = doc.rules.len(), "rule file loaded");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn modify<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut RulesDocument) -> Result<()>,
    {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }

    async fn persist(&self, doc: &RulesDocument) -> Result<()> {
        let data = doc.to_json_pretty()?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        debug!(path = %self.path.display(), rules = doc.rules.len(), "rule file written");
        Ok(())
    }
}

fn storage_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Storage {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl RuleStorage for FileRuleStorage {
    async fn list_channel_rules(&self, org_id: OrgId) -> Result<Vec<ChannelRuleConfig>> {
        Ok(self.doc.lock().await.rules_for(org_id).cloned().collect())
    }

    async fn list_remote_write_backends(&self, org_id: OrgId) -> Result<Vec<RemoteWriteBackend>> {
        Ok(self.doc.lock().await.backends_for(org_id).cloned().collect())
    }

    async fn create_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig> {
        let stored = rule.clone();
        self.modify(|doc| insert_rule(doc, stored)).await?;
        Ok(rule)
    }

    async fn update_channel_rule(&self, rule: ChannelRuleConfig) -> Result<ChannelRuleConfig> {
        let stored = rule.clone();
        self.modify(|doc| replace_rule(doc, stored)).await?;
        Ok(rule)
    }

    async fn delete_channel_rule(&self, org_id: OrgId, pattern: &str) -> Result<()> {
        self.modify(|doc| remove_rule(doc, org_id, pattern)).await
    }
}
