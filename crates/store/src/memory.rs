//! File-backed memory store.
//!
//! Holds a bounded interaction history, a set-like user profile and an open
//! context map. Every mutation is flushed to disk atomically (write to
//! `<path>.tmp`, then rename). If the file exists but cannot be read or
//! parsed, the store keeps working in memory and never overwrites it.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use study_agent_core::{
    config::MemoryConfig,
    types::{InteractionRecord, MemoryDocument, ScoredInteraction, UserProfile},
    Error, Result,
};

use crate::keyword;

/// Limits applied by the store.
#[derive(Debug, Clone, Copy)]
pub struct MemoryLimits {
    pub history_limit: usize,
    pub excerpt_chars: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            history_limit: 20,
            excerpt_chars: 500,
        }
    }
}

impl From<&MemoryConfig> for MemoryLimits {
    fn from(cfg: &MemoryConfig) -> Self {
        Self {
            history_limit: cfg.history_limit.max(1),
            excerpt_chars: cfg.excerpt_chars,
        }
    }
}

struct Inner {
    doc: MemoryDocument,
    /// None when running purely in memory.
    path: Option<PathBuf>,
}

/// Persistent session memory.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    limits: MemoryLimits,
}

impl MemoryStore {
    /// Open the store at `path`. Never fails.
    ///
    /// Absent file: start empty and create it. Corrupt or unreadable file:
    /// start empty with persistence disabled.
    pub async fn open(path: impl Into<PathBuf>, limits: MemoryLimits) -> Self {
        let path = path.into();

        let (doc, persist) = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<MemoryDocument>(&content) {
                Ok(doc) => {
                    tracing::info!(
                        path = %path.display(),
                        history = doc.history.len(),
                        "Loaded memory store"
                    );
                    (doc, true)
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Memory file is corrupt; continuing in memory without overwriting it"
                    );
                    (MemoryDocument::default(), false)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Memory file absent; creating");
                (MemoryDocument::default(), true)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Memory file unreadable; continuing in memory"
                );
                (MemoryDocument::default(), false)
            }
        };

        let mut doc = doc;
        trim_history(&mut doc.history, limits.history_limit);

        let mut inner = Inner {
            doc,
            path: persist.then_some(path),
        };
        if inner.path.is_some() {
            if let Err(e) = flush(&mut inner).await {
                tracing::warn!(error = %e, "Initial memory flush failed");
            }
        }

        Self {
            inner: Mutex::new(inner),
            limits,
        }
    }

    /// Store without any backing file.
    pub fn in_memory(limits: MemoryLimits) -> Self {
        Self {
            inner: Mutex::new(Inner {
                doc: MemoryDocument::default(),
                path: None,
            }),
            limits,
        }
    }

    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// Whether mutations are still being written to disk.
    pub async fn is_persistent(&self) -> bool {
        self.inner.lock().await.path.is_some()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append one interaction, truncating the response and evicting the oldest
    /// entries beyond the history limit.
    pub async fn record_interaction(
        &self,
        query: &str,
        response: &str,
        agents: Vec<String>,
    ) -> Result<()> {
        let excerpt = truncate_chars(response, self.limits.excerpt_chars);
        let mut inner = self.inner.lock().await;
        inner
            .doc
            .history
            .push(InteractionRecord::new(query, excerpt, agents));
        trim_history(&mut inner.doc.history, self.limits.history_limit);
        tracing::debug!(history = inner.doc.history.len(), "Recorded interaction");
        flush(&mut inner).await
    }

    /// Merge profile signals. Flushes only when something new was added.
    pub async fn update_profile(&self, signals: &UserProfile) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let changed = inner.doc.profile.merge(signals);
        if changed {
            tracing::debug!(profile = ?inner.doc.profile, "Profile updated");
            flush(&mut inner).await?;
        }
        Ok(changed)
    }

    pub async fn set_context(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.doc.context.insert(key.to_string(), value);
        flush(&mut inner).await
    }

    /// Drop all history, profile and context.
    pub async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.doc = MemoryDocument::default();
        flush(&mut inner).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The last `n` history entries, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<InteractionRecord> {
        let inner = self.inner.lock().await;
        let history = &inner.doc.history;
        history[history.len().saturating_sub(n)..].to_vec()
    }

    pub async fn profile(&self) -> UserProfile {
        self.inner.lock().await.doc.profile.clone()
    }

    pub async fn context(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.doc.context.get(key).cloned()
    }

    pub async fn snapshot(&self) -> MemoryDocument {
        self.inner.lock().await.doc.clone()
    }

    /// Keyword search over history. See [`keyword::rank`].
    pub async fn search(
        &self,
        query: &str,
        min_overlap: usize,
        limit: usize,
    ) -> Vec<ScoredInteraction> {
        let inner = self.inner.lock().await;
        keyword::rank(&inner.doc.history, query, min_overlap, limit)
    }
}

fn trim_history(history: &mut Vec<InteractionRecord>, limit: usize) {
    if history.len() > limit {
        let excess = history.len() - limit;
        history.drain(..excess);
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the document atomically. On failure persistence is disabled for the
/// rest of the process and the error is returned.
async fn flush(inner: &mut Inner) -> Result<()> {
    let Some(path) = inner.path.clone() else {
        return Ok(());
    };

    match write_atomic(&path, &inner.doc).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Memory flush failed; persistence disabled"
            );
            inner.path = None;
            Err(e)
        }
    }
}

async fn write_atomic(path: &Path, doc: &MemoryDocument) -> Result<()> {
    let content = serde_json::to_string_pretty(doc)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::persistence(format!("Failed to create memory directory: {}", e)))?;
    }

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|e| Error::persistence(format!("Failed to write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::persistence(format!("Failed to replace {}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_tmp_path() {
        assert_eq!(tmp_path(Path::new("/a/memory.json")), PathBuf::from("/a/memory.json.tmp"));
    }

    #[tokio::test]
    async fn test_in_memory_store_evicts_fifo() {
        let store = MemoryStore::in_memory(MemoryLimits {
            history_limit: 3,
            excerpt_chars: 5,
        });
        for i in 0..5 {
            store
                .record_interaction(&format!("q{i}"), "a long response", vec![])
                .await
                .unwrap();
        }
        let recent = store.recent(10).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].query, "q2");
        assert_eq!(recent[2].response, "a lon");
        assert!(!store.is_persistent().await);
    }
}
