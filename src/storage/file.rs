//! File-Backed Embedding Store
//!
//! Records live in an append-only log and are mirrored in memory for scans.
//! An append is acknowledged only after the log write has been synced.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::{validate_message, EmbeddingStore, TextEmbedding, WriteHealth};
use crate::error::{RagError, Result};
use crate::persistence::{AofConfig, AofEntry, AofLog};

struct Inner {
    log: AofLog,
    records: RwLock<Vec<TextEmbedding>>,
    /// Next id to hand out. Held for the whole append so ids, log order and
    /// scan order agree.
    next_id: Mutex<u64>,
}

impl Inner {
    fn append_blocking(&self, message: String, vector: Bytes) -> Result<TextEmbedding> {
        let mut next_id = self.next_id.lock();
        let entry = AofEntry::new(*next_id, message, vector);

        self.log.append(&entry)?;
        *next_id += 1;

        let record = TextEmbedding {
            id: entry.id,
            message: entry.message,
            vector: entry.vector,
        };
        self.records.write().push(record.clone());
        Ok(record)
    }
}

/// Durable embedding store
#[derive(Clone)]
pub struct FileEmbeddingStore {
    inner: Arc<Inner>,
}

impl FileEmbeddingStore {
    /// Open (or create) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(AofConfig::default().with_path(path.as_ref()))
    }

    /// Open with explicit log settings
    pub fn with_config(config: AofConfig) -> Result<Self> {
        let (log, entries) = AofLog::open(config)?;

        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let records = entries
            .into_iter()
            .map(|e| TextEmbedding {
                id: e.id,
                message: e.message,
                vector: e.vector,
            })
            .collect();

        Ok(Self {
            inner: Arc::new(Inner {
                log,
                records: RwLock::new(records),
                next_id: Mutex::new(next_id),
            }),
        })
    }

    /// Path of the backing log
    pub fn path(&self) -> &Path {
        self.inner.log.path()
    }
}

#[async_trait]
impl EmbeddingStore for FileEmbeddingStore {
    async fn append(&self, message: &str, vector: Bytes) -> Result<TextEmbedding> {
        validate_message(message)?;

        let inner = self.inner.clone();
        let message = message.to_string();
        let record = tokio::task::spawn_blocking(move || inner.append_blocking(message, vector))
            .await
            .map_err(|e| RagError::Persistence(format!("append task failed: {}", e)))??;

        debug!(id = record.id, "Appended embedding record");
        Ok(record)
    }

    async fn scan_all(&self) -> Result<Vec<TextEmbedding>> {
        Ok(self.inner.records.read().clone())
    }

    fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    fn write_health(&self) -> WriteHealth {
        if let Some(reason) = self.inner.log.poisoned() {
            return WriteHealth::ReadOnly(reason);
        }
        match self.inner.log.last_error() {
            Some(error) => WriteHealth::LastAppendFailed(error),
            None => WriteHealth::Ok,
        }
    }
}
