//! Storage backends for the document.
//!
//! Persistence uses an atomic "write-then-rename" strategy so a crash
//! mid-save never leaves a half-written document behind. Backends never
//! cache: every load reads the backing state fresh, and a save rewrites it
//! wholesale. When two writers race, the last save wins.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs;

use crate::engine::document::Document;
use crate::{Error, Result};

/// Where the document lives between operations.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads and decodes the entire document.
    async fn load(&self) -> Result<Document>;
    /// Serializes and rewrites the entire document.
    async fn save(&self, document: &Document) -> Result<()>;
}

/// File-backed storage: one pretty-printed JSON file.
///
/// The format matches what the CRM frontend ships with, so an existing data
/// file drops in unchanged: two-space indentation, collection order and
/// record field order exactly as loaded.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates parent directories and seeds an empty document when the file
    /// does not exist yet.
    ///
    /// `load` treats a missing file as [`Error::StorageUnavailable`];
    /// seeding is an explicit startup step, never something a read does on
    /// its own.
    pub async fn ensure_exists(&self) -> Result<()> {
        match fs::try_exists(&self.path).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => return Err(Error::StorageUnavailable(e.to_string())),
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
            }
        }
        self.save(&Document::seed()).await
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self) -> Result<Document> {
        let bytes = fs::read(&self.path).await.map_err(|e| {
            Error::StorageUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let document: Document = serde_json::from_slice(&bytes)
            .map_err(|e| Error::CorruptDocument(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    async fn save(&self, document: &Document) -> Result<()> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("json");
        let temp_path = self.path.with_extension(format!("{}.tmp", ext));

        let bytes = serde_json::to_vec_pretty(document)?;

        fs::write(&temp_path, bytes)
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        Ok(())
    }
}

/// In-memory storage with the same load/save contract, for tests and
/// throwaway embedded use.
pub struct MemoryStorage {
    document: RwLock<Document>,
}

impl MemoryStorage {
    pub fn new(document: Document) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Starts from a seeded empty document.
    pub fn seeded() -> Self {
        Self::new(Document::seed())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<Document> {
        Ok(self.document.read().unwrap().clone())
    }

    async fn save(&self, document: &Document) -> Result<()> {
        *self.document.write().unwrap() = document.clone();
        Ok(())
    }
}
