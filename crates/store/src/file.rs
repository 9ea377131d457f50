//! JSON file-backed document store with atomic writes.
//!
//! Several processes may share one file. Writes go to disk under an exclusive
//! lock on a sidecar `.lock` file: the file is re-read and only the documents
//! this handle committed are merged in, the higher version winning.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::document::{Document, Write};
use crate::memory::{Collections, MemoryDocumentStore};
use crate::query::Query;
use crate::subscription::QuerySubscription;
use crate::{DocumentStore, StoreError};

/// On-disk layout: collection name to its documents.
type PersistedState = BTreeMap<String, Vec<Document>>;

/// Collection and id of a document.
type DocumentKey = (String, String);

/// JSON file store. Loaded to memory on open, merged back on flush.
pub struct FileDocumentStore {
    path: PathBuf,
    inner: MemoryDocumentStore,
    /// Documents committed through this handle since the last flush.
    changed: Mutex<BTreeSet<DocumentKey>>,
}

impl FileDocumentStore {
    /// Load existing file or create empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let collections = Self::load_if_exists(&path)?;

        debug!(path = %path.display(), collections = collections.len(), "opened document store");

        Ok(Self {
            path,
            inner: MemoryDocumentStore::from_collections(collections),
            changed: Mutex::new(BTreeSet::new()),
        })
    }

    /// Open the store, making parent directories if needed.
    pub fn open_with_create_dir(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn load_if_exists(path: &Path) -> Result<Collections, StoreError> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Collections::new())
        }
    }

    fn load_from_file(path: &Path) -> Result<Collections, StoreError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let state: PersistedState = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(state
            .into_iter()
            .map(|(name, docs)| {
                let docs = docs.into_iter().map(|doc| (doc.id.clone(), doc)).collect();
                (name, docs)
            })
            .collect())
    }

    fn save_to_file(&self, collections: &Collections) -> Result<(), StoreError> {
        let state: PersistedState = collections
            .iter()
            .map(|(name, docs)| (name.clone(), docs.values().cloned().collect()))
            .collect();

        // Write to temp file first, then rename (atomic)
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &state)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Merge `changed` into the file under the lock, then take in whatever
    /// other writers left there.
    fn persist(&self, changed: &BTreeSet<DocumentKey>) -> Result<(), StoreError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock_file)?;

        let mut merged = Self::load_if_exists(&self.path)?;
        for (collection, id) in changed {
            let Some(ours) = self.inner.document(collection, id) else {
                continue;
            };
            let docs = merged.entry(collection.clone()).or_default();
            let newer = docs
                .get(id)
                .map(|theirs| theirs.version)
                .filter(|version| *version > ours.version);
            match newer {
                Some(theirs) => warn!(
                    collection = %collection,
                    id = %id,
                    ours = ours.version,
                    theirs,
                    "newer document on disk, keeping it"
                ),
                None => {
                    docs.insert(id.clone(), ours);
                }
            }
        }

        self.save_to_file(&merged)?;
        drop(lock_file);

        debug!(path = %self.path.display(), documents = changed.len(), "persisted document store");
        self.inner.adopt(merged);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn commit(&self, write: Write) -> Result<u64, StoreError> {
        let key = (write.collection.clone(), write.id.clone());
        let version = self.inner.commit(write).await?;
        self.changed.lock().insert(key);
        Ok(version)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query).await
    }

    fn listen(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        self.inner.listen(query)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut changed = self.changed.lock();
        if !changed.is_empty() {
            self.persist(&changed)?;
            changed.clear();
        }
        Ok(())
    }
}

impl Drop for FileDocumentStore {
    fn drop(&mut self) {
        let changed = std::mem::take(self.changed.get_mut());
        if !changed.is_empty() {
            if let Err(e) = self.persist(&changed) {
                warn!(path = %self.path.display(), error = %e, "failed to persist document store");
            }
        }
    }
}
