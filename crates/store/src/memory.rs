//! In-memory document store (does not persist across restarts).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::trace;

use crate::document::{Document, Write};
use crate::query::Query;
use crate::subscription::{QueryEvent, QuerySubscription};
use crate::{DocumentStore, StoreError};

/// Collection name to documents keyed by id.
pub(crate) type Collections = HashMap<String, BTreeMap<String, Document>>;

/// Failure injected into upcoming commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFault {
    Conflict,
    Unavailable,
}

struct Listener {
    query: Query,
    tx: mpsc::UnboundedSender<QueryEvent>,
    /// Last result delivered, to suppress unchanged updates.
    last: Vec<Document>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: HashMap<u64, Listener>,
}

#[derive(Default)]
struct Inner {
    data: RwLock<Collections>,
    listeners: Mutex<Listeners>,
    faults: Mutex<VecDeque<CommitFault>>,
    commits: AtomicU64,
    closed: AtomicBool,
}

/// In-memory store. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_collections(collections: Collections) -> Self {
        let store = Self::new();
        *store.inner.data.write() = collections;
        store
    }

    pub(crate) fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.inner
            .data
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Take in documents written elsewhere. A local document is only
    /// replaced by a higher version.
    pub(crate) fn adopt(&self, collections: Collections) {
        let mut data = self.inner.data.write();
        let mut touched = Vec::new();
        for (name, docs) in collections {
            let local = data.entry(name.clone()).or_default();
            let mut changed = false;
            for (id, doc) in docs {
                if local.get(&id).is_none_or(|current| current.version < doc.version) {
                    local.insert(id, doc);
                    changed = true;
                }
            }
            if changed {
                touched.push(name);
            }
        }

        for name in &touched {
            trace!(collection = %name, "adopted external documents");
            self.notify(name, &data);
        }
    }

    /// Number of successfully committed writes.
    pub fn commit_count(&self) -> u64 {
        self.inner.commits.load(Ordering::Relaxed)
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.inner
            .data
            .read()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().entries.len()
    }

    /// Refuse further operations and end every live query.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Relaxed);
        self.inner.listeners.lock().entries.clear();
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.inner.closed.load(Ordering::Relaxed) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn apply(&self, write: Write) -> Result<u64, StoreError> {
        self.ensure_open()?;

        if let Some(fault) = self.inner.faults.lock().pop_front() {
            trace!(collection = %write.collection, id = %write.id, ?fault, "injected commit fault");
            return Err(match fault {
                CommitFault::Conflict => StoreError::Conflict {
                    collection: write.collection,
                    id: write.id,
                },
                CommitFault::Unavailable => {
                    StoreError::Unavailable("injected commit failure".to_string())
                }
            });
        }

        let mut data = self.inner.data.write();
        let collection = data.entry(write.collection.clone()).or_default();
        let current = collection.get(&write.id).map(|doc| doc.version);

        if !write.precondition.holds(current) {
            return Err(StoreError::Conflict {
                collection: write.collection,
                id: write.id,
            });
        }

        let version = match collection.get_mut(&write.id) {
            Some(doc) => {
                doc.fields.extend(write.fields);
                doc.version += 1;
                doc.version
            }
            None => {
                collection.insert(
                    write.id.clone(),
                    Document {
                        id: write.id.clone(),
                        fields: write.fields,
                        version: 1,
                    },
                );
                1
            }
        };

        self.inner.commits.fetch_add(1, Ordering::Relaxed);
        trace!(collection = %write.collection, id = %write.id, version, "committed write");

        self.notify(&write.collection, &data);
        Ok(version)
    }

    /// Re-evaluate listeners on `collection`, delivering changed results.
    /// Called with the data lock held so deliveries follow commit order.
    fn notify(&self, collection: &str, data: &Collections) {
        let docs = data.get(collection);
        let mut listeners = self.inner.listeners.lock();
        listeners.entries.retain(|_, listener| {
            if listener.query.collection != collection {
                return true;
            }
            let result = listener
                .query
                .evaluate(docs.into_iter().flat_map(BTreeMap::values));
            if result == listener.last {
                return true;
            }
            listener.last = result.clone();
            listener.tx.send(Ok(result)).is_ok()
        });
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl MemoryDocumentStore {
    /// Fail the next `count` commits with `fault`.
    pub fn fail_next_commits(&self, count: usize, fault: CommitFault) {
        self.inner
            .faults
            .lock()
            .extend(std::iter::repeat_n(fault, count));
    }

    /// Deliver a transport error to every live query on `collection`.
    pub fn break_listeners(&self, collection: &str, reason: &str) {
        let listeners = self.inner.listeners.lock();
        for listener in listeners.entries.values() {
            if listener.query.collection == collection {
                let _ = listener
                    .tx
                    .send(Err(StoreError::Unavailable(reason.to_string())));
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_open()?;
        Ok(self
            .inner
            .data
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn commit(&self, write: Write) -> Result<u64, StoreError> {
        self.apply(write)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.ensure_open()?;
        let data = self.inner.data.read();
        Ok(query.evaluate(data.get(&query.collection).into_iter().flat_map(BTreeMap::values)))
    }

    fn listen(&self, query: Query) -> Result<QuerySubscription, StoreError> {
        self.ensure_open()?;

        let data = self.inner.data.read();
        let initial = query.evaluate(
            data.get(&query.collection)
                .into_iter()
                .flat_map(BTreeMap::values),
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(initial.clone()));

        let mut listeners = self.inner.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(
            id,
            Listener {
                query,
                tx,
                last: initial,
            },
        );
        drop(listeners);
        drop(data);

        trace!(listener = id, "registered live query");

        let inner = Arc::downgrade(&self.inner);
        Ok(QuerySubscription::new(rx, move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.lock().entries.remove(&id);
            }
        }))
    }
}
