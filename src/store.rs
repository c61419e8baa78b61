//! Read-mostly data access for subgraph fixtures

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid record {id:?}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse fixtures: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Data-access contract the resolvers depend on
///
/// Absence is a normal outcome: `lookup` returns `Ok(None)` for an unknown id.
/// `Err` is reserved for the backing store itself failing.
#[async_trait]
pub trait DataSource<V>: Send + Sync {
    /// Look up a single record by key
    async fn lookup(&self, id: &str) -> Result<Option<V>, StoreError>;

    /// All records, in the store's iteration order
    async fn list_all(&self) -> Result<Vec<V>, StoreError>;
}

/// In-memory store preserving insertion order
///
/// Writers take the write lock for the whole update and readers clone out
/// under the read lock, so a reader observes either the state before a write
/// or the state after it.
#[derive(Debug)]
pub struct InMemoryStore<V> {
    records: RwLock<IndexMap<String, V>>,
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InMemoryStore<V> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(IndexMap::new()),
        }
    }

    /// Create a store from keyed records, keeping their order
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, V)>,
    {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Insert or replace a record, returning the previous value
    ///
    /// Replacing keeps the key's original position.
    pub async fn insert(&self, id: impl Into<String>, value: V) -> Option<V> {
        let mut records = self.records.write().await;
        records.insert(id.into(), value)
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl<V> DataSource<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync,
{
    async fn lookup(&self, id: &str) -> Result<Option<V>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<V>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}
