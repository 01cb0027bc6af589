//! Data-access port and the in-memory store.
//!
//! Entities are kept as JSON documents grouped in collections. Services on top
//! (see [`crate::services`]) give them types; stores only see `id` + body.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CoachError, Result};

pub type Document = serde_json::Value;

/// The full contents of one collection as `(id, document)` pairs, in order.
pub type Contents = Vec<(String, Document)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Exercises,
    Profiles,
    Logs,
    Plans,
}

impl Collection {
    pub const ALL: [Collection; 4] = [Self::Exercises, Self::Profiles, Self::Logs, Self::Plans];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exercises => "exercises",
            Self::Profiles => "profiles",
            Self::Logs => "logs",
            Self::Plans => "plans",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage backend for entity documents.
///
/// `list` returns documents in insertion order. Writers are expected to be
/// serialised by the caller; implementations only guarantee that each call
/// is atomic on its own.
#[allow(async_fn_in_trait)]
pub trait DataStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>>;
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;
    async fn insert(&self, collection: Collection, id: &str, doc: Document) -> Result<()>;
    /// Returns `false` when `id` does not exist.
    async fn replace(&self, collection: Collection, id: &str, doc: Document) -> Result<bool>;
    /// Returns `false` when `id` does not exist.
    async fn remove(&self, collection: Collection, id: &str) -> Result<bool>;
    /// Swap every collection for `contents` in one step. Collections not
    /// listed end up empty. On error the previous contents stay in place.
    async fn replace_all(&self, contents: Vec<(Collection, Contents)>) -> Result<()>;
}

/// Reads the `id` field every stored document carries.
pub fn document_id(doc: &Document) -> Result<&str> {
    doc.get("id")
        .and_then(Document::as_str)
        .ok_or_else(|| CoachError::validation("document has no string `id` field"))
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Contents>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the bundled sample data.
    pub async fn seeded() -> Result<Self> {
        let store = Self::new();
        Snapshot::bundled()?.load_into(&store).await?;
        Ok(store)
    }

    /// Make every write fail with an I/O error until switched off.
    /// Used to exercise save-retry paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("store rejected the write").into());
        }
        Ok(())
    }
}

impl DataStore for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>> {
        let map = self.collections.read().await;
        Ok(map
            .get(&collection)
            .map(|docs| docs.iter().map(|(_, d)| d.clone()).collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let map = self.collections.read().await;
        Ok(map
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(k, _)| k == id))
            .map(|(_, d)| d.clone()))
    }

    async fn insert(&self, collection: Collection, id: &str, doc: Document) -> Result<()> {
        self.check_writable()?;
        let mut map = self.collections.write().await;
        let docs = map.entry(collection).or_default();
        if docs.iter().any(|(k, _)| k == id) {
            return Err(CoachError::validation(format!("duplicate id `{id}` in {collection}")));
        }
        docs.push((id.to_owned(), doc));
        Ok(())
    }

    async fn replace(&self, collection: Collection, id: &str, doc: Document) -> Result<bool> {
        self.check_writable()?;
        let mut map = self.collections.write().await;
        let slot = map
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(k, _)| k == id));
        match slot {
            Some((_, existing)) => {
                *existing = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<bool> {
        self.check_writable()?;
        let mut map = self.collections.write().await;
        let Some(docs) = map.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|(k, _)| k != id);
        Ok(docs.len() != before)
    }

    async fn replace_all(&self, contents: Vec<(Collection, Contents)>) -> Result<()> {
        self.check_writable()?;
        let fresh: HashMap<_, _> = contents.into_iter().collect();
        *self.collections.write().await = fresh;
        Ok(())
    }
}

/// Every collection at once. The shape of the bundled sample data and of
/// `db export` files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub exercises: Vec<Document>,
    #[serde(default)]
    pub profiles: Vec<Document>,
    #[serde(default)]
    pub logs: Vec<Document>,
    #[serde(default)]
    pub plans: Vec<Document>,
}

const SEED_EXERCISES: &str = include_str!("../data/exercises.json");
const SEED_PROFILES: &str = include_str!("../data/profiles.json");
const SEED_LOGS: &str = include_str!("../data/logs.json");
const SEED_PLANS: &str = include_str!("../data/plans.json");

impl Snapshot {
    /// The sample collections shipped with the binary.
    pub fn bundled() -> Result<Self> {
        Ok(Self {
            exercises: serde_json::from_str(SEED_EXERCISES)?,
            profiles: serde_json::from_str(SEED_PROFILES)?,
            logs: serde_json::from_str(SEED_LOGS)?,
            plans: serde_json::from_str(SEED_PLANS)?,
        })
    }

    pub fn docs(&self, collection: Collection) -> &[Document] {
        match collection {
            Collection::Exercises => &self.exercises,
            Collection::Profiles => &self.profiles,
            Collection::Logs => &self.logs,
            Collection::Plans => &self.plans,
        }
    }

    fn docs_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        match collection {
            Collection::Exercises => &mut self.exercises,
            Collection::Profiles => &mut self.profiles,
            Collection::Logs => &mut self.logs,
            Collection::Plans => &mut self.plans,
        }
    }

    pub fn len(&self) -> usize {
        Collection::ALL.iter().map(|c| self.docs(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn capture<S: DataStore>(store: &S) -> Result<Self> {
        let mut snap = Self::default();
        for c in Collection::ALL {
            *snap.docs_mut(c) = store.list(c).await?;
        }
        Ok(snap)
    }

    /// Every collection keyed by document id. Fails when a document has no
    /// id or an id repeats within its collection.
    pub fn contents(&self) -> Result<Vec<(Collection, Contents)>> {
        Collection::ALL
            .into_iter()
            .map(|c| {
                let mut seen = HashSet::new();
                let docs = self
                    .docs(c)
                    .iter()
                    .map(|doc| {
                        let id = document_id(doc)?;
                        if !seen.insert(id) {
                            return Err(CoachError::validation(format!("duplicate id `{id}` in {c}")));
                        }
                        Ok((id.to_owned(), doc.clone()))
                    })
                    .collect::<Result<Contents>>()?;
                Ok((c, docs))
            })
            .collect()
    }

    /// Replace the store's contents with this snapshot. Nothing is touched
    /// unless the whole snapshot can be written.
    pub async fn load_into<S: DataStore>(&self, store: &S) -> Result<()> {
        store.replace_all(self.contents()?).await?;
        tracing::debug!(documents = self.len(), "snapshot loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_get_replace_remove() {
        let store = MemoryStore::new();
        let c = Collection::Exercises;

        store.insert(c, "a", json!({"id": "a", "n": 1})).await.unwrap();
        store.insert(c, "b", json!({"id": "b", "n": 2})).await.unwrap();
        assert_eq!(store.get(c, "a").await.unwrap(), Some(json!({"id": "a", "n": 1})));
        assert_eq!(store.get(Collection::Logs, "a").await.unwrap(), None);

        assert!(store.replace(c, "a", json!({"id": "a", "n": 3})).await.unwrap());
        assert!(!store.replace(c, "zz", json!({})).await.unwrap());

        let ids: Vec<_> = store
            .list(c)
            .await
            .unwrap()
            .iter()
            .map(|d| d["n"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 2]);

        assert!(store.remove(c, "a").await.unwrap());
        assert!(!store.remove(c, "a").await.unwrap());
        assert_eq!(store.list(c).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        store.insert(Collection::Plans, "p", json!({"id": "p"})).await.unwrap();
        let dup = store.insert(Collection::Plans, "p", json!({"id": "p"})).await;
        assert!(matches!(dup, Err(CoachError::Validation(_))));
    }

    #[tokio::test]
    async fn failing_writes_leave_data_alone() {
        let store = MemoryStore::new();
        store.insert(Collection::Logs, "l", json!({"id": "l"})).await.unwrap();

        store.fail_writes(true);
        assert!(store.remove(Collection::Logs, "l").await.is_err());
        assert!(store.insert(Collection::Logs, "m", json!({"id": "m"})).await.is_err());
        assert_eq!(store.list(Collection::Logs).await.unwrap().len(), 1);

        store.fail_writes(false);
        assert!(store.remove(Collection::Logs, "l").await.unwrap());
    }

    #[tokio::test]
    async fn bundled_data_round_trips_through_a_store() {
        let snap = Snapshot::bundled().unwrap();
        assert!(!snap.exercises.is_empty());
        assert!(!snap.profiles.is_empty());

        let store = MemoryStore::seeded().await.unwrap();
        assert_eq!(Snapshot::capture(&store).await.unwrap(), snap);
    }

    #[tokio::test]
    async fn load_rejects_documents_without_ids() {
        let snap = Snapshot {
            plans: vec![json!({"name": "no id"})],
            ..Snapshot::default()
        };
        let res = snap.load_into(&MemoryStore::new()).await;
        assert!(matches!(res, Err(CoachError::Validation(_))));
    }

    #[tokio::test]
    async fn bad_snapshot_leaves_the_store_as_it_was() {
        let store = MemoryStore::seeded().await.unwrap();
        let before = Snapshot::capture(&store).await.unwrap();

        let dup = Snapshot {
            logs: vec![json!({"id": "dup"}), json!({"id": "dup"})],
            ..Snapshot::default()
        };
        let res = dup.load_into(&store).await;
        assert!(matches!(res, Err(CoachError::Validation(_))));
        assert_eq!(Snapshot::capture(&store).await.unwrap(), before);

        store.fail_writes(true);
        assert!(Snapshot::default().load_into(&store).await.is_err());
        store.fail_writes(false);
        assert_eq!(Snapshot::capture(&store).await.unwrap(), before);
    }

    #[tokio::test]
    async fn same_id_in_different_collections_is_fine() {
        let snap = Snapshot {
            plans: vec![json!({"id": "x"})],
            logs: vec![json!({"id": "x"})],
            ..Snapshot::default()
        };
        let store = MemoryStore::new();
        snap.load_into(&store).await.unwrap();
        assert_eq!(Snapshot::capture(&store).await.unwrap(), snap);
    }
}
