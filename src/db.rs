use std::str::FromStr;

use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{
    error::{CoachError, Result},
    storage::{Collection, Contents, DataStore, Document, Snapshot},
};

pub type DB = SqlitePool;

/// Opens (creating if needed) the database at `path` and applies migrations.
pub async fn open(path: &str) -> Result<DB> {
    let opts = SqliteConnectOptions::from_str(path)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Document store over a single `documents` table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DB,
}

impl SqliteStore {
    /// Expects a migrated pool; see [`open`].
    pub fn new(pool: DB) -> Self {
        Self { pool }
    }

    pub async fn open(path: &str) -> Result<Self> {
        Ok(Self::new(open(path).await?))
    }

    pub fn pool(&self) -> &DB {
        &self.pool
    }

    /// Loads the bundled sample data into a fresh database.
    /// Returns whether anything was written.
    pub async fn seed_if_empty(&self) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(false);
        }
        Snapshot::bundled()?.load_into(self).await?;
        tracing::info!("seeded empty database with sample data");
        Ok(true)
    }
}

fn decode(body: &str) -> Result<Document> {
    Ok(serde_json::from_str(body)?)
}

impl DataStore for SqliteStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = ? ORDER BY position")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| decode(&r.get::<String, _>("body"))).collect()
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode(&r.get::<String, _>("body"))).transpose()
    }

    async fn insert(&self, collection: Collection, id: &str, doc: Document) -> Result<()> {
        let res = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, position)
            VALUES (?1, ?2, ?3,
                    (SELECT COALESCE(MAX(position), 0) + 1 FROM documents WHERE collection = ?1))
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(serde_json::to_string(&doc)?)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                CoachError::validation(format!("duplicate id `{id}` in {collection}")),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, collection: Collection, id: &str, doc: Document) -> Result<bool> {
        let info = sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&doc)?)
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(info.rows_affected() == 1)
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<bool> {
        let info = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(info.rows_affected() == 1)
    }

    async fn replace_all(&self, contents: Vec<(Collection, Contents)>) -> Result<()> {
        // Dropping the transaction on an early return rolls it back.
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        for (collection, docs) in contents {
            for (position, (id, doc)) in docs.iter().enumerate() {
                let res = sqlx::query("INSERT INTO documents (collection, id, body, position) VALUES (?, ?, ?, ?)")
                    .bind(collection.as_str())
                    .bind(id.as_str())
                    .bind(serde_json::to_string(doc)?)
                    .bind(position as i64 + 1)
                    .execute(&mut *tx)
                    .await;
                match res {
                    Ok(_) => {}
                    Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                        return Err(CoachError::validation(format!("duplicate id `{id}` in {collection}")));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // One connection, or each pooled connection gets its own empty in-memory db.
    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn behaves_like_a_document_store() {
        let store = memory_store().await;
        let c = Collection::Logs;

        store.insert(c, "b", json!({"id": "b", "n": 1})).await.unwrap();
        store.insert(c, "a", json!({"id": "a", "n": 2})).await.unwrap();
        store.insert(Collection::Plans, "a", json!({"id": "a"})).await.unwrap();

        // insertion order, not id order
        let ns: Vec<_> = store.list(c).await.unwrap().iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![1, 2]);

        assert!(store.replace(c, "a", json!({"id": "a", "n": 5})).await.unwrap());
        assert_eq!(store.get(c, "a").await.unwrap(), Some(json!({"id": "a", "n": 5})));
        assert!(!store.replace(c, "nope", json!({})).await.unwrap());

        assert!(store.remove(c, "b").await.unwrap());
        assert!(!store.remove(c, "b").await.unwrap());
        assert_eq!(store.get(c, "b").await.unwrap(), None);

        store
            .replace_all(vec![(Collection::Plans, vec![("p".into(), json!({"id": "p"}))])])
            .await
            .unwrap();
        assert!(store.list(c).await.unwrap().is_empty());
        assert_eq!(store.list(Collection::Plans).await.unwrap(), vec![json!({"id": "p"})]);
    }

    #[tokio::test]
    async fn failed_replace_rolls_back() {
        let store = memory_store().await;
        store.seed_if_empty().await.unwrap();
        let before = Snapshot::capture(&store).await.unwrap();

        // the second row hits the primary key after the delete already ran
        let res = store
            .replace_all(vec![(
                Collection::Logs,
                vec![("dup".into(), json!({"id": "dup"})), ("dup".into(), json!({"id": "dup"}))],
            )])
            .await;
        assert!(matches!(res, Err(CoachError::Validation(_))));
        assert_eq!(Snapshot::capture(&store).await.unwrap(), before);

        let dup = Snapshot {
            exercises: vec![json!({"id": "e"}), json!({"id": "e"})],
            ..Snapshot::default()
        };
        assert!(dup.load_into(&store).await.is_err());
        assert_eq!(Snapshot::capture(&store).await.unwrap(), before);
    }

    #[tokio::test]
    async fn duplicate_ids_are_validation_errors() {
        let store = memory_store().await;
        store.insert(Collection::Exercises, "x", json!({"id": "x"})).await.unwrap();
        let dup = store.insert(Collection::Exercises, "x", json!({"id": "x"})).await;
        assert!(matches!(dup, Err(CoachError::Validation(_))));
    }

    #[tokio::test]
    async fn seeds_only_once() {
        let store = memory_store().await;
        assert!(store.seed_if_empty().await.unwrap());
        assert!(!store.seed_if_empty().await.unwrap());
        assert_eq!(Snapshot::capture(&store).await.unwrap(), Snapshot::bundled().unwrap());
    }

    #[tokio::test]
    async fn survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("sqlite://{}", dir.path().join("coach.db").display());

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.insert(Collection::Profiles, "p", json!({"id": "p", "streak": 3})).await.unwrap();
            store.pool().close().await;
        }

        let store = SqliteStore::open(&path).await.unwrap();
        assert_eq!(
            store.get(Collection::Profiles, "p").await.unwrap(),
            Some(json!({"id": "p", "streak": 3}))
        );
    }
}
