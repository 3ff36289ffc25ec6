//! Durable, ordered log of chat messages.

use async_trait::async_trait;

use crate::db::{Database, StorageError, StorageResult};

use super::models::{Message, MessageRole};

/// Append-only chat history.
///
/// Every mutating call is a single SQL statement, so concurrent callers never
/// observe a partially written row.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert a message and return the stored record with its assigned `id`
    /// and `timestamp`.
    async fn append(&self, role: MessageRole, content: &str) -> StorageResult<Message>;

    /// All messages, oldest first (`timestamp`, then `id`).
    async fn list_all(&self) -> StorageResult<Vec<Message>>;

    /// Delete every message, returning how many rows were removed.
    async fn clear_all(&self) -> StorageResult<u64>;

    /// Number of stored messages.
    async fn count(&self) -> StorageResult<i64>;
}

/// SQLite-backed [`HistoryStore`].
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    db: Database,
}

impl SqliteHistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, role: MessageRole, content: &str) -> StorageResult<Message> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (role, content)
            VALUES (?, ?)
            RETURNING id, role, content, timestamp
            "#,
        )
        .bind(role)
        .bind(content)
        .fetch_one(self.db.pool())
        .await
        .map_err(StorageError::query("inserting message"))
    }

    async fn list_all(&self) -> StorageResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, role, content, timestamp
            FROM messages
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(StorageError::query("fetching all messages"))
    }

    async fn clear_all(&self) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM messages")
            .execute(self.db.pool())
            .await
            .map_err(StorageError::query("clearing messages"))?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> StorageResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(self.db.pool())
            .await
            .map_err(StorageError::query("counting messages"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn setup() -> SqliteHistoryStore {
        let db = Database::in_memory().await.unwrap();
        SqliteHistoryStore::new(db)
    }

    #[tokio::test]
    async fn test_append_returns_stored_record() {
        let store = setup().await;

        let message = store.append(MessageRole::User, "Hello").await.unwrap();
        assert!(message.id > 0);
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.content, "Hello");

        let reply = store
            .append(MessageRole::Assistant, "Hi there!")
            .await
            .unwrap();
        assert_eq!(reply.id, message.id + 1);
        assert!(reply.timestamp >= message.timestamp);
    }

    #[tokio::test]
    async fn test_append_rejects_empty_content() {
        let store = setup().await;

        let err = store.append(MessageRole::User, "").await.unwrap_err();
        assert!(matches!(err, StorageError::Query { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_all_is_chronological() {
        let store = setup().await;
        assert!(store.list_all().await.unwrap().is_empty());

        for i in 0..5 {
            store
                .append(MessageRole::User, &format!("question {i}"))
                .await
                .unwrap();
            store
                .append(MessageRole::Assistant, &format!("answer {i}"))
                .await
                .unwrap();
        }

        let messages = store.list_all().await.unwrap();
        assert_eq!(messages.len(), 10);
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(messages[0].content, "question 0");
        assert_eq!(messages[9].content, "answer 4");
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_id() {
        let store = setup().await;

        for content in ["b", "a", "c"] {
            sqlx::query(
                "INSERT INTO messages (role, content, timestamp) VALUES ('user', ?, '2025-01-01T00:00:00.000Z')",
            )
            .bind(content)
            .execute(store.database().pool())
            .await
            .unwrap();
        }

        let contents: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = setup().await;
        store.append(MessageRole::User, "one").await.unwrap();
        store.append(MessageRole::Assistant, "two").await.unwrap();

        assert_eq!(store.clear_all().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(store.clear_all().await.unwrap(), 0);

        // Ids keep increasing after a clear.
        let next = store.append(MessageRole::User, "three").await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_unique_ids() {
        let temp = tempfile::TempDir::new().unwrap();
        let db = Database::open(&temp.path().join("chat.db")).await.unwrap();
        let store = Arc::new(SqliteHistoryStore::new(db));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append(MessageRole::User, &format!("message {i}"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(store.count().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_closed_pool_surfaces_storage_error() {
        let store = setup().await;
        store.database().close().await;

        assert!(store.append(MessageRole::User, "hi").await.is_err());
        assert!(store.list_all().await.is_err());
        assert!(store.clear_all().await.is_err());
    }
}
