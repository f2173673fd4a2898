use sqlx::SqlitePool;
use uuid::Uuid;

use super::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable message persistence consumed by the chat session handler.
/// Implementations must make each `create` atomic.
pub trait MessageStore: Send + Sync {
    fn create(
        &self,
        chat_id: Uuid,
        profile_id: Uuid,
        text: String,
        media_file_ids: Vec<Uuid>,
    ) -> impl Future<Output = Result<Message, StorageError>> + Send;

    fn chat_exists(&self, chat_id: Uuid) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

/// SQLite-backed store. Message ids are UUIDv7, so primary-key order is
/// insertion order.
#[derive(Clone)]
pub struct SqliteMessageStore {
    db_pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

impl MessageStore for SqliteMessageStore {
    async fn create(
        &self,
        chat_id: Uuid,
        profile_id: Uuid,
        text: String,
        media_file_ids: Vec<Uuid>,
    ) -> Result<Message, StorageError> {
        let id = Uuid::now_v7();
        let media_json = serde_json::to_string(&media_file_ids)?;

        sqlx::query("INSERT INTO messages (id,chat_id,profile_id,text,media_file_ids) VALUES (?,?,?,?,?)")
            .bind(id.to_string())
            .bind(chat_id.to_string())
            .bind(profile_id.to_string())
            .bind(&text)
            .bind(&media_json)
            .execute(&self.db_pool)
            .await?;

        Ok(Message {
            id,
            chat_id,
            profile_id,
            text,
            media_file_ids,
        })
    }

    async fn chat_exists(&self, chat_id: Uuid) -> Result<bool, StorageError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM chats WHERE id=?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    async fn insert_chat(pool: &SqlitePool) -> Uuid {
        let chat_id = Uuid::now_v7();
        sqlx::query("INSERT INTO chats (id,name) VALUES (?,?)")
            .bind(chat_id.to_string())
            .bind("test chat")
            .execute(pool)
            .await
            .unwrap();
        chat_id
    }

    #[tokio::test]
    async fn create_persists_and_returns_the_record() {
        let pool = test_pool().await;
        let chat_id = insert_chat(&pool).await;
        let store = SqliteMessageStore::new(pool.clone());

        let profile_id = Uuid::now_v7();
        let media_id = Uuid::now_v7();
        let message = store
            .create(chat_id, profile_id, "hi".to_owned(), vec![media_id])
            .await
            .unwrap();

        assert_eq!(message.chat_id, chat_id);
        assert_eq!(message.profile_id, profile_id);
        assert_eq!(message.text, "hi");

        let (text, media_json): (String, String) =
            sqlx::query_as("SELECT text,media_file_ids FROM messages WHERE id=?")
                .bind(message.id.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(text, "hi");
        let media: Vec<Uuid> = serde_json::from_str(&media_json).unwrap();
        assert_eq!(media, vec![media_id]);
    }

    #[tokio::test]
    async fn chat_exists_distinguishes_known_and_unknown_ids() {
        let pool = test_pool().await;
        let chat_id = insert_chat(&pool).await;
        let store = SqliteMessageStore::new(pool);

        assert!(store.chat_exists(chat_id).await.unwrap());
        assert!(!store.chat_exists(Uuid::now_v7()).await.unwrap());
    }
}
