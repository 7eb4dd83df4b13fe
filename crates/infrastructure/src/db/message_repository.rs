//! 消息Repository实现

use application::MessageRepository;
use async_trait::async_trait;
use domain::{Message, MessageId, NewMessage, RepositoryError, RoomId, UserId};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::DbPool;

/// 数据库消息模型
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    id: Uuid,
    room_id: Uuid,
    sender_id: Uuid,
    sender_name: String,
    content: String,
    is_private: bool,
    receiver_id: Option<Uuid>,
    created_at: OffsetDateTime,
}

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        Message {
            id: MessageId::from(row.id),
            content: row.content,
            sender_id: UserId::from(row.sender_id),
            sender_name: row.sender_name,
            room_id: RoomId::from(row.room_id),
            created_at: row.created_at,
            is_private: row.is_private,
            receiver_id: row.receiver_id.map(UserId::from),
        }
    }
}

/// 消息Repository实现
///
/// id 和 created_at 由数据库在写入时分配；同一房间内写入顺序
/// 由应用层的房间顺序锁保证。
pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let receiver_id: Option<Uuid> = message.scope.receiver_id().map(Uuid::from);

        let row = sqlx::query_as::<_, DbMessage>(
            r#"
            INSERT INTO messages (room_id, sender_id, sender_name, content, is_private, receiver_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, room_id, sender_id, sender_name, content, is_private, receiver_id, created_at
            "#,
        )
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.sender_id))
        .bind(&message.sender_name)
        .bind(message.content.as_str())
        .bind(message.scope.is_private())
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(row.into())
    }

    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbMessage>(
            r#"
            SELECT id, room_id, sender_id, sender_name, content, is_private, receiver_id, created_at
            FROM messages
            WHERE room_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(Uuid::from(room_id))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
