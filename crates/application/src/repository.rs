//! 持久化网关抽象。

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Message, NewMessage, RepositoryError, RoomId};

/// 消息持久化接口。id 与 created_at 由存储在写入时分配。
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 持久化一条消息，恰好一次；失败时消息不进入广播
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    /// 房间最近的消息，按时间倒序
    async fn list_recent(
        &self,
        room_id: RoomId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;
}

/// 房间存在性查询。房间由持久化层拥有，核心视其为既存。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn room_exists(&self, room_id: RoomId) -> Result<bool, RepositoryError>;
}

/// 为持久化调用加上超时上限。
///
/// 超时按持久化失败处理，绝不让处理路径无限期挂起。
pub async fn bounded<T>(
    limit: Duration,
    op: impl Future<Output = Result<T, RepositoryError>> + Send,
) -> Result<T, RepositoryError> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout),
    }
}

/// 内存实现的持久化网关（用于测试）
pub mod memory {
    use super::*;
    use domain::{MessageId, Timestamp};
    use std::collections::HashSet;
    use tokio::sync::RwLock;
    use uuid::Uuid;

    #[derive(Default)]
    pub struct InMemoryMessageRepository {
        messages: RwLock<Vec<Message>>,
    }

    impl InMemoryMessageRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// 当前已持久化的消息总数
        pub async fn count(&self) -> usize {
            self.messages.read().await.len()
        }
    }

    #[async_trait]
    impl MessageRepository for InMemoryMessageRepository {
        async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
            let persisted = Message {
                id: MessageId::from(Uuid::new_v4()),
                content: message.content.into_string(),
                sender_id: message.sender_id,
                sender_name: message.sender_name,
                room_id: message.room_id,
                created_at: Timestamp::now_utc(),
                is_private: message.scope.is_private(),
                receiver_id: message.scope.receiver_id(),
            };
            self.messages.write().await.push(persisted.clone());
            Ok(persisted)
        }

        async fn list_recent(
            &self,
            room_id: RoomId,
            limit: u32,
        ) -> Result<Vec<Message>, RepositoryError> {
            let messages = self.messages.read().await;
            let mut recent: Vec<Message> = messages
                .iter()
                .filter(|message| message.room_id == room_id)
                .cloned()
                .collect();
            recent.reverse();
            recent.truncate(limit as usize);
            Ok(recent)
        }
    }

    #[derive(Default)]
    pub struct InMemoryRoomRepository {
        rooms: RwLock<HashSet<RoomId>>,
    }

    impl InMemoryRoomRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_room(&self, room_id: RoomId) {
            self.rooms.write().await.insert(room_id);
        }
    }

    #[async_trait]
    impl RoomRepository for InMemoryRoomRepository {
        async fn room_exists(&self, room_id: RoomId) -> Result<bool, RepositoryError> {
            Ok(self.rooms.read().await.contains(&room_id))
        }
    }
}
