//! 消息路由器。
//!
//! 入站消息的校验、持久化、受众解析和分发都集中在这里，
//! 私聊可见性的权威判定点只有这一处。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::{
    ConnectionId, DomainError, Message, MessageContent, MessageScope, NewMessage, RoomId,
    ServerEvent, UserId,
};
use tokio::sync::Mutex;

use crate::broadcaster::ConnectionBroadcaster;
use crate::error::ChatError;
use crate::registry::ConnectionRegistry;
use crate::repository::{bounded, MessageRepository};

/// 发送消息命令。
///
/// 发送者身份来自已验证的连接身份，从不信任入站载荷。
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub is_private: bool,
    pub receiver_id: Option<UserId>,
}

pub struct MessageRouter {
    registry: Arc<ConnectionRegistry>,
    messages: Arc<dyn MessageRepository>,
    broadcaster: Arc<dyn ConnectionBroadcaster>,
    /// 每个房间一把顺序锁，持有期覆盖持久化与广播
    room_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    persist_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        messages: Arc<dyn MessageRepository>,
        broadcaster: Arc<dyn ConnectionBroadcaster>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            messages,
            broadcaster,
            room_locks: Mutex::new(HashMap::new()),
            persist_timeout,
        }
    }

    /// 校验、持久化并分发一条消息。
    ///
    /// 同一房间的消息在房间锁内串行完成持久化和广播，
    /// 保证广播顺序与持久化顺序一致；不同房间互不阻塞。
    /// 校验或持久化失败时不广播，错误由调用方报告给发送者。
    pub async fn route(&self, command: SendMessageCommand) -> Result<Message, ChatError> {
        let draft = Self::validate(command)?;
        let room_id = draft.room_id;

        let room_lock = self.room_lock(room_id).await;
        let _ordering = room_lock.lock().await;

        let message = bounded(self.persist_timeout, self.messages.create(draft)).await?;

        let audience = self.resolve_audience(&message).await;
        tracing::debug!(
            message_id = %message.id,
            room_id = %room_id,
            audience = audience.len(),
            is_private = message.is_private,
            "broadcasting message"
        );
        self.broadcaster
            .broadcast_to(
                &audience,
                ServerEvent::ReceiveMessage {
                    message: message.clone(),
                },
            )
            .await;

        Ok(message)
    }

    fn validate(command: SendMessageCommand) -> Result<NewMessage, ChatError> {
        let content = MessageContent::parse(command.content)?;
        let scope = if command.is_private {
            let receiver_id = command.receiver_id.ok_or_else(|| {
                DomainError::validation("receiverId", "required for private messages")
            })?;
            MessageScope::private(command.sender_id, receiver_id)?
        } else {
            MessageScope::Public
        };

        Ok(NewMessage::new(
            command.room_id,
            command.sender_id,
            command.sender_name,
            content,
            scope,
        ))
    }

    /// 解析消息受众。
    ///
    /// 公开消息发给房间内所有连接；私聊消息只发给房间内
    /// 用户标识等于发送者或接收者的连接。
    async fn resolve_audience(&self, message: &Message) -> Vec<ConnectionId> {
        self.registry
            .entries_in_room(message.room_id)
            .await
            .into_iter()
            .filter(|entry| message.visible_to(entry.user_id))
            .map(|entry| entry.connection_id)
            .collect()
    }

    /// 取得房间的顺序锁，首次使用时创建。
    async fn room_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().await;
        locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcaster::BroadcastError;
    use crate::repository::memory::InMemoryMessageRepository;
    use async_trait::async_trait;
    use domain::RepositoryError;
    use mockall::mock;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingBroadcaster {
        delivered: Mutex<Vec<(ConnectionId, ServerEvent)>>,
    }

    impl RecordingBroadcaster {
        async fn deliveries(&self) -> Vec<(ConnectionId, ServerEvent)> {
            self.delivered.lock().await.clone()
        }
    }

    #[async_trait]
    impl ConnectionBroadcaster for RecordingBroadcaster {
        async fn deliver(
            &self,
            connection_id: ConnectionId,
            event: ServerEvent,
        ) -> Result<(), BroadcastError> {
            self.delivered.lock().await.push((connection_id, event));
            Ok(())
        }

        async fn broadcast_to(&self, targets: &[ConnectionId], event: ServerEvent) {
            for &target in targets {
                let _ = self.deliver(target, event.clone()).await;
            }
        }
    }

    mock! {
        MessageRepo {}

        #[async_trait]
        impl MessageRepository for MessageRepo {
            async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError>;
            async fn list_recent(
                &self,
                room_id: RoomId,
                limit: u32,
            ) -> Result<Vec<Message>, RepositoryError>;
        }
    }

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        messages: Arc<InMemoryMessageRepository>,
        broadcaster: Arc<RecordingBroadcaster>,
        router: MessageRouter,
        room_id: RoomId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let messages = Arc::new(InMemoryMessageRepository::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let router = MessageRouter::new(
            registry.clone(),
            messages.clone(),
            broadcaster.clone(),
            Duration::from_secs(1),
        );
        Fixture {
            registry,
            messages,
            broadcaster,
            router,
            room_id: RoomId::from(Uuid::new_v4()),
        }
    }

    async fn join(fixture: &Fixture, name: &str) -> (ConnectionId, UserId) {
        let connection_id = ConnectionId::from(Uuid::new_v4());
        let user_id = UserId::from(Uuid::new_v4());
        fixture
            .registry
            .join(connection_id, user_id, name, fixture.room_id)
            .await;
        (connection_id, user_id)
    }

    fn command(fixture: &Fixture, sender_id: UserId, content: &str) -> SendMessageCommand {
        SendMessageCommand {
            room_id: fixture.room_id,
            sender_id,
            sender_name: "alice".to_string(),
            content: content.to_string(),
            is_private: false,
            receiver_id: None,
        }
    }

    #[tokio::test]
    async fn public_message_reaches_every_member_including_sender() {
        let fixture = fixture();
        let (sender_conn, sender) = join(&fixture, "alice").await;
        let (other_conn, _) = join(&fixture, "bob").await;

        let message = fixture
            .router
            .route(command(&fixture, sender, "hi"))
            .await
            .unwrap();
        assert_eq!(message.content, "hi");

        let deliveries = fixture.broadcaster.deliveries().await;
        let targets: Vec<ConnectionId> = deliveries.iter().map(|(id, _)| *id).collect();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&sender_conn));
        assert!(targets.contains(&other_conn));
    }

    #[tokio::test]
    async fn private_message_reaches_only_sender_and_receiver() {
        let fixture = fixture();
        let (sender_conn, sender) = join(&fixture, "alice").await;
        let (receiver_conn, receiver) = join(&fixture, "bob").await;
        let (bystander_conn, _) = join(&fixture, "carol").await;

        let mut cmd = command(&fixture, sender, "psst");
        cmd.is_private = true;
        cmd.receiver_id = Some(receiver);
        fixture.router.route(cmd).await.unwrap();

        let targets: Vec<ConnectionId> = fixture
            .broadcaster
            .deliveries()
            .await
            .iter()
            .map(|(id, _)| *id)
            .collect();
        assert!(targets.contains(&sender_conn));
        assert!(targets.contains(&receiver_conn));
        assert!(!targets.contains(&bystander_conn));
    }

    #[tokio::test]
    async fn empty_content_fails_without_persisting_or_broadcasting() {
        let fixture = fixture();
        let (_, sender) = join(&fixture, "alice").await;

        let result = fixture.router.route(command(&fixture, sender, "   ")).await;

        assert!(matches!(result, Err(ChatError::Validation(_))));
        assert_eq!(fixture.messages.count().await, 0);
        assert!(fixture.broadcaster.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn private_message_requires_a_receiver() {
        let fixture = fixture();
        let (_, sender) = join(&fixture, "alice").await;

        let mut cmd = command(&fixture, sender, "psst");
        cmd.is_private = true;
        let result = fixture.router.route(cmd).await;

        assert!(matches!(result, Err(ChatError::Validation(_))));
        assert_eq!(fixture.messages.count().await, 0);
    }

    #[tokio::test]
    async fn private_message_to_self_is_rejected() {
        let fixture = fixture();
        let (_, sender) = join(&fixture, "alice").await;

        let mut cmd = command(&fixture, sender, "psst");
        cmd.is_private = true;
        cmd.receiver_id = Some(sender);
        let result = fixture.router.route(cmd).await;

        assert!(matches!(result, Err(ChatError::Validation(_))));
    }

    #[tokio::test]
    async fn persistence_failure_suppresses_the_broadcast() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let mut messages = MockMessageRepo::new();
        messages
            .expect_create()
            .returning(|_| Err(RepositoryError::storage("connection refused")));

        let router = MessageRouter::new(
            registry.clone(),
            Arc::new(messages),
            broadcaster.clone(),
            Duration::from_secs(1),
        );

        let room_id = RoomId::from(Uuid::new_v4());
        let sender = UserId::from(Uuid::new_v4());
        registry
            .join(ConnectionId::from(Uuid::new_v4()), sender, "alice", room_id)
            .await;

        let result = router
            .route(SendMessageCommand {
                room_id,
                sender_id: sender,
                sender_name: "alice".to_string(),
                content: "hi".to_string(),
                is_private: false,
                receiver_id: None,
            })
            .await;

        assert!(matches!(result, Err(ChatError::Persistence(_))));
        assert!(broadcaster.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn same_room_messages_keep_submission_order() {
        let fixture = fixture();
        let (recipient_conn, sender) = join(&fixture, "alice").await;

        let first = fixture
            .router
            .route(command(&fixture, sender, "first"))
            .await
            .unwrap();
        let second = fixture
            .router
            .route(command(&fixture, sender, "second"))
            .await
            .unwrap();

        assert!(first.created_at <= second.created_at);

        // 每个接收连接观察到的广播顺序与提交顺序一致
        let observed: Vec<String> = fixture
            .broadcaster
            .deliveries()
            .await
            .into_iter()
            .filter(|(id, _)| *id == recipient_conn)
            .filter_map(|(_, event)| match event {
                ServerEvent::ReceiveMessage { message } => Some(message.content),
                _ => None,
            })
            .collect();
        assert_eq!(observed, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn room_locks_are_shared_per_room_but_distinct_across_rooms() {
        let fixture = fixture();
        let other_room = RoomId::from(Uuid::new_v4());

        let lock_a1 = fixture.router.room_lock(fixture.room_id).await;
        let lock_a2 = fixture.router.room_lock(fixture.room_id).await;
        let lock_b = fixture.router.room_lock(other_room).await;

        assert!(Arc::ptr_eq(&lock_a1, &lock_a2));
        assert!(!Arc::ptr_eq(&lock_a1, &lock_b));
    }

    /// 模拟挂死的持久化网关
    struct HangingMessageRepo;

    #[async_trait]
    impl MessageRepository for HangingMessageRepo {
        async fn create(&self, _message: NewMessage) -> Result<Message, RepositoryError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(RepositoryError::storage("unreachable"))
        }

        async fn list_recent(
            &self,
            _room_id: RoomId,
            _limit: u32,
        ) -> Result<Vec<Message>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn slow_persistence_times_out_as_a_persistence_error() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());

        let router = MessageRouter::new(
            registry,
            Arc::new(HangingMessageRepo),
            broadcaster.clone(),
            Duration::from_millis(10),
        );

        let result = router
            .route(SendMessageCommand {
                room_id: RoomId::from(Uuid::new_v4()),
                sender_id: UserId::from(Uuid::new_v4()),
                sender_name: "alice".to_string(),
                content: "hi".to_string(),
                is_private: false,
                receiver_id: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(ChatError::Persistence(RepositoryError::Timeout))
        ));
        assert!(broadcaster.deliveries().await.is_empty());
    }
}
