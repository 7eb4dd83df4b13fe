//! 实时流程测试的公共脚手架：内存网关和记录型广播器。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use application::repository::memory::{InMemoryMessageRepository, InMemoryRoomRepository};
use application::{
    BroadcastError, ConnectionBroadcaster, ConnectionRegistry, ConnectionSession, MessageRepository,
    MessageRouter, RealtimeDependencies, RoomPresenceService, UserIdentity,
};
use domain::{
    ClientEvent, ConnectionId, ErrorCode, Message, NewMessage, RepositoryError, RoomId,
    RosterEntry, ServerEvent, UserId,
};
use tokio::sync::Mutex;
use uuid::Uuid;

/// 记录每次投递的广播器，供断言使用。
#[derive(Default)]
pub struct RecordingBroadcaster {
    delivered: Mutex<Vec<(ConnectionId, ServerEvent)>>,
}

impl RecordingBroadcaster {
    pub async fn events_for(&self, connection_id: ConnectionId) -> Vec<ServerEvent> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|(id, _)| *id == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// 某连接收到的所有 receive_message 载荷，按投递顺序。
    pub async fn messages_for(&self, connection_id: ConnectionId) -> Vec<Message> {
        self.events_for(connection_id)
            .await
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::ReceiveMessage { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// 某连接收到的所有名单广播，按投递顺序。
    pub async fn rosters_for(&self, connection_id: ConnectionId) -> Vec<Vec<RosterEntry>> {
        self.events_for(connection_id)
            .await
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::RoomUsers { users } => Some(users),
                _ => None,
            })
            .collect()
    }

    /// 某连接收到的所有历史回放，按投递顺序。
    pub async fn histories_for(&self, connection_id: ConnectionId) -> Vec<Vec<Message>> {
        self.events_for(connection_id)
            .await
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::MessageHistory { messages } => Some(messages),
                _ => None,
            })
            .collect()
    }

    /// 某连接收到的所有错误事件。
    pub async fn errors_for(&self, connection_id: ConnectionId) -> Vec<(ErrorCode, String)> {
        self.events_for(connection_id)
            .await
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::Error { code, message } => Some((code, message)),
                _ => None,
            })
            .collect()
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

/// 写入总是失败的持久化网关。
pub struct FailingMessageRepository;

#[async_trait]
impl MessageRepository for FailingMessageRepository {
    async fn create(&self, _message: NewMessage) -> Result<Message, RepositoryError> {
        Err(RepositoryError::storage("database unavailable"))
    }

    async fn list_recent(
        &self,
        _room_id: RoomId,
        _limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// 装配完整的实时层服务图，网关全部用内存实现。
pub struct World {
    pub registry: Arc<ConnectionRegistry>,
    pub rooms: Arc<InMemoryRoomRepository>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub deps: Arc<RealtimeDependencies>,
}

impl World {
    pub fn with_messages(messages: Arc<dyn MessageRepository>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let presence = Arc::new(RoomPresenceService::new(
            registry.clone(),
            broadcaster.clone(),
        ));
        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            messages.clone(),
            broadcaster.clone(),
            Duration::from_secs(1),
        ));
        let deps = Arc::new(RealtimeDependencies {
            registry: registry.clone(),
            presence,
            router,
            rooms: rooms.clone(),
            messages,
            broadcaster: broadcaster.clone(),
            history_limit: 50,
            repository_timeout: Duration::from_secs(1),
        });
        Self {
            registry,
            rooms,
            broadcaster,
            deps,
        }
    }

    pub fn new() -> (Self, Arc<InMemoryMessageRepository>) {
        let messages = Arc::new(InMemoryMessageRepository::new());
        (Self::with_messages(messages.clone()), messages)
    }

    pub async fn create_room(&self) -> RoomId {
        let room_id = RoomId::from(Uuid::new_v4());
        self.rooms.add_room(room_id).await;
        room_id
    }

    /// 模拟一条完成身份验证的新连接。
    pub fn connect(&self, display_name: &str) -> Client {
        let connection_id = ConnectionId::generate();
        let user_id = UserId::from(Uuid::new_v4());
        let session = ConnectionSession::new(
            self.deps.clone(),
            connection_id,
            UserIdentity::new(user_id, display_name),
        );
        Client {
            connection_id,
            user_id,
            session,
        }
    }
}

pub struct Client {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub session: ConnectionSession,
}

impl Client {
    pub async fn join(&mut self, room_id: RoomId) {
        self.session
            .dispatch(ClientEvent::JoinRoom { room_id })
            .await;
    }

    pub async fn leave(&mut self, room_id: RoomId) {
        self.session
            .dispatch(ClientEvent::LeaveRoom { room_id })
            .await;
    }

    pub async fn send(&mut self, room_id: RoomId, content: &str) {
        self.session
            .dispatch(ClientEvent::SendMessage {
                content: content.to_string(),
                room_id,
                is_private: false,
                receiver_id: None,
            })
            .await;
    }

    pub async fn send_private(&mut self, room_id: RoomId, content: &str, receiver_id: UserId) {
        self.session
            .dispatch(ClientEvent::SendMessage {
                content: content.to_string(),
                room_id,
                is_private: true,
                receiver_id: Some(receiver_id),
            })
            .await;
    }
}
