//! 连接会话状态机。
//!
//! 每个连接一个会话：connected(无房间) → joined(房间)，断开为终态。
//! 每种入站事件只有一个分发入口，断开清理是显式的、可测试的转移，
//! 而不是监听器拆除的隐式副作用。

use std::sync::Arc;
use std::time::Duration;

use domain::{ClientEvent, ConnectionId, DomainError, RoomId, ServerEvent, UserId};

use crate::broadcaster::ConnectionBroadcaster;
use crate::error::ChatError;
use crate::identity::UserIdentity;
use crate::presence::RoomPresenceService;
use crate::registry::ConnectionRegistry;
use crate::repository::{bounded, MessageRepository, RoomRepository};
use crate::router::{MessageRouter, SendMessageCommand};

/// 实时层用例服务的依赖集合，启动时装配一次并在连接间共享。
pub struct RealtimeDependencies {
    pub registry: Arc<ConnectionRegistry>,
    pub presence: Arc<RoomPresenceService>,
    pub router: Arc<MessageRouter>,
    pub rooms: Arc<dyn RoomRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub broadcaster: Arc<dyn ConnectionBroadcaster>,
    /// 加入房间时回放的历史消息条数
    pub history_limit: u32,
    /// 持久化调用的超时上限
    pub repository_timeout: Duration,
}

/// 会话状态。断开不是状态：会话被消费后不可能再接收事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 已连接，尚未加入任何房间
    Connected,
    /// 已加入房间
    Joined(RoomId),
}

pub struct ConnectionSession {
    deps: Arc<RealtimeDependencies>,
    connection_id: ConnectionId,
    identity: UserIdentity,
    state: SessionState,
}

impl ConnectionSession {
    pub fn new(
        deps: Arc<RealtimeDependencies>,
        connection_id: ConnectionId,
        identity: UserIdentity,
    ) -> Self {
        Self {
            deps,
            connection_id,
            identity,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 入站事件的统一分发入口。
    ///
    /// 失败只报告给当前连接，其他房间成员不感知。
    pub async fn dispatch(&mut self, event: ClientEvent) {
        let result = match event {
            ClientEvent::JoinRoom { room_id } => self.handle_join(room_id).await,
            ClientEvent::SendMessage {
                content,
                room_id,
                is_private,
                receiver_id,
            } => {
                self.handle_send(content, room_id, is_private, receiver_id)
                    .await
            }
            ClientEvent::LeaveRoom { room_id } => self.handle_leave(room_id).await,
        };

        if let Err(err) = result {
            self.report(err).await;
        }
    }

    /// connected 或 joined(R') → joined(R)。
    ///
    /// 登记后先向被腾空的房间广播名单，再向新房间广播，
    /// 最后只向本连接回放历史。
    async fn handle_join(&mut self, room_id: RoomId) -> Result<(), ChatError> {
        let exists = bounded(
            self.deps.repository_timeout,
            self.deps.rooms.room_exists(room_id),
        )
        .await?;
        if !exists {
            return Err(DomainError::validation("roomId", "room does not exist").into());
        }

        let vacated = match self.state {
            SessionState::Joined(previous) if previous != room_id => Some(previous),
            _ => None,
        };

        self.deps
            .registry
            .join(
                self.connection_id,
                self.identity.user_id,
                self.identity.display_name.clone(),
                room_id,
            )
            .await;
        self.state = SessionState::Joined(room_id);

        tracing::info!(
            connection_id = %self.connection_id,
            user_id = %self.identity.user_id,
            room_id = %room_id,
            "connection joined room"
        );

        if let Some(previous) = vacated {
            self.deps.presence.announce_roster(previous).await;
        }
        self.deps.presence.announce_roster(room_id).await;
        self.replay_history(room_id).await;

        Ok(())
    }

    /// 只向当前连接回放房间最近的历史消息，按时间升序。
    ///
    /// 历史经过与路由器相同的可见性判定过滤；
    /// 读取失败记录日志，不影响已完成的加入。
    async fn replay_history(&self, room_id: RoomId) {
        let recent = bounded(
            self.deps.repository_timeout,
            self.deps
                .messages
                .list_recent(room_id, self.deps.history_limit),
        )
        .await;

        let mut messages = match recent {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    room_id = %room_id,
                    "failed to load message history"
                );
                return;
            }
        };

        messages.retain(|message| message.visible_to(self.identity.user_id));
        // 仓储返回最新在前，回放按时间升序
        messages.reverse();

        if let Err(err) = self
            .deps
            .broadcaster
            .deliver(self.connection_id, ServerEvent::MessageHistory { messages })
            .await
        {
            tracing::warn!(
                error = %err,
                connection_id = %self.connection_id,
                "failed to deliver message history"
            );
        }
    }

    async fn handle_send(
        &mut self,
        content: String,
        room_id: RoomId,
        is_private: bool,
        receiver_id: Option<UserId>,
    ) -> Result<(), ChatError> {
        match self.state {
            SessionState::Joined(current) if current == room_id => {}
            _ => {
                return Err(
                    DomainError::validation("roomId", "connection has not joined this room").into(),
                )
            }
        }

        let command = SendMessageCommand {
            room_id,
            sender_id: self.identity.user_id,
            sender_name: self.identity.display_name.clone(),
            content,
            is_private,
            receiver_id,
        };
        self.deps.router.route(command).await?;
        Ok(())
    }

    /// joined(R) → connected。对未加入房间的连接按良性空操作处理。
    async fn handle_leave(&mut self, room_id: RoomId) -> Result<(), ChatError> {
        let SessionState::Joined(current) = self.state else {
            tracing::warn!(
                connection_id = %self.connection_id,
                room_id = %room_id,
                "leave_room for a connection with no room, ignored"
            );
            return Ok(());
        };
        if current != room_id {
            tracing::warn!(
                connection_id = %self.connection_id,
                joined = %current,
                requested = %room_id,
                "leave_room for a different room, ignored"
            );
            return Ok(());
        }

        match self.deps.registry.leave(self.connection_id).await {
            Ok(_) => {}
            Err(err) => {
                // 登记表里已经没有这个连接，视为良性空操作
                tracing::warn!(error = %err, "leave for unregistered connection ignored");
                self.state = SessionState::Connected;
                return Ok(());
            }
        }
        self.state = SessionState::Connected;

        tracing::info!(
            connection_id = %self.connection_id,
            room_id = %room_id,
            "connection left room"
        );
        self.deps.presence.announce_roster(room_id).await;
        Ok(())
    }

    /// 断开连接，终态。会话被消费，之后的事件不可能到达这里。
    ///
    /// 若连接在房间中，效果等同于离开房间加登记清理；
    /// 已持久化的消息不回滚。
    pub async fn disconnect(self) {
        if let SessionState::Joined(room_id) = self.state {
            match self.deps.registry.leave(self.connection_id).await {
                Ok(_) => self.deps.presence.announce_roster(room_id).await,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        connection_id = %self.connection_id,
                        "disconnect for unregistered connection ignored"
                    );
                }
            }
        }

        tracing::info!(
            connection_id = %self.connection_id,
            user_id = %self.identity.user_id,
            "connection disconnected"
        );
    }

    /// 向触发操作的连接报告失败，携带足够重试的细节。
    async fn report(&self, err: ChatError) {
        tracing::warn!(
            error = %err,
            connection_id = %self.connection_id,
            "inbound event failed"
        );

        let event = ServerEvent::Error {
            code: err.error_code(),
            message: err.to_string(),
        };
        if let Err(deliver_err) = self
            .deps
            .broadcaster
            .deliver(self.connection_id, event)
            .await
        {
            tracing::warn!(
                error = %deliver_err,
                connection_id = %self.connection_id,
                "failed to report error to connection"
            );
        }
    }
}
