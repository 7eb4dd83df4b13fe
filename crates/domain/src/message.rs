//! 消息实体与可见范围规则。
//!
//! 私聊消息的可见性判定集中在 [`Message::visible_to`]，
//! 路由层和历史回放都只依赖这一个判定点。

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{MessageContent, MessageId, RoomId, Timestamp, UserId};

/// 消息的可见范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageScope {
    /// 对房间内所有连接可见
    Public,
    /// 仅发送者与接收者可见
    Private { receiver_id: UserId },
}

impl MessageScope {
    /// 构造私聊范围，接收者必须存在且不能是发送者本人。
    pub fn private(sender_id: UserId, receiver_id: UserId) -> Result<Self, DomainError> {
        if receiver_id == sender_id {
            return Err(DomainError::validation(
                "receiverId",
                "cannot send a private message to yourself",
            ));
        }
        Ok(Self::Private { receiver_id })
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private { .. })
    }

    pub fn receiver_id(&self) -> Option<UserId> {
        match self {
            Self::Public => None,
            Self::Private { receiver_id } => Some(*receiver_id),
        }
    }
}

/// 待持久化的消息草稿，已通过全部校验。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: MessageContent,
    pub scope: MessageScope,
}

impl NewMessage {
    pub fn new(
        room_id: RoomId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        content: MessageContent,
        scope: MessageScope,
    ) -> Self {
        Self {
            room_id,
            sender_id,
            sender_name: sender_name.into(),
            content,
            scope,
        }
    }
}

/// 已持久化的消息，id 和 created_at 由持久化层分配，之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender_id: UserId,
    pub sender_name: String,
    pub room_id: RoomId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
    pub is_private: bool,
    pub receiver_id: Option<UserId>,
}

impl Message {
    /// 判定某个用户是否可以看到这条消息。
    ///
    /// 公开消息对所有人可见；私聊消息仅发送者和接收者可见。
    pub fn visible_to(&self, user_id: UserId) -> bool {
        if !self.is_private {
            return true;
        }
        self.sender_id == user_id || self.receiver_id == Some(user_id)
    }
}
