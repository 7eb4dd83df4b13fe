//! 客户端与服务端之间的事件协议。
//!
//! 每种事件一个强类型变体，不匹配的载荷直接拒绝，
//! 不在运行时按载荷形状分支。

use serde::{Deserialize, Serialize};

use crate::connection::RosterEntry;
use crate::message::Message;
use crate::value_objects::{RoomId, UserId};

/// 客户端发来的事件。断开由传输层产生，不在此枚举内。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// 加入房间
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    /// 发送消息
    SendMessage {
        content: String,
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "isPrivate", default)]
        is_private: bool,
        #[serde(rename = "receiverId", default)]
        receiver_id: Option<UserId>,
    },
    /// 离开房间
    LeaveRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
}

/// 服务端推送给客户端的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 房间在线名单，成员变化后推送给房间内所有连接
    RoomUsers { users: Vec<RosterEntry> },
    /// 新消息，推送给消息的目标受众
    ReceiveMessage { message: Message },
    /// 加入房间时回放的历史消息，按时间升序
    MessageHistory { messages: Vec<Message> },
    /// 操作失败，仅推送给触发操作的连接
    Error { code: ErrorCode, message: String },
}

/// 推送给客户端的错误码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "PersistenceError")]
    Persistence,
    #[serde(rename = "NotRegisteredError")]
    NotRegistered,
    #[serde(rename = "AuthError")]
    Auth,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Persistence => "PersistenceError",
            Self::NotRegistered => "NotRegisteredError",
            Self::Auth => "AuthError",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
