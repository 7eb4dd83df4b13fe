//! 连接登记条目与在线名单投影。

use serde::{Deserialize, Serialize};

use crate::value_objects::{ConnectionId, RoomId, UserId};

/// 一条活跃连接在登记表中的记录。
///
/// 每个 connection_id 同一时刻最多存在一条记录；重连时旧记录被整体替换。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEntry {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub display_name: String,
    pub room_id: RoomId,
}

impl ConnectionEntry {
    pub fn new(
        connection_id: ConnectionId,
        user_id: UserId,
        display_name: impl Into<String>,
        room_id: RoomId,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            display_name: display_name.into(),
            room_id,
        }
    }

    /// 对外公开的名单投影，不包含连接标识。
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            is_online: true,
        }
    }
}

/// 房间名单中的一项，面向客户端的公开视图。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: UserId,
    pub display_name: String,
    pub is_online: bool,
}
