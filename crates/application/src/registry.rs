//! 连接登记表
//!
//! "谁在线、在哪个房间"的唯一事实来源。状态完全在进程内，
//! 重启后从零重建：在线状态只保证尽力而为，不持久化。

use std::collections::HashMap;

use domain::{ConnectionEntry, ConnectionId, RoomId, UserId};
use tokio::sync::RwLock;

use crate::error::ChatError;

/// 活跃连接到 (用户, 房间) 的登记表。
///
/// 显式持有的实例，在启动时创建并通过句柄传递给需要它的组件，
/// 不使用隐式的模块级全局状态。
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记连接。
    ///
    /// 同一 connection_id 重连时整体替换旧条目，绝不产生重复；
    /// 对相同参数的重复调用幂等。
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        display_name: impl Into<String>,
        room_id: RoomId,
    ) -> ConnectionEntry {
        let entry = ConnectionEntry::new(connection_id, user_id, display_name, room_id);
        let mut entries = self.entries.write().await;
        if let Some(previous) = entries.insert(connection_id, entry.clone()) {
            tracing::debug!(
                connection_id = %connection_id,
                previous_room = %previous.room_id,
                "connection re-registered, previous entry replaced"
            );
        }
        entry
    }

    /// 注销连接并返回其条目。
    ///
    /// 未登记的连接返回 NotRegistered，调用方按良性空操作处理。
    pub async fn leave(&self, connection_id: ConnectionId) -> Result<ConnectionEntry, ChatError> {
        self.entries
            .write()
            .await
            .remove(&connection_id)
            .ok_or(ChatError::NotRegistered(connection_id))
    }

    /// 房间内当前连接的无序快照。
    ///
    /// 快照在登记表后续变更下不保持稳定，调用方不得依赖顺序。
    pub async fn entries_in_room(&self, room_id: RoomId) -> Vec<ConnectionEntry> {
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.room_id == room_id)
            .cloned()
            .collect()
    }
}
