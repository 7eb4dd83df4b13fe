//! 房间在线名单服务。
//!
//! 名单永远从连接登记表派生，不单独维护状态；
//! 只在成员变化后广播，不做轮询。

use std::sync::Arc;

use domain::{ConnectionEntry, ConnectionId, RoomId, ServerEvent};

use crate::broadcaster::ConnectionBroadcaster;
use crate::registry::ConnectionRegistry;

pub struct RoomPresenceService {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<dyn ConnectionBroadcaster>,
}

impl RoomPresenceService {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        broadcaster: Arc<dyn ConnectionBroadcaster>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// 重新计算房间名单并广播给房间内所有连接，包括触发变更的连接。
    ///
    /// 广播是尽力而为的：某个连接投递失败不影响其余连接，
    /// 也不会让触发它的加入/离开操作失败。
    pub async fn announce_roster(&self, room_id: RoomId) {
        let entries = self.registry.entries_in_room(room_id).await;
        let users = entries
            .iter()
            .map(ConnectionEntry::roster_entry)
            .collect::<Vec<_>>();
        let targets = entries
            .iter()
            .map(|entry| entry.connection_id)
            .collect::<Vec<ConnectionId>>();

        tracing::debug!(room_id = %room_id, online = targets.len(), "announcing roster");
        self.broadcaster
            .broadcast_to(&targets, ServerEvent::RoomUsers { users })
            .await;
    }
}
