//! 基于 tokio channel 的传输广播器
//!
//! 每条连接注册一个无界发送端，事件由连接自己的发送任务写回
//! WebSocket。广播器只按 ConnectionId 寻址，不关心网络细节。

use std::collections::HashMap;

use application::{BroadcastError, ConnectionBroadcaster};
use async_trait::async_trait;
use domain::{ConnectionId, ServerEvent};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// 连接发送端登记表
#[derive(Default)]
pub struct ChannelBroadcaster {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册连接发送端
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id, sender);
        debug!(connection_id = %connection_id, "sender registered");
    }

    /// 注销连接发送端
    pub async fn unregister(&self, connection_id: ConnectionId) {
        let mut senders = self.senders.write().await;
        senders.remove(&connection_id);
        debug!(connection_id = %connection_id, "sender unregistered");
    }
}

#[async_trait]
impl ConnectionBroadcaster for ChannelBroadcaster {
    async fn deliver(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), BroadcastError> {
        let senders = self.senders.read().await;
        let sender = senders
            .get(&connection_id)
            .ok_or_else(|| BroadcastError::delivery("connection sender not found"))?;

        sender
            .send(event)
            .map_err(|_| BroadcastError::delivery("connection channel closed"))?;
        Ok(())
    }

    async fn broadcast_to(&self, targets: &[ConnectionId], event: ServerEvent) {
        let senders = self.senders.read().await;
        let mut failed_count = 0;

        for &connection_id in targets {
            match senders.get(&connection_id) {
                Some(sender) if sender.send(event.clone()).is_ok() => {}
                _ => {
                    failed_count += 1;
                    warn!(connection_id = %connection_id, "failed to deliver event");
                }
            }
        }

        if failed_count > 0 {
            warn!(failed_count, "broadcast skipped unreachable connections");
        }
    }
}
