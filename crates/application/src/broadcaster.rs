//! 传输广播器抽象。
//!
//! 核心只通过不透明的 ConnectionId 寻址连接，
//! 不依赖任何具体的网络协议。

use async_trait::async_trait;
use domain::{ConnectionId, ServerEvent};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl BroadcastError {
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery(message.into())
    }
}

#[async_trait]
pub trait ConnectionBroadcaster: Send + Sync {
    /// 投递事件到单个连接。
    async fn deliver(
        &self,
        connection_id: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), BroadcastError>;

    /// 将事件投递到一组连接。
    ///
    /// 尽力而为：单个连接投递失败由实现记录日志，
    /// 不阻止其余连接收到事件，也不向调用方传播。
    async fn broadcast_to(&self, targets: &[ConnectionId], event: ServerEvent);
}
