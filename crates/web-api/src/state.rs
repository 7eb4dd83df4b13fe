use std::sync::Arc;

use application::{IdentityVerifier, RealtimeDependencies};
use infrastructure::ChannelBroadcaster;

#[derive(Clone)]
pub struct AppState {
    /// 实时层服务图，连接间共享
    pub realtime: Arc<RealtimeDependencies>,
    /// 身份网关
    pub identity_verifier: Arc<dyn IdentityVerifier>,
    /// 传输广播器的具体句柄，用于注册/注销连接发送端
    pub transport: Arc<ChannelBroadcaster>,
}

impl AppState {
    pub fn new(
        realtime: Arc<RealtimeDependencies>,
        identity_verifier: Arc<dyn IdentityVerifier>,
        transport: Arc<ChannelBroadcaster>,
    ) -> Self {
        Self {
            realtime,
            identity_verifier,
            transport,
        }
    }
}
