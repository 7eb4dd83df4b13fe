//! 应用层实现。
//!
//! 这里提供围绕领域模型的实时用例服务：连接登记、在线名单广播、
//! 消息路由与顺序保证，以及对外部协作方（身份网关、持久化网关、
//! 传输广播器）的抽象。

pub mod broadcaster;
pub mod error;
pub mod identity;
pub mod presence;
pub mod registry;
pub mod repository;
pub mod router;
pub mod session;

pub use broadcaster::{BroadcastError, ConnectionBroadcaster};
pub use error::ChatError;
pub use identity::{AuthError, IdentityVerifier, UserIdentity};
pub use presence::RoomPresenceService;
pub use registry::ConnectionRegistry;
pub use repository::{bounded, MessageRepository, RoomRepository};
pub use router::{MessageRouter, SendMessageCommand};
pub use session::{ConnectionSession, RealtimeDependencies, SessionState};
