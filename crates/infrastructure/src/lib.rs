//! 基础设施层。
//!
//! 外部协作方的具体适配器：JWT 身份网关、PostgreSQL 持久化网关、
//! 基于 tokio channel 的传输广播器。

pub mod auth;
pub mod channel_broadcaster;
pub mod db;

pub use auth::JwtIdentityVerifier;
pub use channel_broadcaster::ChannelBroadcaster;
pub use db::{create_pg_pool, DbPool, PgMessageRepository, PgRoomRepository};
