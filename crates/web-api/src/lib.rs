//! Web API 层。
//!
//! 提供 Axum 路由，将 WebSocket 连接升级并委托给应用层的会话状态机。

mod error;
mod routes;
mod state;
mod ws_connection;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
