//! 实时聊天系统核心领域模型
//!
//! 包含连接、房间、消息等核心类型，以及事件协议和相关的业务规则。

pub mod connection;
pub mod errors;
pub mod events;
pub mod message;
pub mod value_objects;

// 重新导出常用类型
pub use connection::*;
pub use errors::*;
pub use events::*;
pub use message::*;
pub use value_objects::*;
