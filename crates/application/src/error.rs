use domain::{ConnectionId, DomainError, ErrorCode, RepositoryError};
use thiserror::Error;

use crate::identity::AuthError;

/// 实时层统一错误类型。
///
/// 所有错误都在产生它们的操作边界处理，绝不让进程崩溃；
/// 失败只报告给触发操作的连接，其他成员不感知。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// 入站载荷不合法，无状态变更
    #[error("validation error: {0}")]
    Validation(#[from] DomainError),
    /// 存储不可用或写入失败，消息不广播
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
    /// 对未登记连接的操作，按良性空操作处理
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),
    /// 身份验证失败，连接在登记前被拒绝
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl ChatError {
    /// 映射为推送给客户端的错误码。
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Persistence(_) => ErrorCode::Persistence,
            Self::NotRegistered(_) => ErrorCode::NotRegistered,
            Self::Auth(_) => ErrorCode::Auth,
        }
    }
}
