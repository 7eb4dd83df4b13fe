//! 领域模型错误定义
//!
//! 定义校验错误和持久化网关错误，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 验证错误
    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },
}

impl DomainError {
    /// 创建验证错误
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 持久化网关错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// 资源不存在
    #[error("resource not found")]
    NotFound,

    /// 存储失败
    #[error("storage error: {message}")]
    Storage { message: String },

    /// 持久化调用超时
    #[error("storage operation timed out")]
    Timeout,
}

impl RepositoryError {
    /// 创建存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
