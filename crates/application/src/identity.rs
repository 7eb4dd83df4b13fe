//! 身份网关抽象。
//!
//! 核心只消费身份网关的输出，从不自行解析凭证格式。

use domain::UserId;
use thiserror::Error;

/// 已验证的用户身份。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub display_name: String,
}

impl UserIdentity {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 凭证无效或已过期
    #[error("invalid credential: {reason}")]
    InvalidCredential { reason: String },
}

impl AuthError {
    pub fn invalid_credential(reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            reason: reason.into(),
        }
    }
}

/// 身份网关接口：验证承载凭证并返回稳定的用户身份。
///
/// 验证失败时连接在任何登记表变更之前被拒绝。
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<UserIdentity, AuthError>;
}
