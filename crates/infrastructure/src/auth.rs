//! JWT 身份网关实现
//!
//! 验证承载凭证并提取稳定的用户身份。凭证的签发属于外部系统，
//! 这里只做验证。

use application::{AuthError, IdentityVerifier, UserIdentity};
use config::JwtConfig;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::UserId;

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: Uuid,
    /// 展示名
    pub username: String,
    /// 过期时间 (Unix timestamp)
    pub exp: i64,
}

/// 基于 HS256 共享密钥的身份验证器
pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
            validation: Validation::default(),
        }
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, credential: &str) -> Result<UserIdentity, AuthError> {
        let data = decode::<Claims>(credential, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::invalid_credential(err.to_string()))?;

        Ok(UserIdentity::new(
            UserId::from(data.claims.sub),
            data.claims.username,
        ))
    }
}
