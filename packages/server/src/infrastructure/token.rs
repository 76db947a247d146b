//! JWT (HS256) によるセッショントークン発行
//!
//! `exp` はクレームに含めるが検証時には判定しない。
//! 有効期限はセッションレコードが正であり、SessionStore が判定する。

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{SessionToken, Timestamp, TokenError, TokenIssuer, Username};

/// 署名鍵の最小長
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("jwt secret must be at least {MIN_SECRET_LEN} characters long")]
pub struct WeakSecretError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    /// 同じミリ秒に同じユーザーへ発行してもトークンが衝突しないようにする
    jti: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenIssuer {
    pub fn new(secret: &str) -> Result<Self, WeakSecretError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(WeakSecretError);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(
        &self,
        username: &Username,
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> Result<SessionToken, TokenError> {
        let claims = SessionClaims {
            sub: username.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.value() / 1000,
            exp: expires_at.value() / 1000,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        SessionToken::new(token).map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<Username, TokenError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?
            .claims;

        Username::new(claims.sub).map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
