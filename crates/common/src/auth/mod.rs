//! Session context for authenticated requests
//!
//! Sign-in happens against the hosted backend, which hands the client a
//! signed access token. This module only verifies those tokens and turns
//! them into an explicit [`Session`] value passed to handlers; there is no
//! process-wide "current user".

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
#[cfg(any(test, feature = "testing"))]
use {
    chrono::{Duration, Utc},
    jsonwebtoken::{encode, EncodingKey, Header},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Application role carried in the `app_role` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Adviser,
    Admin,
    Superadmin,
}

impl Role {
    /// Admins and the superadmin curate papers and citation links
    pub fn can_manage_citations(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

/// Identity of the caller for the duration of one request
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,

    /// Request ID for tracing
    pub request_id: String,
}

impl Session {
    /// Fail with `Forbidden` unless the caller may edit citation edges
    pub fn require_citation_manager(&self) -> Result<()> {
        if self.role.can_manage_citations() {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: format!("role {:?} cannot manage citations", self.role),
            })
        }
    }
}

/// Claims issued by the hosted backend
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(default)]
    pub app_role: Role,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Verifies access tokens and builds sessions from them
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    #[cfg(any(test, feature = "testing"))]
    minter: TokenMinter,
}

/// Signs tokens shaped like the hosted backend's, for tests only
#[cfg(any(test, feature = "testing"))]
struct TokenMinter {
    encoding_key: EncodingKey,
    audience: Option<String>,
    expiration_secs: i64,
}

impl SessionVerifier {
    /// Create a verifier for tokens signed with `secret`
    pub fn new(secret: &str, audience: Option<String>, expiration_secs: u64) -> Self {
        let mut validation = Validation::default();
        match audience {
            Some(ref aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }

        #[cfg(not(any(test, feature = "testing")))]
        let _ = (audience, expiration_secs);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            #[cfg(any(test, feature = "testing"))]
            minter: TokenMinter {
                encoding_key: EncodingKey::from_secret(secret.as_bytes()),
                audience,
                expiration_secs: expiration_secs as i64,
            },
        }
    }

    /// Build from configuration; a secret is mandatory
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.jwt_secret is not set".to_string(),
            })?;

        Ok(Self::new(
            secret,
            config.audience.clone(),
            config.jwt_expiration_secs,
        ))
    }

    /// Mint a token the way the hosted backend does.
    ///
    /// Production tokens only ever come from the hosted backend; this exists
    /// for tests, here and in dependent crates through the `testing` feature.
    #[cfg(any(test, feature = "testing"))]
    pub fn issue(&self, user_id: Uuid, email: Option<String>, role: Role) -> Result<String> {
        let minter = &self.minter;
        let now = Utc::now();
        let exp = now + Duration::seconds(minter.expiration_secs);

        let claims = SessionClaims {
            sub: user_id.to_string(),
            email,
            aud: minter.audience.clone(),
            app_role: role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &minter.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a token
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Turn a bearer token into a session
    pub fn session_from_token(&self, token: &str, request_id: String) -> Result<Session> {
        let claims = self.verify(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(Session {
            user_id,
            email: claims.email,
            role: claims.app_role,
            request_id,
        })
    }
}

/// Extract the token from an `Authorization: Bearer ...` header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum extractor for Session
impl<S> FromRequestParts<S> for Session
where
    Arc<SessionVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a bearer token".to_string(),
        })?;

        let verifier = <Arc<SessionVerifier> as FromRef<S>>::from_ref(state);
        let session = verifier.session_from_token(token, request_id)?;

        tracing::debug!(
            user_id = %session.user_id,
            role = ?session.role,
            request_id = %session.request_id,
            "Session established"
        );

        Ok(session)
    }
}
