use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::Filter;

use crate::error::ApiError;

const ADMIN_ROLES: [&str; 2] = ["admin", "service_role"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    pub display_name: Option<String>,
    pub full_name: Option<String>,
}

/// Claims issued by the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: u64,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    fn from_claims(claims: AccessTokenClaims) -> Result<Self, AuthError> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::warn!("Token subject '{}' is not a user id", claims.sub);
            AuthError::InvalidToken
        })?;
        let email = claims.email.unwrap_or_default();
        let display_name = claims
            .user_metadata
            .display_name
            .or(claims.user_metadata.full_name)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(Self {
            id,
            email,
            display_name,
            is_admin: claims
                .role
                .as_deref()
                .is_some_and(|role| ADMIN_ROLES.contains(&role)),
        })
    }
}

/// Dev-mode ids that are not UUIDs map to a stable UUID so the same name
/// always lands on the same profile.
fn dev_user_id(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes()))
}

pub struct AuthService {
    decoding_key: Option<DecodingKey>,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: Some(DecodingKey::from_secret(jwt_secret.as_bytes())),
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            decoding_key: None,
            dev_mode: true,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let key = self.decoding_key.as_ref().ok_or(AuthError::InvalidKey)?;
        let mut validation = Validation::new(Algorithm::HS256);
        // Audience is always "authenticated"; the signature is what matters
        validation.validate_aud = false;

        let token_data = decode::<AccessTokenClaims>(token, key, &validation).map_err(|e| {
            tracing::warn!("JWT token validation failed: {:?}", e.kind());
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        AuthenticatedUser::from_claims(token_data.claims)
    }

    fn validate_dev_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        tracing::debug!(
            "Validating dev token (first 20 chars): {}",
            token.chars().take(20).collect::<String>()
        );

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 {
            // Unsigned JWT: only the payload is read
            let payload = URL_SAFE_NO_PAD
                .decode(parts[1].trim_end_matches('='))
                .map_err(|e| {
                    tracing::warn!("Failed to decode JWT payload in dev mode: {:?}", e);
                    AuthError::InvalidToken
                })?;
            let claims: AccessTokenClaims = serde_json::from_slice(&payload).map_err(|e| {
                tracing::warn!("Failed to parse JWT claims in dev mode: {:?}", e);
                AuthError::InvalidToken
            })?;
            return AuthenticatedUser::from_claims(claims);
        }

        if token.starts_with('{') && token.ends_with('}') {
            #[derive(Deserialize)]
            struct DevClaims {
                user_id: String,
                email: String,
                name: String,
                #[serde(default)]
                admin: bool,
            }

            let claims: DevClaims =
                serde_json::from_str(token).map_err(|_| AuthError::InvalidToken)?;
            return Ok(AuthenticatedUser {
                id: dev_user_id(&claims.user_id),
                email: claims.email,
                display_name: claims.name,
                is_admin: claims.admin,
            });
        }

        // "user_id:email:name" with an optional ":admin" suffix
        let parts: Vec<&str> = token.split(':').collect();
        match parts.as_slice() {
            [id, email, name] | [id, email, name, _] if !id.is_empty() && !name.is_empty() => {
                Ok(AuthenticatedUser {
                    id: dev_user_id(id),
                    email: email.to_string(),
                    display_name: name.to_string(),
                    is_admin: parts.get(3) == Some(&"admin"),
                })
            }
            _ => Err(AuthError::InvalidToken),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid key")]
    InvalidKey,
}

/// Resolve the caller from the `Authorization: Bearer <token>` header.
pub fn with_auth(
    auth_service: Arc<AuthService>,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth_service = auth_service.clone();
        async move {
            let header = header.ok_or_else(|| warp::reject::custom(ApiError::Unauthorized))?;
            let token = header.strip_prefix("Bearer ").unwrap_or(&header);
            auth_service.validate_token(token).map_err(|e| {
                tracing::warn!("Rejected request token: {}", e);
                warp::reject::custom(ApiError::Unauthorized)
            })
        }
    })
}
