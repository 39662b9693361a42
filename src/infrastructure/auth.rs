use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Json},
    http::{request::Parts, HeaderMap, StatusCode},
};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::sync::Arc;

use crate::infrastructure::AppState;
use crate::models::user::{self, Entity as User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub uid: i32,
    pub role: String,
    pub exp: usize,
}

/// Tokens presented at logout, kept until they would have expired anyway.
#[derive(Clone, Default)]
pub struct RevokedTokens {
    inner: Arc<DashMap<String, usize>>,
}

impl RevokedTokens {
    pub fn revoke(&self, token: &str, exp: usize) {
        self.purge_expired();
        self.inner.insert(token.to_owned(), exp);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.inner.contains_key(token)
    }

    fn purge_expired(&self) {
        let now = Utc::now().timestamp() as usize;
        self.inner.retain(|_, exp| *exp > now);
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| e.to_string())?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

pub fn create_jwt(user_id: i32, username: &str, role: &str) -> Result<String, String> {
    let secret = get_jwt_secret();
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| "Token expiry overflow".to_string())?
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        role: role.to_owned(),
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// Role label carried in the token. Superusers have no business role.
pub fn role_claim(user: &user::Model) -> String {
    if user.is_superuser {
        "superuser".to_string()
    } else {
        user.role.clone().unwrap_or_default()
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[derive(Debug)]
pub enum AuthFailure {
    Missing,
    Invalid,
    Revoked,
    UnknownUser,
    Database(String),
}

/// Resolve a bearer token into the stored user it names.
pub async fn authenticate(
    db: &DatabaseConnection,
    revoked: &RevokedTokens,
    token: &str,
) -> Result<(user::Model, Claims), AuthFailure> {
    let claims = decode_jwt(token).map_err(|_| AuthFailure::Invalid)?;
    if revoked.is_revoked(token) {
        return Err(AuthFailure::Revoked);
    }

    let user = User::find_by_id(claims.uid)
        .one(db)
        .await
        .map_err(|e| AuthFailure::Database(e.to_string()))?
        .ok_or(AuthFailure::UnknownUser)?;

    // Renamed accounts invalidate older tokens
    if user.username != claims.sub {
        return Err(AuthFailure::UnknownUser);
    }

    Ok((user, claims))
}

/// The authenticated caller of a request, loaded fresh from the database.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: user::Model,
    pub claims: Claims,
    pub token: String,
}

impl Principal {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn can_manage(&self) -> bool {
        self.user.can_manage()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Missing Authorization header" })),
            ))?
            .to_owned();

        match authenticate(state.db(), &state.revoked, &token).await {
            Ok((user, claims)) => Ok(Principal {
                user,
                claims,
                token,
            }),
            Err(AuthFailure::Database(e)) => {
                tracing::error!("Failed to load user for token: {}", e);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Database error" })),
                ))
            }
            Err(reason) => {
                tracing::debug!("Rejected token: {:?}", reason);
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "Invalid or expired token" })),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_jwt_carries_user_id() {
        let token = create_jwt(7, "alice", "seller").unwrap();
        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, "seller");
    }

    #[test]
    fn test_revoked_tokens_are_remembered() {
        let revoked = RevokedTokens::default();
        let exp = (Utc::now().timestamp() + 3600) as usize;
        revoked.revoke("abc", exp);
        assert!(revoked.is_revoked("abc"));
        assert!(!revoked.is_revoked("def"));
    }

    #[test]
    fn test_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Token abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        headers.insert("Authorization", "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
