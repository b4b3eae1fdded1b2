use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Role, User};

/// Claims carried by access tokens: subject is the user's email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub exp: usize,
}

/// Caller identity, decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

impl AuthUser {
    pub fn require(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!("User {} with role {:?} denied", self.email, self.role);
            Err(AppError::Forbidden("Access denied for your role".to_string()))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        self.require(&[Role::TransitAdmin])
    }

    pub fn require_staff(&self) -> AppResult<()> {
        self.require(&[Role::TicketStaff, Role::TransitAdmin])
    }

    /// Staff may act on anyone's records, passengers only on their own.
    pub fn require_self_or_staff(&self, owner_id: i64) -> AppResult<()> {
        if self.role.is_staff() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("You can only access your own records".to_string()))
        }
    }
}

pub fn issue_token(config: &JwtConfig, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = chrono::Utc::now() + chrono::Duration::hours(config.expires_in_hours);
    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        role: user.role,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        exp: exp.timestamp().max(0) as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
}

// Bearer token extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = decode_token(&state.config.jwt.secret, token.trim()).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::Unauthorized
        })?;

        Ok(claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig { secret: "test-secret".to_string(), expires_in_hours: 1 }
    }

    fn user(role: Role) -> User {
        User {
            id: 7,
            email: "ana@btts.ph".to_string(),
            first_name: Some("Ana".to_string()),
            last_name: Some("Reyes".to_string()),
            role,
        }
    }

    #[test]
    fn issued_token_decodes_to_same_identity() {
        let token = issue_token(&jwt(), &user(Role::TicketStaff)).unwrap();
        let auth: AuthUser = decode_token("test-secret", &token).unwrap().into();

        assert_eq!(auth.user_id, 7);
        assert_eq!(auth.email, "ana@btts.ph");
        assert_eq!(auth.role, Role::TicketStaff);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&jwt(), &user(Role::Passenger)).unwrap();
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = JwtConfig { expires_in_hours: -2, ..jwt() };
        let token = issue_token(&config, &user(Role::Passenger)).unwrap();
        assert!(decode_token("test-secret", &token).is_err());
    }

    #[test]
    fn role_gates() {
        let passenger: AuthUser = AuthUser {
            user_id: 3,
            email: "p@btts.ph".to_string(),
            role: Role::Passenger,
            first_name: None,
            last_name: None,
        };
        assert!(passenger.require_staff().is_err());
        assert!(passenger.require_self_or_staff(3).is_ok());
        assert!(passenger.require_self_or_staff(4).is_err());

        let admin = AuthUser { role: Role::TransitAdmin, ..passenger };
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_staff().is_ok());
        assert!(admin.require_self_or_staff(99).is_ok());
    }
}
