use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Role;
use crate::AppState;

const TOKEN_VALIDITY_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

pub fn create_token(user_id: Uuid, role: Role, secret: &str) -> Result<String, ApiError> {
    let expiration = (Utc::now() + Duration::hours(TOKEN_VALIDITY_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

pub fn validate_token(token: &str, secret: &str) -> Result<AuthUser, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    let id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::Authentication("Invalid or expired token".to_string()))?;
    Ok(AuthUser {
        id,
        role: data.claims.role,
    })
}

/// The authenticated caller, extracted from the bearer token. Handlers
/// take this as an argument; routes without it stay public.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Role gate. Admins pass every gate (capability union), so admin
    /// accounts can act on buyer- and vendor-only routes.
    pub fn require(&self, required: Role) -> Result<(), ApiError> {
        if self.role == required || self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Authorization(format!(
                "Access denied. Required role: {}",
                required
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::Authentication("Missing Authorization header".to_string())
            })?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Authentication("Invalid Authorization header format".to_string())
        })?;
        validate_token(token, &state.config.jwt_secret)
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    Ok(bcrypt::verify(password, hash)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_subject_and_role() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, Role::Vendor, "test-secret").unwrap();
        let user = validate_token(&token, "test-secret").unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Vendor);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = create_token(Uuid::new_v4(), Role::Buyer, "test-secret").unwrap();
        let err = validate_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn admin_passes_every_role_gate() {
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(admin.require(Role::Buyer).is_ok());
        assert!(admin.require(Role::Vendor).is_ok());
        assert!(admin.require(Role::Admin).is_ok());
    }

    #[test]
    fn buyer_cannot_pass_vendor_gate() {
        let buyer = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Buyer,
        };
        assert!(matches!(
            buyer.require(Role::Vendor),
            Err(ApiError::Authorization(_))
        ));
        assert!(buyer.require(Role::Buyer).is_ok());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }
}
