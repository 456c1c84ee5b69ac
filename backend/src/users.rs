use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use diesel::AsChangeset;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, AuthUser};
use crate::db;
use crate::error::ApiError;
use crate::models::{Role, User};
use crate::schema::users;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub company_name: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Name, email and password are required".to_string(),
        ));
    }

    let conn = &mut db::connect(&state.config.database_url)?;
    let existing = users::table
        .filter(users::email.eq(&req.email))
        .first::<User>(conn)
        .optional()?;
    if existing.is_some() {
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let now = Utc::now().naive_utc();
    let new_user = User {
        id: Uuid::new_v4(),
        name: req.name.clone(),
        email: req.email.clone(),
        password_hash: auth::hash_password(&req.password)?,
        role: req.role.as_str().to_string(),
        company_name: req.company_name,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(conn)?;

    log::info!("Created {} account for {}", req.role, req.email);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": { "name": req.name, "role": req.role },
        })),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Portal the client is logging into; a mismatch with the account's
    /// actual role is rejected.
    pub role: Option<Role>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = &mut db::connect(&state.config.database_url)?;
    let user = users::table
        .filter(users::email.eq(&req.email))
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::Authentication("Invalid credentials".to_string()))?;

    let role = user.role()?;
    if let Some(portal) = req.role {
        if portal != role {
            return Err(ApiError::Authorization(format!(
                "Access denied. You are trying to log into the {} portal with a {} account.",
                portal, role
            )));
        }
    }

    if !auth::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Authentication("Invalid credentials".to_string()));
    }

    let token = auth::create_token(user.id, role, &state.config.jwt_secret)?;
    log::info!("Authenticated {} ({})", user.email, role);
    Ok(Json(json!({
        "token": token,
        "user": {
            "name": user.name,
            "role": user.role,
            "email": user.email,
            "companyName": user.company_name,
        },
    })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<User>, ApiError> {
    let conn = &mut db::connect(&state.config.database_url)?;
    let account = users::table
        .find(user.id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(account))
}

#[derive(Deserialize, AsChangeset)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = &mut db::connect(&state.config.database_url)?;

    if let Some(ref email) = req.email {
        let taken = users::table
            .filter(users::email.eq(email))
            .filter(users::id.ne(user.id))
            .first::<User>(conn)
            .optional()?;
        if taken.is_some() {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    let updated = diesel::update(users::table.find(user.id))
        .set((&req, users::updated_at.eq(Utc::now().naive_utc())))
        .get_result::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": updated,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    pub current_password: String,
    pub new_password: String,
}

pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PasswordUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::Validation(
            "Current password and new password are required".to_string(),
        ));
    }
    if req.new_password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let conn = &mut db::connect(&state.config.database_url)?;
    let account = users::table
        .find(user.id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !auth::verify_password(&req.current_password, &account.password_hash)? {
        return Err(ApiError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    diesel::update(users::table.find(user.id))
        .set((
            users::password_hash.eq(auth::hash_password(&req.new_password)?),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}
