use axum::extract::{Path, State};
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
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub company_name: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(Role::Admin)?;
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Name, email, password, and role are required".to_string(),
        ));
    }
    let role = Role::parse(&req.role).ok_or_else(|| {
        ApiError::Validation("Invalid role. Must be 'buyer', 'vendor', or 'admin'".to_string())
    })?;

    let conn = &mut db::connect(&state.config.database_url)?;
    let existing = users::table
        .filter(users::email.eq(&req.email))
        .first::<User>(conn)
        .optional()?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let user = User {
        id: Uuid::new_v4(),
        name: req.name,
        email: req.email,
        password_hash: auth::hash_password(&req.password)?,
        role: role.as_str().to_string(),
        company_name: req.company_name,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(users::table)
        .values(&user)
        .execute(conn)?;

    log::info!("Admin {} created {} account {}", caller.id, role, user.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<User>>, ApiError> {
    caller.require(Role::Admin)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = users::table
        .order_by(users::created_at.desc())
        .load::<User>(conn)?;
    Ok(Json(items))
}

/// Lists accounts by role. Registered on `/admin/users/:id`, where the
/// path segment carries a role name for GET but a user UUID for the
/// PATCH/DELETE handlers sharing the route.
pub async fn users_by_role(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(role): Path<String>,
) -> Result<Json<Vec<User>>, ApiError> {
    caller.require(Role::Admin)?;
    let role =
        Role::parse(&role).ok_or_else(|| ApiError::Validation("Invalid role".to_string()))?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = users::table
        .filter(users::role.eq(role.as_str()))
        .order_by(users::created_at.desc())
        .load::<User>(conn)?;
    Ok(Json(items))
}

pub async fn get_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    caller.require(Role::Admin)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let user = users::table
        .find(user_id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    /// Changing a role is an explicit admin-only operation.
    pub role: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct UserChanges {
    name: Option<String>,
    email: Option<String>,
    company_name: Option<String>,
    role: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(Role::Admin)?;
    let role = match req.role.as_deref() {
        Some(r) => Some(
            Role::parse(r)
                .ok_or_else(|| ApiError::Validation("Invalid role".to_string()))?
                .as_str()
                .to_string(),
        ),
        None => None,
    };

    let conn = &mut db::connect(&state.config.database_url)?;
    if let Some(ref email) = req.email {
        let taken = users::table
            .filter(users::email.eq(email))
            .filter(users::id.ne(user_id))
            .first::<User>(conn)
            .optional()?;
        if taken.is_some() {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    let changes = UserChanges {
        name: req.name,
        email: req.email,
        company_name: req.company_name,
        role,
    };
    let updated = diesel::update(users::table.find(user_id))
        .set((&changes, users::updated_at.eq(Utc::now().naive_utc())))
        .get_result::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "message": "User updated successfully",
        "user": updated,
    })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(Role::Admin)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let deleted = diesel::delete(users::table.find(user_id)).execute(conn)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    log::info!("Admin {} deleted user {}", caller.id, user_id);
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

pub async fn stats(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    caller.require(Role::Admin)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let total_users: i64 = users::table.count().get_result(conn)?;
    let total_vendors: i64 = users::table
        .filter(users::role.eq(Role::Vendor.as_str()))
        .count()
        .get_result(conn)?;
    let total_buyers: i64 = users::table
        .filter(users::role.eq(Role::Buyer.as_str()))
        .count()
        .get_result(conn)?;
    let total_admins: i64 = users::table
        .filter(users::role.eq(Role::Admin.as_str()))
        .count()
        .get_result(conn)?;

    Ok(Json(json!({
        "totalUsers": total_users,
        "totalVendors": total_vendors,
        "totalBuyers": total_buyers,
        "totalAdmins": total_admins,
    })))
}
