use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::lifecycle::{self, QuoteStatus};
use crate::models::{Product, Quote, Role};
use crate::schema::{orders, products, quotes};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub message: Option<String>,
}

pub async fn request_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Buyer)?;
    if req.quantity <= 0 {
        return Err(ApiError::Validation(
            "Quantity must be greater than zero".to_string(),
        ));
    }

    let conn = &mut db::connect(&state.config.database_url)?;
    let product = products::table
        .find(req.product_id)
        .first::<Product>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let now = Utc::now().naive_utc();
    let quote = Quote {
        id: Uuid::new_v4(),
        buyer_id: user.id,
        vendor_id: product.vendor_id,
        product_id: product.id,
        quantity: req.quantity,
        message: req.message,
        vendor_price: None,
        total_price: None,
        vendor_response: None,
        status: QuoteStatus::Pending.as_str().to_string(),
        expires_at: lifecycle::quote_expiry(now),
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(quotes::table)
        .values(&quote)
        .execute(conn)?;

    log::info!("Buyer {} requested quote {} for product {}", user.id, quote.id, product.id);
    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn vendor_quotes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Quote>>, ApiError> {
    user.require(Role::Vendor)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = quotes::table
        .filter(quotes::vendor_id.eq(user.id))
        .order_by(quotes::created_at.desc())
        .load::<Quote>(conn)?;
    Ok(Json(items))
}

pub async fn buyer_quotes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Quote>>, ApiError> {
    user.require(Role::Buyer)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = quotes::table
        .filter(quotes::buyer_id.eq(user.id))
        .order_by(quotes::created_at.desc())
        .load::<Quote>(conn)?;
    Ok(Json(items))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    pub vendor_price: Option<f64>,
    pub vendor_response: Option<String>,
    pub status: Option<String>,
}

pub async fn respond_to_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(quote_id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<Quote>, ApiError> {
    user.require(Role::Vendor)?;

    let target = match req.status.as_deref() {
        Some(s) => Some(QuoteStatus::parse(s).ok_or_else(|| {
            ApiError::Validation(format!("Unknown quote status '{}'", s))
        })?),
        None => None,
    };

    let conn = &mut db::connect(&state.config.database_url)?;
    // Scoping the lookup to the caller keeps other vendors' quotes
    // indistinguishable from absent ones.
    let quote = quotes::table
        .filter(quotes::id.eq(quote_id))
        .filter(quotes::vendor_id.eq(user.id))
        .first::<Quote>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;

    let outcome = lifecycle::respond(&quote, req.vendor_price, target)?;
    let updated = diesel::update(quotes::table.find(quote.id))
        .set((
            quotes::vendor_price.eq(outcome.vendor_price),
            quotes::total_price.eq(outcome.total_price),
            quotes::vendor_response.eq(req.vendor_response.or(quote.vendor_response)),
            quotes::status.eq(outcome.status.as_str()),
            quotes::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<Quote>(conn)?;

    log::info!("Vendor {} moved quote {} to {}", user.id, updated.id, outcome.status);
    Ok(Json(updated))
}

/// Accepts a quoted RFQ and creates the corresponding order. The status
/// write and the order insert land in one transaction so no reader ever
/// sees an accepted quote without its order.
pub async fn accept_quote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(quote_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Buyer)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let quote = quotes::table
        .filter(quotes::id.eq(quote_id))
        .filter(quotes::buyer_id.eq(user.id))
        .first::<Quote>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;

    let now = Utc::now().naive_utc();
    let order = lifecycle::accept(&quote, now)?;

    let (quote, order) = conn.transaction::<_, ApiError, _>(|conn| {
        // Guard on the current status so a concurrent accept or decline
        // between the read above and this write cannot double-fire.
        let accepted = diesel::update(
            quotes::table
                .filter(quotes::id.eq(quote.id))
                .filter(quotes::status.eq(QuoteStatus::Quoted.as_str())),
        )
        .set((
            quotes::status.eq(QuoteStatus::Accepted.as_str()),
            quotes::updated_at.eq(now),
        ))
        .get_result::<Quote>(conn)
        .optional()?
        .ok_or_else(|| ApiError::Conflict("Quote is not in quoted status".to_string()))?;

        diesel::insert_into(orders::table)
            .values(&order)
            .execute(conn)?;
        Ok((accepted, order))
    })?;

    log::info!(
        "Buyer {} accepted quote {}, created order {}",
        user.id,
        quote.id,
        order.id
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "order": order, "quote": quote })),
    ))
}
