use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::AsChangeset;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::lifecycle::{self, OrderStatus};
use crate::models::{Order, Product, Role, ShippingAddress};
use crate::schema::{orders, products};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
    pub shipping_address: Option<ShippingAddress>,
}

/// Direct purchase path: no quote involved, the order starts confirmed.
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Buyer)?;
    if req.quantity <= 0 {
        return Err(ApiError::Validation(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    if req.unit_price <= 0.0 {
        return Err(ApiError::Validation(
            "Unit price must be greater than zero".to_string(),
        ));
    }

    let conn = &mut db::connect(&state.config.database_url)?;
    let product = products::table
        .find(req.product_id)
        .first::<Product>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let address = req.shipping_address.unwrap_or(ShippingAddress {
        street: None,
        city: None,
        state: None,
        country: None,
        zip_code: None,
    });
    let now = Utc::now().naive_utc();
    let order = Order {
        id: Uuid::new_v4(),
        buyer_id: user.id,
        vendor_id: product.vendor_id,
        product_id: product.id,
        quote_id: None,
        quantity: req.quantity,
        unit_price: req.unit_price,
        total_price: lifecycle::order_total(req.quantity, req.unit_price),
        status: OrderStatus::Confirmed.as_str().to_string(),
        street: address.street,
        city: address.city,
        state: address.state,
        country: address.country,
        zip_code: address.zip_code,
        tracking_number: None,
        carrier: None,
        estimated_delivery: None,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(orders::table)
        .values(&order)
        .execute(conn)?;

    log::info!("Buyer {} placed order {} for product {}", user.id, order.id, product.id);
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn vendor_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    user.require(Role::Vendor)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = orders::table
        .filter(orders::vendor_id.eq(user.id))
        .order_by(orders::created_at.desc())
        .load::<Order>(conn)?;
    Ok(Json(items))
}

pub async fn buyer_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    user.require(Role::Buyer)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = orders::table
        .filter(orders::buyer_id.eq(user.id))
        .order_by(orders::created_at.desc())
        .load::<Order>(conn)?;
    Ok(Json(items))
}

/// Party check for single-order reads. Non-parties get the same answer
/// as a missing order so record existence does not leak; admins see all.
fn ensure_order_party(order: &Order, user: &AuthUser) -> Result<(), ApiError> {
    let is_party = order.buyer_id == user.id || order.vendor_id == user.id;
    if is_party || user.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::NotFound("Order not found".to_string()))
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let conn = &mut db::connect(&state.config.database_url)?;
    let order = orders::table
        .find(order_id)
        .first::<Order>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    ensure_order_party(&order, &user)?;
    Ok(Json(order))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<NaiveDateTime>,
}

#[derive(AsChangeset)]
#[diesel(table_name = orders)]
struct TrackingChanges {
    tracking_number: Option<String>,
    carrier: Option<String>,
    estimated_delivery: Option<NaiveDateTime>,
}

/// Vendor-side fulfillment update. The linear pending → delivered
/// progression is advisory: any known status value is accepted, and only
/// the tracking fields that were supplied get overwritten.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    user.require(Role::Vendor)?;

    let conn = &mut db::connect(&state.config.database_url)?;
    // Scoping the lookup to the owning vendor makes other vendors'
    // orders indistinguishable from absent ones.
    let order = orders::table
        .filter(orders::id.eq(order_id))
        .filter(orders::vendor_id.eq(user.id))
        .first::<Order>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    let status = match req.status.as_deref() {
        Some(s) => OrderStatus::parse(s)
            .ok_or_else(|| ApiError::Validation(format!("Unknown order status '{}'", s)))?
            .as_str()
            .to_string(),
        None => order.status.clone(),
    };
    let changes = TrackingChanges {
        tracking_number: req.tracking_number,
        carrier: req.carrier,
        estimated_delivery: req.estimated_delivery,
    };

    let updated = diesel::update(orders::table.find(order.id))
        .set((
            &changes,
            orders::status.eq(&status),
            orders::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<Order>(conn)?;

    log::info!("Vendor {} moved order {} to {}", user.id, updated.id, status);
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        let now = chrono::Utc::now().naive_utc();
        Order {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quote_id: None,
            quantity: 20,
            unit_price: 15.00,
            total_price: 300.00,
            status: OrderStatus::Confirmed.as_str().to_string(),
            street: None,
            city: None,
            state: None,
            country: None,
            zip_code: None,
            tracking_number: None,
            carrier: None,
            estimated_delivery: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn buyer_and_vendor_parties_can_see_their_order() {
        let order = sample_order();
        let buyer = AuthUser {
            id: order.buyer_id,
            role: Role::Buyer,
        };
        let vendor = AuthUser {
            id: order.vendor_id,
            role: Role::Vendor,
        };
        assert!(ensure_order_party(&order, &buyer).is_ok());
        assert!(ensure_order_party(&order, &vendor).is_ok());
    }

    #[test]
    fn non_party_vendor_gets_not_found_never_forbidden() {
        let order = sample_order();
        let other_vendor = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Vendor,
        };
        let err = ensure_order_party(&order, &other_vendor).unwrap_err();
        // The record must look absent, not merely off-limits.
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(!matches!(err, ApiError::Authorization(_)));
    }

    #[test]
    fn non_party_buyer_gets_not_found() {
        let order = sample_order();
        let other_buyer = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Buyer,
        };
        assert!(matches!(
            ensure_order_party(&order, &other_buyer),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn admin_sees_any_order() {
        let order = sample_order();
        let admin = AuthUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(ensure_order_party(&order, &admin).is_ok());
    }
}
