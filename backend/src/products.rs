use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use diesel::AsChangeset;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;
use crate::error::ApiError;
use crate::lifecycle::{self, OrderStatus, QuoteStatus};
use crate::models::{Order, PriceTier, Product, Role};
use crate::schema::{orders, products, quotes};
use crate::AppState;

/// Product as served to clients: the stored record plus the display
/// status derived from the stock indicator.
#[derive(Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub status: &'static str,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let status = lifecycle::stock_status(&product.stock);
        ProductView { product, status }
    }
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductView>>, ApiError> {
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = products::table
        .order_by(products::created_at.desc())
        .load::<Product>(conn)?;
    log::info!("Fetched {} products", items.len());
    Ok(Json(items.into_iter().map(ProductView::from).collect()))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductView>, ApiError> {
    let conn = &mut db::connect(&state.config.database_url)?;
    let product = products::table
        .find(product_id)
        .first::<Product>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(ProductView::from(product)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub moq: Option<i32>,
    pub lead_time: Option<String>,
    pub location: Option<String>,
    /// Display price string, e.g. "$8.50/m".
    pub price: String,
    pub images: Option<Vec<String>>,
    pub tiers: Option<Vec<PriceTier>>,
    pub stock: Option<String>,
}

/// Pulls the numeric part out of a display price like "$8.50/m".
fn numeric_price(display: &str) -> f64 {
    let digits: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or(0.0)
}

pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<AddProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Vendor)?;
    if req.name.trim().is_empty() || req.category.trim().is_empty() || req.price.trim().is_empty() {
        return Err(ApiError::Validation(
            "Name, Category, and Price are required".to_string(),
        ));
    }

    let moq = req.moq.unwrap_or(1);
    let tiers = req.tiers.unwrap_or_else(|| {
        vec![PriceTier {
            min_qty: moq,
            price: numeric_price(&req.price),
            label: "Standard".to_string(),
        }]
    });

    let now = Utc::now().naive_utc();
    let product = Product {
        id: Uuid::new_v4(),
        vendor_id: user.id,
        name: req.name,
        category: req.category,
        description: req.description,
        unit: req.unit.unwrap_or_else(|| "unit".to_string()),
        moq,
        lead_time: req.lead_time,
        location: req.location,
        price: req.price,
        images: req.images.unwrap_or_default(),
        tiers: serde_json::to_value(&tiers)?,
        stock: req.stock.unwrap_or_else(|| "100".to_string()),
        created_at: now,
        updated_at: now,
    };

    let conn = &mut db::connect(&state.config.database_url)?;
    diesel::insert_into(products::table)
        .values(&product)
        .execute(conn)?;
    log::info!("Vendor {} listed product {}", user.id, product.id);
    Ok((StatusCode::CREATED, Json(ProductView::from(product))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub moq: Option<i32>,
    pub lead_time: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub images: Option<Vec<String>>,
    pub tiers: Option<Vec<PriceTier>>,
    pub stock: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = products)]
struct ProductChanges {
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
    unit: Option<String>,
    moq: Option<i32>,
    lead_time: Option<String>,
    location: Option<String>,
    price: Option<String>,
    images: Option<Vec<String>>,
    tiers: Option<serde_json::Value>,
    stock: Option<String>,
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductView>, ApiError> {
    user.require(Role::Vendor)?;
    let tiers = match req.tiers {
        Some(tiers) => Some(serde_json::to_value(&tiers)?),
        None => None,
    };
    let changes = ProductChanges {
        name: req.name,
        category: req.category,
        description: req.description,
        unit: req.unit,
        moq: req.moq,
        lead_time: req.lead_time,
        location: req.location,
        price: req.price,
        images: req.images,
        tiers,
        stock: req.stock,
    };

    let conn = &mut db::connect(&state.config.database_url)?;
    let updated = diesel::update(
        products::table
            .filter(products::id.eq(product_id))
            .filter(products::vendor_id.eq(user.id)),
    )
    .set((&changes, products::updated_at.eq(Utc::now().naive_utc())))
    .get_result::<Product>(conn)
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductView::from(updated)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Vendor)?;
    let conn = &mut db::connect(&state.config.database_url)?;

    // Admins may remove any listing; vendors only their own.
    let deleted = if user.role == Role::Admin {
        diesel::delete(products::table.filter(products::id.eq(product_id))).execute(conn)?
    } else {
        diesel::delete(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::vendor_id.eq(user.id)),
        )
        .execute(conn)?
    };
    if deleted == 0 {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

pub async fn vendor_inventory(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ProductView>>, ApiError> {
    user.require(Role::Vendor)?;
    let conn = &mut db::connect(&state.config.database_url)?;
    let items = products::table
        .filter(products::vendor_id.eq(user.id))
        .order_by(products::created_at.desc())
        .load::<Product>(conn)?;
    Ok(Json(items.into_iter().map(ProductView::from).collect()))
}

/// Vendor dashboard: revenue, quote and shipment counters, inventory
/// health per listing.
pub async fn vendor_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Vendor)?;
    let conn = &mut db::connect(&state.config.database_url)?;

    let listings = products::table
        .filter(products::vendor_id.eq(user.id))
        .load::<Product>(conn)?;
    let inventory_health: Vec<_> = listings
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "health": p.stock.trim().parse::<i64>().unwrap_or(0),
                "status": lifecycle::stock_status(&p.stock),
            })
        })
        .collect();

    let vendor_orders = orders::table
        .filter(orders::vendor_id.eq(user.id))
        .load::<Order>(conn)?;
    let revenue_statuses = [
        OrderStatus::Confirmed.as_str(),
        OrderStatus::Processing.as_str(),
        OrderStatus::Shipped.as_str(),
        OrderStatus::Delivered.as_str(),
    ];
    let total_revenue: f64 = vendor_orders
        .iter()
        .filter(|o| revenue_statuses.contains(&o.status.as_str()))
        .map(|o| o.total_price)
        .sum();
    let shipment_statuses = [
        OrderStatus::Confirmed.as_str(),
        OrderStatus::Processing.as_str(),
        OrderStatus::Shipped.as_str(),
    ];
    let pending_shipments = vendor_orders
        .iter()
        .filter(|o| shipment_statuses.contains(&o.status.as_str()))
        .count();

    let active_quotes: i64 = quotes::table
        .filter(quotes::vendor_id.eq(user.id))
        .filter(quotes::status.eq_any([
            QuoteStatus::Quoted.as_str(),
            QuoteStatus::Negotiating.as_str(),
        ]))
        .count()
        .get_result(conn)?;
    let new_rfqs: i64 = quotes::table
        .filter(quotes::vendor_id.eq(user.id))
        .filter(quotes::status.eq(QuoteStatus::Pending.as_str()))
        .count()
        .get_result(conn)?;

    Ok(Json(json!({
        "revenue": format!("${:.2}", total_revenue),
        "activeQuotes": active_quotes,
        "pendingShipments": pending_shipments,
        "newRFQs": new_rfqs,
        "inventoryHealth": inventory_health,
    })))
}

#[cfg(test)]
mod tests {
    use super::numeric_price;

    #[test]
    fn numeric_price_strips_display_formatting() {
        assert_eq!(numeric_price("$8.50/m"), 8.50);
        assert_eq!(numeric_price("12"), 12.0);
        assert_eq!(numeric_price("free"), 0.0);
    }
}
