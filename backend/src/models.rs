use std::fmt;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::{orders, products, quotes, users};

/// Account roles. Persisted as text, tagged at the domain layer so route
/// gates match on variants rather than raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Vendor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "buyer" => Some(Role::Buyer),
            "vendor" => Some(Role::Vendor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub company_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn role(&self) -> Result<Role, ApiError> {
        Role::parse(&self.role).ok_or_else(|| {
            log::error!("User {} has unknown role {:?}", self.id, self.role);
            ApiError::Internal
        })
    }
}

/// One quantity-price breakpoint. Stored inside the product's `tiers`
/// jsonb column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub min_qty: i32,
    pub price: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = products)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub unit: String,
    pub moq: i32,
    pub lead_time: Option<String>,
    pub location: Option<String>,
    /// Display price string, e.g. "$8.50/m".
    pub price: String,
    pub images: Vec<String>,
    pub tiers: serde_json::Value,
    /// Coarse stock indicator, numeric-as-text. The display status is
    /// derived from it, never stored.
    pub stock: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = quotes)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub vendor_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub message: Option<String>,
    pub vendor_price: Option<f64>,
    pub total_price: Option<f64>,
    pub vendor_response: Option<String>,
    pub status: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Queryable, Insertable, Identifiable)]
#[diesel(table_name = orders)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub vendor_id: Uuid,
    pub product_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_price: f64,
    pub status: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Buyer, Role::Vendor, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
