//! Quote-to-order lifecycle rules, kept as pure functions over the
//! persisted records so handlers only fetch, apply, and store.
//!
//! Quote states: `pending -> {quoted, declined, expired}`,
//! `quoted -> {negotiating, accepted, declined, expired}`,
//! `negotiating -> {accepted, declined, expired}`. `accepted`, `declined`
//! and `expired` are terminal. `negotiating` is reserved for a future
//! counter-offer operation; no current operation transitions into it.
//! `expired` is advisory: `expires_at` is stored but nothing sweeps quotes
//! past it.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Order, Quote};

pub const QUOTE_VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStatus {
    Pending,
    Quoted,
    Negotiating,
    Accepted,
    Declined,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Quoted => "quoted",
            QuoteStatus::Negotiating => "negotiating",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Declined => "declined",
            QuoteStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<QuoteStatus> {
        match s {
            "pending" => Some(QuoteStatus::Pending),
            "quoted" => Some(QuoteStatus::Quoted),
            "negotiating" => Some(QuoteStatus::Negotiating),
            "accepted" => Some(QuoteStatus::Accepted),
            "declined" => Some(QuoteStatus::Declined),
            "expired" => Some(QuoteStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted | QuoteStatus::Declined | QuoteStatus::Expired
        )
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn quote_status(quote: &Quote) -> Result<QuoteStatus, ApiError> {
    QuoteStatus::parse(&quote.status).ok_or_else(|| {
        log::error!("Quote {} has unknown status {:?}", quote.id, quote.status);
        ApiError::Internal
    })
}

pub fn quote_expiry(now: NaiveDateTime) -> NaiveDateTime {
    now + Duration::days(QUOTE_VALIDITY_DAYS)
}

pub fn order_total(quantity: i32, unit_price: f64) -> f64 {
    quantity as f64 * unit_price
}

/// Outcome of a vendor's response, ready to be written back to the quote.
#[derive(Debug, PartialEq)]
pub struct VendorResponse {
    pub status: QuoteStatus,
    pub vendor_price: Option<f64>,
    pub total_price: Option<f64>,
}

/// Applies a vendor response to a quote. The target status defaults to
/// `quoted` and may be `declined`; a quote target requires a unit price so
/// that `quoted` always implies a price (acceptance relies on that).
/// Recomputing the total from the stored quantity makes repeated responses
/// with the same price idempotent.
pub fn respond(
    quote: &Quote,
    unit_price: Option<f64>,
    target: Option<QuoteStatus>,
) -> Result<VendorResponse, ApiError> {
    let current = quote_status(quote)?;
    if current.is_terminal() {
        return Err(ApiError::Conflict(format!("Quote is already {}", current)));
    }

    let target = target.unwrap_or(QuoteStatus::Quoted);
    if target != QuoteStatus::Quoted && target != QuoteStatus::Declined {
        return Err(ApiError::Validation(
            "Status must be 'quoted' or 'declined'".to_string(),
        ));
    }

    // A missing price keeps whatever the vendor quoted previously.
    let unit_price = unit_price.or(quote.vendor_price);
    if let Some(price) = unit_price {
        if price <= 0.0 {
            return Err(ApiError::Validation(
                "Unit price must be greater than zero".to_string(),
            ));
        }
    }
    if target == QuoteStatus::Quoted && unit_price.is_none() {
        return Err(ApiError::Validation(
            "A unit price is required to quote".to_string(),
        ));
    }

    let total_price = unit_price.map(|p| order_total(quote.quantity, p));
    Ok(VendorResponse {
        status: target,
        vendor_price: unit_price,
        total_price,
    })
}

/// Derives the order created by accepting a quote. Only a quote in status
/// exactly `quoted` is acceptable; anything else is a conflict and the
/// quote must be left untouched by the caller.
pub fn accept(quote: &Quote, now: NaiveDateTime) -> Result<Order, ApiError> {
    let current = quote_status(quote)?;
    if current != QuoteStatus::Quoted {
        return Err(ApiError::Conflict(
            "Quote is not in quoted status".to_string(),
        ));
    }

    // `quoted` is only reachable with a price set.
    let unit_price = quote.vendor_price.unwrap_or(0.0);
    let total_price = quote
        .total_price
        .unwrap_or_else(|| order_total(quote.quantity, unit_price));

    Ok(Order {
        id: Uuid::new_v4(),
        buyer_id: quote.buyer_id,
        vendor_id: quote.vendor_id,
        product_id: quote.product_id,
        quote_id: Some(quote.id),
        quantity: quote.quantity,
        unit_price,
        total_price,
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
    })
}

/// Display status derived from the numeric-as-text stock indicator.
pub fn stock_status(stock: &str) -> &'static str {
    let quantity: i64 = stock.trim().parse().unwrap_or(0);
    if quantity <= 0 {
        "Out of Stock"
    } else if quantity < 50 {
        "Low Stock"
    } else {
        "In Stock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_quote(status: QuoteStatus) -> Quote {
        let now = Utc::now().naive_utc();
        Quote {
            id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            vendor_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 100,
            message: Some("Need these by end of month".to_string()),
            vendor_price: None,
            total_price: None,
            vendor_response: None,
            status: status.as_str().to_string(),
            expires_at: quote_expiry(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn quoted_quote(price: f64) -> Quote {
        let mut quote = sample_quote(QuoteStatus::Quoted);
        quote.vendor_price = Some(price);
        quote.total_price = Some(order_total(quote.quantity, price));
        quote
    }

    #[test]
    fn respond_moves_pending_to_quoted_and_computes_total() {
        let quote = sample_quote(QuoteStatus::Pending);
        let outcome = respond(&quote, Some(9.50), None).unwrap();
        assert_eq!(outcome.status, QuoteStatus::Quoted);
        assert_eq!(outcome.vendor_price, Some(9.50));
        assert_eq!(outcome.total_price, Some(950.00));
    }

    #[test]
    fn respond_is_idempotent_for_the_same_price() {
        let quote = sample_quote(QuoteStatus::Pending);
        let first = respond(&quote, Some(9.50), None).unwrap();
        let mut requoted = quote.clone();
        requoted.status = first.status.as_str().to_string();
        requoted.vendor_price = first.vendor_price;
        requoted.total_price = first.total_price;
        let second = respond(&requoted, Some(9.50), None).unwrap();
        assert_eq!(second.total_price, first.total_price);
        assert_eq!(second.status, first.status);
    }

    #[test]
    fn respond_without_price_cannot_quote() {
        let quote = sample_quote(QuoteStatus::Pending);
        let err = respond(&quote, None, None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn respond_can_decline_without_price() {
        let quote = sample_quote(QuoteStatus::Pending);
        let outcome = respond(&quote, None, Some(QuoteStatus::Declined)).unwrap();
        assert_eq!(outcome.status, QuoteStatus::Declined);
        assert_eq!(outcome.total_price, None);
    }

    #[test]
    fn respond_rejects_terminal_quotes() {
        for status in [
            QuoteStatus::Accepted,
            QuoteStatus::Declined,
            QuoteStatus::Expired,
        ] {
            let quote = sample_quote(status);
            let err = respond(&quote, Some(5.0), None).unwrap_err();
            assert!(matches!(err, ApiError::Conflict(_)), "status {}", status);
        }
    }

    #[test]
    fn respond_rejects_accept_as_target() {
        let quote = sample_quote(QuoteStatus::Pending);
        let err = respond(&quote, Some(5.0), Some(QuoteStatus::Accepted)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn accept_requires_quoted_status() {
        for status in [
            QuoteStatus::Pending,
            QuoteStatus::Negotiating,
            QuoteStatus::Accepted,
            QuoteStatus::Declined,
            QuoteStatus::Expired,
        ] {
            let quote = sample_quote(status);
            let err = accept(&quote, Utc::now().naive_utc()).unwrap_err();
            assert!(matches!(err, ApiError::Conflict(_)), "status {}", status);
        }
    }

    #[test]
    fn accept_copies_quantity_and_prices_onto_a_confirmed_order() {
        let quote = quoted_quote(9.50);
        let order = accept(&quote, Utc::now().naive_utc()).unwrap();
        assert_eq!(order.quantity, 100);
        assert_eq!(order.unit_price, 9.50);
        assert_eq!(order.total_price, 950.00);
        assert_eq!(order.status, "confirmed");
        assert_eq!(order.quote_id, Some(quote.id));
        assert_eq!(order.buyer_id, quote.buyer_id);
        assert_eq!(order.vendor_id, quote.vendor_id);
        assert_eq!(order.product_id, quote.product_id);
    }

    #[test]
    fn declined_quote_cannot_be_accepted_afterwards() {
        let quote = sample_quote(QuoteStatus::Pending);
        let declined = respond(&quote, None, Some(QuoteStatus::Declined)).unwrap();
        let mut stored = quote.clone();
        stored.status = declined.status.as_str().to_string();
        let err = accept(&stored, Utc::now().naive_utc()).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn direct_purchase_total() {
        assert_eq!(order_total(20, 15.00), 300.00);
    }

    #[test]
    fn stock_status_thresholds() {
        assert_eq!(stock_status("0"), "Out of Stock");
        assert_eq!(stock_status("-3"), "Out of Stock");
        assert_eq!(stock_status("49"), "Low Stock");
        assert_eq!(stock_status("50"), "In Stock");
        assert_eq!(stock_status("1000"), "In Stock");
        assert_eq!(stock_status("not a number"), "Out of Stock");
    }

    #[test]
    fn expiry_is_seven_days_out() {
        let now = Utc::now().naive_utc();
        assert_eq!(quote_expiry(now) - now, Duration::days(7));
    }
}
