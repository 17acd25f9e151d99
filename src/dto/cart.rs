use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    /// Opaque design blob from the editor; replaces the stored one when the
    /// item already exists in the cart.
    pub customization: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartQuery {
    /// ISO country code used for the shipping/tax estimate.
    pub ship_country: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferCartRequest {
    pub guest_session_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_id: Uuid,
    pub sku: String,
    pub quantity: i32,
    /// Current engine price per unit at this item's quantity, in cents.
    pub unit_price: i64,
    pub line_total: i64,
    pub customization: Option<serde_json::Value>,
}

/// Advisory totals; the real amounts are recomputed at checkout.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartTotals {
    pub subtotal: i64,
    pub estimated_shipping: i64,
    pub estimated_tax: i64,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub totals: CartTotals,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartValidationReport {
    /// True only when no issue of any kind was found.
    pub valid: bool,
    pub errors: Vec<String>,
    /// Items whose quantity was clamped or that were removed without
    /// failing the request.
    pub adjusted_item_ids: Vec<Uuid>,
}

impl CartValidationReport {
    pub fn clean() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            adjusted_item_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResult {
    pub removed: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResult {
    /// Guest items folded into an existing user item.
    pub merged: u64,
    /// Guest items reassigned to the user in place.
    pub reassigned: u64,
}
