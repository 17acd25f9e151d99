use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    /// Base unit price in minor currency units before any discount.
    pub base_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A quantity range mapped to a discount percentage. `max_quantity = None`
/// means the range is open-ended.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PricingTier {
    pub min_quantity: i32,
    pub max_quantity: Option<i32>,
    pub discount_percent: f64,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamDiscount {
    pub team_id: Uuid,
    pub name: String,
    pub discount_percent: f64,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub guest_session_id: Option<Uuid>,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    /// Variant price at the time the item was added, in minor units.
    pub unit_price: i64,
    /// Opaque design blob produced by the editor.
    pub customization: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
    pub invoice_number: String,
    pub shipping_country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i32,
    /// Discounted per-unit price the order was placed at.
    pub unit_price: i64,
    pub customization: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
