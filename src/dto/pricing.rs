use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::PricingTier;

/// Full pricing breakdown for one product at one quantity.
/// All amounts are minor currency units (cents).
#[derive(Debug, Serialize, ToSchema)]
pub struct PricingInfo {
    pub product_id: Uuid,
    pub quantity: i32,
    pub base_unit_price: i64,
    /// Per-unit price after tier and team discounts, rounded to a cent.
    pub unit_price: i64,
    pub tier: Option<AppliedTier>,
    pub team_discount_percent: Option<f64>,
    pub total_price: i64,
    pub total_savings: i64,
    pub recommendations: Vec<TierRecommendation>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedTier {
    pub min_quantity: i32,
    pub max_quantity: Option<i32>,
    pub discount_percent: f64,
}

/// A higher tier worth buying into: purchasing `min_quantity` units costs
/// less in total than the quantity actually asked for.
#[derive(Debug, Serialize, ToSchema)]
pub struct TierRecommendation {
    pub min_quantity: i32,
    pub discount_percent: f64,
    pub unit_price: i64,
    pub total_price: i64,
    /// How much cheaper the recommended quantity is than the current total.
    pub additional_savings: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PricingQuery {
    pub quantity: i32,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TierInput {
    pub min_quantity: i32,
    pub max_quantity: Option<i32>,
    pub discount_percent: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetTiersRequest {
    pub tiers: Vec<TierInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamDiscountRequest {
    pub name: String,
    pub discount_percent: f64,
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TierList {
    #[schema(value_type = Vec<PricingTier>)]
    pub tiers: Vec<PricingTier>,
}
