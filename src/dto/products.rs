use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{PricingTier, Product, ProductVariant};

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub tiers: Vec<PricingTier>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct VariantList {
    #[schema(value_type = Vec<ProductVariant>)]
    pub items: Vec<ProductVariant>,
}
