use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::pricing::{PricingInfo, PricingQuery, TierList},
    error::AppResult,
    response::{ApiResponse, Meta},
    services::pricing_service,
    state::AppState,
};

/// Quantities the storefront may quote; anything outside is clamped here,
/// the engine itself never rejects.
const MIN_QUOTE_QUANTITY: i32 = 1;
const MAX_QUOTE_QUANTITY: i32 = 1000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{product_id}", get(quote))
        .route("/{product_id}/tiers", get(tiers))
}

#[utoipa::path(
    get,
    path = "/api/pricing/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID"),
        ("quantity" = i32, Query, description = "Requested quantity, clamped to 1..=1000"),
        ("team_id" = Option<Uuid>, Query, description = "Team whose discount applies on top of the volume tier")
    ),
    responses(
        (status = 200, description = "Pricing breakdown with upsell recommendations", body = ApiResponse<PricingInfo>),
        (status = 404, description = "Unknown product"),
    ),
    tag = "Pricing"
)]
pub async fn quote(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<PricingQuery>,
) -> AppResult<Json<ApiResponse<PricingInfo>>> {
    let quantity = query.quantity.clamp(MIN_QUOTE_QUANTITY, MAX_QUOTE_QUANTITY);
    let response =
        pricing_service::compute_pricing(&state, product_id, quantity, query.team_id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/pricing/{product_id}/tiers",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Active volume tiers for the product", body = ApiResponse<TierList>),
    ),
    tag = "Pricing"
)]
pub async fn tiers(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TierList>>> {
    let tiers = pricing_service::load_tiers(&state, product_id).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        TierList { tiers },
        Some(Meta::empty()),
    )))
}
