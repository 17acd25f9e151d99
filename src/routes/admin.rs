use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        cart::SweepResult,
        pricing::{SetTiersRequest, TeamDiscountRequest, TierList},
        products::VariantList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::TeamDiscount,
    response::ApiResponse,
    services::admin_service::{self, LowStockQuery},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/{product_id}/tiers", put(set_pricing_tiers))
        .route("/teams/{team_id}/discount", put(upsert_team_discount))
        .route("/cart/sweep", post(sweep_stale_carts))
        .route("/variants/low-stock", get(list_low_stock))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{product_id}/tiers",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = SetTiersRequest,
    responses(
        (status = 200, description = "Tier table replaced", body = ApiResponse<TierList>),
        (status = 400, description = "Table has gaps, overlaps or a closed tail"),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_pricing_tiers(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SetTiersRequest>,
) -> AppResult<Json<ApiResponse<TierList>>> {
    let response = admin_service::set_pricing_tiers(&state, &user, product_id, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/admin/teams/{team_id}/discount",
    params(
        ("team_id" = Uuid, Path, description = "Team ID")
    ),
    request_body = TeamDiscountRequest,
    responses(
        (status = 200, description = "Team discount saved", body = ApiResponse<TeamDiscount>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn upsert_team_discount(
    State(state): State<AppState>,
    user: AuthUser,
    Path(team_id): Path<Uuid>,
    Json(payload): Json<TeamDiscountRequest>,
) -> AppResult<Json<ApiResponse<TeamDiscount>>> {
    let response = admin_service::upsert_team_discount(&state, &user, team_id, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/admin/cart/sweep",
    responses(
        (status = 200, description = "Stale cart items removed", body = ApiResponse<SweepResult>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn sweep_stale_carts(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SweepResult>>> {
    let response = admin_service::sweep_stale_carts(&state, &user).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/admin/variants/low-stock",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("threshold" = Option<i32>, Query, description = "Stock at or below this counts as low, default 5")
    ),
    responses(
        (status = 200, description = "Variants running low", body = ApiResponse<VariantList>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<VariantList>>> {
    let response = admin_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(response))
}
