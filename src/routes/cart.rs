use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::cart::{
        AddToCartRequest, CartQuery, CartValidationReport, CartView, TransferCartRequest,
        TransferResult, UpdateQuantityRequest,
    },
    error::AppResult,
    middleware::auth::{AuthUser, CartOwner},
    models::CartItem,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).post(add_item).delete(clear_cart))
        .route("/validate", post(validate_cart))
        .route("/transfer", post(transfer_cart))
        .route("/{item_id}", patch(update_quantity).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(
        ("ship_country" = Option<String>, Query, description = "ISO country code for the shipping/tax estimate")
    ),
    responses(
        (status = 200, description = "Cart with advisory totals", body = ApiResponse<CartView>)
    ),
    security(("bearer_auth" = []), ("guest_session" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    owner: CartOwner,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let response = cart_service::get_cart(&state, owner, query.ship_country).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added or merged into an existing line", body = ApiResponse<CartItem>),
        (status = 400, description = "Unknown variant"),
        (status = 422, description = "Quantity below 1"),
    ),
    security(("bearer_auth" = []), ("guest_session" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let response = cart_service::add_item(&state, owner, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    patch,
    path = "/api/cart/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart item ID")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<CartItem>),
        (status = 404, description = "Item not in this cart"),
        (status = 422, description = "Quantity below 1; use DELETE to remove"),
    ),
    security(("bearer_auth" = []), ("guest_session" = [])),
    tag = "Cart"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let response = cart_service::update_quantity(&state, owner, item_id, payload.quantity).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart item ID")
    ),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Item not in this cart"),
    ),
    security(("bearer_auth" = []), ("guest_session" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    owner: CartOwner,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let response = cart_service::remove_item(&state, owner, item_id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<serde_json::Value>),
    ),
    security(("bearer_auth" = []), ("guest_session" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    owner: CartOwner,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let response = cart_service::clear_cart(&state, owner).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/cart/validate",
    responses(
        (status = 200, description = "Validation report; unavailable items removed, oversized quantities clamped", body = ApiResponse<CartValidationReport>),
    ),
    security(("bearer_auth" = []), ("guest_session" = [])),
    tag = "Cart"
)]
pub async fn validate_cart(
    State(state): State<AppState>,
    owner: CartOwner,
) -> AppResult<Json<ApiResponse<CartValidationReport>>> {
    let response = cart_service::validate_cart(&state, owner).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/cart/transfer",
    request_body = TransferCartRequest,
    responses(
        (status = 200, description = "Guest cart folded into the user's cart", body = ApiResponse<TransferResult>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn transfer_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TransferCartRequest>,
) -> AppResult<Json<ApiResponse<TransferResult>>> {
    let response = cart_service::transfer_guest_cart_to_user(
        &state,
        payload.guest_session_id,
        user.user_id,
    )
    .await?;
    Ok(Json(response))
}
