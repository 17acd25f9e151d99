use std::collections::{HashMap, hash_map::Entry};

use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    config::PricingConfig,
    dto::cart::{
        AddToCartRequest, CartItemView, CartTotals, CartValidationReport, CartView, SweepResult,
        TransferResult,
    },
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartCol, Entity as CartItems,
            Model as CartItemModel,
        },
        product_variants::Entity as ProductVariants,
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::CartOwner,
    models::{CartItem, PricingTier},
    response::{ApiResponse, Meta},
    services::pricing_service,
    state::AppState,
};

fn owner_condition(owner: CartOwner) -> Condition {
    match owner {
        CartOwner::User(id) => Condition::all().add(CartCol::UserId.eq(id)),
        CartOwner::Guest(id) => Condition::all().add(CartCol::GuestSessionId.eq(id)),
    }
}

fn cart_item_from_entity(model: CartItemModel) -> CartItem {
    CartItem {
        id: model.id,
        user_id: model.user_id,
        guest_session_id: model.guest_session_id,
        product_id: model.product_id,
        variant_id: model.variant_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        customization: model.customization,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

/// Add a variant to the owner's cart. An existing (product, variant) row is
/// incremented instead of duplicated; a supplied customization replaces the
/// stored one. Concurrent double-adds are last-write-wins on the
/// customization blob.
pub async fn add_item(
    state: &AppState,
    owner: CartOwner,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity < 1 {
        return Err(AppError::InvalidQuantity);
    }

    let txn = state.orm.begin().await?;

    let variant = ProductVariants::find_by_id(payload.variant_id)
        .one(&txn)
        .await?
        .filter(|v| v.is_active && v.product_id == payload.product_id)
        .ok_or_else(|| AppError::BadRequest("variant not found".to_string()))?;

    let existing = CartItems::find()
        .filter(owner_condition(owner))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .filter(CartCol::VariantId.eq(payload.variant_id))
        .one(&txn)
        .await?;

    let item = match existing {
        Some(item) => {
            let quantity = item.quantity + payload.quantity;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            if payload.customization.is_some() {
                active.customization = Set(payload.customization.clone());
            }
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?
        }
        None => CartItemActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner.user_id()),
            guest_session_id: Set(match owner {
                CartOwner::Guest(id) => Some(id),
                CartOwner::User(_) => None,
            }),
            product_id: Set(payload.product_id),
            variant_id: Set(payload.variant_id),
            quantity: Set(payload.quantity),
            unit_price: Set(variant.price),
            customization: Set(payload.customization.clone()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?,
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        owner.user_id(),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({
            "variant_id": payload.variant_id,
            "quantity": payload.quantity,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item_from_entity(item), None))
}

pub async fn update_quantity(
    state: &AppState,
    owner: CartOwner,
    item_id: Uuid,
    quantity: i32,
) -> AppResult<ApiResponse<CartItem>> {
    if quantity < 1 {
        return Err(AppError::InvalidQuantity);
    }

    let item = CartItems::find_by_id(item_id)
        .filter(owner_condition(owner))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(quantity);
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&state.orm).await?;

    Ok(ApiResponse::success("OK", cart_item_from_entity(item), None))
}

pub async fn remove_item(
    state: &AppState,
    owner: CartOwner,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(CartCol::Id.eq(item_id))
        .filter(owner_condition(owner))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        owner.user_id(),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    owner: CartOwner,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(owner_condition(owner))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

/// Shipping estimate as a step function on the total unit count.
pub fn estimate_shipping(config: &PricingConfig, total_units: i64) -> i64 {
    match total_units {
        0 => 0,
        1 => config.shipping_single,
        2..=3 => config.shipping_small,
        4..=5 => config.shipping_medium,
        _ => config.shipping_bulk,
    }
}

/// Flat domestic tax estimate; zero when the destination is unknown or
/// abroad.
pub fn estimate_tax(config: &PricingConfig, subtotal: i64, ship_country: Option<&str>) -> i64 {
    match ship_country {
        Some(country) if country.eq_ignore_ascii_case(&config.domestic_country) => {
            ((subtotal as f64) * config.tax_percent / 100.0).round() as i64
        }
        _ => 0,
    }
}

/// True when the live price has drifted further from the snapshot than the
/// configured tolerance allows.
pub fn price_drift_exceeded(snapshot: i64, current: i64, tolerance_percent: f64) -> bool {
    if snapshot <= 0 {
        return current != snapshot;
    }
    let drift = ((current - snapshot).abs() as f64 / snapshot as f64) * 100.0;
    drift > tolerance_percent
}

/// The derived cart: every item the owner holds, each priced independently
/// at its own quantity. Quantities of the same product split across items
/// with different customizations are not pooled for tier purposes.
pub async fn get_cart(
    state: &AppState,
    owner: CartOwner,
    ship_country: Option<String>,
) -> AppResult<ApiResponse<CartView>> {
    let items = CartItems::find()
        .filter(owner_condition(owner))
        .order_by_desc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;

    // Tier tables cached per product so a cart full of one product's
    // variants loads them once.
    let mut tier_cache: HashMap<Uuid, Vec<PricingTier>> = HashMap::new();
    let mut views = Vec::with_capacity(items.len());
    let mut subtotal: i64 = 0;
    let mut total_units: i64 = 0;

    for item in items {
        let product = Products::find_by_id(item.product_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let variant = ProductVariants::find_by_id(item.variant_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;

        let tiers = match tier_cache.entry(item.product_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let loaded = pricing_service::load_tiers(state, item.product_id).await?;
                entry.insert(loaded)
            }
        };

        let tier_percent = pricing_service::select_tier(tiers, item.quantity)
            .map(|t| t.discount_percent)
            .unwrap_or(0.0);
        let unit_price = pricing_service::discounted_unit_price(variant.price, tier_percent, 0.0);
        let line_total = unit_price * item.quantity as i64;

        subtotal += line_total;
        total_units += item.quantity as i64;

        views.push(CartItemView {
            id: item.id,
            product_id: item.product_id,
            product_name: product.name,
            variant_id: item.variant_id,
            sku: variant.sku,
            quantity: item.quantity,
            unit_price,
            line_total,
            customization: item.customization,
        });
    }

    let estimated_shipping = estimate_shipping(&state.pricing, total_units);
    let estimated_tax = estimate_tax(&state.pricing, subtotal, ship_country.as_deref());

    let view = CartView {
        items: views,
        totals: CartTotals {
            subtotal,
            estimated_shipping,
            estimated_tax,
            total: subtotal + estimated_shipping + estimated_tax,
        },
    };

    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

/// Move every guest item to the authenticated user. Each item is handled in
/// its own transaction so a mid-way failure never duplicates or drops an
/// item; a second run finds no guest items and is a no-op.
pub async fn transfer_guest_cart_to_user(
    state: &AppState,
    session_id: Uuid,
    user_id: Uuid,
) -> AppResult<ApiResponse<TransferResult>> {
    let guest_items = CartItems::find()
        .filter(CartCol::GuestSessionId.eq(session_id))
        .all(&state.orm)
        .await?;

    let mut merged: u64 = 0;
    let mut reassigned: u64 = 0;

    for guest_item in guest_items {
        let txn = state.orm.begin().await?;

        // Re-read under a row lock; a concurrent transfer of the same
        // session blocks here and then sees the item already gone.
        let Some(guest_item) = CartItems::find_by_id(guest_item.id)
            .filter(CartCol::GuestSessionId.eq(session_id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            continue;
        };

        let user_item = CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .filter(CartCol::ProductId.eq(guest_item.product_id))
            .filter(CartCol::VariantId.eq(guest_item.variant_id))
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        match user_item {
            Some(user_item) => {
                let quantity = user_item.quantity + guest_item.quantity;
                let mut active: CartItemActive = user_item.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(Utc::now().into());
                active.update(&txn).await?;

                CartItems::delete_by_id(guest_item.id).exec(&txn).await?;
                merged += 1;
            }
            None => {
                let mut active: CartItemActive = guest_item.into();
                active.user_id = Set(Some(user_id));
                active.guest_session_id = Set(None);
                active.updated_at = Set(Utc::now().into());
                active.update(&txn).await?;
                reassigned += 1;
            }
        }

        txn.commit().await?;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user_id),
        "cart_transfer",
        Some("cart_items"),
        Some(serde_json::json!({
            "guest_session_id": session_id,
            "merged": merged,
            "reassigned": reassigned,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Cart transferred",
        TransferResult { merged, reassigned },
        Some(Meta::empty()),
    ))
}

/// Re-check every item against live stock and price. Issues are collected,
/// never thrown per item; unavailable items are removed, oversized
/// quantities clamped, price drift only reported.
pub async fn validate_cart(
    state: &AppState,
    owner: CartOwner,
) -> AppResult<ApiResponse<CartValidationReport>> {
    let items = CartItems::find()
        .filter(owner_condition(owner))
        .order_by_desc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let mut report = CartValidationReport::clean();

    for item in items {
        let variant = ProductVariants::find_by_id(item.variant_id)
            .one(&state.orm)
            .await?
            .filter(|v| v.is_active);

        let Some(variant) = variant else {
            CartItems::delete_by_id(item.id).exec(&state.orm).await?;
            report.valid = false;
            report
                .errors
                .push("An item is no longer available and was removed".to_string());
            report.adjusted_item_ids.push(item.id);
            continue;
        };

        if variant.stock <= 0 {
            CartItems::delete_by_id(item.id).exec(&state.orm).await?;
            report.valid = false;
            report
                .errors
                .push(format!("{} is out of stock and was removed", variant.sku));
            report.adjusted_item_ids.push(item.id);
            continue;
        }

        if item.quantity > variant.stock {
            let stock = variant.stock;
            let mut active: CartItemActive = item.clone().into();
            active.quantity = Set(stock);
            active.updated_at = Set(Utc::now().into());
            active.update(&state.orm).await?;

            report.valid = false;
            report.errors.push(format!(
                "Only {} of {} left, quantity was reduced",
                stock, variant.sku
            ));
            report.adjusted_item_ids.push(item.id);
        }

        if price_drift_exceeded(
            item.unit_price,
            variant.price,
            state.pricing.price_drift_percent,
        ) {
            report.valid = false;
            report.errors.push(format!(
                "The price of {} changed since it was added, please confirm the new price",
                variant.sku
            ));
        }
    }

    Ok(ApiResponse::success("OK", report, Some(Meta::empty())))
}

/// Delete items untouched for longer than the configured age. Invoked from
/// the admin surface, not a background worker.
pub async fn sweep_stale_items(state: &AppState) -> AppResult<ApiResponse<SweepResult>> {
    let cutoff = Utc::now() - Duration::days(state.pricing.stale_cart_days);
    let result = CartItems::delete_many()
        .filter(CartCol::UpdatedAt.lt(cutoff))
        .exec(&state.orm)
        .await?;

    tracing::info!(removed = result.rows_affected, "stale cart sweep finished");

    Ok(ApiResponse::success(
        "Sweep finished",
        SweepResult {
            removed: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn shipping_steps_on_unit_count() {
        let cfg = config();
        assert_eq!(estimate_shipping(&cfg, 0), 0);
        assert_eq!(estimate_shipping(&cfg, 1), cfg.shipping_single);
        assert_eq!(estimate_shipping(&cfg, 2), cfg.shipping_small);
        assert_eq!(estimate_shipping(&cfg, 3), cfg.shipping_small);
        assert_eq!(estimate_shipping(&cfg, 4), cfg.shipping_medium);
        assert_eq!(estimate_shipping(&cfg, 5), cfg.shipping_medium);
        assert_eq!(estimate_shipping(&cfg, 6), cfg.shipping_bulk);
        assert_eq!(estimate_shipping(&cfg, 60), cfg.shipping_bulk);
    }

    #[test]
    fn tax_only_applies_domestically() {
        let cfg = config();
        assert_eq!(estimate_tax(&cfg, 10000, None), 0);
        assert_eq!(estimate_tax(&cfg, 10000, Some("US")), 0);
        assert_eq!(estimate_tax(&cfg, 10000, Some("DE")), 1900);
        assert_eq!(estimate_tax(&cfg, 10000, Some("de")), 1900);
    }

    #[test]
    fn drift_tolerance_is_a_strict_threshold() {
        // $20.00 -> $21.50 is 7.5%, over the 5% default.
        assert!(price_drift_exceeded(2000, 2150, 5.0));
        // $20.00 -> $20.90 is 4.5%, within tolerance.
        assert!(!price_drift_exceeded(2000, 2090, 5.0));
        // Drops count the same as raises.
        assert!(price_drift_exceeded(2000, 1850, 5.0));
        assert!(!price_drift_exceeded(2000, 2000, 0.0));
    }
}
