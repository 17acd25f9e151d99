use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        cart::SweepResult,
        pricing::{SetTiersRequest, TeamDiscountRequest, TierList},
        products::VariantList,
    },
    entity::{
        pricing_tiers::{ActiveModel as TierActive, Column as TierCol, Entity as PricingTiers},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::Entity as Products,
        team_discounts::{ActiveModel as TeamActive, Entity as TeamDiscounts},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PricingTier, TeamDiscount},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{cart_service, pricing_service, product_service},
    state::AppState,
};

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct LowStockQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub threshold: Option<i32>,
}

/// Replace a product's tier table wholesale. The new table must pass the
/// exhaustiveness check before anything is written; orders keep their
/// price snapshots, so replacing tiers never rewrites history.
pub async fn set_pricing_tiers(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: SetTiersRequest,
) -> AppResult<ApiResponse<TierList>> {
    ensure_admin(user)?;

    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let tiers: Vec<PricingTier> = payload
        .tiers
        .iter()
        .map(|t| PricingTier {
            min_quantity: t.min_quantity,
            max_quantity: t.max_quantity,
            discount_percent: t.discount_percent,
            is_active: true,
        })
        .collect();

    pricing_service::validate_tier_table(&tiers)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let txn = state.orm.begin().await?;

    PricingTiers::delete_many()
        .filter(TierCol::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    for tier in &tiers {
        TierActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            min_quantity: Set(tier.min_quantity),
            max_quantity: Set(tier.max_quantity),
            discount_percent: Set(tier.discount_percent),
            is_active: Set(true),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "tiers_replaced",
        Some("pricing_tiers"),
        Some(serde_json::json!({ "product_id": product_id, "tiers": tiers.len() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Tier table replaced",
        TierList { tiers },
        Some(Meta::empty()),
    ))
}

pub async fn upsert_team_discount(
    state: &AppState,
    user: &AuthUser,
    team_id: Uuid,
    payload: TeamDiscountRequest,
) -> AppResult<ApiResponse<TeamDiscount>> {
    ensure_admin(user)?;

    if !(0.0..=100.0).contains(&payload.discount_percent) {
        return Err(AppError::BadRequest(
            "discount percent must be between 0 and 100".into(),
        ));
    }

    let existing = TeamDiscounts::find_by_id(team_id).one(&state.orm).await?;

    let model = match existing {
        Some(team) => {
            let mut active: TeamActive = team.into();
            active.name = Set(payload.name.clone());
            active.discount_percent = Set(payload.discount_percent);
            active.is_active = Set(payload.is_active);
            active.update(&state.orm).await?
        }
        None => TeamActive {
            team_id: Set(team_id),
            name: Set(payload.name.clone()),
            discount_percent: Set(payload.discount_percent),
            is_active: Set(payload.is_active),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await?,
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "team_discount_upsert",
        Some("team_discounts"),
        Some(serde_json::json!({
            "team_id": team_id,
            "discount_percent": payload.discount_percent,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Team discount saved",
        TeamDiscount {
            team_id: model.team_id,
            name: model.name,
            discount_percent: model.discount_percent,
            is_active: model.is_active,
        },
        Some(Meta::empty()),
    ))
}

pub async fn sweep_stale_carts(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SweepResult>> {
    ensure_admin(user)?;
    cart_service::sweep_stale_items(state).await
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<VariantList>> {
    ensure_admin(user)?;

    let (page, limit, offset) = query.pagination.normalize();
    let threshold = query.threshold.unwrap_or(5);

    let finder = ProductVariants::find()
        .filter(VariantCol::IsActive.eq(true))
        .filter(VariantCol::Stock.lte(threshold))
        .order_by_asc(VariantCol::Stock);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_service::variant_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", VariantList { items }, Some(meta)))
}
