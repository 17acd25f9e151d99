use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::products::{ProductDetail, ProductList},
    entity::{
        pricing_tiers::{Column as TierCol, Entity as PricingTiers, Model as TierModel},
        product_variants::{
            Column as VariantCol, Entity as ProductVariants, Model as VariantModel,
        },
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{PricingTier, Product, ProductVariant},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        product_type: model.product_type,
        base_price: model.base_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn variant_from_entity(model: VariantModel) -> ProductVariant {
    ProductVariant {
        id: model.id,
        product_id: model.product_id,
        sku: model.sku,
        color: model.color,
        size: model.size,
        price: model.price,
        stock: model.stock,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn tier_from_entity(model: TierModel) -> PricingTier {
    PricingTier {
        min_quantity: model.min_quantity,
        max_quantity: model.max_quantity,
        discount_percent: model.discount_percent,
        is_active: model.is_active,
    }
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(q) = query.q.as_ref().filter(|q| !q.is_empty()) {
        condition = condition.add(ProdCol::Name.contains(q.as_str()));
    }
    if let Some(min) = query.min_price {
        condition = condition.add(ProdCol::BasePrice.gte(min));
    }
    if let Some(max) = query.max_price {
        condition = condition.add(ProdCol::BasePrice.lte(max));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Products::find().filter(condition);
    let column = match sort_by {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::Price => ProdCol::BasePrice,
        ProductSortBy::Name => ProdCol::Name,
    };
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(column),
        SortOrder::Desc => finder.order_by_desc(column),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", ProductList { items }, Some(meta)))
}

/// Product detail with its active variants and its tier table, the pieces
/// the storefront needs to render a product page with volume pricing.
pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let variants = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(id))
        .filter(VariantCol::IsActive.eq(true))
        .order_by_asc(VariantCol::Sku)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(variant_from_entity)
        .collect();

    let tiers = PricingTiers::find()
        .filter(TierCol::ProductId.eq(id))
        .filter(TierCol::IsActive.eq(true))
        .order_by_asc(TierCol::MinQuantity)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tier_from_entity)
        .collect();

    let detail = ProductDetail {
        product: product_from_entity(product),
        variants,
        tiers,
    };

    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}
