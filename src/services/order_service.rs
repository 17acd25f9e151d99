use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        product_variants::{Column as VariantCol, Entity as ProductVariants},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CartOwner},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, pricing_service},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Hand the cart off to fulfillment. The cart is validated first and an
/// invalid cart is rejected with the validation messages; payment capture
/// happens outside this service, so the order is created pending/unpaid.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let owner = CartOwner::User(user.user_id);

    let validation = cart_service::validate_cart(state, owner).await?;
    if let Some(report) = validation.data {
        if !report.valid {
            return Err(AppError::BadRequest(report.errors.join("; ")));
        }
    }

    let txn = state.orm.begin().await?;

    let cart_items = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart_items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut subtotal: i64 = 0;
    let mut total_units: i64 = 0;
    let mut priced_items = Vec::with_capacity(cart_items.len());

    for item in &cart_items {
        let variant = ProductVariants::find_by_id(item.variant_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .filter(|v| v.is_active)
            .ok_or_else(|| AppError::BadRequest("Cart item is no longer available".into()))?;

        if variant.stock < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                variant.sku
            )));
        }

        let tiers = pricing_service::load_tiers(state, item.product_id).await?;
        let tier_percent = pricing_service::select_tier(&tiers, item.quantity)
            .map(|t| t.discount_percent)
            .unwrap_or(0.0);
        let unit_price = pricing_service::discounted_unit_price(variant.price, tier_percent, 0.0);

        subtotal += unit_price * item.quantity as i64;
        total_units += item.quantity as i64;
        priced_items.push((item, unit_price));
    }

    let shipping = cart_service::estimate_shipping(&state.pricing, total_units);
    let tax = cart_service::estimate_tax(
        &state.pricing,
        subtotal,
        payload.shipping_country.as_deref(),
    );
    let total_amount = subtotal + shipping + tax;

    let order_id = Uuid::new_v4();
    let invoice_number = build_invoice_number(order_id);

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        status: Set("pending".into()),
        payment_status: Set("unpaid".into()),
        invoice_number: Set(invoice_number),
        shipping_country: Set(payload.shipping_country.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();

    for (item, unit_price) in priced_items {
        let inserted = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            variant_id: Set(item.variant_id),
            quantity: Set(item.quantity),
            unit_price: Set(unit_price),
            customization: Set(item.customization.clone()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(order_item_from_entity(inserted));

        ProductVariants::update_many()
            .col_expr(
                VariantCol::Stock,
                Expr::col(VariantCol::Stock).sub(item.quantity),
            )
            .filter(VariantCol::Id.eq(item.variant_id))
            .exec(&txn)
            .await?;
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: model.status,
        payment_status: model.payment_status,
        invoice_number: model.invoice_number,
        shipping_country: model.shipping_country,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        variant_id: model.variant_id,
        quantity: model.quantity,
        unit_price: model.unit_price,
        customization: model.customization,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("INV-{}-{}", date, short)
}
