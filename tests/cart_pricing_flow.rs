use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, Statement};
use uuid::Uuid;

use tshop_api::{
    config::PricingConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{cart::AddToCartRequest, orders::CheckoutRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        pricing_tiers::ActiveModel as TierActive,
        product_variants::{
            ActiveModel as VariantActive, Entity as ProductVariants, Model as VariantModel,
        },
        products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::{AuthUser, CartOwner},
    services::{cart_service, order_service},
    state::AppState,
};

// Integration flow: guest builds a cart -> logs in, cart transfers -> stock
// and price drift get caught by validation -> checkout hands the cart off.
#[tokio::test]
async fn guest_cart_transfer_validation_and_checkout_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "shopper@example.com").await?;
    let (product_id, variant_id) = seed_tee(&state, 2499, 100).await?;

    let guest_session = Uuid::new_v4();
    let guest = CartOwner::Guest(guest_session);
    let user_owner = CartOwner::User(user_id);

    // Adding the same variant twice merges into one line.
    cart_service::add_item(
        &state,
        guest,
        AddToCartRequest {
            product_id,
            variant_id,
            quantity: 1,
            customization: Some(serde_json::json!({ "design": "flames" })),
        },
    )
    .await?;
    cart_service::add_item(
        &state,
        guest,
        AddToCartRequest {
            product_id,
            variant_id,
            quantity: 1,
            customization: None,
        },
    )
    .await?;

    let guest_rows = CartItems::find()
        .filter(CartCol::GuestSessionId.eq(guest_session))
        .all(&state.orm)
        .await?;
    assert_eq!(guest_rows.len(), 1, "duplicate add must merge, not insert");
    assert_eq!(guest_rows[0].quantity, 2);
    assert!(
        guest_rows[0].customization.is_some(),
        "customization survives a merge without a new blob"
    );
    let item_id = guest_rows[0].id;

    // Quantity below 1 is rejected without touching the row.
    let err = cart_service::update_quantity(&state, guest, item_id, 0)
        .await
        .expect_err("zero quantity must be rejected");
    assert!(matches!(err, AppError::InvalidQuantity));

    cart_service::update_quantity(&state, guest, item_id, 5).await?;

    // Login: guest items move to the user, once.
    let transfer = cart_service::transfer_guest_cart_to_user(&state, guest_session, user_id)
        .await?
        .data
        .unwrap();
    assert_eq!(transfer.merged + transfer.reassigned, 1);

    let transfer_again = cart_service::transfer_guest_cart_to_user(&state, guest_session, user_id)
        .await?
        .data
        .unwrap();
    assert_eq!(transfer_again.merged, 0);
    assert_eq!(transfer_again.reassigned, 0);

    let user_cart = cart_service::get_cart(&state, user_owner, None)
        .await?
        .data
        .unwrap();
    assert_eq!(user_cart.items.len(), 1);
    assert_eq!(user_cart.items[0].quantity, 5);
    // 5 units sit in the 1-9 tier at full price.
    assert_eq!(user_cart.totals.subtotal, 2499 * 5);

    // Stock drops to 3 while the cart asks for 5: clamped and reported.
    set_variant(&state, variant_id, |v| v.stock = Set(3)).await?;
    let report = cart_service::validate_cart(&state, user_owner)
        .await?
        .data
        .unwrap();
    assert!(!report.valid);
    assert_eq!(report.adjusted_item_ids.len(), 1);

    let clamped = CartItems::find_by_id(report.adjusted_item_ids[0])
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(clamped.quantity, 3);

    // Price moves 8% from the snapshot: reported, item kept.
    set_variant(&state, variant_id, |v| v.price = Set(2700)).await?;
    let report = cart_service::validate_cart(&state, user_owner)
        .await?
        .data
        .unwrap();
    assert!(!report.valid);
    assert!(report.adjusted_item_ids.is_empty(), "drift never adjusts");

    // A 2% move stays within the default 5% tolerance.
    set_variant(&state, variant_id, |v| v.price = Set(2550)).await?;
    let report = cart_service::validate_cart(&state, user_owner)
        .await?
        .data
        .unwrap();
    assert!(report.valid, "unexpected issues: {:?}", report.errors);

    // Checkout: engine-priced snapshot, stock decrement, cart cleared.
    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let checkout = order_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            shipping_country: Some("DE".into()),
        },
    )
    .await?
    .data
    .unwrap();

    let subtotal = 2550 * 3;
    let shipping = state.pricing.shipping_small;
    let tax = ((subtotal as f64) * state.pricing.tax_percent / 100.0).round() as i64;
    assert_eq!(checkout.order.total_amount, subtotal + shipping + tax);
    assert_eq!(checkout.items.len(), 1);
    assert_eq!(checkout.items[0].unit_price, 2550);

    let variant = ProductVariants::find_by_id(variant_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(variant.stock, 0);

    let leftover = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .all(&state.orm)
        .await?;
    assert!(leftover.is_empty(), "checkout must clear the cart");

    Ok(())
}

// Transfer folds a guest line into an existing user line for the same
// variant instead of duplicating it.
#[tokio::test]
async fn transfer_merges_duplicate_variants() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "merger@example.com").await?;
    let (product_id, variant_id) = seed_tee(&state, 1999, 50).await?;

    let guest_session = Uuid::new_v4();

    cart_service::add_item(
        &state,
        CartOwner::User(user_id),
        AddToCartRequest {
            product_id,
            variant_id,
            quantity: 2,
            customization: None,
        },
    )
    .await?;
    cart_service::add_item(
        &state,
        CartOwner::Guest(guest_session),
        AddToCartRequest {
            product_id,
            variant_id,
            quantity: 3,
            customization: None,
        },
    )
    .await?;

    let transfer = cart_service::transfer_guest_cart_to_user(&state, guest_session, user_id)
        .await?
        .data
        .unwrap();
    assert_eq!(transfer.merged, 1);
    assert_eq!(transfer.reassigned, 0);

    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .all(&state.orm)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 5);

    Ok(())
}

// Two simultaneous transfers of the same session must move each item
// exactly once. The transfer locks the guest row before acting on it, so
// the losing transaction re-reads an already-moved row and skips it
// instead of adding its quantity a second time.
#[tokio::test]
async fn concurrent_transfers_move_each_item_once() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "racer@example.com").await?;
    let (product_id, variant_id) = seed_tee(&state, 2499, 50).await?;

    let guest_session = Uuid::new_v4();
    cart_service::add_item(
        &state,
        CartOwner::Guest(guest_session),
        AddToCartRequest {
            product_id,
            variant_id,
            quantity: 4,
            customization: None,
        },
    )
    .await?;

    let (first, second) = tokio::join!(
        cart_service::transfer_guest_cart_to_user(&state, guest_session, user_id),
        cart_service::transfer_guest_cart_to_user(&state, guest_session, user_id),
    );
    let first = first?.data.unwrap();
    let second = second?.data.unwrap();
    assert_eq!(
        first.merged + first.reassigned + second.merged + second.reassigned,
        1,
        "exactly one transfer may claim the item"
    );

    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .all(&state.orm)
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 4, "quantity must not be double-counted");

    let guest_rows = CartItems::find()
        .filter(CartCol::GuestSessionId.eq(guest_session))
        .all(&state.orm)
        .await?;
    assert!(guest_rows.is_empty());

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, pricing_tiers, team_discounts, product_variants, audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState {
        pool,
        orm,
        pricing: PricingConfig::default(),
    })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

// One tee with one variant and the standard 0/10/20 tier ladder.
async fn seed_tee(state: &AppState, price: i64, stock: i32) -> anyhow::Result<(Uuid, Uuid)> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test Tee {}", Uuid::new_v4())),
        description: Set(Some("A tee for testing".into())),
        product_type: Set("tshirt".into()),
        base_price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let variant = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        sku: Set(format!("TEE-{}", Uuid::new_v4())),
        color: Set(Some("black".into())),
        size: Set(Some("M".into())),
        price: Set(price),
        stock: Set(stock),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    for (min_q, max_q, percent) in [
        (1, Some(9), 0.0_f64),
        (10, Some(49), 10.0),
        (50, None, 20.0),
    ] {
        TierActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            min_quantity: Set(min_q),
            max_quantity: Set(max_q),
            discount_percent: Set(percent),
            is_active: Set(true),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await?;
    }

    Ok((product.id, variant.id))
}

async fn set_variant(
    state: &AppState,
    variant_id: Uuid,
    mutate: impl FnOnce(&mut tshop_api::entity::product_variants::ActiveModel),
) -> anyhow::Result<VariantModel> {
    let variant = ProductVariants::find_by_id(variant_id)
        .one(&state.orm)
        .await?
        .unwrap();
    let mut active: VariantActive = variant.into();
    mutate(&mut active);
    Ok(active.update(&state.orm).await?)
}
