use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{CartItemView, CartTotals, CartValidationReport, CartView, SweepResult, TransferResult},
        orders::{OrderList, OrderWithItems},
        pricing::{AppliedTier, PricingInfo, TierList, TierRecommendation},
        products::{ProductDetail, ProductList, VariantList},
    },
    models::{CartItem, Order, OrderItem, PricingTier, Product, ProductVariant, TeamDiscount},
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, orders, params, pricing, products as product_routes},
    services::admin_service,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "guest_session",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-guest-session"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        pricing::quote,
        pricing::tiers,
        cart::get_cart,
        cart::add_item,
        cart::update_quantity,
        cart::remove_item,
        cart::clear_cart,
        cart::validate_cart,
        cart::transfer_cart,
        product_routes::list_products,
        product_routes::get_product,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        admin::set_pricing_tiers,
        admin::upsert_team_discount,
        admin::sweep_stale_carts,
        admin::list_low_stock
    ),
    components(
        schemas(
            Product,
            ProductVariant,
            PricingTier,
            TeamDiscount,
            CartItem,
            Order,
            OrderItem,
            PricingInfo,
            AppliedTier,
            TierRecommendation,
            TierList,
            CartView,
            CartItemView,
            CartTotals,
            CartValidationReport,
            TransferResult,
            SweepResult,
            ProductList,
            ProductDetail,
            VariantList,
            OrderList,
            OrderWithItems,
            admin_service::LowStockQuery,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<PricingInfo>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ProductDetail>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Pricing", description = "Volume pricing quotes and tier tables"),
        (name = "Cart", description = "User and guest cart endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Checkout hand-off endpoints"),
        (name = "Admin", description = "Pricing configuration and maintenance"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
