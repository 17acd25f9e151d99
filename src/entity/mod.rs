pub mod audit_logs;
pub mod cart_items;
pub mod order_items;
pub mod orders;
pub mod pricing_tiers;
pub mod product_variants;
pub mod products;
pub mod team_discounts;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use pricing_tiers::Entity as PricingTiers;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use team_discounts::Entity as TeamDiscounts;
pub use users::Entity as Users;
