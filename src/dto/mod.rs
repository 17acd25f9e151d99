pub mod cart;
pub mod orders;
pub mod pricing;
pub mod products;
