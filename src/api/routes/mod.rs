pub mod cache;
pub mod collectors;
pub mod health;
