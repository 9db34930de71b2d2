pub mod auth;
pub mod dead_letter;
pub mod system;
pub mod transactions;
pub mod webhooks;
