//! Request handlers.

pub mod auth;
pub mod health;
pub mod tax;
pub mod tax_models;
