//! API handlers.

pub mod accounts;
pub mod credits;
pub mod health;
pub mod payments;
pub mod videos;
pub mod webhooks;
