//! Stripe integration for credit purchases.
//!
//! Stripe handles:
//! - Checkout sessions for package purchases
//! - Webhook delivery of completed checkouts

pub mod client;
pub mod types;

pub use client::StripeClient;
pub use client::StripeError;
pub use client::CheckoutUrls;
pub use types::*;
