//! Server-side price table.
//!
//! Clients pick a package or a duration, but the credits granted and the cost
//! charged are always re-derived from this table.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// A purchasable credit package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPackage {
    /// Catalog id (e.g. `"pro"`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Credits granted on payment.
    pub credits: i64,
    /// Price in cents.
    pub price_cents: i64,
    /// Pre-discount price in cents, when discounted.
    pub original_price_cents: Option<i64>,
    /// Short marketing description.
    pub description: String,
    /// Highlighted in the catalog.
    pub popular: bool,
}

/// Credit cost for one video length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationTier {
    /// Video length in seconds.
    pub seconds: u32,
    /// Credits charged.
    pub credits: i64,
}

/// Pricing configuration: packages for sale and generation cost tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Packages in display order.
    pub packages: Vec<CreditPackage>,
    /// Duration tiers in ascending length.
    pub duration_tiers: Vec<DurationTier>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            packages: vec![
                package("starter", "Starter", 10, 999, None, "Perfect for trying out", false),
                package("pro", "Pro", 50, 3999, Some(4999), "Best for regular creators", true),
                package(
                    "business",
                    "Business",
                    100,
                    6999,
                    Some(9999),
                    "For teams and agencies",
                    false,
                ),
                package(
                    "enterprise",
                    "Enterprise",
                    500,
                    29999,
                    Some(49999),
                    "Maximum value for high volume",
                    false,
                ),
            ],
            duration_tiers: vec![
                DurationTier { seconds: 30, credits: 1 },
                DurationTier { seconds: 60, credits: 2 },
                DurationTier { seconds: 120, credits: 4 },
            ],
        }
    }
}

fn package(
    id: &str,
    name: &str,
    credits: i64,
    price_cents: i64,
    original_price_cents: Option<i64>,
    description: &str,
    popular: bool,
) -> CreditPackage {
    CreditPackage {
        id: id.to_string(),
        name: name.to_string(),
        credits,
        price_cents,
        original_price_cents,
        description: description.to_string(),
        popular,
    }
}

impl PricingConfig {
    /// Look up a package by id.
    #[must_use]
    pub fn package(&self, id: &str) -> Option<&CreditPackage> {
        self.packages.iter().find(|p| p.id == id)
    }

    /// Credit cost of a video of `seconds` length, if a tier exists.
    #[must_use]
    pub fn cost_for_duration(&self, seconds: u32) -> Option<i64> {
        self.duration_tiers
            .iter()
            .find(|t| t.seconds == seconds)
            .map(|t| t.credits)
    }

    /// Validate a purchase request against the catalog.
    ///
    /// The requested credits and price must be present, positive, and equal to
    /// the catalog entry for `package_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidPackage`] otherwise.
    pub fn resolve_purchase(
        &self,
        package_id: Option<&str>,
        credits: Option<i64>,
        price_usd: Option<f64>,
    ) -> Result<&CreditPackage> {
        let package_id = package_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LedgerError::InvalidPackage("missing package id".into()))?;
        let credits = credits
            .filter(|c| *c > 0)
            .ok_or_else(|| LedgerError::InvalidPackage("credits must be positive".into()))?;
        let price_cents = price_usd
            .filter(|p| p.is_finite() && *p > 0.0)
            .map(usd_to_cents)
            .ok_or_else(|| LedgerError::InvalidPackage("price must be positive".into()))?;

        let package = self
            .package(package_id)
            .ok_or_else(|| LedgerError::InvalidPackage(format!("unknown package: {package_id}")))?;

        if package.credits != credits || package.price_cents != price_cents {
            return Err(LedgerError::InvalidPackage(format!(
                "package {package_id} is {} credits for {} cents",
                package.credits, package.price_cents
            )));
        }

        Ok(package)
    }
}

/// Convert a dollar amount to whole cents.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn usd_to_cents(usd: f64) -> i64 {
    (usd * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_matches_storefront() {
        let pricing = PricingConfig::default();
        let pro = pricing.package("pro").unwrap();
        assert_eq!(pro.credits, 50);
        assert_eq!(pro.price_cents, 3999);
        assert!(pro.popular);
        assert_eq!(pricing.packages.len(), 4);
    }

    #[test]
    fn duration_costs() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.cost_for_duration(30), Some(1));
        assert_eq!(pricing.cost_for_duration(60), Some(2));
        assert_eq!(pricing.cost_for_duration(120), Some(4));
        assert_eq!(pricing.cost_for_duration(45), None);
    }

    #[test]
    fn resolve_purchase_accepts_catalog_values() {
        let pricing = PricingConfig::default();
        let pkg = pricing
            .resolve_purchase(Some("pro"), Some(50), Some(39.99))
            .unwrap();
        assert_eq!(pkg.id, "pro");
    }

    #[test]
    fn resolve_purchase_rejects_tampered_credits() {
        let pricing = PricingConfig::default();
        let err = pricing
            .resolve_purchase(Some("pro"), Some(5000), Some(39.99))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPackage(_)));
    }

    #[test]
    fn resolve_purchase_rejects_missing_or_non_positive_fields() {
        let pricing = PricingConfig::default();
        for (id, credits, price) in [
            (None, Some(50), Some(39.99)),
            (Some(""), Some(50), Some(39.99)),
            (Some("pro"), None, Some(39.99)),
            (Some("pro"), Some(0), Some(39.99)),
            (Some("pro"), Some(50), Some(-1.0)),
            (Some("pro"), Some(50), Some(f64::NAN)),
            (Some("gold"), Some(50), Some(39.99)),
        ] {
            assert!(
                matches!(
                    pricing.resolve_purchase(id, credits, price),
                    Err(LedgerError::InvalidPackage(_))
                ),
                "expected rejection for {id:?} {credits:?} {price:?}"
            );
        }
    }

    #[test]
    fn usd_rounds_to_nearest_cent() {
        assert_eq!(usd_to_cents(39.99), 3999);
        assert_eq!(usd_to_cents(9.999), 1000);
    }
}
