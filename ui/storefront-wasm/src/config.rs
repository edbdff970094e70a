//! Page configuration.
//!
//! Server templates embed a JSON block:
//!
//! ```html
//! <script id="storefront-config" type="application/json">
//!   {"cart": {"line_pricing": {"mode": "server"}}, "site": {"mobile_breakpoint": 827}}
//! </script>
//! ```
//!
//! and tag `<body data-page="cart" data-mobile-breakpoint="811">`. Every key
//! is optional.

use crate::dom;
use ba_cart::CartConfig;
use ba_checkout::{CheckoutConfig, PaymentConfig};
use ba_site::{PageKind, SiteConfig};
use serde::Deserialize;
use std::str::FromStr;
use tracing::Level;

pub const CONFIG_SCRIPT_ID: &str = "storefront-config";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Prefix for API paths; empty for same-origin.
    pub api_base: String,
    pub log_level: String,
    pub cart: CartConfig,
    pub checkout: CheckoutConfig,
    pub payment: PaymentConfig,
    pub site: SiteConfig,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            log_level: "info".into(),
            cart: CartConfig::default(),
            checkout: CheckoutConfig::default(),
            payment: PaymentConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl StorefrontConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text)
    }

    pub fn max_level(&self) -> Level {
        Level::from_str(self.log_level.trim()).unwrap_or(Level::INFO)
    }
}

/// Read the embedded config block. A page without one gets the defaults.
pub fn load() -> Result<StorefrontConfig, serde_json::Error> {
    let text = dom::by_id(CONFIG_SCRIPT_ID)
        .and_then(|el| el.text_content())
        .unwrap_or_default();
    StorefrontConfig::from_json(&text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    pub kind: PageKind,
    pub mobile_breakpoint: u32,
}

impl PageContext {
    pub fn resolve(site: &SiteConfig, data_page: Option<&str>, breakpoint: Option<&str>) -> Self {
        let kind = data_page
            .and_then(PageKind::from_data_page)
            .unwrap_or_default();
        let page_override = breakpoint.and_then(|value| value.trim().parse().ok());
        Self {
            kind,
            mobile_breakpoint: site.breakpoint_for(page_override),
        }
    }
}

/// What kind of page this is, from the `<body>` data attributes.
pub fn page_context(site: &SiteConfig) -> PageContext {
    let body = dom::body();
    let attr = |name: &str| body.as_ref().and_then(|b| b.get_attribute(name));
    PageContext::resolve(
        site,
        attr("data-page").as_deref(),
        attr("data-mobile-breakpoint").as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_cart::{LinePricing, RecoveryPolicy};
    use ba_checkout::PurchaseRoute;
    use ba_api_types::Price;

    #[test]
    fn empty_block_means_defaults() -> anyhow::Result<()> {
        let config = StorefrontConfig::from_json("  \n")?;
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.max_level(), Level::INFO);
        Ok(())
    }

    #[test]
    fn legacy_page_settings_parse() -> anyhow::Result<()> {
        let config = StorefrontConfig::from_json(
            r#"{
                "log_level": "debug",
                "cart": {
                    "line_pricing": {"mode": "fixed_unit_price", "unit": 225},
                    "on_total_failure": "message"
                },
                "checkout": {"purchase_route": "process_payment"},
                "payment": {"publishable_key": "pk_test_123"},
                "site": {"mobile_breakpoint": 846}
            }"#,
        )?;

        assert_eq!(config.max_level(), Level::DEBUG);
        assert_eq!(
            config.cart.line_pricing,
            LinePricing::FixedUnitPrice {
                unit: Price::from_dollars(225)
            }
        );
        assert_eq!(config.cart.on_total_failure, RecoveryPolicy::Message);
        assert_eq!(config.cart.on_remove_failure, RecoveryPolicy::Reload);
        assert_eq!(config.checkout.purchase_route, PurchaseRoute::ProcessPayment);
        assert_eq!(config.payment.publishable_key, "pk_test_123");
        assert_eq!(config.payment.message_hide_after_ms, 4000);
        assert_eq!(config.site.mobile_breakpoint, 846);
        Ok(())
    }

    #[test]
    fn body_attributes_pick_page_and_breakpoint() {
        let site = SiteConfig::default();

        let cart = PageContext::resolve(&site, Some("cart"), Some("811"));
        assert_eq!(cart.kind, PageKind::Cart);
        assert_eq!(cart.mobile_breakpoint, 811);

        let unknown = PageContext::resolve(&site, Some("gallery"), Some("wide"));
        assert_eq!(unknown.kind, PageKind::Home);
        assert_eq!(unknown.mobile_breakpoint, 827);
    }
}
