//! Site chrome shared by every page: responsive menu, scroll fade-in,
//! newsletter form, admin login and artwork ordering.

pub mod fade;
pub mod login;
pub mod menu;
pub mod newsletter;
pub mod reorder;

use ba_storefront_client::ApiError;
use serde::Deserialize;
use thiserror::Error;

pub use fade::{FadeTracker, Rect};
pub use login::{AdminLogin, LoginSurface};
pub use menu::{Menu, MenuLayout};
pub use newsletter::{Newsletter, NewsletterSurface, is_valid_email};
pub use reorder::ArtworkOrder;

pub const DEFAULT_MOBILE_BREAKPOINT: u32 = 827;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("login refused")]
    LoginRefused,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Which template the page was rendered from (`<body data-page=...>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    #[default]
    Home,
    ShopMenu,
    Product,
    Cart,
    Checkout,
    Payment,
    Confirmation,
    Login,
    Portal,
}

impl PageKind {
    pub fn from_data_page(value: &str) -> Option<Self> {
        let kind = match value.trim() {
            "home" => PageKind::Home,
            "shop_menu" => PageKind::ShopMenu,
            "product" => PageKind::Product,
            "cart" => PageKind::Cart,
            "checkout" => PageKind::Checkout,
            "payment" => PageKind::Payment,
            "confirmation" => PageKind::Confirmation,
            "login" => PageKind::Login,
            "portal" => PageKind::Portal,
            _ => return None,
        };
        Some(kind)
    }

    /// Pages that show the session countdown.
    pub fn has_session_timer(self) -> bool {
        matches!(self, PageKind::Cart | PageKind::Checkout)
    }

    /// Pages that fade artwork in as it scrolls into view.
    pub fn fades_artwork(self) -> bool {
        matches!(self, PageKind::Home | PageKind::ShopMenu)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Widths at or below this get the mobile menu.
    pub mobile_breakpoint: u32,
    /// Fade-in delay in milliseconds per pixel from the viewport's left edge.
    pub fade_delay_per_px: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint: DEFAULT_MOBILE_BREAKPOINT,
            fade_delay_per_px: fade::DELAY_PER_PX,
        }
    }
}

impl SiteConfig {
    /// A page's own `data-mobile-breakpoint` wins over the site default.
    pub fn breakpoint_for(&self, page_override: Option<u32>) -> u32 {
        page_override.unwrap_or(self.mobile_breakpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_override_beats_default_breakpoint() {
        let config = SiteConfig::default();
        assert_eq!(config.breakpoint_for(None), 827);
        assert_eq!(config.breakpoint_for(Some(768)), 768);
    }

    #[test]
    fn data_page_names_round_trip_through_serde() -> anyhow::Result<()> {
        let kind: PageKind = serde_json::from_str(r#""shop_menu""#)?;
        assert_eq!(kind, PageKind::ShopMenu);
        assert_eq!(PageKind::from_data_page("shop_menu"), Some(kind));
        assert_eq!(PageKind::from_data_page("admin"), None);
        Ok(())
    }

    #[test]
    fn countdown_only_on_cart_and_checkout() {
        assert!(PageKind::Cart.has_session_timer());
        assert!(PageKind::Checkout.has_session_timer());
        assert!(!PageKind::Payment.has_session_timer());
        assert!(!PageKind::Product.has_session_timer());
    }
}
