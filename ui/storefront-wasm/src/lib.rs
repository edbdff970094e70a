//! BrigArt storefront in the browser.
//!
//! Reads the page's config block, works out which template it is on and
//! mounts the matching controllers. Each module owns one concern; the
//! behavior itself lives in the `ba-*` crates.

pub mod api;
pub mod cart_view;
pub mod chrome;
pub mod checkout_view;
pub mod config;
pub mod confirmation;
pub mod dom;
pub mod forms;
pub mod logging;
pub mod page;
pub mod payment;
pub mod session;

use ba_cart::PageLock;
use ba_site::PageKind;
use config::{PageContext, StorefrontConfig};
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

/// WASM entry point, run when the module is instantiated.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let (config, problem) = match config::load() {
        Ok(config) => (config, None),
        Err(err) => (StorefrontConfig::default(), Some(err)),
    };
    logging::init(config.max_level());
    if let Some(err) = problem {
        warn!("storefront config ignored: {err}");
    }

    let ctx = config::page_context(&config.site);
    info!(page = ?ctx.kind, breakpoint = ctx.mobile_breakpoint, "storefront starting");
    mount(&config, ctx);
    Ok(())
}

fn mount(config: &StorefrontConfig, ctx: PageContext) {
    let base = config.api_base.as_str();
    let lock = Rc::new(PageLock::new());

    chrome::mount_menu(ctx.mobile_breakpoint);
    forms::mount_newsletter(base);
    if ctx.kind.fades_artwork() {
        chrome::mount_fade_in(config.site.fade_delay_per_px);
    }

    let cart = match ctx.kind {
        PageKind::Product => {
            cart_view::mount_product(base, lock, config.cart.clone());
            None
        }
        PageKind::Cart => cart_view::mount_cart(base, lock, config.cart.clone()),
        PageKind::Checkout => {
            let cart = cart_view::mount_cart(base, lock.clone(), config.cart.clone());
            checkout_view::mount(base, lock, config.checkout.clone());
            cart
        }
        PageKind::Payment => {
            cart_view::sync_badge(base);
            payment::mount(base, config.payment.clone());
            None
        }
        PageKind::Confirmation => {
            cart_view::sync_badge(base);
            confirmation::mount(base);
            None
        }
        PageKind::Login => {
            forms::mount_login(base);
            None
        }
        PageKind::Portal => {
            forms::mount_reorder(base);
            None
        }
        PageKind::Home | PageKind::ShopMenu => {
            cart_view::sync_badge(base);
            None
        }
    };

    if ctx.kind.has_session_timer() {
        session::mount(base, cart);
    }
    if matches!(
        ctx.kind,
        PageKind::Product | PageKind::Cart | PageKind::Checkout
    ) {
        session::reload_on_back_navigation();
    }
}
