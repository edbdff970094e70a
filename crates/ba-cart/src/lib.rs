//! Cart sync controller.
//!
//! The server session owns the cart. `CartController` keeps a mirror of the
//! lines shown on the page, routes every change through the storefront and
//! writes the server's answer back onto the page through a [`CartSurface`].

mod config;
pub mod page;
pub mod session;

pub use config::{CartConfig, DEFAULT_MAX_QUANTITY, LinePricing, RecoveryPolicy};
pub use page::{LockGuard, LockSurface, Navigator, PageLock};
pub use session::{SessionCountdown, SessionTimer, TimerSurface};

use ba_api_types::{AddToCartRequest, CartQuantity, Price};
use ba_storefront_client::{ApiError, StorefrontApi};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const LIMIT_MESSAGE: &str = "The maximum quantity allowed is 1000.";
pub const INVALID_QUANTITY_MESSAGE: &str = "Please enter a valid integer between 1 and 1000";
pub const TOTAL_LIMIT_MESSAGE: &str = "Your total quantity cannot exceed 1000";
pub const MAX_ITEMS_MESSAGE: &str = "You can only add up to 20 items in the cart.";
pub const EMPTY_CHECKOUT_MESSAGE: &str = "Add Items to Checkout";
pub const RETRY_MESSAGE: &str = "Something went wrong updating your cart. Please try again.";
pub const CONTINUE_SHOPPING_PATH: &str = "/shop_art_menu";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("another cart operation is in progress")]
    Busy,
    #[error("no cart line titled {0:?}")]
    UnknownLine(String),
    #[error("cart quantity limit of {0} reached")]
    QuantityLimit(u32),
    #[error("invalid quantity {0:?}")]
    InvalidQuantity(String),
    #[error("the cart already holds the maximum number of titles")]
    MaxItemsReached,
    #[error("server did not confirm the cart total")]
    TotalRejected,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Everything the cart needs from the page.
pub trait CartSurface: LockSurface + Navigator {
    fn set_line(&self, title: &str, quantity: u32, price: Price);
    fn remove_line(&self, title: &str);
    /// `None` blanks both badges.
    fn set_badge(&self, quantity: Option<u32>);
    fn set_total(&self, total: Price);
    /// Swap in the empty-cart view with a "Continue Shopping" link.
    fn show_empty_cart(&self, continue_path: &str);
    fn show_error(&self, message: &str);
    fn clear_error(&self);
    /// Product page: replace the add-to-cart control with a checkout link.
    fn show_checkout_link(&self);
    fn reset_quantity_input(&self);
    fn show_checkout_hint(&self, message: &str);
    fn clear_checkout_hint(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub title: String,
    pub quantity: u32,
    pub price: Price,
}

impl CartLine {
    pub fn new(title: impl Into<String>, quantity: u32, price: Price) -> Self {
        Self {
            title: title.into(),
            quantity,
            price,
        }
    }
}

/// Client mirror of the session cart, seeded from the rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    total: Price,
}

impl Cart {
    pub fn new(lines: Vec<CartLine>) -> Self {
        let total = lines.iter().map(|line| line.price).sum();
        Self { lines, total }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, title: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.title == title)
    }

    pub fn quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of the displayed line prices.
    pub fn lines_total(&self) -> Price {
        self.lines.iter().map(|line| line.price).sum()
    }

    /// Last total the server confirmed.
    pub fn total(&self) -> Price {
        self.total
    }

    fn set_line(&mut self, title: &str, quantity: u32, price: Price) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.title == title) {
            line.quantity = quantity;
            line.price = price;
        }
    }

    fn remove(&mut self, title: &str) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| line.title == title)?;
        Some(self.lines.remove(index))
    }
}

/// Product-page quantity picker. Never goes below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityStepper(u32);

impl Default for QuantityStepper {
    fn default() -> Self {
        Self(1)
    }
}

impl QuantityStepper {
    pub fn value(self) -> u32 {
        self.0
    }

    pub fn increment(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }

    pub fn decrement(&mut self) -> u32 {
        if self.0 > 1 {
            self.0 -= 1;
        }
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStart {
    /// Empty cart; the hint is (or already was) on the page.
    Empty,
    Redirected(String),
}

pub struct CartController<A, S> {
    api: A,
    surface: S,
    lock: Rc<PageLock>,
    config: CartConfig,
    cart: RefCell<Cart>,
    badge: Cell<u32>,
    hint_shown: Cell<bool>,
}

impl<A, S> CartController<A, S>
where
    A: StorefrontApi,
    S: CartSurface,
{
    pub fn new(api: A, surface: S, lock: Rc<PageLock>, config: CartConfig, cart: Cart) -> Self {
        Self {
            api,
            surface,
            lock,
            config,
            cart: RefCell::new(cart),
            badge: Cell::new(0),
            hint_shown: Cell::new(false),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    pub fn cart(&self) -> Cart {
        self.cart.borrow().clone()
    }

    /// Last aggregate quantity written to the badges.
    pub fn badge(&self) -> u32 {
        self.badge.get()
    }

    /// Session cart quantity, or 0 when the server can't be asked.
    pub async fn get_cart_quantity(&self) -> u32 {
        match self.api.cart_quantity().await {
            Ok(quantity) => quantity,
            Err(err) => {
                warn!("fetching cart quantity failed: {err}");
                0
            }
        }
    }

    pub fn update_cart_quantity(&self, quantity: u32) {
        self.badge.set(quantity);
        if quantity == 0 {
            self.surface.set_badge(None);
            self.surface.show_empty_cart(CONTINUE_SHOPPING_PATH);
        } else {
            self.surface.set_badge(Some(quantity));
        }
    }

    /// Post the displayed total and show whatever the server settles on.
    pub async fn update_total_price(&self) -> Result<Price, CartError> {
        let displayed = self.cart.borrow().lines_total();
        let outcome = match self.api.post_total_price(displayed).await {
            Ok(response) => response.total_price.ok_or(CartError::TotalRejected),
            Err(err) => Err(err.into()),
        };

        match outcome {
            Ok(total) => {
                if total != displayed {
                    debug!(%displayed, %total, "server total differs from page");
                }
                self.cart.borrow_mut().total = total;
                self.surface.set_total(total);
                Ok(total)
            }
            Err(err) => {
                warn!("checking total price failed: {err}");
                self.recover(self.config.on_total_failure);
                Err(err)
            }
        }
    }

    /// Re-read badge and total from the session, e.g. when the tab becomes
    /// visible again.
    pub async fn refresh(&self) -> Result<(), CartError> {
        let quantity = self.get_cart_quantity().await;
        self.update_cart_quantity(quantity);
        self.update_total_price().await?;
        Ok(())
    }

    pub async fn increase_quantity(&self, title: &str) -> Result<(), CartError> {
        let guard = self.lock.acquire(&self.surface).ok_or(CartError::Busy)?;
        let current = self.line_quantity(title)?;
        let cart_quantity = self.get_cart_quantity().await;

        let max = self.config.max_quantity;
        if cart_quantity >= max || current + 1 > max {
            info!(title, cart_quantity, "increase blocked by quantity limit");
            self.surface.show_error(LIMIT_MESSAGE);
            return Err(CartError::QuantityLimit(max));
        }

        guard.busy();
        let response = match self.api.increase_quantity(title).await {
            Ok(response) => response,
            Err(err) => {
                warn!(title, "increase quantity failed: {err}");
                self.recover(self.config.on_increase_failure);
                return Err(err.into());
            }
        };

        let quantity = current + 1;
        self.apply_line(title, quantity, response.price);
        self.update_cart_quantity(cart_quantity + 1);
        self.update_total_price().await?;
        self.surface.clear_error();
        Ok(())
    }

    /// At quantity one this removes the line instead.
    pub async fn decrease_quantity(&self, title: &str) -> Result<(), CartError> {
        let guard = self.lock.acquire(&self.surface).ok_or(CartError::Busy)?;
        let current = self.line_quantity(title)?;
        let cart_quantity = self.get_cart_quantity().await;

        if current <= 1 {
            return self.remove_locked(&guard, title, cart_quantity).await;
        }

        guard.busy();
        let response = match self.api.decrease_quantity(title).await {
            Ok(response) => response,
            Err(err) => {
                warn!(title, "decrease quantity failed: {err}");
                self.recover(self.config.on_decrease_failure);
                return Err(err.into());
            }
        };

        let quantity = current - 1;
        self.apply_line(title, quantity, response.price);
        self.update_cart_quantity(cart_quantity.saturating_sub(1));
        self.update_total_price().await?;
        self.surface.clear_error();
        Ok(())
    }

    pub async fn remove_item(&self, title: &str) -> Result<(), CartError> {
        let guard = self.lock.acquire(&self.surface).ok_or(CartError::Busy)?;
        self.line_quantity(title)?;
        let cart_quantity = self.get_cart_quantity().await;
        self.remove_locked(&guard, title, cart_quantity).await
    }

    async fn remove_locked(
        &self,
        guard: &LockGuard<'_, S>,
        title: &str,
        cart_quantity: u32,
    ) -> Result<(), CartError> {
        let removed = self
            .cart
            .borrow_mut()
            .remove(title)
            .ok_or_else(|| CartError::UnknownLine(title.to_owned()))?;
        self.surface.remove_line(title);

        guard.busy();
        if let Err(err) = self.api.delete_item(title).await {
            warn!(title, "delete item failed: {err}");
            self.recover(self.config.on_remove_failure);
            return Err(err.into());
        }

        info!(title, quantity = removed.quantity, "line removed");
        self.update_cart_quantity(cart_quantity.saturating_sub(removed.quantity));
        self.update_total_price().await?;
        self.surface.clear_error();
        Ok(())
    }

    /// Product page "Add to Cart". `requested` is the raw quantity input.
    pub async fn add_to_cart(&self, title: &str, requested: &str) -> Result<u32, CartError> {
        let max = self.config.max_quantity;
        let quantity = match requested.trim().parse::<u32>() {
            Ok(quantity) if (1..=max).contains(&quantity) => quantity,
            _ => {
                self.surface.show_error(INVALID_QUANTITY_MESSAGE);
                return Err(CartError::InvalidQuantity(requested.to_owned()));
            }
        };
        if self.badge.get() + quantity > max {
            self.surface.show_error(TOTAL_LIMIT_MESSAGE);
            return Err(CartError::QuantityLimit(max));
        }

        let guard = self.lock.acquire(&self.surface).ok_or(CartError::Busy)?;
        guard.busy();
        let request = AddToCartRequest {
            title: title.to_owned(),
            quantity,
        };
        let outcome = self.api.add_to_cart(&request).await;
        drop(guard);
        self.surface.reset_quantity_input();

        match outcome {
            Ok(response) => match response.quantity {
                CartQuantity::Count(total) => {
                    info!(title, quantity, total, "added to cart");
                    self.surface.clear_error();
                    self.update_cart_quantity(total);
                    self.surface.show_checkout_link();
                    Ok(total)
                }
                notice if notice.is_max_items() => {
                    self.surface.show_error(MAX_ITEMS_MESSAGE);
                    Err(CartError::MaxItemsReached)
                }
                CartQuantity::Notice(text) => {
                    warn!(title, "unexpected add-to-cart answer: {text}");
                    self.surface.show_error(TOTAL_LIMIT_MESSAGE);
                    Err(ApiError::Decode(text).into())
                }
            },
            Err(err) => {
                warn!(title, "add to cart failed: {err}");
                self.surface.show_error(TOTAL_LIMIT_MESSAGE);
                Err(err.into())
            }
        }
    }

    /// Cart page checkout button.
    pub async fn begin_checkout(&self) -> Result<CheckoutStart, CartError> {
        if self.cart.borrow().total() == Price::ZERO {
            if !self.hint_shown.replace(true) {
                self.surface.show_checkout_hint(EMPTY_CHECKOUT_MESSAGE);
            }
            return Ok(CheckoutStart::Empty);
        }

        let session_id = self.api.session_id().await?;
        let path = format!("/checkout/{session_id}");
        self.surface.navigate(&path);
        Ok(CheckoutStart::Redirected(path))
    }

    pub fn dismiss_checkout_hint(&self) {
        if self.hint_shown.replace(false) {
            self.surface.clear_checkout_hint();
        }
    }

    fn line_quantity(&self, title: &str) -> Result<u32, CartError> {
        self.cart
            .borrow()
            .line(title)
            .map(|line| line.quantity)
            .ok_or_else(|| CartError::UnknownLine(title.to_owned()))
    }

    fn apply_line(&self, title: &str, quantity: u32, server_price: Price) {
        let price = self.config.line_pricing.line_price(server_price, quantity);
        self.cart.borrow_mut().set_line(title, quantity, price);
        self.surface.set_line(title, quantity, price);
    }

    fn recover(&self, policy: RecoveryPolicy) {
        match policy {
            RecoveryPolicy::Silent => {}
            RecoveryPolicy::Message => self.surface.show_error(RETRY_MESSAGE),
            RecoveryPolicy::Reload => self.surface.reload(),
        }
    }
}
