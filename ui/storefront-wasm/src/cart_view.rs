//! Cart rows, badges and the product page's add-to-cart form.

use crate::api::{self, BrowserClient};
use crate::dom;
use crate::page::{self, page_surface};
use ba_api_types::Price;
use ba_cart::{Cart, CartConfig, CartController, CartLine, CartSurface, PageLock, QuantityStepper};
use ba_storefront_client::StorefrontApi;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info, warn};
use web_sys::Element;

const ROW: &str = ".info_container";
const ROW_TITLE: &str = ".title_container p";
const ROW_QUANTITY: &str = ".quantity-input-wrapper input, .quantity-input";
const ROW_PRICE: &str = ".price";
const BADGES: [&str; 2] = ["cartQuantity", "mobileCartQuantity"];
const CART_PATH: &str = "/cart";

pub type BrowserCart = CartController<BrowserClient, CartView>;

#[derive(Debug, Clone, Copy, Default)]
pub struct CartView;

page_surface!(CartView);

fn row_title(row: &Element) -> Option<String> {
    dom::query_within(row, ROW_TITLE).map(|p| dom::text(&p))
}

fn find_row(title: &str) -> Option<Element> {
    dom::query_all(ROW)
        .into_iter()
        .find(|row| row_title(row).as_deref() == Some(title))
}

fn row_quantity(row: &Element) -> Option<web_sys::HtmlInputElement> {
    use wasm_bindgen::JsCast;
    dom::query_within(row, ROW_QUANTITY)?.dyn_into().ok()
}

/// Seed the mirror from the rows the server rendered.
pub fn read_cart() -> Cart {
    let lines = dom::query_all(ROW)
        .iter()
        .filter_map(|row| {
            let title = row_title(row)?;
            let quantity = row_quantity(row)?.value().trim().parse().ok()?;
            let price = dom::query_within(row, ROW_PRICE)
                .and_then(|el| Price::parse(&dom::text(&el)))
                .unwrap_or_default();
            Some(CartLine::new(title, quantity, price))
        })
        .collect();
    Cart::new(lines)
}

/// Error paragraphs sit just above the checkout button, or above the
/// product form on product pages.
fn insert_error(message: &str) {
    dom::remove_all(".error-msg");
    let Some(anchor) = dom::query(".checkout-btn").or_else(|| dom::by_id("myForm")) else {
        warn!("no place to show cart message: {message}");
        return;
    };
    let (Some(parent), Some(p)) = (anchor.parent_node(), dom::paragraph("error-msg", message)) else {
        return;
    };
    let anchor: &web_sys::Node = &anchor;
    let _ = parent.insert_before(&p, Some(anchor));
    p.scroll_into_view();
}

impl CartSurface for CartView {
    fn set_line(&self, title: &str, quantity: u32, price: Price) {
        let Some(row) = find_row(title) else { return };
        if let Some(input) = row_quantity(&row) {
            input.set_value(&quantity.to_string());
        }
        if let Some(el) = dom::query_within(&row, ROW_PRICE) {
            dom::set_text(&el, &format!("${price}"));
        }
    }

    fn remove_line(&self, title: &str) {
        if let Some(row) = find_row(title) {
            row.remove();
        }
    }

    fn set_badge(&self, quantity: Option<u32>) {
        let text = quantity.map(|q| q.to_string()).unwrap_or_default();
        for id in BADGES {
            if let Some(badge) = dom::by_id(id) {
                dom::set_text(&badge, &text);
            }
        }
    }

    fn set_total(&self, total: Price) {
        if let Some(el) = dom::by_id("total-price") {
            dom::set_text(&el, &format!("${total}"));
        }
    }

    fn show_empty_cart(&self, continue_path: &str) {
        let Some(wrapper) = dom::query(".shop-more-wrapper") else { return };
        if let Some(container) = dom::query(".checkout-container") {
            dom::add_class(&container, "hide");
        }
        if dom::query_within(&wrapper, ".more-shop-styles").is_some() {
            return;
        }
        let Some(button) = dom::create_element("button") else { return };
        dom::set_text(&button, "CONTINUE SHOPPING");
        dom::add_class(&button, "more-shop-styles");
        let path = continue_path.to_string();
        dom::on(&button, "click", move |_| page::navigate(&path));
        let _ = wrapper.append_child(&button);
    }

    fn show_error(&self, message: &str) {
        insert_error(message);
    }

    fn clear_error(&self) {
        dom::remove_all(".error-msg");
    }

    fn show_checkout_link(&self) {
        if let Some(quantity_box) = dom::by_id("quantityBox") {
            dom::set_style(&quantity_box, "display", "none");
        }
        if let Some(link) = dom::by_id("addToCartLink") {
            dom::set_text(&link, "Checkout");
            dom::remove_class(&link, "add-to-cart-btn");
            dom::add_class(&link, "checkout-btn");
        }
    }

    fn reset_quantity_input(&self) {
        dom::set_input_value("quantity-input", "1");
    }

    fn show_checkout_hint(&self, message: &str) {
        let Some(container) = dom::query(".checkout-container") else { return };
        if let Some(p) = dom::paragraph("empty-cart-message", message) {
            let _ = container.append_child(&p);
        }
    }

    fn clear_checkout_hint(&self) {
        dom::remove_all(".empty-cart-message");
    }
}

fn new_controller(base: &str, lock: Rc<PageLock>, config: CartConfig) -> Rc<BrowserCart> {
    Rc::new(CartController::new(
        api::client(base),
        CartView,
        lock,
        config,
        read_cart(),
    ))
}

#[derive(Clone, Copy)]
enum RowAction {
    Increase,
    Decrease,
    Remove,
}

fn bind_row_buttons(controller: &Rc<BrowserCart>, selector: &str, action: RowAction) {
    for button in dom::query_all(selector) {
        let controller = controller.clone();
        let row = dom::closest(&button, ROW);
        dom::on(&button, "click", move |_| {
            let Some(title) = row.as_ref().and_then(row_title) else { return };
            let controller = controller.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = match action {
                    RowAction::Increase => controller.increase_quantity(&title).await,
                    RowAction::Decrease => controller.decrease_quantity(&title).await,
                    RowAction::Remove => controller.remove_item(&title).await,
                };
                if let Err(err) = result {
                    debug!(%title, "cart action ended: {err}");
                }
            });
        });
    }
}

/// Cart rows on the cart and checkout pages. `None` when the page has no
/// cart to drive.
pub fn mount_cart(base: &str, lock: Rc<PageLock>, config: CartConfig) -> Option<Rc<BrowserCart>> {
    if dom::query(ROW).is_none() && dom::query(".checkout-container").is_none() {
        return None;
    }
    let controller = new_controller(base, lock, config);
    info!(lines = controller.cart().lines().len(), "cart mounted");

    bind_row_buttons(&controller, ".increase-quantity", RowAction::Increase);
    bind_row_buttons(&controller, ".decrease-quantity", RowAction::Decrease);
    bind_row_buttons(&controller, ".remove-item", RowAction::Remove);

    if let Some(button) = dom::query(".checkout-container .checkout-btn") {
        let controller = controller.clone();
        dom::on(&button, "click", move |event| {
            event.prevent_default();
            let controller = controller.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = controller.begin_checkout().await {
                    warn!("starting checkout failed: {err}");
                }
            });
        });
    }
    if let Some(image) = dom::query(".cart-image") {
        let controller = controller.clone();
        dom::on(&image, "click", move |_| controller.dismiss_checkout_hint());
    }

    let first_sync = controller.clone();
    wasm_bindgen_futures::spawn_local(async move {
        let quantity = first_sync.get_cart_quantity().await;
        first_sync.update_cart_quantity(quantity);
    });
    Some(controller)
}

/// Product page: quantity stepper plus add-to-cart, which turns into a
/// checkout link once something was added.
pub fn mount_product(base: &str, lock: Rc<PageLock>, config: CartConfig) {
    let title = dom::query("#title h2").map(|h2| dom::text(&h2)).unwrap_or_default();
    if title == "None" {
        page::navigate("/");
        return;
    }
    let controller = new_controller(base, lock, config);
    let stepper = Rc::new(Cell::new(QuantityStepper::default()));
    let added = Rc::new(Cell::new(false));

    for (id, step_up) in [("increment-btn", true), ("decrement-btn", false)] {
        let Some(button) = dom::by_id(id) else { continue };
        let stepper = stepper.clone();
        dom::on(&button, "click", move |_| {
            let mut value = stepper.get();
            let shown = if step_up { value.increment() } else { value.decrement() };
            stepper.set(value);
            dom::set_input_value("quantity-input", &shown.to_string());
        });
    }

    if let Some(link) = dom::by_id("addToCartLink") {
        let controller = controller.clone();
        dom::on(&link, "click", move |event| {
            event.prevent_default();
            if added.get() {
                page::navigate(CART_PATH);
                return;
            }
            let requested = dom::input_value("quantity-input");
            let controller = controller.clone();
            let title = title.clone();
            let added = added.clone();
            let stepper = stepper.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = controller.add_to_cart(&title, &requested).await;
                let mut value = stepper.get();
                value.reset();
                stepper.set(value);
                match result {
                    Ok(_) => added.set(true),
                    Err(err) => debug!(%title, "add to cart refused: {err}"),
                }
            });
        });
    }

    wasm_bindgen_futures::spawn_local(async move {
        let quantity = controller.get_cart_quantity().await;
        controller.update_cart_quantity(quantity);
    });
}

/// Pages without a cart still show the badge count.
pub fn sync_badge(base: &str) {
    let client = api::client(base);
    wasm_bindgen_futures::spawn_local(async move {
        match client.cart_quantity().await {
            Ok(quantity) if quantity > 0 => CartView.set_badge(Some(quantity)),
            Ok(_) => {}
            Err(err) => warn!("fetching cart quantity failed: {err}"),
        }
    });
}
