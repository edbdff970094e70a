//! Page-wide effects shared by every view while a request holds the page
//! lock.

use crate::dom;
use tracing::warn;

const SPINNER_ID: &str = "page-spinner";
const LOCKED_CONTROLS: &str =
    ".increase-quantity, .decrease-quantity, .remove-item, .checkout-btn, #addToCartLink";

pub fn navigate(path: &str) {
    let Some(window) = dom::window() else { return };
    if let Err(err) = window.location().set_href(path) {
        warn!(path, "navigation failed: {err:?}");
    }
}

pub fn reload() {
    let Some(window) = dom::window() else { return };
    if let Err(err) = window.location().reload() {
        warn!("reload failed: {err:?}");
    }
}

pub fn set_controls_disabled(disabled: bool) {
    for el in dom::query_all(LOCKED_CONTROLS) {
        dom::set_disabled(&el, disabled);
    }
}

/// Dim the page and show the spinner, or undo both.
pub fn show_busy(busy: bool) {
    let Some(body) = dom::body() else { return };
    if !busy {
        let _ = body.style().set_property("opacity", "1");
        if let Some(spinner) = dom::by_id(SPINNER_ID) {
            spinner.remove();
        }
        return;
    }

    let _ = body.style().set_property("opacity", "0.5");
    if dom::by_id(SPINNER_ID).is_some() {
        return;
    }
    let (Some(wrapper), Some(container), Some(spinner)) = (
        dom::create_element("div"),
        dom::create_element("div"),
        dom::create_element("div"),
    ) else {
        return;
    };
    wrapper.set_id(SPINNER_ID);
    dom::add_class(&wrapper, "spinner_wrapper");
    dom::add_class(&container, "spinner_container");
    dom::add_class(&spinner, "spinner");
    let _ = container.append_child(&spinner);
    let _ = wrapper.append_child(&container);
    let _ = body.append_child(&wrapper);
}

/// Lock and navigation behavior for a view type; every view shares the
/// same page-wide handling.
macro_rules! page_surface {
    ($view:ty) => {
        impl ba_cart::LockSurface for $view {
            fn set_controls_disabled(&self, disabled: bool) {
                $crate::page::set_controls_disabled(disabled);
            }

            fn show_busy(&self, busy: bool) {
                $crate::page::show_busy(busy);
            }
        }

        impl ba_cart::Navigator for $view {
            fn navigate(&self, path: &str) {
                $crate::page::navigate(path);
            }

            fn reload(&self) {
                $crate::page::reload();
            }
        }
    };
}

pub(crate) use page_surface;
