//! Navigation menu, footer year and scroll fade-in.

use crate::dom;
use ba_site::{FadeTracker, Menu, MenuLayout, Rect};
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;
use web_sys::Element;

fn viewport() -> (u32, f64) {
    let Some(window) = dom::window() else {
        return (0, 0.0);
    };
    let size = |v: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
    };
    (size(window.inner_width()) as u32, size(window.inner_height()))
}

fn show_hide(selector: &str, visible: bool, display: &str) {
    if let Some(el) = dom::query(selector) {
        dom::set_style(&el, "display", if visible { display } else { "none" });
    }
}

fn apply(layout: &MenuLayout) {
    show_hide(".navbar", layout.navbar_visible, "flex");
    show_hide(".mobile-menu", layout.mobile_menu_visible, "flex");
    show_hide(".glance_inner h1", !layout.content_hidden, "block");
    if let Some(dropdown) = dom::query(".mobile-dropdown") {
        dom::toggle_class(&dropdown, "show", layout.dropdown_open);
    }
    if let Some(content) = dom::query(".content") {
        dom::toggle_class(&content, "hide", layout.content_hidden);
    }
    if let Some(footer) = dom::query(".footer") {
        dom::toggle_class(&footer, "hide", layout.footer_hidden);
    }
    if let Some(body) = dom::body() {
        let overflow = if layout.scroll_locked { "hidden" } else { "auto" };
        let _ = body.style().set_property("overflow", overflow);
    }
}

pub fn mount_menu(breakpoint: u32) {
    let menu = Rc::new(RefCell::new(Menu::new(breakpoint, viewport().0)));
    apply(&menu.borrow().layout());

    if let Some(window) = dom::window() {
        let menu = menu.clone();
        dom::on(&window, "resize", move |_| {
            let layout = menu.borrow_mut().on_resize(viewport().0);
            apply(&layout);
        });
    }

    if let Some(icon) = dom::by_id("nav-icon3") {
        let target = icon.clone();
        dom::on(&icon, "click", move |_| {
            let open = !dom::has_class(&target, "open");
            dom::toggle_class(&target, "open", open);
            let layout = menu.borrow_mut().toggle_dropdown();
            apply(&layout);
        });
    }

    if let Some(year) = dom::by_id("currentYear") {
        let now = js_sys::Date::new_0();
        dom::set_text(&year, &now.get_full_year().to_string());
    }
}

fn rect(el: &Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect {
        top: r.top(),
        bottom: r.bottom(),
        left: r.left(),
    }
}

/// Swap `data-src` into `src` for images that reached the viewport.
fn load_visible_images(height: f64) {
    for img in dom::query_all("img[data-src]") {
        if !rect(&img).in_view(height) {
            continue;
        }
        if let Some(src) = img.get_attribute("data-src") {
            let _ = img.set_attribute("src", &src);
            let _ = img.remove_attribute("data-src");
        }
    }
}

fn reveal(tracker: &RefCell<FadeTracker>) {
    let (_, height) = viewport();
    load_visible_images(height);

    let artworks = dom::query_all(".artwork");
    let names = dom::query_all(".artwork-name");
    let prices = dom::query_all(".artwork-price");
    let rects: Vec<Rect> = artworks.iter().map(rect).collect();

    for (index, delay) in tracker.borrow_mut().plan(&rects, height) {
        let targets: Vec<Element> = [artworks.get(index), names.get(index), prices.get(index)]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        Timeout::new(millis, move || {
            for el in &targets {
                dom::add_class(el, "fade-in");
            }
        })
        .forget();
    }
}

pub fn mount_fade_in(delay_per_px: f64) {
    let tracker = Rc::new(RefCell::new(FadeTracker::new(delay_per_px)));
    reveal(&tracker);

    let Some(window) = dom::window() else { return };
    for event in ["scroll", "resize"] {
        let tracker = tracker.clone();
        dom::on(&window, event, move |_| reveal(&tracker));
    }
    debug!("fade-in mounted");
}
