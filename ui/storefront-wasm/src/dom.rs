//! DOM helpers.
//!
//! Every lookup returns `Option`: templates differ between pages and a
//! missing node switches the feature off for that page instead of panicking.

use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, NodeList, Window};

pub fn window() -> Option<Window> {
    web_sys::window()
}

pub fn document() -> Option<Document> {
    window()?.document()
}

pub fn body() -> Option<HtmlElement> {
    document()?.body()
}

pub fn by_id(id: &str) -> Option<Element> {
    document()?.get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query(selector: &str) -> Option<Element> {
    document()?.query_selector(selector).ok()?
}

pub fn query_all(selector: &str) -> Vec<Element> {
    document()
        .and_then(|doc| doc.query_selector_all(selector).ok())
        .map(elements)
        .unwrap_or_default()
}

pub fn query_within(parent: &Element, selector: &str) -> Option<Element> {
    parent.query_selector(selector).ok()?
}

pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    parent
        .query_selector_all(selector)
        .map(elements)
        .unwrap_or_default()
}

fn elements(list: NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn create_element(tag: &str) -> Option<Element> {
    document()?.create_element(tag).ok()
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn has_class(el: &Element, cls: &str) -> bool {
    el.class_list().contains(cls)
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn text(el: &Element) -> String {
    el.text_content().unwrap_or_default().trim().to_string()
}

pub fn set_style(el: &Element, property: &str, value: &str) {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.style().set_property(property, value);
    }
}

pub fn set_disabled(el: &Element, disabled: bool) {
    let _ = if disabled {
        el.set_attribute("disabled", "")
    } else {
        el.remove_attribute("disabled")
    };
}

/// Raw value of `<input id=...>`, empty when the input is missing.
pub fn input_value(id: &str) -> String {
    by_id_typed::<HtmlInputElement>(id)
        .map(|input| input.value())
        .unwrap_or_default()
}

pub fn set_input_value(id: &str, value: &str) {
    if let Some(input) = by_id_typed::<HtmlInputElement>(id) {
        input.set_value(value);
    }
}

/// Nearest ancestor (or `el` itself) matching `selector`.
pub fn closest(el: &Element, selector: &str) -> Option<Element> {
    el.closest(selector).ok()?
}

/// Element an event fired on, if it is an element.
pub fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

/// Attach a listener for the page's lifetime.
pub fn on(target: &EventTarget, event: &str, handler: impl FnMut(Event) + 'static) {
    let cb = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    if let Err(err) = target.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref()) {
        warn!(event, "could not attach listener: {err:?}");
    }
    cb.forget();
}

/// Remove every element matching `selector`.
pub fn remove_all(selector: &str) {
    for el in query_all(selector) {
        el.remove();
    }
}

/// `<p class=...>text</p>`, not yet attached.
pub fn paragraph(class: &str, text: &str) -> Option<Element> {
    let p = create_element("p")?;
    add_class(&p, class);
    set_text(&p, text);
    Some(p)
}
