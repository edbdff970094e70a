//! Footer newsletter form, admin login and the portal's artwork ordering.

use crate::api::{self, BrowserClient};
use crate::dom;
use crate::page::page_surface;
use ba_site::{AdminLogin, ArtworkOrder, LoginSurface, Newsletter, NewsletterSurface};
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{Element, KeyboardEvent};

const EMAIL_INPUT: &str = "emailInput";

#[derive(Debug, Clone, Copy, Default)]
pub struct NewsletterView;

impl NewsletterView {
    fn show(&self, message: &str, class: &str) {
        dom::remove_all(".contact_form .error-msg, .contact_form .confirmation-msg");
        let Some(form) = dom::query(".contact_form").or_else(|| dom::query(".footer_navbar")) else {
            return;
        };
        if let Some(p) = dom::paragraph(class, message) {
            let _ = form.append_child(&p);
            p.scroll_into_view();
        }
    }
}

impl NewsletterSurface for NewsletterView {
    fn clear_input(&self) {
        dom::set_input_value(EMAIL_INPUT, "");
    }

    fn show_error(&self, message: &str) {
        self.show(message, "error-msg");
    }

    fn show_confirmation(&self, message: &str) {
        self.show(message, "confirmation-msg");
    }
}

pub fn mount_newsletter(base: &str) {
    let Some(input) = dom::by_id(EMAIL_INPUT) else { return };
    let form = Rc::new(Newsletter::new(api::client(base), NewsletterView));

    let submit = {
        let form = form.clone();
        move || {
            let form = form.clone();
            let email = dom::input_value(EMAIL_INPUT);
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = form.subscribe(email.trim()).await {
                    debug!("newsletter: {err}");
                }
            });
        }
    };

    if let Some(button) = dom::query(".contact_form button") {
        let submit = submit.clone();
        dom::on(&button, "click", move |event| {
            event.prevent_default();
            submit();
        });
    }
    dom::on(&input, "keydown", move |event| {
        let enter = event
            .dyn_ref::<KeyboardEvent>()
            .is_some_and(|key| key.key() == "Enter");
        if enter {
            event.prevent_default();
            submit();
        }
    });
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoginView;

page_surface!(LoginView);

impl LoginSurface for LoginView {
    fn show_error(&self) {
        if let Some(el) = dom::by_id("error-message") {
            dom::set_style(&el, "display", "block");
        }
    }
}

pub fn mount_login(base: &str) {
    let Some(form_el) = dom::by_id("login-form") else { return };
    let login = Rc::new(AdminLogin::new(api::client(base), LoginView));
    dom::on(&form_el, "submit", move |event| {
        event.prevent_default();
        let login = login.clone();
        let username = dom::input_value("username");
        let password = dom::input_value("password");
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = login.login(&username, &password).await {
                debug!("login: {err}");
            }
        });
    });
}

fn artwork_items(container: &Element) -> Vec<Element> {
    dom::query_all_within(container, ".artwork-item")
}

fn artwork_title(item: &Element) -> String {
    item.get_attribute("data-title")
        .unwrap_or_else(|| dom::text(item))
}

fn item_index(container: &Element, item: &Element) -> Option<usize> {
    artwork_items(container).iter().position(|el| el == item)
}

fn drop_target(event: &web_sys::Event) -> Option<Element> {
    dom::event_element(event).filter(|el| dom::has_class(el, "artwork-item"))
}

/// Portal drag-and-drop. The dragged tile is inserted before the tile it is
/// dropped on; `#saveArtworkOrder` posts the new order.
pub fn mount_reorder(base: &str) {
    let Some(container) = dom::by_id("artworkContainer") else { return };
    let titles = artwork_items(&container).iter().map(artwork_title).collect();
    let order = Rc::new(RefCell::new(ArtworkOrder::new(titles)));
    let dragged: Rc<RefCell<Option<Element>>> = Rc::new(RefCell::new(None));

    {
        let (order, dragged, root) = (order.clone(), dragged.clone(), container.clone());
        dom::on(&container, "dragstart", move |event| {
            let Some(item) = dom::event_element(&event).and_then(|el| dom::closest(&el, ".artwork-item"))
            else {
                return;
            };
            if let Some(index) = item_index(&root, &item) {
                order.borrow_mut().drag_start(index);
            }
            *dragged.borrow_mut() = Some(item.clone());
            Timeout::new(0, move || dom::set_style(&item, "display", "none")).forget();
        });
    }
    {
        let (order, dragged) = (order.clone(), dragged.clone());
        dom::on(&container, "dragend", move |_| {
            order.borrow_mut().drag_end();
            if let Some(item) = dragged.borrow_mut().take() {
                Timeout::new(0, move || dom::set_style(&item, "display", "block")).forget();
            }
        });
    }
    dom::on(&container, "dragover", |event| event.prevent_default());
    dom::on(&container, "dragenter", |event| {
        event.prevent_default();
        if let Some(target) = drop_target(&event) {
            dom::set_style(&target, "border", "2px dashed #ccc");
        }
    });
    dom::on(&container, "dragleave", |event| {
        if let Some(target) = drop_target(&event) {
            dom::set_style(&target, "border", "none");
        }
    });
    {
        let (order, dragged, root) = (order.clone(), dragged.clone(), container.clone());
        dom::on(&container, "drop", move |event| {
            let Some(target) = drop_target(&event) else { return };
            dom::set_style(&target, "border", "none");
            let Some(index) = item_index(&root, &target) else { return };
            if !order.borrow_mut().drop_on(index) {
                return;
            }
            if let Some(item) = dragged.borrow().as_ref() {
                let before: &web_sys::Node = &target;
                if let Err(err) = root.insert_before(item, Some(before)) {
                    warn!("moving artwork tile failed: {err:?}");
                }
            }
        });
    }

    if let Some(save) = dom::by_id("saveArtworkOrder") {
        let client: Rc<BrowserClient> = Rc::new(api::client(base));
        dom::on(&save, "click", move |_| {
            let snapshot = order.borrow().clone();
            let client = client.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match snapshot.save(client.as_ref()).await {
                    Ok(()) => info!(count = snapshot.titles().len(), "artwork order saved"),
                    Err(err) => warn!("saving artwork order failed: {err}"),
                }
            });
        });
    }
}
