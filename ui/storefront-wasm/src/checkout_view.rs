//! Collapsible checkout sections.

use crate::api::{self, BrowserClient};
use crate::dom;
use crate::page::page_surface;
use ba_api_types::{BillingInfo, ContactInfo, PaymentInfo, ShippingInfo};
use ba_cart::PageLock;
use ba_checkout::{
    Advance, CheckoutConfig, CheckoutForm, CheckoutSequencer, SectionId, SectionSurface,
};
use std::rc::Rc;
use tracing::{debug, info};
use web_sys::{Element, HtmlInputElement};

pub type BrowserCheckout = CheckoutSequencer<BrowserClient, CheckoutView>;

const SAME_AS_SHIPPING_ID: &str = "sameAsShipping";

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutView;

page_surface!(CheckoutView);

fn section(section: SectionId) -> Option<Element> {
    dom::by_id(section.dom_id())
}

fn header(section_el: &Element) -> Option<Element> {
    dom::query_within(section_el, ".collapsible-header")
}

/// Walk up from `el` to the checkout section that contains it.
fn owning_section(el: &Element) -> Option<SectionId> {
    let mut current = Some(el.clone());
    while let Some(node) = current {
        if let Some(section) = SectionId::from_dom_id(&node.id()) {
            return Some(section);
        }
        current = node.parent_element();
    }
    None
}

impl SectionSurface for CheckoutView {
    fn read_form(&self) -> CheckoutForm {
        let v = dom::input_value;
        CheckoutForm {
            contact: ContactInfo {
                email: v("email"),
                phone: v("phone"),
            },
            payment: PaymentInfo {
                card_name: v("card-name"),
                card_number: v("card-number"),
                expiry_date: v("expiry"),
                cvv: v("cvv"),
            },
            billing: BillingInfo {
                fullname: v("fullname"),
                address1: v("address1"),
                address2: v("address2"),
                city: v("city"),
                state: v("state"),
                zip: v("zip"),
            },
            shipping: ShippingInfo {
                ship_fullname: v("shipFullname"),
                ship_address1: v("shipAddress1"),
                ship_address2: v("shipAddress2"),
                ship_city: v("shipCity"),
                ship_state: v("shipState"),
                ship_zip: v("shipZip"),
            },
        }
    }

    fn set_open(&self, id: SectionId, open: bool) {
        let Some(el) = section(id) else { return };
        dom::toggle_class(&el, "open", open);
        if let Some(arrow) = header(&el).and_then(|h| dom::query_within(&h, ".arrow")) {
            let turn = if open { "rotate(180deg)" } else { "rotate(0deg)" };
            dom::set_style(&arrow, "transform", turn);
        }
    }

    fn unlock_header(&self, id: SectionId) {
        let Some(h) = section(id).as_ref().and_then(header) else { return };
        dom::remove_class(&h, "disabled");
        dom::set_style(&h, "font-weight", "bold");
    }

    fn set_inputs_disabled(&self, id: SectionId, disabled: bool) {
        let Some(el) = section(id) else { return };
        for control in dom::query_all_within(&el, "input, button.continue-btn") {
            dom::set_disabled(&control, disabled);
        }
    }

    fn remove_continue(&self, id: SectionId) {
        if let Some(button) = section(id).and_then(|el| dom::query_within(&el, ".continue-btn")) {
            button.remove();
        }
    }

    fn set_continue_label(&self, id: SectionId, label: &str) {
        if let Some(button) = section(id).and_then(|el| dom::query_within(&el, ".continue-btn")) {
            dom::set_text(&button, label);
        }
    }

    fn mark_same_as_shipping(&self, checked: bool) {
        if let Some(checkbox) = dom::by_id_typed::<HtmlInputElement>(SAME_AS_SHIPPING_ID) {
            checkbox.set_checked(checked);
        }
        if let Some(el) = section(SectionId::Shipping) {
            dom::toggle_class(&el, "show", checked);
        }
    }

    fn show_masked_card(&self, number: &str, cvv: &str) {
        dom::set_input_value("card-number", number);
        dom::set_input_value("cvv", cvv);
    }

    fn show_section_error(&self, id: SectionId, message: &str) {
        self.clear_section_error();
        let content = section(id).and_then(|el| dom::query_within(&el, ".collapsible-content"));
        if let (Some(content), Some(p)) = (content, dom::paragraph("error-message", message)) {
            let _ = content.append_child(&p);
        }
    }

    fn clear_section_error(&self) {
        dom::remove_all(".error-message");
    }
}

/// Checkout page. `None` when the page has no contact section.
pub fn mount(base: &str, lock: Rc<PageLock>, config: CheckoutConfig) -> Option<Rc<BrowserCheckout>> {
    section(SectionId::Contact)?;
    let sequencer = Rc::new(CheckoutSequencer::new(
        api::client(base),
        CheckoutView,
        lock,
        config,
    ));
    sequencer.start();

    for h in dom::query_all(".collapsible-header") {
        let sequencer = sequencer.clone();
        let id = owning_section(&h);
        dom::on(&h, "click", move |_| {
            if let Some(id) = id {
                sequencer.toggle_header(id);
            }
        });
    }

    if let Some(checkbox) = dom::by_id_typed::<HtmlInputElement>(SAME_AS_SHIPPING_ID) {
        let sequencer = sequencer.clone();
        let target = checkbox.clone();
        dom::on(&checkbox, "change", move |_| {
            sequencer.set_same_as_shipping(target.checked());
        });
    }

    for button in dom::query_all(".continue-btn") {
        let Some(current) = owning_section(&button) else { continue };
        let next = button
            .get_attribute("data-next")
            .and_then(|id| SectionId::from_dom_id(&id))
            .or_else(|| current.next());
        let Some(next) = next else { continue };
        let sequencer = sequencer.clone();
        dom::on(&button, "click", move |event| {
            event.prevent_default();
            let sequencer = sequencer.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match sequencer.advance(current, next).await {
                    Ok(Advance::Purchased(path)) => info!(%path, "order placed"),
                    Ok(outcome) => debug!(%current, ?outcome, "continue"),
                    Err(err) => debug!(%current, "continue refused: {err}"),
                }
            });
        });
    }

    info!("checkout mounted");
    Some(sequencer)
}
