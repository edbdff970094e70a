//! Stripe.js binding and the payment page.
//!
//! The page loads `https://js.stripe.com/v3/` itself; `Stripe` is resolved
//! from the global scope when the page mounts.

use crate::api::{self, BrowserClient};
use crate::dom;
use async_trait::async_trait;
use ba_api_types::PaymentIntentStatus;
use ba_checkout::{PaymentBridge, PaymentConfig, PaymentProvider, PaymentSurface, ProviderError};
use gloo_timers::callback::Timeout;
use js_sys::{Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    type StripeJs;

    #[wasm_bindgen(catch, js_name = Stripe)]
    fn stripe(publishable_key: &str) -> Result<StripeJs, JsValue>;

    #[wasm_bindgen(method)]
    fn elements(this: &StripeJs, options: &JsValue) -> StripeElements;

    #[wasm_bindgen(method, js_name = confirmPayment)]
    fn confirm_payment(this: &StripeJs, options: &JsValue) -> Promise;

    #[wasm_bindgen(method, js_name = retrievePaymentIntent)]
    fn retrieve_payment_intent(this: &StripeJs, client_secret: &str) -> Promise;

    type StripeElements;

    #[wasm_bindgen(method)]
    fn create(this: &StripeElements, kind: &str, options: &JsValue) -> StripeElement;

    type StripeElement;

    #[wasm_bindgen(method)]
    fn mount(this: &StripeElement, selector: &str);

    #[wasm_bindgen(method)]
    fn on(this: &StripeElement, event: &str, handler: &Function);
}

const PAYMENT_SLOT: &str = "#payment-element";
const SHIPPING_SLOT: &str = "#shipping-element";
const MESSAGE_IDS: [&str; 2] = ["payment-message", "shipping-message"];

fn js_options(value: &serde_json::Value) -> Result<JsValue, ProviderError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| ProviderError::new("integration_error", err.to_string()))
}

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

/// `{ error: { type, message } }` as returned by the SDK's promises.
fn sdk_error(result: &JsValue) -> Option<ProviderError> {
    let error = get(result, "error");
    if error.is_undefined() || error.is_null() {
        return None;
    }
    Some(ProviderError::new(
        get(&error, "type").as_string().unwrap_or_default(),
        get(&error, "message").as_string().unwrap_or_default(),
    ))
}

fn rejected(err: JsValue) -> ProviderError {
    ProviderError::new("api_error", format!("{err:?}"))
}

pub struct StripeProvider {
    stripe: StripeJs,
    elements: RefCell<Option<StripeElements>>,
}

impl StripeProvider {
    pub fn new(publishable_key: &str) -> Result<Self, ProviderError> {
        let stripe = stripe(publishable_key).map_err(rejected)?;
        Ok(Self {
            stripe,
            elements: RefCell::new(None),
        })
    }
}

#[async_trait(?Send)]
impl PaymentProvider for StripeProvider {
    async fn mount(&self, client_secret: &str) -> Result<(), ProviderError> {
        let options = js_options(&json!({
            "appearance": { "theme": "stripe" },
            "clientSecret": client_secret,
        }))?;
        let elements = self.stripe.elements(&options);

        let payment = elements.create("payment", &js_options(&json!({ "layout": "tabs" }))?);
        let address = elements.create(
            "address",
            &js_options(&json!({ "mode": "shipping", "fields": { "phone": "always" } }))?,
        );

        let remaining = Rc::new(Cell::new(2u8));
        let ready = Promise::new(&mut |resolve, _reject| {
            for element in [&payment, &address] {
                let remaining = remaining.clone();
                let resolve = resolve.clone();
                let cb = Closure::wrap(Box::new(move || {
                    remaining.set(remaining.get().saturating_sub(1));
                    if remaining.get() == 0 {
                        let _ = resolve.call0(&JsValue::NULL);
                    }
                }) as Box<dyn FnMut()>);
                element.on("ready", cb.as_ref().unchecked_ref());
                cb.forget();
            }
        });

        payment.mount(PAYMENT_SLOT);
        address.mount(SHIPPING_SLOT);
        *self.elements.borrow_mut() = Some(elements);

        JsFuture::from(ready).await.map_err(rejected)?;
        Ok(())
    }

    async fn confirm(&self, return_url: &str) -> Result<(), ProviderError> {
        let options = Object::new();
        {
            let elements = self.elements.borrow();
            let Some(elements) = elements.as_ref() else {
                return Err(ProviderError::new("integration_error", "payment form not mounted"));
            };
            let params = js_options(&json!({ "return_url": return_url }))?;
            Reflect::set(&options, &JsValue::from_str("elements"), elements).map_err(rejected)?;
            Reflect::set(&options, &JsValue::from_str("confirmParams"), &params).map_err(rejected)?;
        }

        let result = JsFuture::from(self.stripe.confirm_payment(&options))
            .await
            .map_err(rejected)?;
        match sdk_error(&result) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn retrieve_status(
        &self,
        client_secret: &str,
    ) -> Result<PaymentIntentStatus, ProviderError> {
        let result = JsFuture::from(self.stripe.retrieve_payment_intent(client_secret))
            .await
            .map_err(rejected)?;
        if let Some(err) = sdk_error(&result) {
            return Err(err);
        }
        let status = get(&get(&result, "paymentIntent"), "status")
            .as_string()
            .unwrap_or_default();
        Ok(PaymentIntentStatus::parse(&status))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentView;

impl PaymentSurface for PaymentView {
    fn set_loading(&self, loading: bool) {
        if let Some(submit) = dom::by_id("submit") {
            dom::set_disabled(&submit, loading);
        }
        if let Some(spinner) = dom::by_id("spinner") {
            dom::toggle_class(&spinner, "hidden", !loading);
        }
        if let Some(label) = dom::by_id("button-text") {
            dom::toggle_class(&label, "hidden", loading);
        }
    }

    fn show_submit(&self) {
        if let Some(submit) = dom::query(".submit-payment") {
            dom::add_class(&submit, "show");
        }
    }

    fn show_message(&self, text: &str, hide_after: Duration) {
        for id in MESSAGE_IDS {
            let Some(el) = dom::by_id(id) else { continue };
            dom::remove_class(&el, "hidden");
            dom::set_text(&el, text);
            let millis = u32::try_from(hide_after.as_millis()).unwrap_or(u32::MAX);
            Timeout::new(millis, move || {
                dom::add_class(&el, "hidden");
                dom::set_text(&el, "");
            })
            .forget();
        }
    }
}

pub type BrowserPayment = PaymentBridge<BrowserClient, StripeProvider, PaymentView>;

/// Payment page: mount the hosted form, wire the pay button and report the
/// status when Stripe redirects back here.
pub fn mount(base: &str, config: PaymentConfig) -> Option<Rc<BrowserPayment>> {
    dom::by_id("payment-form")?;
    let mut config = config;
    if config.return_base.is_empty() {
        config.return_base = dom::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
    }
    let provider = match StripeProvider::new(&config.publishable_key) {
        Ok(provider) => provider,
        Err(err) => {
            warn!("Stripe.js unavailable: {err}");
            return None;
        }
    };
    let bridge = Rc::new(PaymentBridge::new(
        api::client(base),
        provider,
        PaymentView,
        config,
    ));

    if let Some(form) = dom::by_id("payment-form") {
        let bridge = bridge.clone();
        dom::on(&form, "submit", move |event| {
            event.prevent_default();
            let bridge = bridge.clone();
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = bridge.submit().await {
                    warn!("payment not confirmed: {err}");
                }
            });
        });
    }

    let started = bridge.clone();
    wasm_bindgen_futures::spawn_local(async move {
        if started.initialize().await.is_err() {
            return;
        }
        if let Err(err) = started.sync_amount().await {
            warn!("payment amount not refreshed: {err}");
        }
        let query = dom::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        match started.check_status(&query).await {
            Ok(Some(status)) => info!(?status, "returned from payment provider"),
            Ok(None) => {}
            Err(err) => warn!("payment status lookup failed: {err}"),
        }
    });
    info!("payment page mounted");
    Some(bridge)
}
