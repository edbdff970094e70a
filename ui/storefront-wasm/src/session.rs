//! Session countdown and tab lifecycle.

use crate::api::{self, BrowserClient};
use crate::cart_view::BrowserCart;
use crate::dom;
use crate::page::{self, page_surface};
use ba_cart::{SessionTimer, TimerSurface};
use gloo_timers::callback::Interval;
use js_sys::{Array, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{PageTransitionEvent, VisibilityState};

const TIMER_ID: &str = "timer";
const TICK_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct TimerView;

page_surface!(TimerView);

impl TimerSurface for TimerView {
    fn show_remaining(&self, text: &str) {
        if let Some(el) = dom::by_id(TIMER_ID) {
            dom::set_text(&el, text);
        }
    }
}

type BrowserTimer = SessionTimer<BrowserClient, TimerView>;

/// The running one-second interval; dropping it stops the countdown.
type Ticker = Rc<RefCell<Option<Interval>>>;

fn start_ticking(timer: &Rc<BrowserTimer>, ticker: &Ticker) {
    let (t, slot) = (timer.clone(), ticker.clone());
    let interval = Interval::new(TICK_MS, move || {
        let (t, slot) = (t.clone(), slot.clone());
        wasm_bindgen_futures::spawn_local(async move {
            if !t.tick().await {
                slot.borrow_mut().take();
            }
        });
    });
    *ticker.borrow_mut() = Some(interval);
}

async fn resync(timer: &Rc<BrowserTimer>, ticker: &Ticker) {
    match timer.sync().await {
        Ok(seconds) => {
            debug!(seconds, "session clock synced");
            if ticker.borrow().is_none() {
                start_ticking(timer, ticker);
            }
        }
        Err(err) => warn!("reading session time failed: {err}"),
    }
}

/// Countdown on pages with `#timer`. When the tab comes back into view the
/// countdown restarts from the server clock and the cart is re-read.
pub fn mount(base: &str, cart: Option<Rc<BrowserCart>>) {
    if dom::by_id(TIMER_ID).is_none() {
        return;
    }
    let timer = Rc::new(SessionTimer::new(api::client(base), TimerView));
    let ticker: Ticker = Rc::new(RefCell::new(None));

    {
        let (timer, ticker) = (timer.clone(), ticker.clone());
        wasm_bindgen_futures::spawn_local(async move { resync(&timer, &ticker).await });
    }

    let Some(document) = dom::document() else { return };
    let doc = document.clone();
    dom::on(&document, "visibilitychange", move |_| {
        if doc.visibility_state() != VisibilityState::Visible {
            return;
        }
        let (timer, ticker, cart) = (timer.clone(), ticker.clone(), cart.clone());
        wasm_bindgen_futures::spawn_local(async move {
            resync(&timer, &ticker).await;
            if let Some(cart) = cart {
                if let Err(err) = cart.refresh().await {
                    debug!("cart refresh after tab switch: {err}");
                }
            }
        });
    });
    info!("session countdown mounted");
}

fn came_back(event: &web_sys::Event) -> bool {
    let persisted = event
        .dyn_ref::<PageTransitionEvent>()
        .is_some_and(|e| e.persisted());
    persisted || navigation_type().as_deref() == Some("back_forward")
}

fn navigation_type() -> Option<String> {
    let performance = dom::window()?.performance()?;
    let entries: Array = performance.get_entries_by_type("navigation");
    let entry: JsValue = entries.get(0);
    Reflect::get(&entry, &JsValue::from_str("type")).ok()?.as_string()
}

/// Pages restored from the back-forward cache show stale quantities;
/// rebuild them from the session instead.
pub fn reload_on_back_navigation() {
    let Some(window) = dom::window() else { return };
    dom::on(&window, "pageshow", |event| {
        if came_back(&event) {
            info!("restored from history, reloading");
            page::reload();
        }
    });
}
