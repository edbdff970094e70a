use crate::api;
use crate::dom;
use ba_api_types::OrderContentsResponse;
use ba_checkout::order_summary;
use tracing::warn;

const SUMMARY_ID: &str = "order-summary";

fn render(order: &OrderContentsResponse) {
    let Some(list) = dom::by_id(SUMMARY_ID) else { return };
    list.set_inner_html("");
    for line in &order.items {
        let Some(item) = dom::create_element("li") else { continue };
        dom::set_text(
            &item,
            &format!("{} x{}: ${}", line.title, line.quantity, line.price),
        );
        let _ = list.append_child(&item);
    }
    if let (Some(total), Some(el)) = (order.total_price, dom::by_id("order-total")) {
        dom::set_text(&el, &format!("${total}"));
    }
}

/// Confirmation page: list what was bought.
pub fn mount(base: &str) {
    if dom::by_id(SUMMARY_ID).is_none() {
        return;
    }
    let client = api::client(base);
    wasm_bindgen_futures::spawn_local(async move {
        match order_summary(&client).await {
            Ok(order) => render(&order),
            Err(err) => warn!("loading order contents failed: {err}"),
        }
    });
}
