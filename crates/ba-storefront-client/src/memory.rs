use async_trait::async_trait;
use ba_api_types::{
    AddToCartRequest, AddToCartResponse, ArtworkOrderRequest, BillingInfo, CartQuantity,
    CheckoutPayload, ClientSecretResponse, ContactInfo, CredentialsRequest, LinePriceResponse,
    LoginDestination, MAX_ITEMS_NOTICE, MessageResponse, ModifyPaymentIntentRequest, OrderContentsResponse,
    OrderLine, PaymentInfo, Price, SubscribeRequest, TotalPriceResponse,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::{ApiError, ApiResult, StorefrontApi};

const MAX_DISTINCT_LINES: usize = 20;

#[derive(Debug, Clone)]
struct StoredLine {
    title: String,
    quantity: u32,
    unit_price: Price,
}

#[derive(Debug, Default)]
struct State {
    lines: Vec<StoredLine>,
    catalog: HashMap<String, Price>,
    calls: Vec<String>,
    failing: HashMap<String, u16>,
    unreachable: HashSet<String>,
    session_id: String,
    remaining_time: u64,
    session_deleted: bool,
    purchases: Vec<CheckoutPayload>,
    subscribers: Vec<String>,
    artwork_order: Vec<String>,
    admins: Vec<(String, String, LoginDestination)>,
    payment_intent_total: Option<Price>,
}

/// Session-backed storefront kept in memory.
///
/// Behaves like the real server for the cart and checkout endpoints (line
/// prices are unit price × quantity, validation requires the same fields) and
/// records every endpoint it is asked for, so callers can assert which round
/// trips happened.
#[derive(Debug, Default)]
pub struct InMemoryStorefront {
    state: RefCell<State>,
}

impl InMemoryStorefront {
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.borrow_mut();
            state.session_id = "session-1".to_owned();
            state.remaining_time = 900;
        }
        store
    }

    pub fn with_artwork(self, title: &str, unit_price: Price) -> Self {
        self.state
            .borrow_mut()
            .catalog
            .insert(title.to_owned(), unit_price);
        self
    }

    /// Seed a cart line as if it had been added in an earlier request.
    pub fn with_line(self, title: &str, quantity: u32, unit_price: Price) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.catalog.insert(title.to_owned(), unit_price);
            state.lines.push(StoredLine {
                title: title.to_owned(),
                quantity,
                unit_price,
            });
        }
        self
    }

    pub fn with_admin(self, username: &str, password: &str, destination: LoginDestination) -> Self {
        self.state.borrow_mut().admins.push((
            username.to_owned(),
            password.to_owned(),
            destination,
        ));
        self
    }

    pub fn with_remaining_time(self, seconds: u64) -> Self {
        self.state.borrow_mut().remaining_time = seconds;
        self
    }

    /// Make `path` answer with `status` until cleared.
    pub fn fail(&self, path: &str, status: u16) {
        self.state
            .borrow_mut()
            .failing
            .insert(path.to_owned(), status);
    }

    /// Make `path` fail at the transport level until cleared.
    pub fn disconnect(&self, path: &str) {
        self.state.borrow_mut().unreachable.insert(path.to_owned());
    }

    pub fn heal(&self) {
        let mut state = self.state.borrow_mut();
        state.failing.clear();
        state.unreachable.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn called(&self, path: &str) -> bool {
        self.state.borrow().calls.iter().any(|call| call == path)
    }

    pub fn line_quantity(&self, title: &str) -> Option<u32> {
        self.state
            .borrow()
            .lines
            .iter()
            .find(|line| line.title == title)
            .map(|line| line.quantity)
    }

    pub fn total_quantity(&self) -> u32 {
        self.state.borrow().lines.iter().map(|line| line.quantity).sum()
    }

    pub fn total_price(&self) -> Price {
        self.state
            .borrow()
            .lines
            .iter()
            .map(|line| line.unit_price.times(line.quantity))
            .sum()
    }

    pub fn purchases(&self) -> Vec<CheckoutPayload> {
        self.state.borrow().purchases.clone()
    }

    pub fn subscribers(&self) -> Vec<String> {
        self.state.borrow().subscribers.clone()
    }

    pub fn artwork_order(&self) -> Vec<String> {
        self.state.borrow().artwork_order.clone()
    }

    pub fn session_deleted(&self) -> bool {
        self.state.borrow().session_deleted
    }

    pub fn payment_intent_total(&self) -> Option<Price> {
        self.state.borrow().payment_intent_total
    }

    fn enter(&self, path: &str) -> ApiResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(path.to_owned());
        if state.unreachable.contains(path) {
            return Err(ApiError::Transport(format!("{path}: connection reset")));
        }
        if let Some(status) = state.failing.get(path) {
            return Err(ApiError::Status {
                status: *status,
                body: r#"{"detail": "Internal server error"}"#.to_owned(),
            });
        }
        Ok(())
    }

    /// Validation endpoints answer a refused request with `false`.
    fn screen(&self, path: &str) -> ApiResult<bool> {
        match self.enter(path) {
            Ok(()) => Ok(true),
            Err(err) if err.is_rejection() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn line_price(&self, title: &str, delta: i64) -> ApiResult<LinePriceResponse> {
        let mut state = self.state.borrow_mut();
        let index = state
            .lines
            .iter()
            .position(|line| line.title == title)
            .ok_or_else(|| not_found(title))?;
        let line = &mut state.lines[index];
        line.quantity = (i64::from(line.quantity) + delta).max(0) as u32;
        let price = line.unit_price.times(line.quantity);
        if line.quantity == 0 {
            state.lines.remove(index);
        }
        Ok(LinePriceResponse { price })
    }
}

fn not_found(title: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        body: format!(r#"{{"detail": "{title} is not in the cart"}}"#),
    }
}

fn refused(detail: &str) -> ApiResult<bool> {
    tracing::debug!("in-memory storefront refused: {detail}");
    Ok(false)
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[async_trait(?Send)]
impl StorefrontApi for InMemoryStorefront {
    async fn cart_quantity(&self) -> ApiResult<u32> {
        self.enter("/get_cart_quantity")?;
        Ok(self.total_quantity())
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> ApiResult<AddToCartResponse> {
        self.enter("/shop_art")?;
        let mut state = self.state.borrow_mut();
        let unit_price = state
            .catalog
            .get(&request.title)
            .copied()
            .ok_or_else(|| not_found(&request.title))?;

        if let Some(line) = state.lines.iter_mut().find(|line| line.title == request.title) {
            line.quantity += request.quantity;
        } else if state.lines.len() >= MAX_DISTINCT_LINES {
            return Ok(AddToCartResponse {
                quantity: CartQuantity::Notice(MAX_ITEMS_NOTICE.to_owned()),
            });
        } else {
            state.lines.push(StoredLine {
                title: request.title.clone(),
                quantity: request.quantity,
                unit_price,
            });
        }

        let total = state.lines.iter().map(|line| line.quantity).sum();
        Ok(AddToCartResponse {
            quantity: CartQuantity::Count(total),
        })
    }

    async fn increase_quantity(&self, title: &str) -> ApiResult<LinePriceResponse> {
        self.enter("/increase_quantity")?;
        self.line_price(title, 1)
    }

    async fn decrease_quantity(&self, title: &str) -> ApiResult<LinePriceResponse> {
        self.enter("/decrease_quantity")?;
        self.line_price(title, -1)
    }

    async fn delete_item(&self, title: &str) -> ApiResult<MessageResponse> {
        self.enter("/delete_item")?;
        let mut state = self.state.borrow_mut();
        let before = state.lines.len();
        state.lines.retain(|line| line.title != title);
        if state.lines.len() == before {
            return Err(not_found(title));
        }
        Ok(MessageResponse {
            message: "Item removed from cart".to_owned(),
        })
    }

    async fn post_total_price(&self, total: Price) -> ApiResult<TotalPriceResponse> {
        self.enter("/post_total_price")?;
        let server_total = self.total_price();
        if server_total != total {
            tracing::debug!(%total, %server_total, "client total disagrees with session");
        }
        Ok(TotalPriceResponse {
            total_price: Some(server_total),
        })
    }

    async fn validate_contact_info(&self, contact: &ContactInfo) -> ApiResult<bool> {
        if !self.screen("/validate_contact_info")? {
            return Ok(false);
        }
        if blank(&contact.email) || blank(&contact.phone) {
            return refused("Email or phone number not provided");
        }
        Ok(true)
    }

    async fn validate_payment_info(&self, payment: &PaymentInfo) -> ApiResult<bool> {
        if !self.screen("/validate_payment_info")? {
            return Ok(false);
        }
        if [
            &payment.card_name,
            &payment.card_number,
            &payment.expiry_date,
            &payment.cvv,
        ]
        .iter()
        .any(|field| blank(field))
        {
            return refused("Payment information not provided");
        }
        Ok(true)
    }

    async fn validate_shipping_info(&self, address: &BillingInfo) -> ApiResult<bool> {
        if !self.screen("/validate_shipping_info")? {
            return Ok(false);
        }
        if [
            &address.fullname,
            &address.address1,
            &address.city,
            &address.state,
            &address.zip,
        ]
        .iter()
        .any(|field| blank(field))
        {
            return refused("Billing information not provided");
        }
        Ok(true)
    }

    async fn purchase(&self, payload: &CheckoutPayload) -> ApiResult<()> {
        self.enter("/purchase")?;
        self.state.borrow_mut().purchases.push(payload.clone());
        Ok(())
    }

    async fn process_payment(&self, payload: &CheckoutPayload) -> ApiResult<serde_json::Value> {
        self.enter("/process_payment")?;
        self.state.borrow_mut().purchases.push(payload.clone());
        Ok(serde_json::json!({ "message": "Payment processed" }))
    }

    async fn order_contents(&self) -> ApiResult<OrderContentsResponse> {
        self.enter("/get_order_contents")?;
        let items = self
            .state
            .borrow()
            .lines
            .iter()
            .map(|line| OrderLine {
                title: line.title.clone(),
                quantity: line.quantity,
                price: line.unit_price.times(line.quantity),
            })
            .collect();
        Ok(OrderContentsResponse {
            items,
            total_price: Some(self.total_price()),
        })
    }

    async fn session_id(&self) -> ApiResult<String> {
        self.enter("/get_session_id")?;
        Ok(self.state.borrow().session_id.clone())
    }

    async fn session_time(&self) -> ApiResult<u64> {
        self.enter("/get_session_time")?;
        Ok(self.state.borrow().remaining_time)
    }

    async fn delete_session(&self) -> ApiResult<()> {
        self.enter("/delete_session")?;
        let mut state = self.state.borrow_mut();
        state.session_deleted = true;
        state.lines.clear();
        Ok(())
    }

    async fn create_payment_intent(&self) -> ApiResult<ClientSecretResponse> {
        self.enter("/create-payment-intent")?;
        let total = self.total_price();
        self.state.borrow_mut().payment_intent_total = Some(total);
        Ok(ClientSecretResponse {
            client_secret: format!("pi_{}_secret_memory", total.cents()),
        })
    }

    async fn modify_payment_intent(
        &self,
        request: &ModifyPaymentIntentRequest,
    ) -> ApiResult<ClientSecretResponse> {
        self.enter("/modify-payment-intent")?;
        self.state.borrow_mut().payment_intent_total = Some(request.total_price);
        Ok(ClientSecretResponse {
            client_secret: format!("pi_{}_secret_memory", request.total_price.cents()),
        })
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> ApiResult<MessageResponse> {
        self.enter("/subscribe")?;
        let mut state = self.state.borrow_mut();
        let message = if state.subscribers.contains(&request.email) {
            "Email already subscribed"
        } else {
            state.subscribers.push(request.email.clone());
            "Email subscribed successfully"
        };
        Ok(MessageResponse {
            message: message.to_owned(),
        })
    }

    async fn update_artwork_order(
        &self,
        request: &ArtworkOrderRequest,
    ) -> ApiResult<MessageResponse> {
        self.enter("/update_artwork_order")?;
        self.state.borrow_mut().artwork_order = request.titles.clone();
        Ok(MessageResponse {
            message: "Artwork order updated".to_owned(),
        })
    }

    async fn credentials_check(
        &self,
        request: &CredentialsRequest,
    ) -> ApiResult<Option<LoginDestination>> {
        self.enter("/credentials_check")?;
        Ok(self
            .state
            .borrow()
            .admins
            .iter()
            .find(|(user, pass, _)| *user == request.username && *pass == request.password)
            .map(|(_, _, destination)| *destination))
    }
}
