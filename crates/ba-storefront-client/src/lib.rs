//! Storefront API client.
//!
//! `Transport` is the seam between typed endpoint calls and whatever moves
//! bytes (browser `fetch`, `reqwest`, a test double). `StorefrontApi` is the
//! typed surface the cart and checkout logic is written against;
//! `StorefrontClient` implements it over any transport.

mod memory;

pub use memory::InMemoryStorefront;

use async_trait::async_trait;
use ba_api_types::{
    AddToCartRequest, AddToCartResponse, ArtworkOrderRequest, BillingInfo, CartQuantityResponse,
    CheckoutPayload, ClientSecretResponse, ContactInfo, CredentialsRequest, LinePriceResponse,
    LoginDestination, MessageResponse, ModifyPaymentIntentRequest, OrderContentsResponse,
    PaymentInfo, Price, SessionIdResponse, SessionTimeResponse, SubscribeRequest, TitleRequest,
    TotalPriceRequest, TotalPriceResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// 4xx answers mean the server looked at the request and refused it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if (400..500).contains(status))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one JSON request to the storefront and hands back status + body.
/// Non-2xx statuses are not errors at this level.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<RawResponse, ApiError>;
}

pub type ApiResult<T> = Result<T, ApiError>;

#[async_trait(?Send)]
pub trait StorefrontApi {
    async fn cart_quantity(&self) -> ApiResult<u32>;
    async fn add_to_cart(&self, request: &AddToCartRequest) -> ApiResult<AddToCartResponse>;
    async fn increase_quantity(&self, title: &str) -> ApiResult<LinePriceResponse>;
    async fn decrease_quantity(&self, title: &str) -> ApiResult<LinePriceResponse>;
    async fn delete_item(&self, title: &str) -> ApiResult<MessageResponse>;
    async fn post_total_price(&self, total: Price) -> ApiResult<TotalPriceResponse>;

    /// `Ok(false)` when the server refuses the fields (4xx).
    async fn validate_contact_info(&self, contact: &ContactInfo) -> ApiResult<bool>;
    async fn validate_payment_info(&self, payment: &PaymentInfo) -> ApiResult<bool>;
    async fn validate_shipping_info(&self, address: &BillingInfo) -> ApiResult<bool>;
    async fn purchase(&self, payload: &CheckoutPayload) -> ApiResult<()>;
    async fn process_payment(&self, payload: &CheckoutPayload) -> ApiResult<serde_json::Value>;
    async fn order_contents(&self) -> ApiResult<OrderContentsResponse>;

    async fn session_id(&self) -> ApiResult<String>;
    async fn session_time(&self) -> ApiResult<u64>;
    async fn delete_session(&self) -> ApiResult<()>;

    async fn create_payment_intent(&self) -> ApiResult<ClientSecretResponse>;
    async fn modify_payment_intent(
        &self,
        request: &ModifyPaymentIntentRequest,
    ) -> ApiResult<ClientSecretResponse>;

    async fn subscribe(&self, request: &SubscribeRequest) -> ApiResult<MessageResponse>;
    async fn update_artwork_order(&self, request: &ArtworkOrderRequest)
    -> ApiResult<MessageResponse>;
    /// `None` when the credentials were refused.
    async fn credentials_check(
        &self,
        request: &CredentialsRequest,
    ) -> ApiResult<Option<LoginDestination>>;
}

/// Typed storefront client over any [`Transport`].
pub struct StorefrontClient<T> {
    transport: T,
}

impl<T: Transport> StorefrontClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<RawResponse> {
        let body = body.map(serde_json::to_string).transpose()?;
        debug!(method = method.as_str(), path, "storefront request");
        self.transport.send(method, path, body).await
    }

    async fn json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<R> {
        let response = ok_or_status(self.call(method, path, body).await?)?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Like `json`, but an empty or `null` body decodes to `R::default()`.
    async fn json_or_default<B: Serialize, R: DeserializeOwned + Default>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<R> {
        let response = ok_or_status(self.call(method, path, body).await?)?;
        let text = response.body.trim();
        if text.is_empty() || text == "null" {
            return Ok(R::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    async fn accepted<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<bool> {
        let response = self.call(Method::Post, path, Some(body)).await?;
        if response.is_success() {
            return Ok(true);
        }
        let err = status_error(response);
        if err.is_rejection() {
            debug!(path, "server refused fields: {err}");
            Ok(false)
        } else {
            Err(err)
        }
    }
}

fn ok_or_status(response: RawResponse) -> ApiResult<RawResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(status_error(response))
    }
}

fn status_error(response: RawResponse) -> ApiError {
    ApiError::Status {
        status: response.status,
        body: response.body,
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait(?Send)]
impl<T: Transport> StorefrontApi for StorefrontClient<T> {
    async fn cart_quantity(&self) -> ApiResult<u32> {
        let response: CartQuantityResponse =
            self.json(Method::Get, "/get_cart_quantity", NO_BODY).await?;
        Ok(response.quantity)
    }

    async fn add_to_cart(&self, request: &AddToCartRequest) -> ApiResult<AddToCartResponse> {
        self.json(Method::Post, "/shop_art", Some(request)).await
    }

    async fn increase_quantity(&self, title: &str) -> ApiResult<LinePriceResponse> {
        let body = TitleRequest {
            title: title.to_owned(),
        };
        self.json(Method::Post, "/increase_quantity", Some(&body)).await
    }

    async fn decrease_quantity(&self, title: &str) -> ApiResult<LinePriceResponse> {
        let body = TitleRequest {
            title: title.to_owned(),
        };
        self.json(Method::Post, "/decrease_quantity", Some(&body)).await
    }

    async fn delete_item(&self, title: &str) -> ApiResult<MessageResponse> {
        let body = TitleRequest {
            title: title.to_owned(),
        };
        self.json_or_default(Method::Post, "/delete_item", Some(&body))
            .await
    }

    async fn post_total_price(&self, total: Price) -> ApiResult<TotalPriceResponse> {
        let body = TotalPriceRequest { total_price: total };
        self.json(Method::Post, "/post_total_price", Some(&body)).await
    }

    async fn validate_contact_info(&self, contact: &ContactInfo) -> ApiResult<bool> {
        self.accepted("/validate_contact_info", contact).await
    }

    async fn validate_payment_info(&self, payment: &PaymentInfo) -> ApiResult<bool> {
        self.accepted("/validate_payment_info", payment).await
    }

    async fn validate_shipping_info(&self, address: &BillingInfo) -> ApiResult<bool> {
        self.accepted("/validate_shipping_info", address).await
    }

    async fn purchase(&self, payload: &CheckoutPayload) -> ApiResult<()> {
        ok_or_status(self.call(Method::Post, "/purchase", Some(payload)).await?)?;
        Ok(())
    }

    async fn process_payment(&self, payload: &CheckoutPayload) -> ApiResult<serde_json::Value> {
        self.json_or_default(Method::Post, "/process_payment", Some(payload))
            .await
    }

    async fn order_contents(&self) -> ApiResult<OrderContentsResponse> {
        self.json_or_default(Method::Get, "/get_order_contents", NO_BODY)
            .await
    }

    async fn session_id(&self) -> ApiResult<String> {
        let response: SessionIdResponse =
            self.json(Method::Get, "/get_session_id", NO_BODY).await?;
        Ok(response.session_id)
    }

    async fn session_time(&self) -> ApiResult<u64> {
        let response: SessionTimeResponse =
            self.json(Method::Get, "/get_session_time", NO_BODY).await?;
        Ok(response.remaining_time)
    }

    async fn delete_session(&self) -> ApiResult<()> {
        ok_or_status(self.call(Method::Post, "/delete_session", NO_BODY).await?)?;
        Ok(())
    }

    async fn create_payment_intent(&self) -> ApiResult<ClientSecretResponse> {
        self.json(Method::Post, "/create-payment-intent", NO_BODY)
            .await
    }

    async fn modify_payment_intent(
        &self,
        request: &ModifyPaymentIntentRequest,
    ) -> ApiResult<ClientSecretResponse> {
        self.json(Method::Post, "/modify-payment-intent", Some(request))
            .await
    }

    async fn subscribe(&self, request: &SubscribeRequest) -> ApiResult<MessageResponse> {
        self.json_or_default(Method::Post, "/subscribe", Some(request))
            .await
    }

    async fn update_artwork_order(
        &self,
        request: &ArtworkOrderRequest,
    ) -> ApiResult<MessageResponse> {
        self.json_or_default(Method::Post, "/update_artwork_order", Some(request))
            .await
    }

    async fn credentials_check(
        &self,
        request: &CredentialsRequest,
    ) -> ApiResult<Option<LoginDestination>> {
        let response = self
            .call(Method::Post, "/credentials_check", Some(request))
            .await?;
        Ok(LoginDestination::from_status(response.status))
    }
}
