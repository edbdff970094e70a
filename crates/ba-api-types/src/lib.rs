use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Notice the storefront returns in place of a count when the cart is full.
pub const MAX_ITEMS_NOTICE: &str = "Max items in cart reached";

/// Money amount in cents.
///
/// The server is loose about prices: line prices come back as integers,
/// totals as floats, and the page renders them with a leading `$`. All of
/// those parse into the same value here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub fn from_major(amount: f64) -> Self {
        Self((amount * 100.0).round() as i64)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * i64::from(quantity))
    }

    /// Parse page text such as `$225`, `225.00` or ` $1,350.50 `.
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned: String = text
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        let amount: f64 = cleaned.trim().parse().ok()?;
        amount.is_finite().then(|| Self::from_major(amount))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, Add::add)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_major())
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(dollars) => dollars
                .checked_mul(100)
                .map(Price::from_cents)
                .ok_or_else(|| serde::de::Error::custom(format!("price out of range: {dollars}"))),
            Raw::Float(amount) => Ok(Price::from_major(amount)),
            Raw::Text(text) => Price::parse(&text)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid price: {text:?}"))),
        }
    }
}

/// Session-stored counts come back either as numbers or numeric strings.
fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(count) => Ok(count),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid count: {text:?}"))),
    }
}

// ── Cart ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddToCartRequest {
    pub title: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartQuantityResponse {
    #[serde(deserialize_with = "de_count")]
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CartQuantity {
    Count(u32),
    Notice(String),
}

impl CartQuantity {
    pub fn is_max_items(&self) -> bool {
        matches!(self, CartQuantity::Notice(text) if text == MAX_ITEMS_NOTICE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddToCartResponse {
    pub quantity: CartQuantity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinePriceResponse {
    pub price: Price,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalPriceRequest {
    #[serde(rename = "totalPrice")]
    pub total_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotalPriceResponse {
    #[serde(rename = "totalPrice", default)]
    pub total_price: Option<Price>,
}

// ── Checkout ──

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub card_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingInfo {
    pub fullname: String,
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub ship_fullname: String,
    pub ship_address1: String,
    #[serde(default)]
    pub ship_address2: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_zip: String,
}

impl ShippingInfo {
    /// View the shipping fields through the billing shape, which is what the
    /// shipping validation endpoint accepts.
    pub fn as_address(&self) -> BillingInfo {
        BillingInfo {
            fullname: self.ship_fullname.clone(),
            address1: self.ship_address1.clone(),
            address2: self.ship_address2.clone(),
            city: self.ship_city.clone(),
            state: self.ship_state.clone(),
            zip: self.ship_zip.clone(),
        }
    }
}

/// Body of `/purchase` and the legacy `/process_payment`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutPayload {
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(flatten)]
    pub payment: PaymentInfo,
    #[serde(flatten)]
    pub billing: BillingInfo,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub title: String,
    #[serde(deserialize_with = "de_count")]
    pub quantity: u32,
    pub price: Price,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderContentsResponse {
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(rename = "totalPrice", default)]
    pub total_price: Option<Price>,
}

impl OrderContentsResponse {
    /// The server's total, or the sum of the line prices when it sent none.
    pub fn total(&self) -> Price {
        self.total_price
            .unwrap_or_else(|| self.items.iter().map(|line| line.price).sum())
    }
}

// ── Session ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionIdResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTimeResponse {
    pub remaining_time: u64,
}

// ── Payment provider ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSecretResponse {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifyPaymentIntentRequest {
    #[serde(rename = "totalPrice")]
    pub total_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Succeeded,
    Processing,
    RequiresPaymentMethod,
    #[serde(other)]
    Unknown,
}

impl PaymentIntentStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            _ => Self::Unknown,
        }
    }
}

// ── Site ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtworkOrderRequest {
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Where a successful admin login lands. The server tells the two apart by
/// status code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginDestination {
    Logs,
    Portal,
}

impl LoginDestination {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            201 => Some(Self::Logs),
            200 => Some(Self::Portal),
            _ => None,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Logs => "/logs",
            Self::Portal => "/brig_portal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_accepts_every_server_shape() {
        let from_int: LinePriceResponse = serde_json::from_str(r#"{"price": 225}"#).unwrap();
        let from_float: LinePriceResponse = serde_json::from_str(r#"{"price": 225.5}"#).unwrap();
        let from_text: LinePriceResponse = serde_json::from_str(r#"{"price": "$1,350"}"#).unwrap();

        assert_eq!(from_int.price, Price::from_dollars(225));
        assert_eq!(from_float.price, Price::from_cents(22_550));
        assert_eq!(from_text.price, Price::from_dollars(1350));
    }

    #[test]
    fn oversized_integer_price_is_a_decode_error() {
        let result: Result<LinePriceResponse, _> =
            serde_json::from_str(r#"{"price": 9223372036854775807}"#);
        let err = result.expect_err("price should overflow");
        assert!(err.to_string().contains("price out of range"));
    }

    #[test]
    fn price_parse_rejects_garbage() {
        assert_eq!(Price::parse("abc"), None);
        assert_eq!(Price::parse(""), None);
        assert_eq!(Price::parse(" $900.00 "), Some(Price::from_dollars(900)));
    }

    #[test]
    fn price_display_has_two_decimals() {
        assert_eq!(Price::from_dollars(900).to_string(), "900.00");
        assert_eq!(Price::from_cents(105).to_string(), "1.05");
    }

    #[test]
    fn total_price_serializes_with_server_field_name() {
        let body = serde_json::to_value(TotalPriceRequest {
            total_price: Price::from_dollars(675),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "totalPrice": 675 }));
    }

    #[test]
    fn add_to_cart_response_recognises_full_cart_notice() {
        let full: AddToCartResponse =
            serde_json::from_str(r#"{"quantity": "Max items in cart reached"}"#).unwrap();
        let counted: AddToCartResponse = serde_json::from_str(r#"{"quantity": 4}"#).unwrap();

        assert!(full.quantity.is_max_items());
        assert_eq!(counted.quantity, CartQuantity::Count(4));
    }

    #[test]
    fn checkout_payload_omits_shipping_when_same_as_billing() {
        let payload = CheckoutPayload {
            contact: ContactInfo {
                email: "a@b.co".into(),
                phone: "555".into(),
            },
            ..CheckoutPayload::default()
        };
        let body = serde_json::to_value(&payload).unwrap();

        assert_eq!(body["email"], "a@b.co");
        assert_eq!(body["cardName"], "");
        assert!(body.get("shipFullname").is_none());
    }

    #[test]
    fn checkout_payload_flattens_shipping_fields() {
        let payload = CheckoutPayload {
            shipping: Some(ShippingInfo {
                ship_fullname: "Ada".into(),
                ship_zip: "94110".into(),
                ..ShippingInfo::default()
            }),
            ..CheckoutPayload::default()
        };
        let body = serde_json::to_value(&payload).unwrap();

        assert_eq!(body["shipFullname"], "Ada");
        assert_eq!(body["shipZip"], "94110");
    }

    #[test]
    fn order_lines_accept_string_quantities() {
        let contents: OrderContentsResponse = serde_json::from_str(
            r#"{"items": [{"title": "Sunset", "quantity": "3", "price": 675}]}"#,
        )
        .unwrap();
        assert_eq!(contents.items[0].quantity, 3);
        assert_eq!(contents.total_price, None);
        assert_eq!(contents.total(), Price::from_dollars(675));
    }

    #[test]
    fn login_destination_follows_status_code() {
        assert_eq!(LoginDestination::from_status(201), Some(LoginDestination::Logs));
        assert_eq!(LoginDestination::from_status(200), Some(LoginDestination::Portal));
        assert_eq!(LoginDestination::from_status(401), None);
    }

    #[test]
    fn unknown_intent_status_falls_through() {
        let status: PaymentIntentStatus = serde_json::from_str(r#""canceled""#).unwrap();
        assert_eq!(status, PaymentIntentStatus::Unknown);
        assert_eq!(
            PaymentIntentStatus::parse("requires_payment_method"),
            PaymentIntentStatus::RequiresPaymentMethod
        );
    }
}
