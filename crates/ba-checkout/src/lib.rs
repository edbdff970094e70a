//! Checkout page: the section sequencer and the hosted-payment bridge.

pub mod payment;
mod sections;

pub use payment::{
    PaymentBridge, PaymentConfig, PaymentError, PaymentProvider, PaymentSurface, ProviderError,
};
pub use sections::{
    Advance, CheckoutForm, CheckoutSequencer, SectionId, SectionState, SectionSurface, SectionView,
    mask_card_number, mask_cvv, order_summary,
};

use ba_storefront_client::ApiError;
use serde::Deserialize;
use thiserror::Error;

pub const INVALID_FIELDS_MESSAGE: &str = "Please enter a valid email and phone number.";
pub const VALIDATION_ERROR_MESSAGE: &str = "An error occurred while validating. Please try again.";
pub const PURCHASE_ERROR_MESSAGE: &str =
    "An error occurred while processing your purchase. Please try again.";
pub const PURCHASE_LABEL: &str = "Purchase";
pub const CONTINUE_LABEL: &str = "Continue";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("another checkout operation is in progress")]
    Busy,
    #[error("cannot move from {current} to {next}")]
    OutOfOrder { current: SectionId, next: SectionId },
    #[error("{0} has not been validated")]
    NotReady(SectionId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Endpoint that takes the finished order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseRoute {
    /// `/purchase`, then the confirmation page.
    #[default]
    Purchase,
    /// Older `/process_payment`, then the home page.
    ProcessPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub purchase_route: PurchaseRoute,
    /// Append the session id to the confirmation path.
    pub confirmation_with_session: bool,
    /// Mask the card number and CVV once payment details validate.
    pub mask_card: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            purchase_route: PurchaseRoute::default(),
            confirmation_with_session: false,
            mask_card: true,
        }
    }
}
