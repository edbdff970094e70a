//! Hosted payment form bridge.
//!
//! The provider SDK owns the card and address widgets; this module only
//! fetches the client secret, tells the SDK to mount and confirm, and turns
//! the SDK's answers into page messages.

use async_trait::async_trait;
use ba_api_types::{ModifyPaymentIntentRequest, PaymentIntentStatus, Price};
use ba_storefront_client::{ApiError, StorefrontApi};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SUCCEEDED_MESSAGE: &str = "Payment succeeded!";
pub const PROCESSING_MESSAGE: &str = "Your payment is processing.";
pub const DECLINED_MESSAGE: &str = "Your payment was not successful, please try again.";
pub const UNKNOWN_STATUS_MESSAGE: &str = "Something went wrong.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

const CLIENT_SECRET_PARAM: &str = "payment_intent_client_secret";

/// Error object handed back by the provider SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Card and validation errors carry a message meant for the shopper.
    pub fn shopper_message(&self) -> &str {
        match self.kind.as_str() {
            "card_error" | "validation_error" => &self.message,
            _ => UNEXPECTED_ERROR_MESSAGE,
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[async_trait(?Send)]
pub trait PaymentProvider {
    /// Mount the payment and address widgets; resolves once both are ready.
    async fn mount(&self, client_secret: &str) -> Result<(), ProviderError>;
    /// Confirm the payment. On success the SDK leaves the page for
    /// `return_url`, so `Ok` is rarely observed.
    async fn confirm(&self, return_url: &str) -> Result<(), ProviderError>;
    async fn retrieve_status(&self, client_secret: &str)
    -> Result<PaymentIntentStatus, ProviderError>;
}

pub trait PaymentSurface {
    fn set_loading(&self, loading: bool);
    fn show_submit(&self);
    /// Show `text` in the payment and shipping message boxes, hiding both
    /// again after `hide_after`.
    fn show_message(&self, text: &str, hide_after: Duration);
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub publishable_key: String,
    /// Origin the provider sends the shopper back to. Empty means the
    /// page's own origin.
    pub return_base: String,
    pub message_hide_after_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            publishable_key: String::new(),
            return_base: String::new(),
            message_hide_after_ms: 4000,
        }
    }
}

impl PaymentConfig {
    pub fn return_url(&self, session_id: &str) -> String {
        format!(
            "{}/confirmation/{session_id}",
            self.return_base.trim_end_matches('/')
        )
    }

    fn hide_after(&self) -> Duration {
        Duration::from_millis(self.message_hide_after_ms)
    }
}

pub fn status_message(status: &PaymentIntentStatus) -> &'static str {
    match status {
        PaymentIntentStatus::Succeeded => SUCCEEDED_MESSAGE,
        PaymentIntentStatus::Processing => PROCESSING_MESSAGE,
        PaymentIntentStatus::RequiresPaymentMethod => DECLINED_MESSAGE,
        PaymentIntentStatus::Unknown => UNKNOWN_STATUS_MESSAGE,
    }
}

/// Value of `payment_intent_client_secret` in a `?a=b&c=d` query string.
pub fn client_secret_from_query(query: &str) -> Option<&str> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == CLIENT_SECRET_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

pub struct PaymentBridge<A, P, S> {
    api: A,
    provider: P,
    surface: S,
    config: PaymentConfig,
    client_secret: RefCell<Option<String>>,
    amount: Cell<Option<Price>>,
}

impl<A, P, S> PaymentBridge<A, P, S>
where
    A: StorefrontApi,
    P: PaymentProvider,
    S: PaymentSurface,
{
    pub fn new(api: A, provider: P, surface: S, config: PaymentConfig) -> Self {
        Self {
            api,
            provider,
            surface,
            config,
            client_secret: RefCell::new(None),
            amount: Cell::new(None),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn client_secret(&self) -> Option<String> {
        self.client_secret.borrow().clone()
    }

    /// Create the payment intent and mount the widgets. The submit control
    /// appears only once both widgets are ready.
    pub async fn initialize(&self) -> Result<(), PaymentError> {
        self.surface.set_loading(true);
        let result = self.mount().await;
        self.surface.set_loading(false);
        if let Err(err) = &result {
            warn!("payment form failed to initialize: {err}");
        }
        result
    }

    async fn mount(&self) -> Result<(), PaymentError> {
        let secret = self.api.create_payment_intent().await?.client_secret;
        self.provider.mount(&secret).await?;
        *self.client_secret.borrow_mut() = Some(secret);
        self.surface.show_submit();
        info!("payment form mounted");
        Ok(())
    }

    /// Pay button. Provider errors are shown and returned.
    pub async fn submit(&self) -> Result<(), PaymentError> {
        self.surface.set_loading(true);
        let session_id = match self.api.session_id().await {
            Ok(session_id) => session_id,
            Err(err) => {
                self.surface.set_loading(false);
                return Err(err.into());
            }
        };

        let return_url = self.config.return_url(&session_id);
        debug!(%return_url, "confirming payment");
        let result = self.provider.confirm(&return_url).await;
        if let Err(err) = &result {
            warn!("payment confirmation failed: {err}");
            self.surface
                .show_message(err.shopper_message(), self.config.hide_after());
        }
        self.surface.set_loading(false);
        Ok(result?)
    }

    /// After the provider redirects back: report the intent's status if the
    /// query carries a client secret.
    pub async fn check_status(
        &self,
        query: &str,
    ) -> Result<Option<PaymentIntentStatus>, PaymentError> {
        let Some(secret) = client_secret_from_query(query) else {
            return Ok(None);
        };
        let status = self.provider.retrieve_status(secret).await?;
        info!(?status, "payment intent status");
        self.surface
            .show_message(status_message(&status), self.config.hide_after());
        Ok(Some(status))
    }

    /// Keep the intent's amount in step with a reconciled cart total.
    /// Returns whether the intent was updated.
    pub async fn refresh_amount(&self, total: Price) -> Result<bool, PaymentError> {
        if self.amount.get() == Some(total) {
            return Ok(false);
        }
        let response = self
            .api
            .modify_payment_intent(&ModifyPaymentIntentRequest { total_price: total })
            .await?;
        self.amount.set(Some(total));
        *self.client_secret.borrow_mut() = Some(response.client_secret);
        Ok(true)
    }

    /// Bring the intent in line with the session's current order total.
    pub async fn sync_amount(&self) -> Result<bool, PaymentError> {
        let total = self.api.order_contents().await?.total();
        debug!(%total, "order total for payment intent");
        self.refresh_amount(total).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_storefront_client::InMemoryStorefront;

    #[derive(Default)]
    struct FakeProvider {
        mounted: RefCell<Option<String>>,
        confirm_error: Option<ProviderError>,
        confirmed_with: RefCell<Option<String>>,
        status: Option<PaymentIntentStatus>,
    }

    #[async_trait(?Send)]
    impl PaymentProvider for FakeProvider {
        async fn mount(&self, client_secret: &str) -> Result<(), ProviderError> {
            *self.mounted.borrow_mut() = Some(client_secret.to_owned());
            Ok(())
        }

        async fn confirm(&self, return_url: &str) -> Result<(), ProviderError> {
            *self.confirmed_with.borrow_mut() = Some(return_url.to_owned());
            match &self.confirm_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        async fn retrieve_status(
            &self,
            _client_secret: &str,
        ) -> Result<PaymentIntentStatus, ProviderError> {
            self.status
                .clone()
                .ok_or_else(|| ProviderError::new("api_error", "no intent"))
        }
    }

    #[derive(Default)]
    struct Checkout {
        loading: RefCell<Vec<bool>>,
        submit_shown: Cell<bool>,
        messages: RefCell<Vec<(String, Duration)>>,
    }

    impl PaymentSurface for Checkout {
        fn set_loading(&self, loading: bool) {
            self.loading.borrow_mut().push(loading);
        }

        fn show_submit(&self) {
            self.submit_shown.set(true);
        }

        fn show_message(&self, text: &str, hide_after: Duration) {
            self.messages.borrow_mut().push((text.to_owned(), hide_after));
        }
    }

    fn bridge(provider: FakeProvider) -> PaymentBridge<InMemoryStorefront, FakeProvider, Checkout> {
        let store = InMemoryStorefront::new().with_line("Sunset", 2, Price::from_dollars(225));
        let config = PaymentConfig {
            return_base: "https://brigart.example/".into(),
            ..PaymentConfig::default()
        };
        PaymentBridge::new(store, provider, Checkout::default(), config)
    }

    #[tokio::test]
    async fn initialize_mounts_with_fresh_secret() -> anyhow::Result<()> {
        let bridge = bridge(FakeProvider::default());

        bridge.initialize().await?;

        assert_eq!(
            bridge.provider().mounted.borrow().as_deref(),
            Some("pi_45000_secret_memory")
        );
        assert!(bridge.surface().submit_shown.get());
        assert_eq!(*bridge.surface().loading.borrow(), vec![true, false]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_intent_leaves_submit_hidden() {
        let bridge = bridge(FakeProvider::default());
        bridge.api().fail("/create-payment-intent", 500);

        assert!(matches!(
            bridge.initialize().await,
            Err(PaymentError::Api(_))
        ));
        assert!(!bridge.surface().submit_shown.get());
        assert_eq!(*bridge.surface().loading.borrow(), vec![true, false]);
    }

    #[tokio::test]
    async fn submit_returns_to_confirmation_for_session() -> anyhow::Result<()> {
        let bridge = bridge(FakeProvider::default());

        bridge.submit().await?;

        assert_eq!(
            bridge.provider().confirmed_with.borrow().as_deref(),
            Some("https://brigart.example/confirmation/session-1")
        );
        assert!(bridge.surface().messages.borrow().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn card_errors_show_provider_message() {
        let bridge = bridge(FakeProvider {
            confirm_error: Some(ProviderError::new("card_error", "Your card was declined.")),
            ..FakeProvider::default()
        });

        assert!(bridge.submit().await.is_err());
        assert_eq!(
            bridge.surface().messages.borrow()[0],
            ("Your card was declined.".to_owned(), Duration::from_secs(4))
        );
    }

    #[tokio::test]
    async fn other_errors_show_generic_message() {
        let bridge = bridge(FakeProvider {
            confirm_error: Some(ProviderError::new("api_connection_error", "socket closed")),
            ..FakeProvider::default()
        });

        assert!(bridge.submit().await.is_err());
        assert_eq!(
            bridge.surface().messages.borrow()[0].0,
            UNEXPECTED_ERROR_MESSAGE
        );
    }

    #[tokio::test]
    async fn status_on_return_maps_to_message() -> anyhow::Result<()> {
        let bridge = bridge(FakeProvider {
            status: Some(PaymentIntentStatus::RequiresPaymentMethod),
            ..FakeProvider::default()
        });

        assert_eq!(bridge.check_status("?redirect_status=failed").await?, None);
        let status = bridge
            .check_status("?payment_intent=pi_1&payment_intent_client_secret=pi_1_secret_x")
            .await?;

        assert_eq!(status, Some(PaymentIntentStatus::RequiresPaymentMethod));
        assert_eq!(bridge.surface().messages.borrow()[0].0, DECLINED_MESSAGE);
        Ok(())
    }

    #[tokio::test]
    async fn amount_refresh_skips_unchanged_totals() -> anyhow::Result<()> {
        let bridge = bridge(FakeProvider::default());

        assert!(bridge.refresh_amount(Price::from_dollars(450)).await?);
        assert!(!bridge.refresh_amount(Price::from_dollars(450)).await?);
        assert!(bridge.refresh_amount(Price::from_dollars(675)).await?);

        assert_eq!(
            bridge.api().payment_intent_total(),
            Some(Price::from_dollars(675))
        );
        assert_eq!(bridge.client_secret().as_deref(), Some("pi_67500_secret_memory"));
        Ok(())
    }

    #[tokio::test]
    async fn amount_follows_session_order_total() -> anyhow::Result<()> {
        let bridge = bridge(FakeProvider::default());
        bridge.initialize().await?;

        assert!(bridge.sync_amount().await?);
        assert_eq!(
            bridge.api().payment_intent_total(),
            Some(Price::from_dollars(450))
        );
        assert!(!bridge.sync_amount().await?);

        bridge.api().increase_quantity("Sunset").await?;
        assert!(bridge.sync_amount().await?);
        assert_eq!(
            bridge.api().payment_intent_total(),
            Some(Price::from_dollars(675))
        );
        assert!(bridge.api().called("/modify-payment-intent"));
        Ok(())
    }

    #[test]
    fn every_status_has_a_message() {
        assert_eq!(status_message(&PaymentIntentStatus::Succeeded), SUCCEEDED_MESSAGE);
        assert_eq!(status_message(&PaymentIntentStatus::Processing), PROCESSING_MESSAGE);
        assert_eq!(status_message(&PaymentIntentStatus::Unknown), UNKNOWN_STATUS_MESSAGE);
    }
}
