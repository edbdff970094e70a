use ba_api_types::{
    BillingInfo, CheckoutPayload, ContactInfo, OrderContentsResponse, PaymentInfo, ShippingInfo,
};
use ba_cart::{LockGuard, LockSurface, Navigator, PageLock};
use ba_storefront_client::StorefrontApi;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{info, warn};

use crate::{
    CONTINUE_LABEL, CheckoutConfig, CheckoutError, INVALID_FIELDS_MESSAGE, PURCHASE_ERROR_MESSAGE,
    PURCHASE_LABEL, PurchaseRoute, VALIDATION_ERROR_MESSAGE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionId {
    Contact,
    Payment,
    Billing,
    Shipping,
    Submit,
}

impl SectionId {
    pub const FORM_SECTIONS: [SectionId; 4] = [
        SectionId::Contact,
        SectionId::Payment,
        SectionId::Billing,
        SectionId::Shipping,
    ];

    pub fn dom_id(self) -> &'static str {
        match self {
            SectionId::Contact => "contactInfoSection",
            SectionId::Payment => "paymentInfoSection",
            SectionId::Billing => "billingAddressSection",
            SectionId::Shipping => "shippingAddressSection",
            SectionId::Submit => "SubmitButton",
        }
    }

    pub fn from_dom_id(id: &str) -> Option<Self> {
        Self::FORM_SECTIONS
            .into_iter()
            .chain([SectionId::Submit])
            .find(|section| section.dom_id() == id)
    }

    pub fn next(self) -> Option<SectionId> {
        match self {
            SectionId::Contact => Some(SectionId::Payment),
            SectionId::Payment => Some(SectionId::Billing),
            SectionId::Billing => Some(SectionId::Shipping),
            SectionId::Shipping => Some(SectionId::Submit),
            SectionId::Submit => None,
        }
    }

    fn slot(self) -> Option<usize> {
        match self {
            SectionId::Contact => Some(0),
            SectionId::Payment => Some(1),
            SectionId::Billing => Some(2),
            SectionId::Shipping => Some(3),
            SectionId::Submit => None,
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Collapsed,
    Open,
    /// Header locked; the section has not been reached yet.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionView {
    pub state: SectionState,
    /// Validated and left behind. Inputs stay disabled.
    pub completed: bool,
}

impl SectionView {
    const LOCKED: SectionView = SectionView {
        state: SectionState::Disabled,
        completed: false,
    };
}

/// Raw field values as typed on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub contact: ContactInfo,
    pub payment: PaymentInfo,
    pub billing: BillingInfo,
    pub shipping: ShippingInfo,
}

impl CheckoutForm {
    fn trimmed(mut self) -> Self {
        for field in [
            &mut self.contact.email,
            &mut self.contact.phone,
            &mut self.payment.card_name,
            &mut self.payment.card_number,
            &mut self.payment.expiry_date,
            &mut self.payment.cvv,
            &mut self.billing.fullname,
            &mut self.billing.address1,
            &mut self.billing.address2,
            &mut self.billing.city,
            &mut self.billing.state,
            &mut self.billing.zip,
            &mut self.shipping.ship_fullname,
            &mut self.shipping.ship_address1,
            &mut self.shipping.ship_address2,
            &mut self.shipping.ship_city,
            &mut self.shipping.ship_state,
            &mut self.shipping.ship_zip,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_owned();
            }
        }
        self
    }
}

fn any_blank(fields: &[&String]) -> bool {
    fields.iter().any(|field| field.is_empty())
}

fn address_incomplete(address: &BillingInfo) -> bool {
    any_blank(&[
        &address.fullname,
        &address.address1,
        &address.city,
        &address.state,
        &address.zip,
    ])
}

/// `************1234`. Short numbers are left alone.
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.trim().chars().collect();
    if digits.len() <= 4 {
        return digits.into_iter().collect();
    }
    let visible: String = digits[digits.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(digits.len() - 4))
}

pub fn mask_cvv(cvv: &str) -> String {
    "*".repeat(cvv.trim().chars().count())
}

pub trait SectionSurface: LockSurface + Navigator {
    fn read_form(&self) -> CheckoutForm;
    /// Expand or collapse a section; the header arrow follows.
    fn set_open(&self, section: SectionId, open: bool);
    fn unlock_header(&self, section: SectionId);
    fn set_inputs_disabled(&self, section: SectionId, disabled: bool);
    fn remove_continue(&self, section: SectionId);
    fn set_continue_label(&self, section: SectionId, label: &str);
    /// Reflect the "same as shipping" box: checkbox state plus the `show`
    /// marker on the shipping section.
    fn mark_same_as_shipping(&self, checked: bool);
    fn show_masked_card(&self, number: &str, cvv: &str);
    /// At most one error is on the page at a time.
    fn show_section_error(&self, section: SectionId, message: &str);
    fn clear_section_error(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Fields refused; the section stays open with its message.
    Invalid,
    Moved(SectionId),
    /// Order placed; holds the path the page was sent to.
    Purchased(String),
}

#[derive(Debug, Default)]
struct Validated {
    contact: Option<ContactInfo>,
    payment: Option<PaymentInfo>,
    billing: Option<BillingInfo>,
    shipping: Option<ShippingInfo>,
}

/// Contact → payment → billing → (shipping) → purchase.
///
/// A section opens only after the one before it passed server validation.
/// Validated values are kept here so the purchase never reads masked
/// display values back off the page.
pub struct CheckoutSequencer<A, S> {
    api: A,
    surface: S,
    lock: Rc<PageLock>,
    config: CheckoutConfig,
    views: RefCell<[SectionView; 4]>,
    validated: RefCell<Validated>,
    same_as_shipping: Cell<bool>,
}

impl<A, S> CheckoutSequencer<A, S>
where
    A: StorefrontApi,
    S: SectionSurface,
{
    pub fn new(api: A, surface: S, lock: Rc<PageLock>, config: CheckoutConfig) -> Self {
        let mut views = [SectionView::LOCKED; 4];
        views[0].state = SectionState::Open;
        Self {
            api,
            surface,
            lock,
            config,
            views: RefCell::new(views),
            validated: RefCell::new(Validated::default()),
            same_as_shipping: Cell::new(false),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Put the page in its initial state: contact open, shipping separate.
    pub fn start(&self) {
        self.surface.set_open(SectionId::Contact, true);
        self.surface.unlock_header(SectionId::Contact);
        self.surface.set_inputs_disabled(SectionId::Contact, false);
        for section in &SectionId::FORM_SECTIONS[1..] {
            self.surface.set_inputs_disabled(*section, true);
        }
        self.set_same_as_shipping(false);
    }

    pub fn view(&self, section: SectionId) -> Option<SectionView> {
        section.slot().map(|slot| self.views.borrow()[slot])
    }

    pub fn same_as_shipping(&self) -> bool {
        self.same_as_shipping.get()
    }

    pub fn set_same_as_shipping(&self, checked: bool) {
        self.same_as_shipping.set(checked);
        self.surface.mark_same_as_shipping(checked);
        let label = if checked { PURCHASE_LABEL } else { CONTINUE_LABEL };
        self.surface.set_continue_label(SectionId::Billing, label);
    }

    /// Header click. Locked sections ignore it unless already open. Returns
    /// whether the section is open afterwards.
    pub fn toggle_header(&self, section: SectionId) -> bool {
        let Some(slot) = section.slot() else {
            return false;
        };
        let mut views = self.views.borrow_mut();
        let view = &mut views[slot];
        view.state = match view.state {
            SectionState::Disabled => return false,
            SectionState::Open => SectionState::Collapsed,
            SectionState::Collapsed => SectionState::Open,
        };
        let open = view.state == SectionState::Open;
        self.surface.set_open(section, open);
        open
    }

    fn hold(&self) -> Result<LockGuard<'_, S>, CheckoutError> {
        let guard = self.lock.acquire(&self.surface).ok_or(CheckoutError::Busy)?;
        guard.busy();
        Ok(guard)
    }

    /// Presence check, then the section's server validation. Missing fields
    /// answer `false` without a request.
    pub async fn validate_section(&self, section: SectionId) -> Result<bool, CheckoutError> {
        let form = self.surface.read_form().trimmed();
        match section {
            SectionId::Contact => {
                let contact = form.contact;
                if any_blank(&[&contact.email, &contact.phone]) {
                    return Ok(false);
                }
                let guard = self.hold()?;
                let accepted = self.api.validate_contact_info(&contact).await?;
                drop(guard);
                if accepted {
                    self.validated.borrow_mut().contact = Some(contact);
                }
                Ok(accepted)
            }
            SectionId::Payment => {
                let payment = form.payment;
                if any_blank(&[
                    &payment.card_name,
                    &payment.card_number,
                    &payment.expiry_date,
                    &payment.cvv,
                ]) {
                    return Ok(false);
                }
                let guard = self.hold()?;
                let accepted = self.api.validate_payment_info(&payment).await?;
                drop(guard);
                if accepted {
                    self.validated.borrow_mut().payment = Some(payment);
                }
                Ok(accepted)
            }
            SectionId::Billing => {
                let billing = form.billing;
                if address_incomplete(&billing) {
                    return Ok(false);
                }
                let guard = self.hold()?;
                let accepted = self.api.validate_shipping_info(&billing).await?;
                drop(guard);
                if accepted {
                    self.validated.borrow_mut().billing = Some(billing);
                }
                Ok(accepted)
            }
            SectionId::Shipping if self.same_as_shipping.get() => Ok(true),
            SectionId::Shipping => {
                let shipping = form.shipping;
                let address = shipping.as_address();
                if address_incomplete(&address) {
                    return Ok(false);
                }
                let guard = self.hold()?;
                let accepted = self.api.validate_shipping_info(&address).await?;
                drop(guard);
                if accepted {
                    self.validated.borrow_mut().shipping = Some(shipping);
                }
                Ok(accepted)
            }
            SectionId::Submit => Ok(true),
        }
    }

    /// Continue button of `current`.
    pub async fn advance(
        &self,
        current: SectionId,
        next: SectionId,
    ) -> Result<Advance, CheckoutError> {
        let out_of_order = CheckoutError::OutOfOrder { current, next };
        if current.next() != Some(next) {
            return Err(out_of_order);
        }
        match self.view(current) {
            Some(view) if view.state != SectionState::Disabled && !view.completed => {}
            _ => return Err(out_of_order),
        }

        let accepted = match self.validate_section(current).await {
            Ok(accepted) => accepted,
            Err(CheckoutError::Api(err)) => {
                warn!(%current, "validation failed: {err}");
                self.surface
                    .show_section_error(current, VALIDATION_ERROR_MESSAGE);
                return Err(err.into());
            }
            Err(err) => return Err(err),
        };
        if !accepted {
            info!(%current, "section refused");
            self.surface.show_section_error(current, INVALID_FIELDS_MESSAGE);
            return Ok(Advance::Invalid);
        }

        self.surface.clear_section_error();
        if current == SectionId::Payment && self.config.mask_card {
            if let Some(payment) = &self.validated.borrow().payment {
                self.surface.show_masked_card(
                    &mask_card_number(&payment.card_number),
                    &mask_cvv(&payment.cvv),
                );
            }
        }

        let purchase_now = next == SectionId::Submit
            || (next == SectionId::Shipping && self.same_as_shipping.get());
        if purchase_now {
            self.complete(current, SectionState::Open);
            let path = self.handle_purchase(current).await?;
            return Ok(Advance::Purchased(path));
        }

        self.complete(current, SectionState::Collapsed);
        self.surface.set_open(current, false);
        self.surface.remove_continue(current);
        self.surface.set_inputs_disabled(current, true);

        if let Some(slot) = next.slot() {
            self.views.borrow_mut()[slot].state = SectionState::Open;
        }
        self.surface.set_open(next, true);
        self.surface.unlock_header(next);
        self.surface.set_inputs_disabled(next, false);
        info!(%current, %next, "checkout advanced");
        Ok(Advance::Moved(next))
    }

    fn complete(&self, section: SectionId, state: SectionState) {
        if let Some(slot) = section.slot() {
            self.views.borrow_mut()[slot] = SectionView {
                state,
                completed: true,
            };
        }
    }

    fn payload(&self) -> Result<CheckoutPayload, CheckoutError> {
        let validated = self.validated.borrow();
        let contact = validated
            .contact
            .clone()
            .ok_or(CheckoutError::NotReady(SectionId::Contact))?;
        let payment = validated
            .payment
            .clone()
            .ok_or(CheckoutError::NotReady(SectionId::Payment))?;
        let billing = validated
            .billing
            .clone()
            .ok_or(CheckoutError::NotReady(SectionId::Billing))?;
        let shipping = if self.same_as_shipping.get() {
            None
        } else {
            Some(
                validated
                    .shipping
                    .clone()
                    .ok_or(CheckoutError::NotReady(SectionId::Shipping))?,
            )
        };
        Ok(CheckoutPayload {
            contact,
            payment,
            billing,
            shipping,
        })
    }

    /// Place the order from the validated sections. Returns the path the
    /// page was sent to.
    pub async fn handle_purchase(&self, section: SectionId) -> Result<String, CheckoutError> {
        let payload = self.payload()?;
        self.surface.set_inputs_disabled(section, true);
        self.surface.set_continue_label(section, PURCHASE_LABEL);

        let guard = self.hold()?;
        let placed = match self.config.purchase_route {
            PurchaseRoute::Purchase => self.api.purchase(&payload).await,
            PurchaseRoute::ProcessPayment => self.api.process_payment(&payload).await.map(drop),
        };
        if let Err(err) = placed {
            drop(guard);
            warn!(%section, "purchase failed: {err}");
            self.surface.show_section_error(section, PURCHASE_ERROR_MESSAGE);
            return Err(err.into());
        }

        let path = self.confirmation_path().await;
        drop(guard);
        info!(path, "purchase placed");
        self.surface.navigate(&path);
        Ok(path)
    }

    async fn confirmation_path(&self) -> String {
        match self.config.purchase_route {
            PurchaseRoute::ProcessPayment => "/".to_owned(),
            PurchaseRoute::Purchase if self.config.confirmation_with_session => {
                match self.api.session_id().await {
                    Ok(session_id) => format!("/confirmation/{session_id}"),
                    Err(err) => {
                        warn!("session id unavailable for confirmation: {err}");
                        "/confirmation".to_owned()
                    }
                }
            }
            PurchaseRoute::Purchase => "/confirmation".to_owned(),
        }
    }
}

/// Lines and total for the confirmation page. The total is filled in from
/// the lines when the server leaves it out.
pub async fn order_summary<A: StorefrontApi>(
    api: &A,
) -> Result<OrderContentsResponse, CheckoutError> {
    let mut order = api.order_contents().await?;
    order.total_price = Some(order.total());
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_api_types::Price;
    use ba_storefront_client::InMemoryStorefront;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Open(SectionId, bool),
        Unlocked(SectionId),
        Inputs(SectionId, bool),
        ContinueRemoved(SectionId),
        Label(SectionId, String),
        SameAsShipping(bool),
        Masked(String, String),
        Error(SectionId, String),
        ClearError,
        Navigate(String),
        Busy(bool),
    }

    #[derive(Default)]
    struct FormPage {
        form: RefCell<CheckoutForm>,
        events: RefCell<Vec<Event>>,
    }

    impl FormPage {
        fn filled() -> Self {
            let page = Self::default();
            *page.form.borrow_mut() = CheckoutForm {
                contact: ContactInfo {
                    email: " ada@example.com ".into(),
                    phone: "555-0100".into(),
                },
                payment: PaymentInfo {
                    card_name: "Ada Lovelace".into(),
                    card_number: "4242424242424242".into(),
                    expiry_date: "12/30".into(),
                    cvv: "123".into(),
                },
                billing: BillingInfo {
                    fullname: "Ada Lovelace".into(),
                    address1: "1 Analytical Way".into(),
                    address2: String::new(),
                    city: "London".into(),
                    state: "LN".into(),
                    zip: "10001".into(),
                },
                shipping: ShippingInfo {
                    ship_fullname: "Charles Babbage".into(),
                    ship_address1: "2 Difference Rd".into(),
                    ship_address2: "Apt 3".into(),
                    ship_city: "London".into(),
                    ship_state: "LN".into(),
                    ship_zip: "10002".into(),
                },
            };
            page
        }

        fn push(&self, event: Event) {
            self.events.borrow_mut().push(event);
        }

        fn saw(&self, event: &Event) -> bool {
            self.events.borrow().contains(event)
        }

        fn navigated(&self) -> Option<String> {
            self.events.borrow().iter().find_map(|e| match e {
                Event::Navigate(path) => Some(path.clone()),
                _ => None,
            })
        }
    }

    impl LockSurface for FormPage {
        fn set_controls_disabled(&self, _disabled: bool) {}

        fn show_busy(&self, busy: bool) {
            self.push(Event::Busy(busy));
        }
    }

    impl Navigator for FormPage {
        fn navigate(&self, path: &str) {
            self.push(Event::Navigate(path.to_owned()));
        }

        fn reload(&self) {}
    }

    impl SectionSurface for FormPage {
        fn read_form(&self) -> CheckoutForm {
            self.form.borrow().clone()
        }

        fn set_open(&self, section: SectionId, open: bool) {
            self.push(Event::Open(section, open));
        }

        fn unlock_header(&self, section: SectionId) {
            self.push(Event::Unlocked(section));
        }

        fn set_inputs_disabled(&self, section: SectionId, disabled: bool) {
            self.push(Event::Inputs(section, disabled));
        }

        fn remove_continue(&self, section: SectionId) {
            self.push(Event::ContinueRemoved(section));
        }

        fn set_continue_label(&self, section: SectionId, label: &str) {
            self.push(Event::Label(section, label.to_owned()));
        }

        fn mark_same_as_shipping(&self, checked: bool) {
            self.push(Event::SameAsShipping(checked));
        }

        fn show_masked_card(&self, number: &str, cvv: &str) {
            self.push(Event::Masked(number.to_owned(), cvv.to_owned()));
            let mut form = self.form.borrow_mut();
            form.payment.card_number = number.to_owned();
            form.payment.cvv = cvv.to_owned();
        }

        fn show_section_error(&self, section: SectionId, message: &str) {
            self.push(Event::Error(section, message.to_owned()));
        }

        fn clear_section_error(&self) {
            self.push(Event::ClearError);
        }
    }

    fn sequencer(
        store: InMemoryStorefront,
        page: FormPage,
        config: CheckoutConfig,
    ) -> CheckoutSequencer<InMemoryStorefront, FormPage> {
        let sequencer = CheckoutSequencer::new(store, page, Rc::new(PageLock::new()), config);
        sequencer.start();
        sequencer
    }

    async fn through_billing(
        checkout: &CheckoutSequencer<InMemoryStorefront, FormPage>,
    ) -> Result<Advance, CheckoutError> {
        checkout.advance(SectionId::Contact, SectionId::Payment).await?;
        checkout.advance(SectionId::Payment, SectionId::Billing).await?;
        checkout.advance(SectionId::Billing, SectionId::Shipping).await
    }

    #[tokio::test]
    async fn empty_phone_fails_without_a_request() -> anyhow::Result<()> {
        let page = FormPage::filled();
        page.form.borrow_mut().contact.phone = "   ".into();
        let checkout = sequencer(InMemoryStorefront::new(), page, CheckoutConfig::default());

        assert!(!checkout.validate_section(SectionId::Contact).await?);
        assert!(checkout.api().calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn refused_contact_keeps_payment_locked() -> anyhow::Result<()> {
        let store = InMemoryStorefront::new();
        store.fail("/validate_contact_info", 400);
        let checkout = sequencer(store, FormPage::filled(), CheckoutConfig::default());

        let outcome = checkout
            .advance(SectionId::Contact, SectionId::Payment)
            .await?;

        assert_eq!(outcome, Advance::Invalid);
        assert!(checkout.surface().saw(&Event::Error(
            SectionId::Contact,
            INVALID_FIELDS_MESSAGE.into()
        )));
        assert_eq!(
            checkout.view(SectionId::Payment).map(|v| v.state),
            Some(SectionState::Disabled)
        );
        assert!(matches!(
            checkout.advance(SectionId::Payment, SectionId::Billing).await,
            Err(CheckoutError::OutOfOrder { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn server_fault_shows_generic_validation_error() {
        let store = InMemoryStorefront::new();
        store.fail("/validate_contact_info", 500);
        let checkout = sequencer(store, FormPage::filled(), CheckoutConfig::default());

        assert!(matches!(
            checkout.advance(SectionId::Contact, SectionId::Payment).await,
            Err(CheckoutError::Api(_))
        ));
        assert!(checkout.surface().saw(&Event::Error(
            SectionId::Contact,
            VALIDATION_ERROR_MESSAGE.into()
        )));
        assert!(!checkout.surface().saw(&Event::Unlocked(SectionId::Payment)));
    }

    #[tokio::test]
    async fn advancing_collapses_current_and_opens_next() -> anyhow::Result<()> {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );

        let outcome = checkout
            .advance(SectionId::Contact, SectionId::Payment)
            .await?;

        assert_eq!(outcome, Advance::Moved(SectionId::Payment));
        let page = checkout.surface();
        assert!(page.saw(&Event::Open(SectionId::Contact, false)));
        assert!(page.saw(&Event::ContinueRemoved(SectionId::Contact)));
        assert!(page.saw(&Event::Inputs(SectionId::Contact, true)));
        assert!(page.saw(&Event::Open(SectionId::Payment, true)));
        assert!(page.saw(&Event::Unlocked(SectionId::Payment)));
        assert!(page.saw(&Event::Inputs(SectionId::Payment, false)));
        assert_eq!(
            checkout.view(SectionId::Contact),
            Some(SectionView {
                state: SectionState::Collapsed,
                completed: true
            })
        );
        assert!(matches!(
            checkout.advance(SectionId::Contact, SectionId::Payment).await,
            Err(CheckoutError::OutOfOrder { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn same_as_shipping_purchases_from_billing_with_unmasked_card() -> anyhow::Result<()> {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );
        checkout.set_same_as_shipping(true);

        let outcome = through_billing(&checkout).await?;

        assert_eq!(outcome, Advance::Purchased("/confirmation".into()));
        assert!(checkout.surface().saw(&Event::Masked(
            "************4242".into(),
            "***".into()
        )));
        let purchases = checkout.api().purchases();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].payment.card_number, "4242424242424242");
        assert_eq!(purchases[0].payment.cvv, "123");
        assert_eq!(purchases[0].contact.email, "ada@example.com");
        assert_eq!(purchases[0].shipping, None);
        assert!(checkout
            .surface()
            .saw(&Event::Label(SectionId::Billing, PURCHASE_LABEL.into())));
        assert_eq!(checkout.surface().navigated().as_deref(), Some("/confirmation"));
        Ok(())
    }

    #[tokio::test]
    async fn separate_shipping_is_its_own_step() -> anyhow::Result<()> {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );

        assert_eq!(
            through_billing(&checkout).await?,
            Advance::Moved(SectionId::Shipping)
        );
        assert!(checkout.api().purchases().is_empty());

        let outcome = checkout
            .advance(SectionId::Shipping, SectionId::Submit)
            .await?;

        assert_eq!(outcome, Advance::Purchased("/confirmation".into()));
        let shipping = checkout.api().purchases()[0].shipping.clone();
        assert_eq!(
            shipping.map(|s| s.ship_fullname),
            Some("Charles Babbage".to_owned())
        );
        Ok(())
    }

    #[tokio::test]
    async fn checking_same_as_shipping_at_shipping_step_still_purchases() -> anyhow::Result<()> {
        let page = FormPage::filled();
        page.form.borrow_mut().shipping = ShippingInfo::default();
        let checkout = sequencer(InMemoryStorefront::new(), page, CheckoutConfig::default());

        assert_eq!(
            through_billing(&checkout).await?,
            Advance::Moved(SectionId::Shipping)
        );
        checkout.set_same_as_shipping(true);

        let outcome = checkout
            .advance(SectionId::Shipping, SectionId::Submit)
            .await?;

        assert_eq!(outcome, Advance::Purchased("/confirmation".into()));
        let purchases = checkout.api().purchases();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].shipping, None);
        let shipping_checks = checkout
            .api()
            .calls()
            .iter()
            .filter(|call| *call == "/validate_shipping_info")
            .count();
        assert_eq!(shipping_checks, 1);
        assert!(!checkout
            .surface()
            .events
            .borrow()
            .iter()
            .any(|event| matches!(event, Event::Error(SectionId::Shipping, _))));
        Ok(())
    }

    #[test]
    fn same_as_shipping_starts_unchecked_and_marks_the_section() {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );
        assert!(checkout.surface().saw(&Event::SameAsShipping(false)));
        assert!(!checkout.same_as_shipping());

        checkout.set_same_as_shipping(true);

        let events = checkout.surface().events.borrow();
        let tail = &events[events.len() - 2..];
        assert_eq!(
            tail,
            [
                Event::SameAsShipping(true),
                Event::Label(SectionId::Billing, PURCHASE_LABEL.into()),
            ]
        );
    }

    #[tokio::test]
    async fn purchase_requires_every_earlier_section() {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );

        assert!(matches!(
            checkout.handle_purchase(SectionId::Billing).await,
            Err(CheckoutError::NotReady(SectionId::Contact))
        ));
        assert!(!checkout.api().called("/purchase"));
    }

    #[tokio::test]
    async fn failed_purchase_shows_message_and_stays() {
        let store = InMemoryStorefront::new();
        store.fail("/purchase", 500);
        let checkout = sequencer(store, FormPage::filled(), CheckoutConfig::default());
        checkout.set_same_as_shipping(true);

        assert!(matches!(
            through_billing(&checkout).await,
            Err(CheckoutError::Api(_))
        ));
        assert!(checkout.surface().saw(&Event::Error(
            SectionId::Billing,
            PURCHASE_ERROR_MESSAGE.into()
        )));
        assert_eq!(checkout.surface().navigated(), None);
    }

    #[tokio::test]
    async fn confirmation_can_carry_session_id() -> anyhow::Result<()> {
        let config = CheckoutConfig {
            confirmation_with_session: true,
            ..CheckoutConfig::default()
        };
        let checkout = sequencer(InMemoryStorefront::new(), FormPage::filled(), config);
        checkout.set_same_as_shipping(true);

        assert_eq!(
            through_billing(&checkout).await?,
            Advance::Purchased("/confirmation/session-1".into())
        );
        Ok(())
    }

    #[tokio::test]
    async fn legacy_route_processes_payment_and_goes_home() -> anyhow::Result<()> {
        let config = CheckoutConfig {
            purchase_route: PurchaseRoute::ProcessPayment,
            ..CheckoutConfig::default()
        };
        let checkout = sequencer(InMemoryStorefront::new(), FormPage::filled(), config);
        checkout.set_same_as_shipping(true);

        assert_eq!(
            through_billing(&checkout).await?,
            Advance::Purchased("/".into())
        );
        assert!(checkout.api().called("/process_payment"));
        assert!(!checkout.api().called("/purchase"));
        Ok(())
    }

    #[tokio::test]
    async fn header_toggle_ignores_locked_sections() -> anyhow::Result<()> {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );

        assert!(!checkout.toggle_header(SectionId::Billing));
        assert!(!checkout.toggle_header(SectionId::Contact));
        assert!(checkout.toggle_header(SectionId::Contact));

        checkout
            .advance(SectionId::Contact, SectionId::Payment)
            .await?;
        assert!(checkout.toggle_header(SectionId::Contact));
        assert_eq!(
            checkout.view(SectionId::Contact).map(|v| v.completed),
            Some(true)
        );
        Ok(())
    }

    #[tokio::test]
    async fn busy_page_refuses_validation() {
        let checkout = sequencer(
            InMemoryStorefront::new(),
            FormPage::filled(),
            CheckoutConfig::default(),
        );
        let _held = checkout.lock.acquire(checkout.surface());

        assert!(matches!(
            checkout.validate_section(SectionId::Contact).await,
            Err(CheckoutError::Busy)
        ));
        assert!(checkout.api().calls().is_empty());
    }

    #[tokio::test]
    async fn order_summary_reads_session_lines() -> anyhow::Result<()> {
        let store = InMemoryStorefront::new()
            .with_line("Sunset", 2, Price::from_dollars(225))
            .with_line("Harbor", 1, Price::from_dollars(300));

        let summary = order_summary(&store).await?;

        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.total_price, Some(Price::from_dollars(750)));
        assert!(store.called("/get_order_contents"));
        Ok(())
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_card_number("4242 4242"), "*****4242");
        assert_eq!(mask_card_number("424"), "424");
        assert_eq!(mask_cvv(" 1234 "), "****");
        assert_eq!(
            SectionId::from_dom_id("billingAddressSection"),
            Some(SectionId::Billing)
        );
    }
}
