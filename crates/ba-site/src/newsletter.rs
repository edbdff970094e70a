use ba_api_types::SubscribeRequest;
use ba_storefront_client::StorefrontApi;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::SiteError;

pub const INVALID_EMAIL_MESSAGE: &str = "Your email is not valid. Please try again.";
pub const SUBSCRIBED_MESSAGE: &str = "Your email has been added to the email list.";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

pub trait NewsletterSurface {
    fn clear_input(&self);
    fn show_error(&self, message: &str);
    fn show_confirmation(&self, message: &str);
}

/// Footer "join the email list" form.
pub struct Newsletter<A, S> {
    api: A,
    surface: S,
}

impl<A, S> Newsletter<A, S>
where
    A: StorefrontApi,
    S: NewsletterSurface,
{
    pub fn new(api: A, surface: S) -> Self {
        Self { api, surface }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub async fn subscribe(&self, email: &str) -> Result<(), SiteError> {
        if !is_valid_email(email) {
            self.surface.clear_input();
            self.surface.show_error(INVALID_EMAIL_MESSAGE);
            return Err(SiteError::InvalidEmail);
        }

        let request = SubscribeRequest {
            email: email.to_owned(),
        };
        match self.api.subscribe(&request).await {
            Ok(response) => {
                info!("newsletter subscription sent");
                self.surface.clear_input();
                let message = if response.message.is_empty() {
                    SUBSCRIBED_MESSAGE
                } else {
                    response.message.as_str()
                };
                self.surface.show_confirmation(message);
                Ok(())
            }
            Err(err) => {
                warn!("newsletter subscription failed: {err}");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_storefront_client::InMemoryStorefront;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Footer {
        log: RefCell<Vec<String>>,
    }

    impl NewsletterSurface for Footer {
        fn clear_input(&self) {
            self.log.borrow_mut().push("clear".into());
        }

        fn show_error(&self, message: &str) {
            self.log.borrow_mut().push(format!("error: {message}"));
        }

        fn show_confirmation(&self, message: &str) {
            self.log.borrow_mut().push(format!("ok: {message}"));
        }
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.io"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_server() {
        let form = Newsletter::new(InMemoryStorefront::new(), Footer::default());

        assert!(matches!(
            form.subscribe("not-an-email").await,
            Err(SiteError::InvalidEmail)
        ));
        assert!(form.api().calls().is_empty());
        assert_eq!(
            *form.surface().log.borrow(),
            vec!["clear".to_owned(), format!("error: {INVALID_EMAIL_MESSAGE}")]
        );
    }

    #[tokio::test]
    async fn subscription_shows_server_message() -> anyhow::Result<()> {
        let form = Newsletter::new(InMemoryStorefront::new(), Footer::default());

        form.subscribe("ada@example.com").await?;
        form.subscribe("ada@example.com").await?;

        assert_eq!(form.api().subscribers(), vec!["ada@example.com".to_owned()]);
        let log = form.surface().log.borrow();
        assert_eq!(log[1], "ok: Email subscribed successfully");
        assert_eq!(log[3], "ok: Email already subscribed");
        Ok(())
    }
}
