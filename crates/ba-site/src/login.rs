use ba_api_types::CredentialsRequest;
use ba_cart::Navigator;
use ba_storefront_client::StorefrontApi;
use tracing::{info, warn};

use crate::SiteError;

pub trait LoginSurface: Navigator {
    /// Reveal the inline "invalid credentials" message.
    fn show_error(&self);
}

pub struct AdminLogin<A, S> {
    api: A,
    surface: S,
}

impl<A, S> AdminLogin<A, S>
where
    A: StorefrontApi,
    S: LoginSurface,
{
    pub fn new(api: A, surface: S) -> Self {
        Self { api, surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// On success the page moves to the destination the server picked and
    /// its path is returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<&'static str, SiteError> {
        let request = CredentialsRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let destination = match self.api.credentials_check(&request).await {
            Ok(destination) => destination,
            Err(err) => {
                warn!("credentials check failed: {err}");
                self.surface.show_error();
                return Err(err.into());
            }
        };

        let Some(destination) = destination else {
            info!(username, "login refused");
            self.surface.show_error();
            return Err(SiteError::LoginRefused);
        };
        let path = destination.path();
        self.surface.navigate(path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ba_api_types::LoginDestination;
    use ba_storefront_client::InMemoryStorefront;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct LoginPage {
        went_to: RefCell<Option<String>>,
        error_shown: Cell<bool>,
    }

    impl Navigator for LoginPage {
        fn navigate(&self, path: &str) {
            *self.went_to.borrow_mut() = Some(path.to_owned());
        }

        fn reload(&self) {}
    }

    impl LoginSurface for LoginPage {
        fn show_error(&self) {
            self.error_shown.set(true);
        }
    }

    fn login_page() -> AdminLogin<InMemoryStorefront, LoginPage> {
        let store = InMemoryStorefront::new()
            .with_admin("brig", "portal-pw", LoginDestination::Portal)
            .with_admin("brig", "logs-pw", LoginDestination::Logs);
        AdminLogin::new(store, LoginPage::default())
    }

    #[tokio::test]
    async fn status_picks_destination() -> anyhow::Result<()> {
        assert_eq!(login_page().login("brig", "logs-pw").await?, "/logs");

        let portal = login_page();
        assert_eq!(portal.login("brig", "portal-pw").await?, "/brig_portal");
        assert_eq!(portal.surface().went_to.borrow().as_deref(), Some("/brig_portal"));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_shows_inline_error() {
        let page = login_page();

        assert!(matches!(
            page.login("brig", "guess").await,
            Err(SiteError::LoginRefused)
        ));
        assert!(page.surface().error_shown.get());
        assert!(page.surface().went_to.borrow().is_none());
    }
}
