//! Session expiry countdown shown on the cart and checkout pages.

use ba_storefront_client::StorefrontApi;
use std::cell::Cell;
use tracing::{info, warn};

use crate::page::Navigator;

/// Seconds left in the server session, counted down once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCountdown {
    remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Running(String),
    /// Last value shown before the session ran out.
    Expired(String),
}

impl SessionCountdown {
    pub fn new(seconds: u64) -> Self {
        Self {
            remaining: i64::try_from(seconds).unwrap_or(i64::MAX),
        }
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Show the current value, then count down.
    pub fn tick(&mut self) -> Tick {
        let shown = format_mm_ss(self.remaining.max(0));
        self.remaining -= 1;
        if self.remaining < 0 {
            Tick::Expired(shown)
        } else {
            Tick::Running(shown)
        }
    }
}

pub fn format_mm_ss(seconds: i64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub trait TimerSurface: Navigator {
    fn show_remaining(&self, text: &str);
}

/// Drives a [`SessionCountdown`] from the server's remaining time. The
/// caller owns the one-second interval and calls [`SessionTimer::tick`].
pub struct SessionTimer<A, S> {
    api: A,
    surface: S,
    countdown: Cell<Option<SessionCountdown>>,
}

impl<A, S> SessionTimer<A, S>
where
    A: StorefrontApi,
    S: TimerSurface,
{
    pub fn new(api: A, surface: S) -> Self {
        Self {
            api,
            surface,
            countdown: Cell::new(None),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// (Re)start from the server's clock. Also used when the tab becomes
    /// visible again.
    pub async fn sync(&self) -> Result<u64, ba_storefront_client::ApiError> {
        let seconds = self.api.session_time().await?;
        self.countdown.set(Some(SessionCountdown::new(seconds)));
        Ok(seconds)
    }

    /// One second elapsed. Returns `false` once the session is gone and the
    /// interval should stop.
    pub async fn tick(&self) -> bool {
        let Some(mut countdown) = self.countdown.get() else {
            return false;
        };
        match countdown.tick() {
            Tick::Running(text) => {
                self.countdown.set(Some(countdown));
                self.surface.show_remaining(&text);
                true
            }
            Tick::Expired(text) => {
                self.countdown.set(None);
                self.surface.show_remaining(&text);
                info!("session expired");
                match self.api.delete_session().await {
                    Ok(()) => self.surface.reload(),
                    Err(err) => warn!("deleting expired session failed: {err}"),
                }
                false
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
    struct Clock {
        shown: RefCell<Vec<String>>,
        reloads: Cell<u32>,
    }

    impl Navigator for Clock {
        fn navigate(&self, _path: &str) {}

        fn reload(&self) {
            self.reloads.set(self.reloads.get() + 1);
        }
    }

    impl TimerSurface for Clock {
        fn show_remaining(&self, text: &str) {
            self.shown.borrow_mut().push(text.to_owned());
        }
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mm_ss(0), "00:00");
        assert_eq!(format_mm_ss(65), "01:05");
        assert_eq!(format_mm_ss(900), "15:00");
    }

    #[test]
    fn countdown_expires_after_showing_zero() {
        let mut countdown = SessionCountdown::new(1);
        assert_eq!(countdown.tick(), Tick::Running("00:01".into()));
        assert_eq!(countdown.tick(), Tick::Expired("00:00".into()));
    }

    #[tokio::test]
    async fn expiry_deletes_session_and_reloads() -> anyhow::Result<()> {
        let timer = SessionTimer::new(
            InMemoryStorefront::new().with_remaining_time(2),
            Clock::default(),
        );

        assert_eq!(timer.sync().await?, 2);
        assert!(timer.tick().await);
        assert!(timer.tick().await);
        assert!(!timer.tick().await);

        assert_eq!(*timer.surface().shown.borrow(), vec!["00:02", "00:01", "00:00"]);
        assert!(timer.api.session_deleted());
        assert_eq!(timer.surface().reloads.get(), 1);
        assert!(!timer.tick().await);
        Ok(())
    }
}
