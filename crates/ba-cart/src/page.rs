//! Page-wide interaction lock and navigation.

use std::cell::Cell;

/// Whatever renders the page while a cart or checkout call is in flight.
pub trait LockSurface {
    /// Enable or disable every link and button on the page.
    fn set_controls_disabled(&self, disabled: bool);
    /// Dim the page and show the spinner.
    fn show_busy(&self, busy: bool);
}

pub trait Navigator {
    fn navigate(&self, path: &str);
    fn reload(&self);
}

/// One flag for the whole page. The cart controller and the checkout
/// sequencer hold the same instance.
#[derive(Debug, Default)]
pub struct PageLock {
    locked: Cell<bool>,
}

impl PageLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    /// Take the lock and disable the page's controls. `None` if another
    /// operation already holds it.
    pub fn acquire<'a, S: LockSurface + ?Sized>(&'a self, surface: &'a S) -> Option<LockGuard<'a, S>> {
        if self.locked.replace(true) {
            return None;
        }
        surface.set_controls_disabled(true);
        Some(LockGuard {
            lock: self,
            surface,
            busy: Cell::new(false),
        })
    }
}

/// Releases the page on drop, whichever way the operation ended.
pub struct LockGuard<'a, S: LockSurface + ?Sized> {
    lock: &'a PageLock,
    surface: &'a S,
    busy: Cell<bool>,
}

impl<S: LockSurface + ?Sized> LockGuard<'_, S> {
    /// Dim the page for the mutating call.
    pub fn busy(&self) {
        if !self.busy.replace(true) {
            self.surface.show_busy(true);
        }
    }
}

impl<S: LockSurface + ?Sized> Drop for LockGuard<'_, S> {
    fn drop(&mut self) {
        if self.busy.get() {
            self.surface.show_busy(false);
        }
        self.surface.set_controls_disabled(false);
        self.lock.locked.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Trace(RefCell<Vec<&'static str>>);

    impl LockSurface for Trace {
        fn set_controls_disabled(&self, disabled: bool) {
            self.0
                .borrow_mut()
                .push(if disabled { "disable" } else { "enable" });
        }

        fn show_busy(&self, busy: bool) {
            self.0.borrow_mut().push(if busy { "dim" } else { "undim" });
        }
    }

    #[test]
    fn second_acquire_is_refused_until_release() {
        let lock = PageLock::new();
        let surface = Trace::default();

        let guard = lock.acquire(&surface);
        assert!(guard.is_some());
        assert!(lock.acquire(&surface).is_none());

        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.acquire(&surface).is_some());
    }

    #[test]
    fn release_undoes_busy_state() {
        let lock = PageLock::new();
        let surface = Trace::default();
        {
            let guard = lock.acquire(&surface).unwrap();
            guard.busy();
            guard.busy();
        }
        assert_eq!(*surface.0.borrow(), vec!["disable", "dim", "undim", "enable"]);
    }
}
