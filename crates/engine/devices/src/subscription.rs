//! Latest-value sensor subscriptions
//!
//! Sensor callbacks write into a `tokio::sync::watch` channel owned by the
//! backend; the render loop reads the most recent value without blocking.
//! Dropping a [`Subscription`] detaches the underlying platform listener.

use std::fmt;
use tokio::sync::watch;

type Detach = Box<dyn FnOnce()>;

/// A handle on a platform listener that caches the most recent value
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
    detach: Option<Detach>,
}

impl<T> Subscription<T> {
    /// Wrap a receiver with a detach action run exactly once on drop or [`Subscription::detach`]
    pub fn new(rx: watch::Receiver<T>, detach: impl FnOnce() + 'static) -> Self {
        Self {
            rx,
            detach: Some(Box::new(detach)),
        }
    }

    /// Wrap a receiver that has no platform listener to release
    pub fn detached(rx: watch::Receiver<T>) -> Self {
        Self { rx, detach: None }
    }

    /// Borrow the most recent value
    pub fn latest(&self) -> watch::Ref<'_, T> {
        self.rx.borrow()
    }

    /// Returns true if a value arrived since the last [`Subscription::take_changed`]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next value; returns false once the backend is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// A receiver clone for awaiting changes outside the owner
    pub fn receiver(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }

    /// Release the platform listener; idempotent
    pub fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.detach.is_some()
    }
}

impl<T: Clone> Subscription<T> {
    /// Take the value if it changed since the last call
    pub fn take_changed(&mut self) -> Option<T> {
        if self.has_changed() {
            Some(self.rx.borrow_and_update().clone())
        } else {
            None
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<T: fmt::Debug> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("latest", &*self.rx.borrow())
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
