//! Gesture-gated permission prompt
//!
//! Some platforms only grant orientation access when the request is made
//! from a direct user gesture. The session asks the UI to show a full-screen
//! button and waits on the receiver; the UI's click handler calls
//! [`PermissionPrompt::respond`].

use std::cell::RefCell;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Default)]
pub struct PermissionPrompt {
    pending: RefCell<Option<oneshot::Sender<bool>>>,
}

impl PermissionPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the prompt; the receiver resolves with the user's answer
    ///
    /// A previous unanswered prompt is cancelled.
    pub fn request(&self) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        if self.pending.replace(Some(tx)).is_some() {
            debug!("replacing unanswered permission prompt");
        }
        rx
    }

    /// Deliver the user's answer; returns false if nothing was waiting
    pub fn respond(&self, granted: bool) -> bool {
        match self.pending.borrow_mut().take() {
            Some(tx) => tx.send(granted).is_ok(),
            None => false,
        }
    }

    /// Dismiss without an answer; the waiting side sees a closed channel
    pub fn cancel(&self) {
        self.pending.borrow_mut().take();
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}
