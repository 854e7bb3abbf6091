//! Single-slot notification popup.
//!
//! At most one popup is pending. A second [`Popup::show`] while one is
//! displayed waits on the same dismissal instead of stacking a duplicate.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

struct Pending {
    message: String,
    dismissed: watch::Sender<bool>,
}

/// Popup slot shared between the menu and whoever reports errors.
#[derive(Default)]
pub struct Popup {
    slot: Mutex<Option<Pending>>,
}

impl Popup {
    /// Create an empty popup slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Display `message` and wait until it is dismissed.
    ///
    /// If a popup is already pending, its message stays on screen and this
    /// call waits for that same dismissal.
    pub async fn show(&self, message: impl Into<String>) {
        let mut dismissed = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(pending) => pending.dismissed.subscribe(),
                None => {
                    let message = message.into();
                    tracing::info!(%message, "popup shown");
                    let (tx, rx) = watch::channel(false);
                    *slot = Some(Pending {
                        message,
                        dismissed: tx,
                    });
                    rx
                }
            }
        };
        // The sender publishes `true` before it is dropped, so a closed
        // channel can only follow a dismissal.
        loop {
            if *dismissed.borrow_and_update() {
                break;
            }
            if dismissed.changed().await.is_err() {
                break;
            }
        }
    }

    /// Resolve the pending popup. Returns `false` if nothing was pending.
    pub fn dismiss(&self) -> bool {
        let pending = self.slot().take();
        match pending {
            Some(pending) => {
                pending.dismissed.send_replace(true);
                tracing::debug!(message = %pending.message, "popup dismissed");
                true
            }
            None => false,
        }
    }

    /// Message currently displayed, if any.
    pub fn current(&self) -> Option<String> {
        self.slot().as_ref().map(|p| p.message.clone())
    }

    /// Whether a popup is waiting for dismissal.
    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Pending>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
