//! Completion notifications.
//!
//! The engine sees a single outbound capability, [`NotificationPort::fire`],
//! which must return immediately. Everything else lives on the far side of a
//! channel:
//!
//! - `dispatcher`: [`ChannelNotifier`] + [`NotificationDispatcher`] task
//! - `hook`: [`HookSink`], a user-configured command (sound, desktop popup, ...)
//! - `content`: title/body text per event
//!
//! # Example
//!
//! ```rust,ignore
//! use floatclock::notification::{channel, NotificationDispatcher, SinkSet};
//!
//! let (notifier, rx) = channel();
//! tokio::spawn(NotificationDispatcher::new(rx, SinkSet::new(None)).run());
//! // hand `notifier` to the TimerEngine
//! ```

mod content;
mod dispatcher;
pub mod error;
mod hook;

use std::sync::{Mutex, PoisonError};

pub use self::content::NotificationContent;
pub use self::dispatcher::{channel, ChannelNotifier, LogSink, NotificationDispatcher, SinkSet};
pub use self::error::NotificationError;
pub use self::hook::{HookSink, DEFAULT_HOOK_TIMEOUT_SECONDS};

use crate::types::CompletionEvent;

/// Outbound port the engine calls when a timer completes.
///
/// Implementations must not block; delivery happens asynchronously.
pub trait NotificationPort: Send + Sync {
    /// Queues a completion event for delivery.
    fn fire(&self, event: CompletionEvent);
}

/// Something that can actually present a notification.
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    /// Presents one completion event.
    async fn deliver(
        &self,
        event: CompletionEvent,
        content: &NotificationContent,
    ) -> Result<(), NotificationError>;
}

/// Records fired events instead of delivering them.
#[derive(Debug, Default)]
pub struct MockNotifier {
    events: Mutex<Vec<CompletionEvent>>,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<CompletionEvent> {
        self.lock().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Number of recorded events equal to `event`.
    #[must_use]
    pub fn count_of(&self, event: CompletionEvent) -> usize {
        self.lock().iter().filter(|e| **e == event).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CompletionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationPort for MockNotifier {
    fn fire(&self, event: CompletionEvent) {
        self.lock().push(event);
    }
}
