//! Background delivery of completion events.
//!
//! The engine pushes events into an unbounded channel through
//! [`ChannelNotifier`] and returns immediately. A [`NotificationDispatcher`]
//! task drains the channel and hands each event to its sinks, so a slow or
//! failing notification path never delays ticking.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::content::NotificationContent;
use super::error::NotificationError;
use super::hook::HookSink;
use super::{NotificationPort, NotificationSink};
use crate::types::CompletionEvent;

/// Creates a connected notifier / receiver pair.
pub fn channel() -> (ChannelNotifier, mpsc::UnboundedReceiver<CompletionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelNotifier { tx }, rx)
}

// ============================================================================
// ChannelNotifier
// ============================================================================

/// Fire-and-forget notification port backed by a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<CompletionEvent>,
}

impl NotificationPort for ChannelNotifier {
    fn fire(&self, event: CompletionEvent) {
        if self.tx.send(event).is_err() {
            warn!("{}: {:?} を破棄しました", NotificationError::ChannelClosed, event);
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Writes every completion to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    async fn deliver(
        &self,
        event: CompletionEvent,
        content: &NotificationContent,
    ) -> Result<(), NotificationError> {
        info!(event = event.as_str(), "{} - {}", content.title, content.body);
        Ok(())
    }
}

/// The sinks the daemon delivers to: always the log, optionally a hook.
#[derive(Debug, Clone, Default)]
pub struct SinkSet {
    /// Log sink
    pub log: LogSink,
    /// Optional shell hook
    pub hook: Option<HookSink>,
}

impl SinkSet {
    /// Creates a set with an optional hook.
    pub fn new(hook: Option<HookSink>) -> Self {
        Self { log: LogSink, hook }
    }
}

impl NotificationSink for SinkSet {
    async fn deliver(
        &self,
        event: CompletionEvent,
        content: &NotificationContent,
    ) -> Result<(), NotificationError> {
        self.log.deliver(event, content).await?;
        if let Some(hook) = &self.hook {
            hook.deliver(event, content).await?;
        }
        Ok(())
    }
}

// ============================================================================
// NotificationDispatcher
// ============================================================================

/// Drains completion events and delivers them to a sink.
pub struct NotificationDispatcher<S> {
    rx: mpsc::UnboundedReceiver<CompletionEvent>,
    sink: S,
}

impl<S: NotificationSink> NotificationDispatcher<S> {
    /// Creates a dispatcher over the receiving half of [`channel`].
    pub fn new(rx: mpsc::UnboundedReceiver<CompletionEvent>, sink: S) -> Self {
        Self { rx, sink }
    }

    /// Delivers events until every notifier has been dropped.
    ///
    /// Returns the number of events processed.
    pub async fn run(mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.rx.recv().await {
            let content = NotificationContent::for_event(event);
            if let Err(e) = self.sink.deliver(event, &content).await {
                warn!("通知の配信に失敗しました: {} ({})", e, e.suggestion());
            }
            processed += 1;
        }
        debug!(processed, "通知ディスパッチャを終了します");
        processed
    }
}
