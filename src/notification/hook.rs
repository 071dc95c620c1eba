//! User-configured shell hook run on every completion.
//!
//! The hook is how the floating utility plays its sound or raises a desktop
//! notification without the engine knowing about either. The command runs
//! through `sh -c` in a blocking task with a timeout, and receives the event
//! through environment variables:
//!
//! - `FLOATCLOCK_EVENT`: `countdown_complete` or `phase_complete`
//! - `FLOATCLOCK_PHASE`: finished phase (`work`, `short_break`, `long_break`), empty for countdowns
//! - `FLOATCLOCK_TITLE` / `FLOATCLOCK_BODY`: notification text

use std::process::Command;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error};

use super::content::NotificationContent;
use super::error::NotificationError;
use super::NotificationSink;
use crate::types::CompletionEvent;

/// Default timeout for hook execution in seconds.
pub const DEFAULT_HOOK_TIMEOUT_SECONDS: u64 = 5;

/// Runs a shell command per completion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSink {
    command: String,
    timeout_seconds: u64,
}

impl HookSink {
    /// Creates a hook with the default timeout.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout_seconds: DEFAULT_HOOK_TIMEOUT_SECONDS,
        }
    }

    /// Sets the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Returns the configured command line.
    pub fn command(&self) -> &str {
        &self.command
    }

    async fn execute(
        &self,
        event: CompletionEvent,
        content: &NotificationContent,
    ) -> Result<(), NotificationError> {
        let phase = match event {
            CompletionEvent::CountdownComplete => "",
            CompletionEvent::PhaseComplete(phase) => phase.as_str(),
        };

        let output = tokio::task::spawn_blocking({
            let command = self.command.clone();
            let title = content.title.clone();
            let body = content.body.clone();
            let kind = event.as_str();
            move || {
                Command::new("sh")
                    .arg("-c")
                    .arg(&command)
                    .env("FLOATCLOCK_EVENT", kind)
                    .env("FLOATCLOCK_PHASE", phase)
                    .env("FLOATCLOCK_TITLE", title)
                    .env("FLOATCLOCK_BODY", body)
                    .output()
            }
        })
        .await
        .map_err(|e| NotificationError::SpawnFailed(self.command.clone(), e.to_string()))?
        .map_err(|e| NotificationError::SpawnFailed(self.command.clone(), e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(NotificationError::HookFailed(
                self.command.clone(),
                stderr.trim().to_string(),
            ))
        }
    }
}

impl NotificationSink for HookSink {
    async fn deliver(
        &self,
        event: CompletionEvent,
        content: &NotificationContent,
    ) -> Result<(), NotificationError> {
        debug!(command = %self.command, "通知フックを実行します");

        match timeout(
            Duration::from_secs(self.timeout_seconds),
            self.execute(event, content),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!("通知フックがタイムアウトしました: {}", self.command);
                Err(NotificationError::HookTimeout(
                    self.command.clone(),
                    self.timeout_seconds,
                ))
            }
        }
    }
}
