//! floatclock library
//!
//! Multi-mode timer engine behind a floating desktop time utility:
//! - Clock rendering (pure functions of the current time)
//! - Countdown and Pomodoro timers with pause/resume/reset and progress
//! - Resume recomputation across sleep, suspension and restarts
//! - Write-through snapshot persistence
//! - Snapshot fan-out to independent observers
//! - Fire-and-forget completion notifications
//! - Daemon, control socket and CLI client

pub mod broadcast;
pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod notification;
pub mod store;
pub mod time;
pub mod types;

// Re-export commonly used types for convenience
pub use broadcast::{StateBroadcaster, DEFAULT_BROADCAST_CAPACITY};
pub use config::AppConfig;
pub use daemon::{CommandStatus, InvalidCommand, Outcome, TimerEngine};
pub use notification::{MockNotifier, NotificationPort};
pub use store::{JsonFileStore, MemoryStore, PersistenceError, SnapshotStore};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
pub use types::{
    CompletionEvent, CountdownState, EngineSnapshot, IpcRequest, IpcResponse, Mode, Phase,
    PomodoroSettings, PomodoroState,
};
