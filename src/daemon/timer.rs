//! Timer engine.
//!
//! Owns the live [`EngineSnapshot`] and is its only writer:
//! - user commands (start, pause, reset, presets, mode cycling, phase skip)
//! - 1 Hz `tick(now)` and the one-shot `resume_recompute(now)` at startup
//! - write-through persistence, snapshot broadcast and completion events
//!
//! The engine performs no scheduling itself. The host calls `tick` and
//! supplies the clock through a [`TimeSource`], so every transition is a
//! plain function of the current state and a timestamp.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::broadcast::{SnapshotReceiver, StateBroadcaster};
use crate::notification::NotificationPort;
use crate::store::{PersistenceError, SnapshotStore};
use crate::time::{TimeSource, Timestamp};
use crate::types::{
    CompletionEvent, CountdownState, EngineSnapshot, Mode, PomodoroSettings, PomodoroState,
};

/// Most completion events fired for one advance step.
///
/// Phase transitions beyond this are still applied; only their notification
/// is dropped.
pub const MAX_REPLAYED_COMPLETIONS: usize = 8;

/// Longest accepted countdown (24 hours).
pub const MAX_COUNTDOWN_SECONDS: u32 = 24 * 60 * 60;

// ============================================================================
// Command results
// ============================================================================

/// Why a command was ignored.
///
/// These are normal UI timing races, not faults: the engine state is left
/// untouched and the host may show the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCommand {
    /// Clock mode has nothing to start, pause or reset
    #[error("時計モードでは操作できるタイマーがありません")]
    NoTimer,

    /// The timer has progress that the command would discard
    #[error("タイマーが動作中のため変更できません。先にリセットしてください")]
    TimerActive,

    /// A zero-length duration was requested
    #[error("時間は1秒以上を指定してください")]
    ZeroDuration,

    /// The requested countdown exceeds the maximum
    #[error("カウントダウンは最大{}分です", MAX_COUNTDOWN_SECONDS / 60)]
    DurationTooLong,

    /// Pomodoro settings with a zero duration or session count
    #[error("ポモドーロの設定が不正です。各時間とセッション数は1以上を指定してください")]
    InvalidSettings,
}

/// What a command or tick did to the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// The state changed and was persisted and published
    Applied,
    /// The command was legal but a no-op
    Unchanged,
    /// The command was ignored
    Rejected(InvalidCommand),
}

/// Result of a command or tick.
#[derive(Debug)]
#[must_use]
pub struct Outcome {
    /// What happened to the state
    pub status: CommandStatus,
    /// Set when the state changed in memory but could not be saved
    pub save_error: Option<PersistenceError>,
}

impl Outcome {
    fn unchanged() -> Self {
        Self {
            status: CommandStatus::Unchanged,
            save_error: None,
        }
    }

    fn rejected(reason: InvalidCommand) -> Self {
        Self {
            status: CommandStatus::Rejected(reason),
            save_error: None,
        }
    }

    /// Returns true if the state changed.
    pub fn is_applied(&self) -> bool {
        self.status == CommandStatus::Applied
    }

    /// Returns the rejection reason, if any.
    pub fn rejection(&self) -> Option<&InvalidCommand> {
        match &self.status {
            CommandStatus::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Multi-mode timer engine.
pub struct TimerEngine {
    /// Live state
    snapshot: EngineSnapshot,
    /// Durable copy
    store: Box<dyn SnapshotStore>,
    /// Observers
    broadcaster: StateBroadcaster,
    /// Completion events go here
    notifier: Arc<dyn NotificationPort>,
    /// Clock used to stamp commands
    time: Arc<dyn TimeSource>,
    /// Whether the last save failed
    save_failing: bool,
}

impl TimerEngine {
    /// Creates an engine from the store's snapshot.
    pub fn new(
        store: impl SnapshotStore + 'static,
        notifier: Arc<dyn NotificationPort>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let mut snapshot = store.load();
        snapshot.sanitize();
        debug!(mode = snapshot.mode.as_str(), "スナップショットを読み込みました");

        Self {
            snapshot,
            store: Box::new(store),
            broadcaster: StateBroadcaster::default(),
            notifier,
            time,
            save_failing: false,
        }
    }

    /// Replaces the broadcaster (e.g. to use a configured capacity).
    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: StateBroadcaster) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// Returns a copy of the current state.
    pub fn get_snapshot(&self) -> EngineSnapshot {
        self.snapshot.clone()
    }

    /// Subscribes to every state change from now on.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.broadcaster.subscribe()
    }

    /// Returns true while saves are failing.
    pub fn is_save_failing(&self) -> bool {
        self.save_failing
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Starts or resumes the displayed mode's timer.
    ///
    /// A finished countdown is refilled first.
    pub fn start(&mut self) -> Outcome {
        self.apply("start", |snapshot, now| match snapshot.mode {
            Mode::Clock => Err(InvalidCommand::NoTimer),
            Mode::Countdown => {
                let countdown = &mut snapshot.countdown;
                if countdown.running {
                    return Ok(());
                }
                if countdown.total_seconds == 0 {
                    return Err(InvalidCommand::ZeroDuration);
                }
                if countdown.remaining_seconds == 0 {
                    countdown.remaining_seconds = countdown.total_seconds;
                }
                countdown.running = true;
                countdown.paused = false;
                countdown.last_tick_epoch = Some(now);
                Ok(())
            }
            Mode::Pomodoro => {
                let pomodoro = &mut snapshot.pomodoro;
                if pomodoro.running {
                    return Ok(());
                }
                if pomodoro.remaining_seconds == 0 {
                    pomodoro.remaining_seconds = pomodoro.phase_total();
                }
                pomodoro.running = true;
                pomodoro.last_tick_epoch = Some(now);
                Ok(())
            }
        })
    }

    /// Pauses the displayed mode's timer. Pausing twice is a no-op.
    pub fn pause(&mut self) -> Outcome {
        self.apply("pause", |snapshot, _| match snapshot.mode {
            Mode::Clock => Err(InvalidCommand::NoTimer),
            Mode::Countdown => {
                let countdown = &mut snapshot.countdown;
                if countdown.running {
                    countdown.running = false;
                    countdown.paused = true;
                    countdown.last_tick_epoch = None;
                }
                Ok(())
            }
            Mode::Pomodoro => {
                let pomodoro = &mut snapshot.pomodoro;
                if pomodoro.running {
                    pomodoro.running = false;
                    pomodoro.last_tick_epoch = None;
                }
                Ok(())
            }
        })
    }

    /// Resets the displayed mode's timer.
    pub fn reset(&mut self) -> Outcome {
        self.apply("reset", |snapshot, _| match snapshot.mode {
            Mode::Clock => Err(InvalidCommand::NoTimer),
            Mode::Countdown => {
                snapshot.countdown.reset();
                Ok(())
            }
            Mode::Pomodoro => {
                snapshot.pomodoro.reset();
                Ok(())
            }
        })
    }

    /// Sets the countdown to a preset length in minutes.
    ///
    /// Only legal while the countdown is idle.
    pub fn set_preset(&mut self, minutes: u32) -> Outcome {
        match minutes.checked_mul(60) {
            Some(seconds) => self.set_duration_seconds(seconds),
            None => Outcome::rejected(InvalidCommand::DurationTooLong),
        }
    }

    /// Sets the countdown length in seconds.
    ///
    /// Only legal while the countdown is idle.
    pub fn set_duration_seconds(&mut self, seconds: u32) -> Outcome {
        self.apply("set_duration", |snapshot, _| {
            if seconds == 0 {
                return Err(InvalidCommand::ZeroDuration);
            }
            if seconds > MAX_COUNTDOWN_SECONDS {
                return Err(InvalidCommand::DurationTooLong);
            }
            let countdown = &mut snapshot.countdown;
            if !countdown.is_idle() {
                return Err(InvalidCommand::TimerActive);
            }
            countdown.total_seconds = seconds;
            countdown.remaining_seconds = seconds;
            countdown.last_tick_epoch = None;
            Ok(())
        })
    }

    /// Shows the next mode (Clock → Countdown → Pomodoro → Clock).
    ///
    /// Timers keep their state and keep ticking in the background.
    pub fn cycle_mode(&mut self) -> Outcome {
        self.apply("cycle_mode", |snapshot, _| {
            snapshot.mode = snapshot.mode.next();
            Ok(())
        })
    }

    /// Skips to the next Pomodoro phase without a completion event.
    pub fn advance_phase(&mut self) -> Outcome {
        self.apply("advance_phase", |snapshot, now| {
            let pomodoro = &mut snapshot.pomodoro;
            pomodoro.advance_phase();
            if pomodoro.running {
                pomodoro.last_tick_epoch = Some(now);
            }
            Ok(())
        })
    }

    /// Enables or disables countdown auto-repeat.
    pub fn set_auto_repeat(&mut self, enabled: bool) -> Outcome {
        self.apply("set_auto_repeat", |snapshot, _| {
            snapshot.countdown.auto_repeat = enabled;
            Ok(())
        })
    }

    /// Enables or disables starting the next Pomodoro phase automatically.
    pub fn set_auto_start_next(&mut self, enabled: bool) -> Outcome {
        self.apply("set_auto_start_next", |snapshot, _| {
            snapshot.pomodoro.auto_start_next = enabled;
            Ok(())
        })
    }

    /// Replaces the Pomodoro durations and returns to the start of a work
    /// phase.
    ///
    /// Only legal while the Pomodoro is idle.
    pub fn configure_pomodoro(&mut self, settings: PomodoroSettings) -> Outcome {
        self.apply("configure_pomodoro", |snapshot, _| {
            if !settings.is_valid() {
                return Err(InvalidCommand::InvalidSettings);
            }
            let current = &snapshot.pomodoro;
            if !current.is_idle() {
                return Err(InvalidCommand::TimerActive);
            }
            if current.settings() == settings {
                return Ok(());
            }
            let auto_start_next = current.auto_start_next;
            snapshot.pomodoro = PomodoroState::with_settings(settings);
            snapshot.pomodoro.auto_start_next = auto_start_next;
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Time advancement
    // ------------------------------------------------------------------------

    /// Advances every running timer to `now`.
    ///
    /// Called by the host at 1 Hz. Both timers advance regardless of the
    /// displayed mode.
    pub fn tick(&mut self, now: Timestamp) -> Outcome {
        let before = self.snapshot.clone();
        let mut events = Vec::new();

        if advance_countdown(&mut self.snapshot.countdown, now) {
            events.push(CompletionEvent::CountdownComplete);
        }
        advance_pomodoro(&mut self.snapshot.pomodoro, now, &mut events);

        if self.snapshot == before {
            return Outcome::unchanged();
        }
        self.commit(now, events)
    }

    /// Reconstructs running timers after the process was suspended or
    /// restarted.
    ///
    /// Call once at startup, before the first [`tick`](Self::tick). Uses the
    /// same boundary logic as live ticking, so completions missed while
    /// suspended are fired now.
    pub fn resume_recompute(&mut self, now: Timestamp) -> Outcome {
        let countdown_gap = gap(self.snapshot.countdown.last_tick_epoch, now);
        let pomodoro_gap = gap(self.snapshot.pomodoro.last_tick_epoch, now);
        info!(
            countdown_running = self.snapshot.countdown.running,
            pomodoro_running = self.snapshot.pomodoro.running,
            countdown_gap,
            pomodoro_gap,
            "中断からの経過時間を反映します"
        );
        if !self.snapshot.any_running() {
            return Outcome::unchanged();
        }
        self.tick(now)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Runs a command against a copy of the state and commits it if it
    /// changed.
    fn apply<F>(&mut self, command: &'static str, f: F) -> Outcome
    where
        F: FnOnce(&mut EngineSnapshot, Timestamp) -> Result<(), InvalidCommand>,
    {
        let now = self.time.now();
        let mut next = self.snapshot.clone();

        if let Err(reason) = f(&mut next, now) {
            debug!(command, %reason, "コマンドを無視しました");
            return Outcome::rejected(reason);
        }
        if next == self.snapshot {
            debug!(command, "状態に変化はありません");
            return Outcome::unchanged();
        }

        debug!(command, "コマンドを適用しました");
        self.snapshot = next;
        self.commit(now, Vec::new())
    }

    /// Saves, publishes, then fires events, in that order.
    fn commit(&mut self, now: Timestamp, events: Vec<CompletionEvent>) -> Outcome {
        self.snapshot.saved_at = now;

        let save_error = match self.store.save(&self.snapshot) {
            Ok(()) => {
                if self.save_failing {
                    info!("スナップショットの保存が回復しました");
                    self.save_failing = false;
                }
                None
            }
            Err(e) => {
                if self.save_failing {
                    debug!("スナップショットの保存に引き続き失敗しています: {}", e);
                } else {
                    warn!("スナップショットの保存に失敗しました: {} ({})", e, e.suggestion());
                    self.save_failing = true;
                }
                Some(e)
            }
        };

        let receivers = self.broadcaster.publish(self.snapshot.clone());
        debug!(receivers, "スナップショットを配信しました");

        for event in events {
            info!(event = event.as_str(), "タイマーが完了しました");
            self.notifier.fire(event);
        }

        Outcome {
            status: CommandStatus::Applied,
            save_error,
        }
    }
}

/// Seconds between `last` and `now`, for logging.
fn gap(last: Option<Timestamp>, now: Timestamp) -> i64 {
    last.map_or(0, |last| now.saturating_sub(last))
}

/// Seconds to apply since the last tick, re-stamping `last_tick_epoch`.
///
/// Returns `None` when no time should be applied: first stamp of a running
/// timer, same second, or a clock that went backwards.
fn take_elapsed(last_tick_epoch: &mut Option<Timestamp>, now: Timestamp) -> Option<u64> {
    let Some(last) = *last_tick_epoch else {
        *last_tick_epoch = Some(now);
        return None;
    };
    *last_tick_epoch = Some(now);
    // A negative or overflowing difference (clock went backwards, or a
    // hand-edited timestamp) applies no time.
    match now.checked_sub(last).map(u64::try_from) {
        Some(Ok(elapsed)) if elapsed > 0 => Some(elapsed),
        Some(Ok(_)) => None,
        _ => {
            debug!(last, now, "経過時間を計算できません。経過時間を適用しません");
            None
        }
    }
}

/// Advances a running countdown. Returns true if it reached zero.
///
/// With auto-repeat, extra full cycles within one step are folded into a
/// single completion.
fn advance_countdown(countdown: &mut CountdownState, now: Timestamp) -> bool {
    if !countdown.running {
        return false;
    }
    let Some(elapsed) = take_elapsed(&mut countdown.last_tick_epoch, now) else {
        return false;
    };

    let remaining = u64::from(countdown.remaining_seconds);
    if elapsed < remaining {
        countdown.remaining_seconds = narrow(remaining - elapsed);
        return false;
    }

    if countdown.auto_repeat && countdown.total_seconds > 0 {
        let total = u64::from(countdown.total_seconds);
        let into_next = (elapsed - remaining) % total;
        countdown.remaining_seconds = narrow(total - into_next);
        debug!(remaining = countdown.remaining_seconds, "カウントダウンを繰り返します");
    } else {
        countdown.remaining_seconds = 0;
        countdown.running = false;
        countdown.paused = false;
        countdown.last_tick_epoch = None;
    }
    true
}

/// Advances a running Pomodoro, pushing one completion per crossed phase.
fn advance_pomodoro(
    pomodoro: &mut PomodoroState,
    now: Timestamp,
    events: &mut Vec<CompletionEvent>,
) {
    if !pomodoro.running {
        return;
    }
    let Some(mut elapsed) = take_elapsed(&mut pomodoro.last_tick_epoch, now) else {
        return;
    };

    let mut crossed = 0usize;
    let mut folded_cycles = 0u64;
    loop {
        let remaining = u64::from(pomodoro.remaining_seconds);
        if elapsed < remaining {
            pomodoro.remaining_seconds = narrow(remaining - elapsed);
            break;
        }
        elapsed -= remaining;

        let finished = pomodoro.advance_phase();
        crossed += 1;
        if crossed <= MAX_REPLAYED_COMPLETIONS {
            events.push(CompletionEvent::PhaseComplete(finished));
        }
        debug!(
            finished = finished.as_str(),
            next = pomodoro.phase.as_str(),
            session = pomodoro.current_session,
            "フェーズが切り替わりました"
        );

        if !pomodoro.auto_start_next {
            pomodoro.running = false;
            pomodoro.last_tick_epoch = None;
            break;
        }

        // Past the cap we are at a phase start on the cycle; whole cycles
        // leave the state unchanged.
        if crossed >= MAX_REPLAYED_COMPLETIONS {
            let cycle = full_cycle_seconds(pomodoro);
            if cycle > 0 && elapsed >= cycle {
                folded_cycles += elapsed / cycle;
                elapsed %= cycle;
            }
        }
    }

    if crossed > MAX_REPLAYED_COMPLETIONS || folded_cycles > 0 {
        debug!(crossed, folded_cycles, "上限を超えたフェーズ完了通知を省略しました");
    }
}

/// Length of one Work/ShortBreak/.../LongBreak cycle.
fn full_cycle_seconds(pomodoro: &PomodoroState) -> u64 {
    let sessions = u64::from(pomodoro.sessions_before_long.max(1));
    sessions * u64::from(pomodoro.work_seconds)
        + (sessions - 1) * u64::from(pomodoro.short_break_seconds)
        + u64::from(pomodoro.long_break_seconds)
}

/// Narrows a value already bounded by a `u32` duration.
fn narrow(seconds: u64) -> u32 {
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

// ============================================================================
// Tests
// ============================================================================
