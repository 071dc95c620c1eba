//! Core data types for the timer engine.
//!
//! This module defines the data structures used for:
//! - Display mode selection (clock / countdown / Pomodoro)
//! - Countdown and Pomodoro sub-states
//! - The persisted engine snapshot
//! - Completion events handed to the notification port
//! - IPC request/response serialization (see [`ipc`])

pub mod ipc;

use serde::{Deserialize, Serialize};

pub use crate::time::Timestamp;
pub use ipc::{ConfigureParams, IpcRequest, IpcResponse};

/// Default countdown duration (the first preset).
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 5 * 60;

/// Default work phase duration.
pub const DEFAULT_WORK_SECONDS: u32 = 25 * 60;

/// Default short break duration.
pub const DEFAULT_SHORT_BREAK_SECONDS: u32 = 5 * 60;

/// Default long break duration.
pub const DEFAULT_LONG_BREAK_SECONDS: u32 = 15 * 60;

/// Default number of work sessions before a long break.
pub const DEFAULT_SESSIONS_BEFORE_LONG: u8 = 4;

// ============================================================================
// Mode
// ============================================================================

/// Which face of the utility is displayed.
///
/// Switching mode never touches the inactive sub-states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Wall-clock display
    #[default]
    Clock,
    /// Countdown timer
    Countdown,
    /// Pomodoro work/break cycle
    Pomodoro,
}

impl Mode {
    /// Returns the mode that follows this one: Clock → Countdown → Pomodoro → Clock.
    pub fn next(self) -> Self {
        match self {
            Mode::Clock => Mode::Countdown,
            Mode::Countdown => Mode::Pomodoro,
            Mode::Pomodoro => Mode::Clock,
        }
    }

    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Clock => "clock",
            Mode::Countdown => "countdown",
            Mode::Pomodoro => "pomodoro",
        }
    }

    /// Returns true if the mode owns a timer that can be started.
    pub fn has_timer(&self) -> bool {
        !matches!(self, Mode::Clock)
    }
}

// ============================================================================
// Phase
// ============================================================================

/// One segment of the Pomodoro cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Focused work
    #[default]
    Work,
    /// Short break between work sessions
    ShortBreak,
    /// Long break after `sessions_before_long` work sessions
    LongBreak,
}

impl Phase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "作業",
            Phase::ShortBreak => "短い休憩",
            Phase::LongBreak => "長い休憩",
        }
    }

    /// Returns true for either break phase.
    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }
}

// ============================================================================
// CountdownState
// ============================================================================

/// State of the countdown timer.
///
/// Invariants: `remaining_seconds <= total_seconds`, and `running` and
/// `paused` are never both true. `!running && !paused` means idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    /// Selected duration
    pub total_seconds: u32,
    /// Seconds left in the current run
    pub remaining_seconds: u32,
    /// Currently counting down
    pub running: bool,
    /// Stopped mid-run by the user
    pub paused: bool,
    /// Restart from `total_seconds` on reaching zero
    pub auto_repeat: bool,
    /// Instant of the last applied tick; `None` unless running
    pub last_tick_epoch: Option<Timestamp>,
}

impl Default for CountdownState {
    fn default() -> Self {
        Self::with_duration(DEFAULT_COUNTDOWN_SECONDS)
    }
}

impl CountdownState {
    /// Creates an idle countdown of the given length.
    pub fn with_duration(total_seconds: u32) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            running: false,
            paused: false,
            auto_repeat: false,
            last_tick_epoch: None,
        }
    }

    /// Returns true if neither running nor paused.
    pub fn is_idle(&self) -> bool {
        !self.running && !self.paused
    }

    /// Fraction of the run already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        progress_of(self.remaining_seconds, self.total_seconds)
    }

    /// Resets to the full duration and idles.
    pub fn reset(&mut self) {
        self.remaining_seconds = self.total_seconds;
        self.running = false;
        self.paused = false;
        self.last_tick_epoch = None;
    }

    /// Restores the invariants on state read from outside the engine.
    pub fn sanitize(&mut self) {
        self.remaining_seconds = self.remaining_seconds.min(self.total_seconds);
        if self.running {
            self.paused = false;
        } else {
            self.last_tick_epoch = None;
        }
    }
}

// ============================================================================
// PomodoroState
// ============================================================================

/// State of the Pomodoro cycle.
///
/// Invariants: `remaining_seconds <= duration_of(phase)` and
/// `current_session <= sessions_before_long`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroState {
    /// Current phase
    pub phase: Phase,
    /// Work phase duration
    pub work_seconds: u32,
    /// Short break duration
    pub short_break_seconds: u32,
    /// Long break duration
    pub long_break_seconds: u32,
    /// Work sessions before a long break
    pub sessions_before_long: u8,
    /// Work phases completed since the last long break
    pub current_session: u8,
    /// Seconds left in the current phase
    pub remaining_seconds: u32,
    /// Currently counting down
    pub running: bool,
    /// Start the next phase automatically on completion
    pub auto_start_next: bool,
    /// Instant of the last applied tick; `None` unless running
    pub last_tick_epoch: Option<Timestamp>,
}

impl Default for PomodoroState {
    fn default() -> Self {
        Self::with_settings(PomodoroSettings::default())
    }
}

impl PomodoroState {
    /// Creates an idle cycle at the start of a work phase.
    pub fn with_settings(settings: PomodoroSettings) -> Self {
        Self {
            phase: Phase::Work,
            work_seconds: settings.work_seconds,
            short_break_seconds: settings.short_break_seconds,
            long_break_seconds: settings.long_break_seconds,
            sessions_before_long: settings.sessions_before_long,
            current_session: 0,
            remaining_seconds: settings.work_seconds,
            running: false,
            auto_start_next: false,
            last_tick_epoch: None,
        }
    }

    /// Returns the configured duration of a phase.
    pub fn duration_of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_seconds,
            Phase::ShortBreak => self.short_break_seconds,
            Phase::LongBreak => self.long_break_seconds,
        }
    }

    /// Returns the full duration of the current phase.
    pub fn phase_total(&self) -> u32 {
        self.duration_of(self.phase)
    }

    /// Returns the current duration settings.
    pub fn settings(&self) -> PomodoroSettings {
        PomodoroSettings {
            work_seconds: self.work_seconds,
            short_break_seconds: self.short_break_seconds,
            long_break_seconds: self.long_break_seconds,
            sessions_before_long: self.sessions_before_long,
        }
    }

    /// Returns true if no progress has been made in the current phase.
    pub fn is_idle(&self) -> bool {
        !self.running && self.remaining_seconds == self.phase_total()
    }

    /// Fraction of the current phase already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        progress_of(self.remaining_seconds, self.phase_total())
    }

    /// Moves to the next phase per the transition table and refills
    /// `remaining_seconds`. Returns the phase that was left.
    ///
    /// | left       | sessions after increment   | next       |
    /// |------------|----------------------------|------------|
    /// | Work       | `< sessions_before_long`   | ShortBreak |
    /// | Work       | `== sessions_before_long`  | LongBreak (counter back to 0) |
    /// | ShortBreak | -                          | Work       |
    /// | LongBreak  | -                          | Work       |
    pub fn advance_phase(&mut self) -> Phase {
        let finished = self.phase;
        self.phase = match finished {
            Phase::Work => {
                self.current_session = self.current_session.saturating_add(1);
                if self.current_session >= self.sessions_before_long {
                    self.current_session = 0;
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        };
        self.remaining_seconds = self.phase_total();
        finished
    }

    /// Returns to the start of a work phase and idles.
    pub fn reset(&mut self) {
        self.phase = Phase::Work;
        self.current_session = 0;
        self.remaining_seconds = self.work_seconds;
        self.running = false;
        self.last_tick_epoch = None;
    }

    /// Restores the invariants on state read from outside the engine.
    ///
    /// Zero durations fall back to the defaults.
    pub fn sanitize(&mut self) {
        let defaults = PomodoroSettings::default();
        if self.work_seconds == 0 {
            self.work_seconds = defaults.work_seconds;
        }
        if self.short_break_seconds == 0 {
            self.short_break_seconds = defaults.short_break_seconds;
        }
        if self.long_break_seconds == 0 {
            self.long_break_seconds = defaults.long_break_seconds;
        }
        self.sessions_before_long = self.sessions_before_long.max(1);
        self.current_session = self.current_session.min(self.sessions_before_long);
        self.remaining_seconds = self.remaining_seconds.min(self.phase_total());
        if !self.running {
            self.last_tick_epoch = None;
        }
    }
}

// ============================================================================
// PomodoroSettings
// ============================================================================

/// Configurable durations of the Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroSettings {
    /// Work phase duration
    pub work_seconds: u32,
    /// Short break duration
    pub short_break_seconds: u32,
    /// Long break duration
    pub long_break_seconds: u32,
    /// Work sessions before a long break
    pub sessions_before_long: u8,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_seconds: DEFAULT_WORK_SECONDS,
            short_break_seconds: DEFAULT_SHORT_BREAK_SECONDS,
            long_break_seconds: DEFAULT_LONG_BREAK_SECONDS,
            sessions_before_long: DEFAULT_SESSIONS_BEFORE_LONG,
        }
    }
}

impl PomodoroSettings {
    /// Returns true if every duration and the session count are non-zero.
    pub fn is_valid(&self) -> bool {
        self.work_seconds > 0
            && self.short_break_seconds > 0
            && self.long_break_seconds > 0
            && self.sessions_before_long > 0
    }
}

// ============================================================================
// EngineSnapshot
// ============================================================================

/// The complete persisted engine state.
///
/// Observers only ever receive value copies of this struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Displayed mode
    pub mode: Mode,
    /// Countdown sub-state
    pub countdown: CountdownState,
    /// Pomodoro sub-state
    pub pomodoro: PomodoroState,
    /// Instant this snapshot was last committed
    pub saved_at: Timestamp,
}

impl EngineSnapshot {
    /// Progress of the displayed timer, or `None` in clock mode.
    pub fn progress(&self) -> Option<f64> {
        match self.mode {
            Mode::Clock => None,
            Mode::Countdown => Some(self.countdown.progress()),
            Mode::Pomodoro => Some(self.pomodoro.progress()),
        }
    }

    /// Returns true if either timer is counting down.
    pub fn any_running(&self) -> bool {
        self.countdown.running || self.pomodoro.running
    }

    /// Restores all invariants (used on snapshots loaded from disk).
    pub fn sanitize(&mut self) {
        self.countdown.sanitize();
        self.pomodoro.sanitize();
    }
}

// ============================================================================
// CompletionEvent
// ============================================================================

/// Emitted to the notification port when a timer reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "phase", rename_all = "snake_case")]
pub enum CompletionEvent {
    /// The countdown reached zero
    CountdownComplete,
    /// A Pomodoro phase reached zero
    PhaseComplete(Phase),
}

impl CompletionEvent {
    /// Returns the string representation of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionEvent::CountdownComplete => "countdown_complete",
            CompletionEvent::PhaseComplete(_) => "phase_complete",
        }
    }
}

fn progress_of(remaining: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (1.0 - f64::from(remaining) / f64::from(total)).clamp(0.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================
