//! Clock face and display strings.
//!
//! Pure functions of a time value and the engine snapshot; no state. Used by
//! the CLI and by any external renderer that wants the same text as the
//! menu bar summary.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::types::{EngineSnapshot, Mode, Phase};

/// Emoji for the countdown
const COUNTDOWN_EMOJI: &str = "⏳";

/// Emoji for a work phase
const WORKING_EMOJI: &str = "🍅";

/// Emoji for a break phase
const BREAK_EMOJI: &str = "☕";

/// Marker appended to a stopped-mid-run timer
const PAUSED_MARKER: &str = "⏸";

/// How the wall clock is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockFormat {
    /// 24-hour clock instead of AM/PM
    #[serde(default = "default_true")]
    pub use_24h: bool,
    /// Include seconds in the time string
    #[serde(default = "default_true")]
    pub show_seconds: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ClockFormat {
    fn default() -> Self {
        Self {
            use_24h: true,
            show_seconds: true,
        }
    }
}

impl ClockFormat {
    fn time_pattern(&self) -> &'static str {
        match (self.use_24h, self.show_seconds) {
            (true, true) => "%H:%M:%S",
            (true, false) => "%H:%M",
            (false, true) => "%-I:%M:%S %p",
            (false, false) => "%-I:%M %p",
        }
    }
}

/// Rendered clock strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockFace {
    /// e.g. "14:05:09" or "2:05 PM"
    pub time: String,
    /// e.g. "Mon, Oct 19"
    pub date: String,
}

/// Renders the clock for `now` in whatever timezone it carries.
pub fn render<Tz>(now: &DateTime<Tz>, format: &ClockFormat) -> ClockFace
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ClockFace {
        time: now.format(format.time_pattern()).to_string(),
        date: now.format("%a, %b %-d").to_string(),
    }
}

/// Formats remaining seconds as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_remaining(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// One-line summary of the displayed mode, as shown in the menu bar.
///
/// - Clock: the clock time
/// - Countdown: "⏳ 04:10", with "⏸" appended while paused
/// - Pomodoro: "🍅 24:59" during work, "☕ 04:59" during breaks, "⏸" when
///   stopped mid-phase
pub fn summary(snapshot: &EngineSnapshot, face: &ClockFace) -> String {
    match snapshot.mode {
        Mode::Clock => face.time.clone(),
        Mode::Countdown => {
            let countdown = &snapshot.countdown;
            let text = format!(
                "{} {}",
                COUNTDOWN_EMOJI,
                format_remaining(countdown.remaining_seconds)
            );
            if countdown.paused {
                format!("{} {}", text, PAUSED_MARKER)
            } else {
                text
            }
        }
        Mode::Pomodoro => {
            let pomodoro = &snapshot.pomodoro;
            let emoji = match pomodoro.phase {
                Phase::Work => WORKING_EMOJI,
                Phase::ShortBreak | Phase::LongBreak => BREAK_EMOJI,
            };
            let text = format!("{} {}", emoji, format_remaining(pomodoro.remaining_seconds));
            if !pomodoro.running && !pomodoro.is_idle() {
                format!("{} {}", text, PAUSED_MARKER)
            } else {
                text
            }
        }
    }
}
