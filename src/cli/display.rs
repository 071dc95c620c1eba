//! Display utilities for the floatclock CLI.
//!
//! This module provides formatted output for:
//! - Command results and warnings
//! - Error messages
//! - Status display
//! - The local clock and `watch` lines

use crate::clock::{format_remaining, summary, ClockFace};
use crate::types::{EngineSnapshot, IpcResponse, Mode};

/// Width of the text progress bar
const PROGRESS_BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a command.
    pub fn show_response(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        if let Some(data) = &response.data {
            if let Some(line) = Self::remaining_line(data) {
                println!("  {}", line);
            }
        }
        if let Some(warning) = &response.warning {
            eprintln!("警告: {}", warning);
        }
    }

    /// Shows the full state.
    pub fn show_status(snapshot: &EngineSnapshot, face: &ClockFace) {
        for line in Self::status_lines(snapshot, face) {
            println!("{}", line);
        }
    }

    /// Shows the configured countdown presets.
    pub fn show_presets(presets: &[u32]) {
        if let Some(line) = Self::presets_line(presets) {
            println!("{}", line);
        }
    }

    /// Shows one line per snapshot while watching.
    pub fn show_watch_line(snapshot: &EngineSnapshot, face: &ClockFace) {
        println!("{}", summary(snapshot, face));
    }

    /// Shows the local clock.
    pub fn show_clock(face: &ClockFace) {
        println!("{}", face.time);
        println!("{}", face.date);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Builds the status report.
    fn status_lines(snapshot: &EngineSnapshot, face: &ClockFace) -> Vec<String> {
        let countdown = &snapshot.countdown;
        let pomodoro = &snapshot.pomodoro;

        let mut lines = vec![
            "floatclock ステータス".to_string(),
            "─────────────────────────────".to_string(),
            format!("表示モード: {}", Self::mode_label(snapshot.mode)),
            format!("時刻: {} ({})", face.time, face.date),
            String::new(),
            format!(
                "カウントダウン: {} / {} [{}]",
                format_remaining(countdown.remaining_seconds),
                format_remaining(countdown.total_seconds),
                Self::countdown_state(snapshot)
            ),
            format!("  {}", Self::progress_bar(countdown.progress())),
            format!(
                "ポモドーロ: {} {} [{}]",
                pomodoro.phase.label(),
                format_remaining(pomodoro.remaining_seconds),
                Self::pomodoro_state(snapshot)
            ),
            format!("  {}", Self::progress_bar(pomodoro.progress())),
            format!(
                "  セッション: {}/{}",
                pomodoro.current_session, pomodoro.sessions_before_long
            ),
        ];

        let mut flags = Vec::new();
        if countdown.auto_repeat {
            flags.push("カウントダウン自動リピート");
        }
        if pomodoro.auto_start_next {
            flags.push("次のフェーズを自動開始");
        }
        if !flags.is_empty() {
            lines.push(format!("設定: {}", flags.join(", ")));
        }
        lines
    }

    fn presets_line(presets: &[u32]) -> Option<String> {
        if presets.is_empty() {
            return None;
        }
        let minutes: Vec<String> = presets.iter().map(u32::to_string).collect();
        Some(format!("プリセット: {} 分 (floatclock preset <分>)", minutes.join(" / ")))
    }

    /// Remaining time of the displayed timer, if it has one.
    fn remaining_line(snapshot: &EngineSnapshot) -> Option<String> {
        if !snapshot.mode.has_timer() {
            return None;
        }
        let line = if snapshot.mode == Mode::Pomodoro {
            format!(
                "{} 残り時間: {}",
                snapshot.pomodoro.phase.label(),
                format_remaining(snapshot.pomodoro.remaining_seconds)
            )
        } else {
            format!(
                "残り時間: {}",
                format_remaining(snapshot.countdown.remaining_seconds)
            )
        };
        Some(line)
    }

    fn mode_label(mode: Mode) -> &'static str {
        match mode {
            Mode::Clock => "時計",
            Mode::Countdown => "カウントダウン",
            Mode::Pomodoro => "ポモドーロ",
        }
    }

    fn countdown_state(snapshot: &EngineSnapshot) -> &'static str {
        let countdown = &snapshot.countdown;
        if countdown.running {
            "実行中"
        } else if countdown.paused {
            "一時停止中"
        } else if countdown.remaining_seconds == 0 {
            "完了"
        } else {
            "待機中"
        }
    }

    fn pomodoro_state(snapshot: &EngineSnapshot) -> &'static str {
        let pomodoro = &snapshot.pomodoro;
        if pomodoro.running {
            "実行中"
        } else if pomodoro.is_idle() {
            "待機中"
        } else {
            "一時停止中"
        }
    }

    /// Renders progress in [0, 1] as a bar with a percentage.
    fn progress_bar(progress: f64) -> String {
        let progress = progress.clamp(0.0, 1.0);
        let filled = (progress * PROGRESS_BAR_WIDTH as f64).round() as usize;
        format!(
            "[{}{}] {:>3}%",
            "#".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            (progress * 100.0).round() as u32
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
