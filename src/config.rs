//! Application configuration.
//!
//! Read once at startup from `<config_dir>/floatclock/config.json`. Every field
//! has a default, so a missing file (or a partial one) is fine. The config
//! only seeds the first-launch snapshot; after that the persisted snapshot is
//! authoritative.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::broadcast::DEFAULT_BROADCAST_CAPACITY;
use crate::clock::ClockFormat;
use crate::notification::{HookSink, DEFAULT_HOOK_TIMEOUT_SECONDS};
use crate::store::SNAPSHOT_FILE_NAME;
use crate::types::{
    ConfigureParams, CountdownState, EngineSnapshot, PomodoroSettings, PomodoroState,
};

/// Directory name under the platform config/data directories.
const APP_DIR_NAME: &str = "floatclock";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.json";

/// Control socket file name.
const SOCKET_FILE_NAME: &str = "floatclock.sock";

// ============================================================================
// Sections
// ============================================================================

/// Countdown defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownConfig {
    /// Initial countdown length in minutes (1-1440)
    pub default_minutes: u32,
    /// Preset lengths offered by the UI, in minutes (1-1440 each)
    pub presets: Vec<u32>,
    /// Restart the countdown automatically on completion
    pub auto_repeat: bool,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            default_minutes: 5,
            presets: vec![5, 10, 25, 45, 60],
            auto_repeat: false,
        }
    }
}

/// Pomodoro defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PomodoroConfig {
    /// Work duration in minutes (1-120)
    pub work_minutes: u32,
    /// Short break duration in minutes (1-60)
    pub short_break_minutes: u32,
    /// Long break duration in minutes (1-60)
    pub long_break_minutes: u32,
    /// Work sessions before a long break (1-12)
    pub sessions_before_long: u8,
    /// Start the next phase automatically on completion
    pub auto_start_next: bool,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sessions_before_long: 4,
            auto_start_next: false,
        }
    }
}

impl PomodoroConfig {
    /// Validates the ranges.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        check_work_minutes(self.work_minutes)?;
        check_short_break_minutes(self.short_break_minutes)?;
        check_long_break_minutes(self.long_break_minutes)?;
        check_sessions(self.sessions_before_long)
    }

    /// Converts the minute-based settings into engine settings.
    pub fn settings(&self) -> PomodoroSettings {
        PomodoroSettings {
            work_seconds: self.work_minutes * 60,
            short_break_seconds: self.short_break_minutes * 60,
            long_break_seconds: self.long_break_minutes * 60,
            sessions_before_long: self.sessions_before_long,
        }
    }
}

fn check_work_minutes(minutes: u32) -> Result<(), String> {
    if !(1..=120).contains(&minutes) {
        return Err("作業時間は1-120分の範囲で指定してください".to_string());
    }
    Ok(())
}

fn check_short_break_minutes(minutes: u32) -> Result<(), String> {
    if !(1..=60).contains(&minutes) {
        return Err("短い休憩時間は1-60分の範囲で指定してください".to_string());
    }
    Ok(())
}

fn check_long_break_minutes(minutes: u32) -> Result<(), String> {
    if !(1..=60).contains(&minutes) {
        return Err("長い休憩時間は1-60分の範囲で指定してください".to_string());
    }
    Ok(())
}

fn check_sessions(sessions: u8) -> Result<(), String> {
    if !(1..=12).contains(&sessions) {
        return Err("長い休憩までのセッション数は1-12の範囲で指定してください".to_string());
    }
    Ok(())
}

/// Applies the Pomodoro duration changes in `params` to `current`.
///
/// Only the fields present in `params` are range-checked and replaced; the
/// others keep their exact second values.
pub fn merge_pomodoro_changes(
    current: PomodoroSettings,
    params: &ConfigureParams,
) -> Result<PomodoroSettings, String> {
    let mut settings = current;
    if let Some(minutes) = params.work_minutes {
        check_work_minutes(minutes)?;
        settings.work_seconds = minutes * 60;
    }
    if let Some(minutes) = params.short_break_minutes {
        check_short_break_minutes(minutes)?;
        settings.short_break_seconds = minutes * 60;
    }
    if let Some(minutes) = params.long_break_minutes {
        check_long_break_minutes(minutes)?;
        settings.long_break_seconds = minutes * 60;
    }
    if let Some(sessions) = params.sessions_before_long {
        check_sessions(sessions)?;
        settings.sessions_before_long = sessions;
    }
    Ok(settings)
}

/// Completion notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Shell command run on every completion (see `HookSink`)
    pub hook_command: Option<String>,
    /// Hook timeout in seconds
    pub hook_timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            hook_command: None,
            hook_timeout_seconds: DEFAULT_HOOK_TIMEOUT_SECONDS,
        }
    }
}

impl NotificationConfig {
    /// Builds the hook sink, if a command is configured.
    pub fn hook(&self) -> Option<HookSink> {
        self.hook_command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
            .map(|command| HookSink::new(command).with_timeout(self.hook_timeout_seconds))
    }
}

// ============================================================================
// AppConfig
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where the snapshot (and by default the socket) lives
    pub data_dir: Option<PathBuf>,
    /// Control socket path override
    pub socket_path: Option<PathBuf>,
    /// Clock rendering
    pub clock: ClockFormat,
    /// Countdown defaults
    pub countdown: CountdownConfig,
    /// Pomodoro defaults
    pub pomodoro: PomodoroConfig,
    /// Completion notifications
    pub notifications: NotificationConfig,
    /// Unread snapshots kept per observer before the oldest is dropped
    pub broadcast_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            socket_path: None,
            clock: ClockFormat::default(),
            countdown: CountdownConfig::default(),
            pomodoro: PomodoroConfig::default(),
            notifications: NotificationConfig::default(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Returns the default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads the config from `path`, or from the default location.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "設定ファイルがないため既定値を使用します");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("設定ファイルを読み込めません: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("設定ファイルのパースに失敗しました: {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        let countdown = &self.countdown;
        if countdown.default_minutes < 1 || countdown.default_minutes > 1440 {
            return Err("カウントダウンの既定時間は1-1440分の範囲で指定してください".to_string());
        }
        if countdown.presets.iter().any(|m| *m < 1 || *m > 1440) {
            return Err("プリセットは1-1440分の範囲で指定してください".to_string());
        }

        self.pomodoro.validate()?;

        if self.broadcast_capacity < 1 {
            return Err("broadcast_capacity は1以上を指定してください".to_string());
        }
        Ok(())
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
        })
    }

    /// Returns the snapshot file path.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir().join(SNAPSHOT_FILE_NAME)
    }

    /// Returns the control socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(SOCKET_FILE_NAME))
    }

    /// The snapshot used on first launch.
    pub fn initial_snapshot(&self) -> EngineSnapshot {
        let mut countdown = CountdownState::with_duration(self.countdown.default_minutes * 60);
        countdown.auto_repeat = self.countdown.auto_repeat;

        let mut pomodoro = PomodoroState::with_settings(self.pomodoro.settings());
        pomodoro.auto_start_next = self.pomodoro.auto_start_next;

        EngineSnapshot {
            countdown,
            pomodoro,
            ..EngineSnapshot::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
