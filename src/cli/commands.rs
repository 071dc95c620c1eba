//! Command definitions for the floatclock CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::ConfigureParams;

// ============================================================================
// CLI Structure
// ============================================================================

/// floatclock - clock, countdown and Pomodoro timer
#[derive(Parser, Debug)]
#[command(
    name = "floatclock",
    version,
    about = "時計・カウントダウン・ポモドーロのマルチモードタイマー",
    long_about = "常駐デーモンがタイマーを刻み、状態をディスクに保存します。\n\
                  スリープや再起動をまたいでも残り時間を正しく復元します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: <config_dir>/floatclock/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Control socket path (overrides the config)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the timer daemon in the foreground
    Daemon,

    /// Start or resume the displayed timer
    Start,

    /// Pause the displayed timer
    Pause,

    /// Reset the displayed timer
    Reset,

    /// Set the countdown to a preset length
    Preset {
        /// Length in minutes (1-1440)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=1440))]
        minutes: u32,
    },

    /// Set the countdown length in seconds
    Duration {
        /// Length in seconds (1-86400)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=86400))]
        seconds: u32,
    },

    /// Switch to the next mode (clock → countdown → pomodoro)
    Mode,

    /// Skip to the next Pomodoro phase
    Skip,

    /// Change timer settings
    Configure(ConfigureArgs),

    /// Show the current state
    Status,

    /// Follow state changes until interrupted
    Watch,

    /// Show the current time (no daemon needed)
    Clock,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Configure Command Arguments
// ============================================================================

/// Arguments for the configure command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigureArgs {
    /// Restart the countdown automatically on completion
    #[arg(long, value_name = "BOOL")]
    pub auto_repeat: Option<bool>,

    /// Start the next Pomodoro phase automatically
    #[arg(long, value_name = "BOOL")]
    pub auto_start_next: Option<bool>,

    /// Work duration in minutes (1-120)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub work: Option<u32>,

    /// Short break duration in minutes (1-60)
    #[arg(short = 'b', long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub long_break: Option<u32>,

    /// Work sessions before a long break (1-12)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=12))]
    pub sessions: Option<u8>,
}

impl ConfigureArgs {
    /// Converts the arguments into IPC parameters.
    pub fn to_params(&self) -> ConfigureParams {
        ConfigureParams {
            auto_repeat: self.auto_repeat,
            auto_start_next: self.auto_start_next,
            work_minutes: self.work,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            sessions_before_long: self.sessions,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
