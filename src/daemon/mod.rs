//! Daemon module for floatclock.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with commands, ticking and resume recomputation
//! - `ipc`: Control socket server and request dispatch
//! - `runner`: Host loop driving the engine at 1 Hz

pub mod ipc;
pub mod runner;
pub mod timer;

pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use runner::run;
pub use timer::{CommandStatus, InvalidCommand, Outcome, TimerEngine, MAX_REPLAYED_COMPLETIONS};
