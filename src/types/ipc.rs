//! IPC request/response types shared by the daemon and the CLI client.

use serde::{Deserialize, Serialize};

use super::EngineSnapshot;

/// Optional settings changes carried by the configure command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureParams {
    /// Restart the countdown automatically on completion
    #[serde(rename = "autoRepeat", skip_serializing_if = "Option::is_none")]
    pub auto_repeat: Option<bool>,
    /// Start the next Pomodoro phase automatically
    #[serde(rename = "autoStartNext", skip_serializing_if = "Option::is_none")]
    pub auto_start_next: Option<bool>,
    /// Work duration in minutes
    #[serde(rename = "workMinutes", skip_serializing_if = "Option::is_none")]
    pub work_minutes: Option<u32>,
    /// Short break duration in minutes
    #[serde(rename = "shortBreakMinutes", skip_serializing_if = "Option::is_none")]
    pub short_break_minutes: Option<u32>,
    /// Long break duration in minutes
    #[serde(rename = "longBreakMinutes", skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    /// Work sessions before a long break
    #[serde(rename = "sessionsBeforeLong", skip_serializing_if = "Option::is_none")]
    pub sessions_before_long: Option<u8>,
}

impl ConfigureParams {
    /// Returns true if any Pomodoro duration setting is present.
    pub fn touches_pomodoro_durations(&self) -> bool {
        self.work_minutes.is_some()
            || self.short_break_minutes.is_some()
            || self.long_break_minutes.is_some()
            || self.sessions_before_long.is_some()
    }

    /// Returns true if nothing would change.
    pub fn is_empty(&self) -> bool {
        self.auto_repeat.is_none()
            && self.auto_start_next.is_none()
            && !self.touches_pomodoro_durations()
    }
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start (or resume) the displayed timer
    Start,
    /// Pause the displayed timer
    Pause,
    /// Reset the displayed timer
    Reset,
    /// Select a countdown preset
    Preset {
        /// Preset length in minutes
        minutes: u32,
    },
    /// Enter a countdown duration manually
    Duration {
        /// Duration in seconds
        seconds: u32,
    },
    /// Switch to the next mode
    CycleMode,
    /// Skip to the next Pomodoro phase
    AdvancePhase,
    /// Change timer settings
    Configure {
        /// Settings to change
        #[serde(flatten)]
        params: ConfigureParams,
    },
    /// Query the current snapshot
    Status,
    /// Stream every snapshot change until the client disconnects
    Watch,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Non-fatal problem the user should know about (e.g. a failed save)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Engine snapshot after the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EngineSnapshot>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<EngineSnapshot>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            warning: None,
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            warning: None,
            data: None,
        }
    }

    /// Attaches a warning.
    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    /// Returns true for error responses.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tagging() {
        let json = serde_json::to_string(&IpcRequest::CycleMode).unwrap();
        assert_eq!(json, r#"{"command":"cycle_mode"}"#);

        let json = serde_json::to_string(&IpcRequest::Preset { minutes: 25 }).unwrap();
        assert_eq!(json, r#"{"command":"preset","minutes":25}"#);
    }

    #[test]
    fn test_configure_flattened() {
        let request: IpcRequest =
            serde_json::from_str(r#"{"command":"configure","autoRepeat":true,"workMinutes":50}"#)
                .unwrap();
        match request {
            IpcRequest::Configure { params } => {
                assert_eq!(params.auto_repeat, Some(true));
                assert_eq!(params.work_minutes, Some(50));
                assert!(params.auto_start_next.is_none());
                assert!(params.touches_pomodoro_durations());
            }
            other => panic!("Expected Configure, got {:?}", other),
        }
    }

    #[test]
    fn test_configure_params_is_empty() {
        assert!(ConfigureParams::default().is_empty());
        let params = ConfigureParams {
            auto_start_next: Some(false),
            ..ConfigureParams::default()
        };
        assert!(!params.is_empty());
        assert!(!params.touches_pomodoro_durations());
    }

    #[test]
    fn test_response_skips_empty_fields() {
        let json = serde_json::to_string(&IpcResponse::error("失敗")).unwrap();
        assert!(!json.contains("data"));
        assert!(!json.contains("warning"));

        let response = IpcResponse::success("ok", Some(EngineSnapshot::default()))
            .with_warning(Some("保存に失敗しました".to_string()));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"data\""));
        assert!(!response.is_error());
    }
}
