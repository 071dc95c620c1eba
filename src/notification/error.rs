//! Notification system error types.
//!
//! Notification failures never reach the engine: the dispatcher logs them and
//! moves on to the next event.

use thiserror::Error;

/// Errors that can occur while delivering a completion notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The hook command could not be started.
    #[error("通知フックを起動できません '{0}': {1}")]
    SpawnFailed(String, String),

    /// The hook command exited with a failure status.
    #[error("通知フック '{0}' が失敗しました: {1}")]
    HookFailed(String, String),

    /// The hook command did not finish in time.
    #[error("通知フック '{0}' がタイムアウトしました（{1}秒）")]
    HookTimeout(String, u64),

    /// The dispatcher is no longer receiving events.
    #[error("通知チャネルが閉じられています")]
    ChannelClosed,
}

impl NotificationError {
    /// Returns true if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HookTimeout(_, _))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SpawnFailed(_, _) => "設定ファイルの notifications.hook_command を確認してください",
            Self::HookFailed(_, _) => "フックコマンドを単体で実行して動作を確認してください",
            Self::HookTimeout(_, _) => "フックの処理を簡素化するか、hook_timeout_seconds を延長してください",
            Self::ChannelClosed => "デーモンを再起動してください",
        }
    }
}
