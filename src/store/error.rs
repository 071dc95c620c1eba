//! Persistence error types.
//!
//! None of these errors is fatal. Read failures make the store fall back to
//! default state; write failures are reported to the host while the in-memory
//! engine state stays authoritative.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving a snapshot.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The snapshot file exists but could not be read.
    #[error("スナップショットを読み込めません ({path}): {source}")]
    Unreadable {
        /// Snapshot file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file could not be parsed.
    #[error("スナップショットが破損しています ({path}): {source}")]
    Corrupt {
        /// Snapshot file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be serialized.
    #[error("スナップショットのシリアライズに失敗しました: {0}")]
    Encode(#[source] serde_json::Error),

    /// The snapshot could not be written.
    #[error("スナップショットの保存に失敗しました ({path}): {source}")]
    Write {
        /// Snapshot file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The backing store refused the write.
    #[error("ストレージが利用できません: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Returns true if this error happened while saving.
    #[must_use]
    pub fn is_write_error(&self) -> bool {
        matches!(
            self,
            Self::Encode(_) | Self::Write { .. } | Self::Unavailable(_)
        )
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Unreadable { .. } => "ファイルの権限を確認してください",
            Self::Corrupt { .. } => "既定の状態で起動しました。破損したファイルは次回の保存で上書きされます",
            Self::Encode(_) => "アプリケーションを再起動してください",
            Self::Write { .. } | Self::Unavailable(_) => {
                "ディスクの空き容量と書き込み権限を確認してください"
            }
        }
    }
}
