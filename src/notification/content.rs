//! Notification text for completion events.

use crate::types::{CompletionEvent, Phase};

/// Title and body shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
}

impl NotificationContent {
    /// Builds the text for a completion event.
    pub fn for_event(event: CompletionEvent) -> Self {
        let (title, body) = match event {
            CompletionEvent::CountdownComplete => ("⏰ カウントダウン終了", "設定した時間が経過しました"),
            CompletionEvent::PhaseComplete(Phase::Work) => ("🍅 作業終了", "お疲れさまでした。休憩しましょう"),
            CompletionEvent::PhaseComplete(Phase::ShortBreak) => ("☕ 休憩終了", "作業に戻りましょう"),
            CompletionEvent::PhaseComplete(Phase::LongBreak) => {
                ("☕ 長い休憩終了", "新しいサイクルを始めましょう")
            }
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}
