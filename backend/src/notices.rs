//! # Notices
//!
//! User-facing notifications raised by the state layer: sync failures,
//! low-balance alerts and usage resets. The bus only carries the message;
//! rendering (toasts, banners, localization) belongs to the UI observers.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    /// `<domain>-<id>` of the entity the notice is about, if any
    pub entity_key: Option<String>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            entity_key: None,
        }
    }

    pub fn with_entity(mut self, entity_key: impl Into<String>) -> Self {
        self.entity_key = Some(entity_key.into());
        self
    }
}

/// Broadcasts notices to every subscribed observer. Publishing with no
/// observers is not an error; the notice is simply dropped.
#[derive(Clone)]
pub struct NoticeBus {
    sender: broadcast::Sender<Notice>,
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NOTICE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Returns the number of observers that received the notice
    pub fn publish(&self, notice: Notice) -> usize {
        debug!("Notice [{:?}] {}: {}", notice.level, notice.title, notice.message);
        self.sender.send(notice).unwrap_or(0)
    }

    pub fn info(&self, title: impl Into<String>, message: impl Into<String>) -> usize {
        self.publish(Notice::new(NoticeLevel::Info, title, message))
    }
}
