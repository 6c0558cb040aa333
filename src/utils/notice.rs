//! User-visible transient notices.

use crate::domain::ports::Notifier;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

/// 只保留最新一則通知，超過 TTL 後自動失效
pub struct NoticeBoard {
    current: Mutex<Option<(Notice, Instant)>>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: Mutex::new(None),
            ttl,
        }
    }

    pub fn current(&self) -> Option<Notice> {
        let mut guard = self.current.lock().ok()?;
        match guard.as_ref() {
            Some((notice, shown_at)) if shown_at.elapsed() < self.ttl => Some(notice.clone()),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some((notice, Instant::now()));
        }
    }
}

/// CLI 用：寫到 stderr 並同步記錄到 tracing
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::error!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => tracing::debug!("{}", notice.message),
        }

        let icon = match notice.level {
            NoticeLevel::Info => "ℹ️",
            NoticeLevel::Success => "✅",
            NoticeLevel::Warning => "⚠️",
            NoticeLevel::Error => "❌",
        };
        eprintln!("{} {}", icon, notice.message);
    }
}
