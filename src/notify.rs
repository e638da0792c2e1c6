use serde::Serialize;

pub const DEFAULT_DISMISS_AFTER_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// One toast. The shell hides it after `dismiss_after_ms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub dismiss_after_ms: u64,
}

#[derive(Debug)]
pub struct Notifier {
    dismiss_after_ms: u64,
    pending: Vec<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER_MS)
    }
}

impl Notifier {
    pub fn new(dismiss_after_ms: u64) -> Self {
        Self {
            dismiss_after_ms,
            pending: Vec::new(),
        }
    }

    pub fn set_dismiss_after(&mut self, ms: u64) {
        self.dismiss_after_ms = ms;
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.pending.push(Notice {
            kind,
            message: message.into(),
            dismiss_after_ms: self.dismiss_after_ms,
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeKind::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeKind::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeKind::Error, message);
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[Notice] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}
