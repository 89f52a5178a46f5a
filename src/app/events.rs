//! Defines the events the application layer sends to whatever is presenting it.

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// Events sent from the application layer to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// A short notification; the only user-visible outcome channel.
    Toast { kind: ToastKind, message: String },
    /// The requested artifact no longer exists; leave the detail view.
    NavigateToFileList,
    /// The saved artifact list changed (parse, rename, delete).
    FilesChanged,
}

impl UserEvent {
    pub fn success(message: impl Into<String>) -> Self {
        UserEvent::Toast {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        UserEvent::Toast {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        UserEvent::Toast {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }
}
