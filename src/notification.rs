use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Transient user-visible messages (toasts). The canvas calls it but owns none of its lifecycle.
pub trait NotificationSink {
    fn notify(&self, message: &str, level: NotificationLevel);
}

/// Routes notifications into the log only. Used by headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, message: &str, level: NotificationLevel) {
        match level {
            NotificationLevel::Warning | NotificationLevel::Error => {
                tracing::warn!(%level, "{message}")
            }
            NotificationLevel::Info | NotificationLevel::Success => {
                tracing::info!(%level, "{message}")
            }
        }
    }
}

/// Desktop notification daemon sink.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new("Poster Canvas")
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, message: &str, level: NotificationLevel) {
        let summary = match level {
            NotificationLevel::Error | NotificationLevel::Warning => {
                format!("{} ({level})", self.app_name)
            }
            NotificationLevel::Info | NotificationLevel::Success => self.app_name.clone(),
        };
        if let Err(err) = notify_rust::Notification::new()
            .appname(&self.app_name)
            .summary(&summary)
            .body(message)
            .show()
        {
            tracing::warn!("system notification failed: {err}");
        }
    }
}
