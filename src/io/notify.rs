//! Notification and navigation collaborators
//!
//! The API client never renders anything itself. Failures are handed to a
//! `Notifier`, session teardown asks a `Navigator` to move to the login route.

use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Destructive,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Default => "default",
            Variant::Destructive => "destructive",
        }
    }
}

/// A user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), variant: Variant::Destructive }
    }
}

/// Fire-and-forget "show message"
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Full navigation to a fixed route
pub trait Navigator: Send + Sync {
    fn redirect(&self, route: &str);
}

/// Writes notifications to stderr and the log
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            Variant::Destructive => warn!(
                variant = notification.variant.as_str(),
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
            Variant::Default => info!(
                variant = notification.variant.as_str(),
                title = %notification.title,
                description = %notification.description,
                "notification"
            ),
        }
        eprintln!("{}: {}", notification.title, notification.description);
    }
}

/// A terminal has nowhere to navigate to; tell the operator how to log in again
#[derive(Debug)]
pub struct TerminalNavigator {
    program: String,
}

impl TerminalNavigator {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Navigator for TerminalNavigator {
    fn redirect(&self, route: &str) {
        info!(route = %route, "navigation_redirect");
        eprintln!("Session ended. Run `{} login` to sign in again.", self.program);
    }
}

/// Captures notifications for headless tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// Captures redirects for headless tests
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, route: &str) {
        self.routes.lock().push(route.to_string());
    }
}
