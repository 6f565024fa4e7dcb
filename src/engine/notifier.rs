//! User-visible error notification (spec Section 7): the out-of-scope OS
//! notification collaborator would implement this trait; the crate ships a
//! logging-only default so the engine never crashes the process on a
//! surfaced error.

use log::error;

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

#[derive(Default)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, title: &str, message: &str) {
        error!("[{title}] {message}");
    }
}
