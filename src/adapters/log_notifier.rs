//! Notifier that writes message cards to the log.

use crate::domain::error::TwscanError;
use crate::ports::notifier::Notifier;

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, code: &str, message: &str) -> Result<(), TwscanError> {
        tracing::info!(code, "notification\n{message}");
        Ok(())
    }
}
