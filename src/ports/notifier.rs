//! Notification delivery port trait.

use crate::domain::error::TwscanError;

pub trait Notifier {
    fn notify(&self, code: &str, message: &str) -> Result<(), TwscanError>;
}
