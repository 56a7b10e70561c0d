//! Held-instrument list file.

use crate::domain::error::TwscanError;
use crate::domain::universe::HeldSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reads a held list; a missing file means nothing is held.
pub fn load_held(path: &Path) -> Result<HeldSet, TwscanError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(HeldSet::parse(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HeldSet::new()),
        Err(e) => Err(TwscanError::Io(e)),
    }
}
