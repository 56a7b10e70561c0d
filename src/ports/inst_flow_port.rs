//! Institutional net-flow access port trait.

use crate::domain::error::TwscanError;
use crate::domain::inst_flow::InstFlow;

pub trait InstFlowPort {
    /// Daily net flow for `code`; `None` when the source has no rows for it.
    fn inst_flow(&self, code: &str) -> Result<Option<InstFlow>, TwscanError>;
}
