//! Port traits (interfaces) for hexagonal architecture.

pub mod config_port;
pub mod data_port;
pub mod inst_flow_port;
pub mod notifier;
pub mod report_port;
