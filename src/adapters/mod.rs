//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod held_file_adapter;
pub mod inst_flow_csv_adapter;
pub mod log_notifier;
