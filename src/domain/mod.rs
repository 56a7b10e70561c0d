//! Core domain types and logic.

pub mod ohlcv;
pub mod error;
pub mod indicator;
pub mod frame;
pub mod signal;
pub mod inst_flow;
pub mod stops;
pub mod execution;
pub mod position;
pub mod metrics;
pub mod backtest;
pub mod notification;
pub mod config;
pub mod config_validation;
pub mod scan;
pub mod universe;
