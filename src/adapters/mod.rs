//! Concrete adapter implementations for ports.

pub mod delimited_adapter;
pub mod file_config_adapter;
pub mod csv_report_adapter;
