//! Concrete adapter implementations for ports, plus the output formats.

pub mod csv_export;
pub mod file_config_adapter;
pub mod fs_data_adapter;
pub mod svg_chart;
#[cfg(feature = "web")]
pub mod web;
