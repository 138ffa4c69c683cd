//! Core domain types and logic: records, dataset location, segment and
//! trade assembly, chart scenes, and the queries built on top of them.

pub mod attributes;
pub mod chart;
pub mod dataset;
pub mod error;
pub mod locator;
pub mod query;
pub mod record;
pub mod segment;
pub mod series;
pub mod session;
pub mod settings;
pub mod trade;
