//! Offline photo library indexing: reverse geocoding against a bundled
//! gazetteer, label-to-tag classification and tag persistence.

pub mod config;
pub mod db;
pub mod geo;
pub mod labels;
pub mod logging;
pub mod scanner;
pub mod tags;
