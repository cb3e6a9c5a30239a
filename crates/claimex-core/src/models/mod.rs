//! Data models: templates, extracted values, results and configuration.

pub mod config;
pub mod result;
pub mod template;
pub mod value;
