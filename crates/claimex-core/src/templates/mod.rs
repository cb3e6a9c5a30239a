//! Template registry and the shipped templates.

pub mod baseline;
mod registry;

pub use baseline::{LAB_RESULT, MEDICAL_BILL, PRESCRIPTION};
pub use registry::TemplateRegistry;
