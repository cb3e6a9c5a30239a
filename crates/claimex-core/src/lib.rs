//! Core library for Vietnamese medical document data extraction.
//!
//! This crate provides:
//! - Declarative extraction templates with a registry and shipped templates
//!   for medical bills, prescriptions and lab results
//! - Pattern matchers (regex, keyword, table) with confidence scoring
//! - Field and document extraction with validation and post-processing
//! - Bounded extraction history and statistics

pub mod error;
pub mod events;
pub mod extraction;
pub mod history;
pub mod models;
pub mod postprocess;
pub mod templates;

pub use error::{ClaimexError, FieldError, PostProcessError, Result};
pub use events::{ChannelObserver, ExtractionEvent, ExtractionObserver, TracingObserver};
pub use extraction::{
    BatchDocument, DataExtractionService, DataExtractionServiceBuilder, ExtractOptions,
    ExtractionMatch, FieldExtractor,
};
pub use history::{BoundedHistory, HistoryStore, StatisticsReport};
pub use models::config::ClaimexConfig;
pub use models::result::{ExtractionError, ExtractionResult, ExtractionWarning, Severity};
pub use models::template::{
    DocumentCheck, ExtractionPattern, ExtractionTemplate, FieldDefinition, FieldValidation,
    PatternStrategy, PostAction, PostProcessingRule, TableKind, TemplateUpdate, ValidationRule,
};
pub use models::value::{ExtractedValue, FieldType, Measurement, TableRow};
pub use postprocess::{PostProcessingPipeline, PostProcessor};
pub use templates::TemplateRegistry;
