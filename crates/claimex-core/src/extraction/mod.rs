//! Field extraction: pattern matchers, the field extractor and the
//! document-level service that orchestrates them.

mod convert;
mod field;
pub mod matchers;
pub mod rules;
mod service;

pub use convert::convert_value;
pub use field::FieldExtractor;
pub use matchers::{MatchContext, PatternMatcher};
pub use service::{
    BatchDocument, DataExtractionService, DataExtractionServiceBuilder, ExtractOptions,
};

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Keep the match metadata while replacing the value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionMatch<U> {
        ExtractionMatch {
            value: f(self.value),
            confidence: self.confidence,
            position: self.position,
            source: self.source,
        }
    }
}
