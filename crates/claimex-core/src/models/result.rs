//! Extraction results and the diagnostics attached to them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::ExtractedValue;

/// Field tag used for document-level validation failures.
pub const VALIDATION_FIELD: &str = "validation";

/// Outcome of one extraction call. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Document type the template was resolved for.
    pub document_type: String,

    /// Extracted values by field name.
    pub extracted_data: BTreeMap<String, ExtractedValue>,

    /// Overall confidence: mean of the field confidences.
    pub confidence: f32,

    /// Per-field confidence (0.0 - 1.0).
    pub field_confidences: BTreeMap<String, f32>,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Extraction errors.
    pub errors: Vec<ExtractionError>,

    /// Extraction warnings.
    pub warnings: Vec<ExtractionWarning>,

    /// When the extraction finished.
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionResult {
    /// True when no error was recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a human should review this result.
    pub fn needs_review(&self, threshold: f32) -> bool {
        self.confidence < threshold
            || self.errors.iter().any(|e| e.severity == Severity::High)
    }

    pub fn value(&self, field: &str) -> Option<&ExtractedValue> {
        self.extracted_data.get(field)
    }

    pub fn field_confidence(&self, field: &str) -> Option<f32> {
        self.field_confidences.get(field).copied()
    }

    /// Errors recorded against one field.
    pub fn errors_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a ExtractionError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }
}

/// Error severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

/// Non-fatal error recorded in a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionError {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ExtractionError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity,
        }
    }

    /// Required field not found.
    pub fn missing_required(field: &str) -> Self {
        Self::new(
            field,
            format!("Required field '{}' not found", field),
            Severity::High,
        )
    }

    /// Key used when counting recurring errors.
    pub fn key(&self) -> String {
        format!("{}: {}", self.field, self.message)
    }
}

/// Informational note recorded in a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionWarning {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<ExtractedValue>,
}

impl ExtractionWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggested_value: None,
        }
    }

    pub fn with_suggestion(mut self, value: ExtractedValue) -> Self {
        self.suggested_value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(confidence: f32, errors: Vec<ExtractionError>) -> ExtractionResult {
        ExtractionResult {
            document_type: "medical_bill".to_string(),
            extracted_data: BTreeMap::new(),
            confidence,
            field_confidences: BTreeMap::new(),
            processing_time_ms: 1,
            errors,
            warnings: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_required_message() {
        let err = ExtractionError::missing_required("patientName");
        assert_eq!(err.message, "Required field 'patientName' not found");
        assert_eq!(err.severity, Severity::High);
        assert_eq!(err.key(), "patientName: Required field 'patientName' not found");
    }

    #[test]
    fn test_needs_review() {
        assert!(!result(0.9, vec![]).needs_review(0.75));
        assert!(result(0.6, vec![]).needs_review(0.75));
        assert!(result(0.95, vec![ExtractionError::missing_required("x")]).needs_review(0.75));
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }
}
