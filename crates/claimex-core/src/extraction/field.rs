//! Single-field extraction.

use tracing::{debug, trace};

use crate::error::FieldError;
use crate::models::template::FieldDefinition;
use crate::models::value::{CandidateValue, ExtractedValue};

use super::ExtractionMatch;
use super::convert::convert_value;

/// A candidate above this confidence stops evaluation of later patterns.
pub const SHORT_CIRCUIT_CONFIDENCE: f32 = 0.9;

/// Locates one field's value by trying its patterns in priority order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract a field from OCR text.
    ///
    /// Returns `Ok(None)` when no pattern matched. The best candidate is the
    /// one with strictly highest confidence, ties going to the earlier
    /// pattern; failed validation halves its confidence before conversion.
    pub fn extract(
        &self,
        text: &str,
        field: &FieldDefinition,
    ) -> Result<Option<ExtractionMatch<ExtractedValue>>, FieldError> {
        let Some(mut best) = self.best_candidate(text, field) else {
            trace!("No pattern matched field '{}'", field.name);
            return Ok(None);
        };

        if let Some(validation) = &field.validation {
            let failures = validation.failures(&best.value);
            if !failures.is_empty() {
                debug!(
                    "Field '{}' failed validation ({}), halving confidence",
                    field.name,
                    failures.join("; ")
                );
                best.confidence /= 2.0;
            }
        }

        let field_type = field.field_type;
        let ExtractionMatch {
            value,
            confidence,
            position,
            source,
        } = best;
        let value = convert_value(value, field_type)?;

        Ok(Some(ExtractionMatch {
            value,
            confidence,
            position,
            source,
        }))
    }

    fn best_candidate(
        &self,
        text: &str,
        field: &FieldDefinition,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        let mut best: Option<ExtractionMatch<CandidateValue>> = None;

        for pattern in field.ordered_patterns() {
            let Some(candidate) = pattern.attempt(text, field.field_type) else {
                continue;
            };
            trace!(
                "Field '{}': {} pattern (priority {}) matched with {:.2}",
                field.name,
                pattern.strategy.name(),
                pattern.priority,
                candidate.confidence
            );

            if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
                best = Some(candidate);
            }
            if best
                .as_ref()
                .is_some_and(|b| b.confidence > SHORT_CIRCUIT_CONFIDENCE)
            {
                break;
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::template::{ExtractionPattern, FieldValidation, TableKind};
    use crate::models::value::FieldType;

    fn regex(pattern: &str, priority: u32) -> ExtractionPattern {
        ExtractionPattern::regex_str(pattern, priority).unwrap()
    }

    #[test]
    fn test_regex_date_field() {
        let field = FieldDefinition::new("treatmentDate", FieldType::Date)
            .with_pattern(regex(r"ngày khám[:\s]+(\d{1,2}/\d{1,2}/\d{4})", 1));

        let m = FieldExtractor::new()
            .extract("Ngày khám: 15/03/2024", &field)
            .unwrap()
            .unwrap();

        assert_eq!(
            m.value,
            ExtractedValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert!(m.confidence >= 0.9);
    }

    #[test]
    fn test_currency_field() {
        let field = FieldDefinition::new("totalAmount", FieldType::Currency)
            .with_pattern(regex(r"tổng cộng[:\s]*([\d.,]+)\s*(?:vnđ|vnd|đồng)", 1));

        let m = FieldExtractor::new()
            .extract("Tổng cộng: 1.250.000 vnđ", &field)
            .unwrap()
            .unwrap();

        assert_eq!(m.value, ExtractedValue::Number(1250000.0));
        assert_eq!(m.confidence, 0.95);
    }

    #[test]
    fn test_lower_priority_wins_on_tie() {
        let field = FieldDefinition::new("diagnosis", FieldType::Text)
            .with_pattern(regex(r"chẩn đoán:\s*(\S+)", 2))
            .with_pattern(regex(r"chẩn đoán:\s*(.+)", 1));

        let m = FieldExtractor::new()
            .extract("Chẩn đoán: Viêm họng", &field)
            .unwrap()
            .unwrap();

        assert_eq!(m.value, ExtractedValue::Text("Viêm họng".to_string()));
    }

    #[test]
    fn test_higher_confidence_beats_priority() {
        // Keyword (0.7) tried first, regex (0.8) later still wins.
        let field = FieldDefinition::new("diagnosis", FieldType::Text)
            .with_pattern(ExtractionPattern::keyword("Chẩn đoán", 1))
            .with_pattern(regex(r"chẩn đoán:\s*(\S+)", 2));

        let m = FieldExtractor::new()
            .extract("Chẩn đoán: Viêm họng", &field)
            .unwrap()
            .unwrap();

        assert_eq!(m.value, ExtractedValue::Text("Viêm".to_string()));
        assert_eq!(m.confidence, 0.8);
    }

    #[test]
    fn test_short_circuit_on_high_confidence() {
        // The first pattern scores 0.95 and ends the search before the table.
        let text = "Khám | 1 | 150.000 | 150.000\nTổng cộng: 150.000 vnđ";
        let field = FieldDefinition::new("totalAmount", FieldType::Currency)
            .with_pattern(regex(r"tổng cộng:\s*([\d.]+)\s*vnđ", 1))
            .with_pattern(ExtractionPattern::table(TableKind::Services, 2));

        let m = FieldExtractor::new().extract(text, &field).unwrap().unwrap();
        assert_eq!(m.value, ExtractedValue::Number(150000.0));
    }

    #[test]
    fn test_validation_failure_halves_confidence() {
        let field = FieldDefinition::new("billNumber", FieldType::Text)
            .with_pattern(regex(r"số hóa đơn:\s*(\S+)", 1))
            .with_validation(FieldValidation::new().with_length(Some(6), None));

        let m = FieldExtractor::new()
            .extract("Số hóa đơn: HD001", &field)
            .unwrap()
            .unwrap();

        assert_eq!(m.value, ExtractedValue::Text("HD001".to_string()));
        assert_eq!(m.confidence, 0.4);
    }

    #[test]
    fn test_no_match() {
        let field = FieldDefinition::new("patientName", FieldType::Text)
            .with_pattern(regex(r"họ tên:\s*(.+)", 1));
        assert_eq!(FieldExtractor::new().extract("PHIẾU THU", &field).unwrap(), None);
    }

    #[test]
    fn test_conversion_failure_surfaces() {
        let field = FieldDefinition::new("billDate", FieldType::Date)
            .with_pattern(regex(r"ngày:\s*(\S+)", 1));
        let err = FieldExtractor::new()
            .extract("Ngày: 31/02/2024", &field)
            .unwrap_err();
        assert!(matches!(err, FieldError::Conversion { .. }));
    }
}
