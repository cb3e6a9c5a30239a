//! Conversion of matched text to a field's semantic type.

use crate::error::FieldError;
use crate::extraction::rules::{parse_date, parse_vnd_amount};
use crate::models::value::{CandidateValue, ExtractedValue, FieldType};

const TRUTHY: &[&str] = &["true", "yes", "có", "1", "x"];

/// Convert a matched candidate to the typed value stored in a result.
///
/// Structured rows pass through unchanged.
pub fn convert_value(
    candidate: CandidateValue,
    field_type: FieldType,
) -> Result<ExtractedValue, FieldError> {
    let raw = match candidate {
        CandidateValue::Rows(rows) => return Ok(ExtractedValue::Rows(rows)),
        CandidateValue::Text(raw) => raw,
    };

    let conversion_error = |raw: &str| FieldError::Conversion {
        value: raw.to_string(),
        target: field_type.to_string(),
    };

    match field_type {
        FieldType::Number | FieldType::Currency => parse_vnd_amount(&raw)
            .map(ExtractedValue::Number)
            .ok_or_else(|| conversion_error(&raw)),
        FieldType::Date => parse_date(&raw)
            .map(ExtractedValue::Date)
            .ok_or_else(|| conversion_error(&raw)),
        FieldType::Boolean => {
            let lowered = raw.trim().to_lowercase();
            Ok(ExtractedValue::Boolean(TRUTHY.contains(&lowered.as_str())))
        }
        FieldType::Phone => {
            let phone = normalize_phone(&raw);
            if phone.chars().any(|c| c.is_ascii_digit()) {
                Ok(ExtractedValue::Text(phone))
            } else {
                Err(conversion_error(&raw))
            }
        }
        FieldType::Text | FieldType::Email | FieldType::Address => {
            Ok(ExtractedValue::Text(raw.trim().to_string()))
        }
    }
}

/// Keep digits and a leading `+`.
fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut phone = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        phone.push('+');
    }
    phone.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    phone
}
