//! Typed values produced by field extraction.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::extraction::rules::dates::parse_date;

/// Semantic type of a field, driving value conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Currency,
    Email,
    Phone,
    Address,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Currency => "currency",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Address => "address",
            FieldType::Boolean => "boolean",
        }
    }

    /// Whether values of this type convert to numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Currency)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value extracted for one field.
///
/// JSON is untagged: an ISO `YYYY-MM-DD` string reads back as a `Date`.
/// Values declared in templates go through [`ExtractedValue::for_field`]
/// before use so the declared field type decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    Boolean(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Rows(Vec<TableRow>),
}

impl ExtractedValue {
    /// Short name of the value kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractedValue::Boolean(_) => "boolean",
            ExtractedValue::Number(_) => "number",
            ExtractedValue::Date(_) => "date",
            ExtractedValue::Text(_) => "text",
            ExtractedValue::Rows(_) => "rows",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExtractedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ExtractedValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExtractedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[TableRow]> {
        match self {
            ExtractedValue::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Reinterpret a value for a field of `field_type`.
    ///
    /// Dates on non-date fields become their ISO text; text on a date field
    /// is parsed when it holds a date.
    pub fn for_field(self, field_type: FieldType) -> Self {
        match (self, field_type) {
            (ExtractedValue::Date(d), t) if t != FieldType::Date => {
                ExtractedValue::Text(d.format("%Y-%m-%d").to_string())
            }
            (ExtractedValue::Text(s), FieldType::Date) => match parse_date(&s) {
                Some(d) => ExtractedValue::Date(d),
                None => ExtractedValue::Text(s),
            },
            (value, _) => value,
        }
    }

    /// True for empty text and empty row lists.
    pub fn is_empty(&self) -> bool {
        match self {
            ExtractedValue::Text(s) => s.trim().is_empty(),
            ExtractedValue::Rows(rows) => rows.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for ExtractedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractedValue::Boolean(b) => write!(f, "{}", b),
            ExtractedValue::Number(n) => write!(f, "{}", n),
            ExtractedValue::Date(d) => write!(f, "{}", d.format("%d/%m/%Y")),
            ExtractedValue::Text(s) => f.write_str(s),
            ExtractedValue::Rows(rows) => write!(f, "{} rows", rows.len()),
        }
    }
}

/// A matcher's raw candidate before type conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateValue {
    Text(String),
    Rows(Vec<TableRow>),
}

impl CandidateValue {
    /// Length used by field validation: characters for text, rows for tables.
    pub fn len(&self) -> usize {
        match self {
            CandidateValue::Text(s) => s.chars().count(),
            CandidateValue::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CandidateValue::Text(s) => Some(s),
            CandidateValue::Rows(_) => None,
        }
    }
}

/// One parsed row of a recognized table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableRow {
    Service(ServiceRow),
    Medication(MedicationRow),
    TestResult(TestResultRow),
}

/// A billed service line (medical bills).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub service: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
}

/// A prescribed medication line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRow {
    pub ordinal: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A lab test measurement line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultRow {
    pub test_name: String,
    pub value: Measurement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub reference_range: String,
}

/// A lab measurement, raw as read or coerced to a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measurement {
    Numeric(f64),
    Raw(String),
}

impl Measurement {
    /// Coerce a raw reading to a number when it parses.
    pub fn coerce(self) -> Self {
        match self {
            Measurement::Raw(raw) => {
                let trimmed = raw.trim();
                match trimmed.replace(',', ".").parse::<f64>() {
                    Ok(n) if n.is_finite() => Measurement::Numeric(n),
                    _ => Measurement::Raw(trimmed.to_string()),
                }
            }
            numeric => numeric,
        }
    }
}
