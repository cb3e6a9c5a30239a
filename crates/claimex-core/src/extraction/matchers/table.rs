//! Line-oriented table recognition.
//!
//! OCR text flattens tables into lines; each table shape is recognized by
//! a per-line heuristic and every line that fits becomes one row.

use crate::extraction::ExtractionMatch;
use crate::extraction::rules::amounts::parse_vnd_amount;
use crate::extraction::rules::patterns::{
    DECIMAL_AMOUNT, MEDICATION_DOSE, MEDICATION_LINE, TEST_RESULT_LINE,
};
use crate::models::template::{TableKind, TablePattern};
use crate::models::value::{
    CandidateValue, Measurement, MedicationRow, ServiceRow, TableRow, TestResultRow,
};

use super::{MatchContext, PatternMatcher, TABLE_CONFIDENCE};

impl PatternMatcher for TablePattern {
    fn attempt(
        &self,
        text: &str,
        _ctx: &MatchContext<'_>,
    ) -> Option<ExtractionMatch<CandidateValue>> {
        let rows: Vec<TableRow> = match self.table {
            TableKind::Services => parse_services(text)
                .into_iter()
                .map(TableRow::Service)
                .collect(),
            TableKind::Medications => parse_medications(text)
                .into_iter()
                .map(TableRow::Medication)
                .collect(),
            TableKind::TestResults => parse_test_results(text)
                .into_iter()
                .map(TableRow::TestResult)
                .collect(),
        };

        if rows.is_empty() {
            return None;
        }

        Some(ExtractionMatch::new(
            CandidateValue::Rows(rows),
            TABLE_CONFIDENCE,
            self.table.as_str(),
        ))
    }
}

/// Parse delimited service lines: `service | quantity | unit price [| total]`.
///
/// A line qualifies when it contains `|` or a tab and a decimal number, and
/// splits into at least three non-empty columns. A leading ordinal column is
/// dropped when four or more columns are present.
pub fn parse_services(text: &str) -> Vec<ServiceRow> {
    let mut rows = Vec::new();

    for line in text.lines() {
        if !(line.contains('|') || line.contains('\t')) || !DECIMAL_AMOUNT.is_match(line) {
            continue;
        }

        let mut columns: Vec<&str> = line
            .split(['|', '\t'])
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        if columns.len() >= 4 && columns[0].chars().all(|c| c.is_ascii_digit()) {
            columns.remove(0);
        }
        if columns.len() < 3 {
            continue;
        }

        let quantity = columns[1]
            .parse::<u32>()
            .ok()
            .filter(|&q| q > 0)
            .unwrap_or(1);
        let unit_price = parse_vnd_amount(columns[2]).unwrap_or(0.0);
        let total = columns
            .get(3)
            .and_then(|c| parse_vnd_amount(c))
            .unwrap_or(unit_price * f64::from(quantity));

        rows.push(ServiceRow {
            service: columns[0].to_string(),
            quantity,
            unit_price,
            total,
        });
    }

    rows
}

/// Parse numbered medication lines: `1. Name [500mg] [instructions]`.
pub fn parse_medications(text: &str) -> Vec<MedicationRow> {
    let mut rows = Vec::new();

    for line in text.lines() {
        let Some(caps) = MEDICATION_LINE.captures(line) else {
            continue;
        };
        let Ok(ordinal) = caps[1].parse::<u32>() else {
            continue;
        };
        let rest = &caps[2];

        let row = match MEDICATION_DOSE.find(rest) {
            Some(dose) => {
                let name = rest[..dose.start()].trim();
                let instructions = rest[dose.end()..]
                    .trim_start_matches(|c: char| c == ',' || c == '-' || c.is_whitespace())
                    .trim();
                MedicationRow {
                    ordinal,
                    name: name.to_string(),
                    dosage: Some(dose.as_str().split_whitespace().collect::<String>()),
                    instructions: (!instructions.is_empty()).then(|| instructions.to_string()),
                }
            }
            None => MedicationRow {
                ordinal,
                name: rest.trim().to_string(),
                dosage: None,
                instructions: None,
            },
        };

        if !row.name.is_empty() {
            rows.push(row);
        }
    }

    rows
}

/// Parse lab lines: `Test name: value [unit] (reference range)`.
pub fn parse_test_results(text: &str) -> Vec<TestResultRow> {
    text.lines()
        .filter_map(|line| TEST_RESULT_LINE.captures(line))
        .map(|caps| TestResultRow {
            test_name: caps[1].trim().to_string(),
            value: Measurement::Raw(caps[2].to_string()),
            unit: caps.get(3).map(|u| u.as_str().to_string()),
            reference_range: caps[4].trim().to_string(),
        })
        .collect()
}
