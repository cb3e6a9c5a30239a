//! Extraction history and statistics.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::models::result::ExtractionResult;

/// Number of entries kept in [`StatisticsReport::common_errors`].
pub const TOP_ERRORS: usize = 10;

/// Storage for past extraction results.
pub trait HistoryStore: Send + Sync {
    /// Append a result under its document type.
    fn record(&self, result: Arc<ExtractionResult>);

    /// Results for one document type, or for all types when `None`, oldest first.
    fn snapshot(&self, document_type: Option<&str>) -> Vec<Arc<ExtractionResult>>;

    /// Total number of retained results.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// In-memory history keeping at most `capacity` results per document type.
/// The oldest result is evicted first.
#[derive(Debug)]
pub struct BoundedHistory {
    capacity: usize,
    entries: Mutex<HashMap<String, VecDeque<Arc<ExtractionResult>>>>,
}

impl BoundedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Arc<ExtractionResult>>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl HistoryStore for BoundedHistory {
    fn record(&self, result: Arc<ExtractionResult>) {
        let mut entries = self.lock();
        let queue = entries.entry(result.document_type.clone()).or_default();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(result);
    }

    fn snapshot(&self, document_type: Option<&str>) -> Vec<Arc<ExtractionResult>> {
        let entries = self.lock();
        match document_type {
            Some(doc_type) => entries
                .get(doc_type)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<Arc<ExtractionResult>> =
                    entries.values().flat_map(|q| q.iter().cloned()).collect();
                all.sort_by_key(|r| r.extracted_at);
                all
            }
        }
    }

    fn len(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// How often one `"field: message"` error occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrequency {
    pub error: String,
    pub count: usize,
}

/// Aggregate view over retained extraction results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    /// Document type the report covers; `None` for all types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    pub total_extractions: usize,
    pub average_confidence: f32,
    pub average_processing_time_ms: f64,
    /// Fraction of results without errors.
    pub success_rate: f32,
    /// Most frequent errors, count descending then key ascending.
    pub common_errors: Vec<ErrorFrequency>,
    /// Fraction of results in which each field was extracted.
    pub field_extraction_rates: BTreeMap<String, f32>,
}

impl StatisticsReport {
    /// Compute the report over `results`. `fields` seeds the field rates so
    /// template fields that were never extracted still report 0.
    pub fn compute<'a>(
        document_type: Option<&str>,
        results: &[Arc<ExtractionResult>],
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut field_names: BTreeSet<String> = fields.into_iter().map(str::to_string).collect();
        for result in results {
            field_names.extend(result.extracted_data.keys().cloned());
        }

        let total = results.len();
        if total == 0 {
            return Self {
                document_type: document_type.map(str::to_string),
                total_extractions: 0,
                average_confidence: 0.0,
                average_processing_time_ms: 0.0,
                success_rate: 0.0,
                common_errors: Vec::new(),
                field_extraction_rates: field_names.into_iter().map(|f| (f, 0.0)).collect(),
            };
        }
        let n = total as f64;

        let average_confidence = results.iter().map(|r| f64::from(r.confidence)).sum::<f64>() / n;
        let average_processing_time_ms = results
            .iter()
            .map(|r| r.processing_time_ms as f64)
            .sum::<f64>()
            / n;
        let successes = results.iter().filter(|r| r.is_clean()).count();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for error in results.iter().flat_map(|r| r.errors.iter()) {
            *counts.entry(error.key()).or_default() += 1;
        }
        let mut common_errors: Vec<ErrorFrequency> = counts
            .into_iter()
            .map(|(error, count)| ErrorFrequency { error, count })
            .collect();
        common_errors.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));
        common_errors.truncate(TOP_ERRORS);

        let field_extraction_rates = field_names
            .into_iter()
            .map(|field| {
                let hits = results
                    .iter()
                    .filter(|r| r.extracted_data.contains_key(&field))
                    .count();
                (field, (hits as f64 / n) as f32)
            })
            .collect();

        Self {
            document_type: document_type.map(str::to_string),
            total_extractions: total,
            average_confidence: average_confidence as f32,
            average_processing_time_ms,
            success_rate: (successes as f64 / n) as f32,
            common_errors,
            field_extraction_rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::result::{ExtractionError, Severity};
    use crate::models::value::ExtractedValue;

    fn result(
        doc_type: &str,
        confidence: f32,
        fields: &[&str],
        errors: &[&str],
    ) -> Arc<ExtractionResult> {
        Arc::new(ExtractionResult {
            document_type: doc_type.to_string(),
            extracted_data: fields
                .iter()
                .map(|f| (f.to_string(), ExtractedValue::Text("x".to_string())))
                .collect(),
            confidence,
            field_confidences: fields.iter().map(|f| (f.to_string(), confidence)).collect(),
            processing_time_ms: 10,
            errors: errors
                .iter()
                .map(|f| ExtractionError::missing_required(f))
                .collect(),
            warnings: Vec::new(),
            extracted_at: Utc::now(),
        })
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let history = BoundedHistory::new(2);
        for confidence in [0.1, 0.2, 0.3] {
            history.record(result("medical_bill", confidence, &[], &[]));
        }
        history.record(result("prescription", 0.9, &[], &[]));

        let bills = history.snapshot(Some("medical_bill"));
        let kept: Vec<f32> = bills.iter().map(|r| r.confidence).collect();
        assert_eq!(kept, vec![0.2, 0.3]);
        assert_eq!(history.len(), 3);
        assert_eq!(history.snapshot(None).len(), 3);

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_snapshot_all_types_oldest_first() {
        let history = BoundedHistory::new(10);
        let mut older = (*result("lab_result", 0.5, &[], &[])).clone();
        older.extracted_at = Utc::now() - Duration::seconds(60);
        history.record(result("medical_bill", 0.9, &[], &[]));
        history.record(Arc::new(older));

        let all = history.snapshot(None);
        assert_eq!(all[0].document_type, "lab_result");
    }

    #[test]
    fn test_statistics() {
        let results = vec![
            result("medical_bill", 1.0, &["billNumber", "totalAmount"], &[]),
            result("medical_bill", 0.5, &["billNumber"], &["patientName"]),
            result("medical_bill", 0.0, &[], &["patientName", "billNumber"]),
            result("medical_bill", 0.5, &["totalAmount"], &[]),
        ];

        let report = StatisticsReport::compute(
            Some("medical_bill"),
            &results,
            ["billNumber", "patientName", "totalAmount"],
        );

        assert_eq!(report.total_extractions, 4);
        assert_eq!(report.average_confidence, 0.5);
        assert_eq!(report.average_processing_time_ms, 10.0);
        assert_eq!(report.success_rate, 0.5);
        assert_eq!(
            report.common_errors,
            vec![
                ErrorFrequency {
                    error: "patientName: Required field 'patientName' not found".to_string(),
                    count: 2,
                },
                ErrorFrequency {
                    error: "billNumber: Required field 'billNumber' not found".to_string(),
                    count: 1,
                },
            ]
        );
        assert_eq!(report.field_extraction_rates["billNumber"], 0.5);
        assert_eq!(report.field_extraction_rates["patientName"], 0.0);
        assert_eq!(report.field_extraction_rates["totalAmount"], 0.5);
    }

    #[test]
    fn test_common_errors_capped() {
        let names: Vec<String> = (0..12).map(|i| format!("f{:02}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let results = vec![result("lab_result", 0.2, &[], &refs)];

        let report = StatisticsReport::compute(None, &results, []);
        assert_eq!(report.common_errors.len(), TOP_ERRORS);
        assert!(report.common_errors[0].error.starts_with("f00"));
    }

    #[test]
    fn test_empty_history_is_zero() {
        let report = StatisticsReport::compute(Some("lab_result"), &[], ["results"]);
        assert_eq!(report.total_extractions, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.field_extraction_rates["results"], 0.0);
        assert!(report.common_errors.is_empty());
    }

    #[test]
    fn test_error_key() {
        let error = ExtractionError::new("validation", "Total must be positive", Severity::Medium);
        assert_eq!(error.key(), "validation: Total must be positive");
    }
}
