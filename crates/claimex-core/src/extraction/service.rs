//! Document-level extraction service.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ClaimexError, Result};
use crate::events::{ExtractionEvent, ExtractionObserver};
use crate::history::{BoundedHistory, HistoryStore, StatisticsReport};
use crate::models::config::ClaimexConfig;
use crate::models::result::{
    ExtractionError, ExtractionResult, ExtractionWarning, Severity, VALIDATION_FIELD,
};
use crate::models::template::{ExtractionTemplate, TemplateUpdate};
use crate::postprocess::PostProcessingPipeline;
use crate::templates::TemplateRegistry;

use super::field::FieldExtractor;

/// Confidence assigned to a default value standing in for a missing field.
pub const DEFAULT_VALUE_CONFIDENCE: f32 = 0.5;

/// Per-call extraction options.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Template used instead of the registered one.
    pub custom_template: Option<Arc<ExtractionTemplate>>,
}

impl ExtractOptions {
    pub fn with_template(template: ExtractionTemplate) -> Self {
        Self {
            custom_template: Some(Arc::new(template)),
        }
    }
}

/// One input of a batch extraction.
#[derive(Debug, Clone)]
pub struct BatchDocument {
    pub text: String,
    pub document_type: String,
    pub options: ExtractOptions,
}

impl BatchDocument {
    pub fn new(text: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            document_type: document_type.into(),
            options: ExtractOptions::default(),
        }
    }
}

/// Turns OCR text into structured records using registered templates.
pub struct DataExtractionService {
    registry: Arc<TemplateRegistry>,
    history: Arc<dyn HistoryStore>,
    pipeline: PostProcessingPipeline,
    observers: Vec<Arc<dyn ExtractionObserver>>,
    extractor: FieldExtractor,
    config: ClaimexConfig,
    pool: Option<rayon::ThreadPool>,
}

/// Builder for DataExtractionService.
pub struct DataExtractionServiceBuilder {
    registry: Option<Arc<TemplateRegistry>>,
    history: Option<Arc<dyn HistoryStore>>,
    pipeline: PostProcessingPipeline,
    observers: Vec<Arc<dyn ExtractionObserver>>,
    config: ClaimexConfig,
}

impl DataExtractionServiceBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            registry: None,
            history: None,
            pipeline: PostProcessingPipeline::new(),
            observers: Vec::new(),
            config: ClaimexConfig::default(),
        }
    }

    /// Use an existing registry instead of one built from the configuration.
    pub fn with_registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use an existing history store instead of a bounded in-memory one.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_pipeline(mut self, pipeline: PostProcessingPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExtractionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_config(mut self, config: ClaimexConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the service.
    ///
    /// Without an injected registry, the baseline templates are registered
    /// (unless disabled) and then `templates.template_dir` is loaded.
    pub fn build(self) -> Result<DataExtractionService> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                let registry = if self.config.templates.include_baseline {
                    TemplateRegistry::with_baseline_templates()
                } else {
                    TemplateRegistry::new()
                };
                if let Some(dir) = &self.config.templates.template_dir {
                    registry.load_dir(dir)?;
                }
                Arc::new(registry)
            }
        };

        let history = self.history.unwrap_or_else(|| {
            Arc::new(BoundedHistory::new(self.config.extraction.history_capacity))
        });

        let pool = match self.config.batch.max_parallelism {
            0 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ClaimexError::Config(format!("cannot build batch pool: {}", e)))?,
            ),
        };

        Ok(DataExtractionService {
            registry,
            history,
            pipeline: self.pipeline,
            observers: self.observers,
            extractor: FieldExtractor::new(),
            config: self.config,
            pool,
        })
    }
}

impl Default for DataExtractionServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataExtractionService {
    /// Create a new builder.
    pub fn builder() -> DataExtractionServiceBuilder {
        DataExtractionServiceBuilder::new()
    }

    /// Service with the baseline templates and default configuration.
    pub fn with_defaults() -> Self {
        Self {
            registry: Arc::new(TemplateRegistry::with_baseline_templates()),
            history: Arc::new(BoundedHistory::default()),
            pipeline: PostProcessingPipeline::new(),
            observers: Vec::new(),
            extractor: FieldExtractor::new(),
            config: ClaimexConfig::default(),
            pool: None,
        }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn config(&self) -> &ClaimexConfig {
        &self.config
    }

    fn notify(&self, event: ExtractionEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn resolve_template(
        &self,
        document_type: &str,
        options: &ExtractOptions,
    ) -> Result<Arc<ExtractionTemplate>> {
        match &options.custom_template {
            Some(template) => Ok(Arc::clone(template)),
            None => self.registry.get(document_type),
        }
    }

    /// Extract a structured record from OCR text.
    ///
    /// Only a missing template fails the call; every other problem is
    /// recorded in the result's errors and warnings.
    pub fn extract_data(
        &self,
        text: &str,
        document_type: &str,
        options: &ExtractOptions,
    ) -> Result<ExtractionResult> {
        let start = Instant::now();

        let template = match self.resolve_template(document_type, options) {
            Ok(template) => template,
            Err(e) => {
                warn!("Extraction of '{}' failed: {}", document_type, e);
                self.notify(ExtractionEvent::ExtractionFailed {
                    document_type: document_type.to_string(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        info!(
            "Extracting {} ({} chars, {} fields)",
            document_type,
            text.len(),
            template.fields.len()
        );

        let mut extracted_data = BTreeMap::new();
        let mut field_confidences = BTreeMap::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for field in &template.fields {
            match self.extractor.extract(text, field) {
                Ok(Some(found)) => {
                    debug!("Field '{}' = {} ({:.2})", field.name, found.value, found.confidence);
                    extracted_data.insert(field.name.clone(), found.value);
                    field_confidences.insert(field.name.clone(), found.confidence);
                }
                Ok(None) => {
                    if field.required {
                        errors.push(ExtractionError::missing_required(&field.name));
                    } else if let Some(default) = field.typed_default() {
                        extracted_data.insert(field.name.clone(), default.clone());
                        field_confidences.insert(field.name.clone(), DEFAULT_VALUE_CONFIDENCE);
                        warnings.push(
                            ExtractionWarning::new(
                                &field.name,
                                format!("Field '{}' not found, using default value", field.name),
                            )
                            .with_suggestion(default),
                        );
                    }
                }
                Err(e) => {
                    debug!("Field '{}' failed: {}", field.name, e);
                    errors.push(ExtractionError::new(&field.name, e.to_string(), Severity::Medium));
                    if field.required {
                        errors.push(ExtractionError::missing_required(&field.name));
                    }
                }
            }
        }

        let today = Utc::now().date_naive();
        for rule in &template.validation_rules {
            if !rule.passes(&extracted_data, today) {
                debug!("Validation rule '{}' failed", rule.name);
                errors.push(ExtractionError::new(
                    VALIDATION_FIELD,
                    &rule.message,
                    Severity::Medium,
                ));
            }
        }

        for rule in &template.post_processing {
            let Some(value) = extracted_data.get(&rule.field).cloned() else {
                continue;
            };
            match self.pipeline.apply(rule, value) {
                Ok(processed) => {
                    extracted_data.insert(rule.field.clone(), processed);
                }
                Err(e) => warnings.push(ExtractionWarning::new(
                    &rule.field,
                    format!("Post-processing '{}' failed: {}", rule.action, e),
                )),
            }
        }

        let confidence = if field_confidences.is_empty() {
            0.0
        } else {
            field_confidences.values().sum::<f32>() / field_confidences.len() as f32
        };

        let result = ExtractionResult {
            document_type: document_type.to_string(),
            extracted_data,
            confidence,
            field_confidences,
            processing_time_ms: start.elapsed().as_millis() as u64,
            errors,
            warnings,
            extracted_at: Utc::now(),
        };

        self.history.record(Arc::new(result.clone()));
        self.notify(ExtractionEvent::DataExtracted {
            document_type: result.document_type.clone(),
            confidence: result.confidence,
            fields_extracted: result.extracted_data.len(),
            processing_time_ms: result.processing_time_ms,
        });

        Ok(result)
    }

    /// Extract several documents in parallel. Results keep input order.
    pub fn extract_batch(&self, documents: &[BatchDocument]) -> Vec<Result<ExtractionResult>> {
        let run = || {
            documents
                .par_iter()
                .map(|doc| self.extract_data(&doc.text, &doc.document_type, &doc.options))
                .collect::<Vec<_>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let confidences: Vec<f32> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|r| r.confidence)
            .collect();
        let average_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };

        info!(
            "Batch of {} documents done ({} succeeded)",
            documents.len(),
            confidences.len()
        );
        self.notify(ExtractionEvent::BatchCompleted {
            total_documents: documents.len(),
            average_confidence,
        });

        results
    }

    /// Register a template, replacing any template for its document type.
    pub fn add_template(&self, template: ExtractionTemplate) -> Result<()> {
        let document_type = template.document_type.clone();
        self.registry.register(template)?;
        self.notify(ExtractionEvent::TemplateAdded { document_type });
        Ok(())
    }

    /// Merge a partial update into a registered template.
    pub fn update_template(&self, document_type: &str, update: TemplateUpdate) -> Result<()> {
        self.registry.update(document_type, update)?;
        self.notify(ExtractionEvent::TemplateUpdated {
            document_type: document_type.to_string(),
        });
        Ok(())
    }

    pub fn template(&self, document_type: &str) -> Option<Arc<ExtractionTemplate>> {
        self.registry.get(document_type).ok()
    }

    pub fn supported_document_types(&self) -> BTreeSet<String> {
        self.registry.document_types()
    }

    /// Statistics over retained history for one document type, or all types.
    pub fn statistics(&self, document_type: Option<&str>) -> StatisticsReport {
        let results = self.history.snapshot(document_type);
        let template = document_type.and_then(|t| self.template(t));
        let fields = template
            .as_ref()
            .map(|t| t.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();

        StatisticsReport::compute(document_type, &results, fields)
    }
}
