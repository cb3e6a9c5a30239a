//! Post-processing of extracted values.
//!
//! A [`PostProcessingPipeline`] maps each [`PostAction`] to a handler. The
//! default pipeline ships `normalize` and `format` handlers and identity
//! handlers for `calculate`, `lookup` and `transform`; callers can replace any
//! of them or register handlers for custom action names.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::error::PostProcessError;
use crate::extraction::rules::{format_currency, format_date};
use crate::models::template::{PostAction, PostProcessingRule};
use crate::models::value::{ExtractedValue, TableRow};

/// Rule parameters as declared in the template.
pub type Parameters = BTreeMap<String, Value>;

/// A post-processing step: a pure function of value and parameters.
pub trait PostProcessor: Send + Sync {
    fn process(
        &self,
        value: ExtractedValue,
        parameters: &Parameters,
    ) -> Result<ExtractedValue, PostProcessError>;
}

impl<F> PostProcessor for F
where
    F: Fn(ExtractedValue, &Parameters) -> Result<ExtractedValue, PostProcessError> + Send + Sync,
{
    fn process(
        &self,
        value: ExtractedValue,
        parameters: &Parameters,
    ) -> Result<ExtractedValue, PostProcessError> {
        self(value, parameters)
    }
}

fn string_param<'a>(
    parameters: &'a Parameters,
    name: &str,
) -> Result<Option<&'a str>, PostProcessError> {
    match parameters.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(PostProcessError::InvalidParameter {
            name: name.to_string(),
            reason: format!("expected a string, found {}", other),
        }),
    }
}

/// `normalize`, dispatching on the `type` parameter.
///
/// - `currency`: number to a locale currency string (`currency` parameter,
///   default `VND`)
/// - `medication_list`: trims medication text
/// - `lab_results`: trims text and coerces measurements to numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

impl PostProcessor for Normalize {
    fn process(
        &self,
        value: ExtractedValue,
        parameters: &Parameters,
    ) -> Result<ExtractedValue, PostProcessError> {
        let kind = string_param(parameters, "type")?.ok_or_else(|| {
            PostProcessError::InvalidParameter {
                name: "type".to_string(),
                reason: "missing".to_string(),
            }
        })?;

        match kind {
            "currency" => {
                let code = string_param(parameters, "currency")?.unwrap_or("VND");
                let amount = value
                    .as_number()
                    .ok_or_else(|| unsupported("normalize currency", &value))?;
                format_currency(amount, code)
                    .map(ExtractedValue::Text)
                    .ok_or_else(|| unsupported("normalize currency", &value))
            }
            "medication_list" => match value {
                ExtractedValue::Rows(rows) => Ok(ExtractedValue::Rows(
                    rows.into_iter().map(trim_row).collect(),
                )),
                ExtractedValue::Text(s) => Ok(ExtractedValue::Text(s.trim().to_string())),
                other => Err(unsupported("normalize medication_list", &other)),
            },
            "lab_results" => match value {
                ExtractedValue::Rows(rows) => Ok(ExtractedValue::Rows(
                    rows.into_iter()
                        .map(trim_row)
                        .map(|row| match row {
                            TableRow::TestResult(mut r) => {
                                r.value = r.value.coerce();
                                TableRow::TestResult(r)
                            }
                            other => other,
                        })
                        .collect(),
                )),
                other => Err(unsupported("normalize lab_results", &other)),
            },
            other => Err(PostProcessError::InvalidParameter {
                name: "type".to_string(),
                reason: format!("unknown normalization '{}'", other),
            }),
        }
    }
}

fn trim_row(row: TableRow) -> TableRow {
    fn trim_opt(s: Option<String>) -> Option<String> {
        s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    match row {
        TableRow::Service(mut r) => {
            r.service = r.service.trim().to_string();
            TableRow::Service(r)
        }
        TableRow::Medication(mut r) => {
            r.name = r.name.trim().to_string();
            r.dosage = trim_opt(r.dosage);
            r.instructions = trim_opt(r.instructions);
            TableRow::Medication(r)
        }
        TableRow::TestResult(mut r) => {
            r.test_name = r.test_name.trim().to_string();
            r.unit = trim_opt(r.unit);
            r.reference_range = r.reference_range.trim().to_string();
            TableRow::TestResult(r)
        }
    }
}

fn unsupported(action: &str, value: &ExtractedValue) -> PostProcessError {
    PostProcessError::UnsupportedValue {
        action: action.to_string(),
        found: value.kind().to_string(),
    }
}

/// `format`: renders dates with `YYYY`/`MM`/`DD` tokens (`format`
/// parameter, default `DD/MM/YYYY`). Other values pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormat;

impl PostProcessor for DateFormat {
    fn process(
        &self,
        value: ExtractedValue,
        parameters: &Parameters,
    ) -> Result<ExtractedValue, PostProcessError> {
        match value {
            ExtractedValue::Date(date) => {
                let pattern = string_param(parameters, "format")?.unwrap_or("DD/MM/YYYY");
                Ok(ExtractedValue::Text(format_date(date, pattern)))
            }
            other => Ok(other),
        }
    }
}

/// Identity handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl PostProcessor for Passthrough {
    fn process(
        &self,
        value: ExtractedValue,
        _parameters: &Parameters,
    ) -> Result<ExtractedValue, PostProcessError> {
        Ok(value)
    }
}

/// Handlers keyed by action.
#[derive(Clone)]
pub struct PostProcessingPipeline {
    handlers: HashMap<PostAction, Arc<dyn PostProcessor>>,
}

impl PostProcessingPipeline {
    /// Pipeline with the default handlers.
    pub fn new() -> Self {
        Self::empty()
            .with_handler(PostAction::Normalize, Normalize)
            .with_handler(PostAction::Format, DateFormat)
            .with_handler(PostAction::Calculate, Passthrough)
            .with_handler(PostAction::Lookup, Passthrough)
            .with_handler(PostAction::Transform, Passthrough)
    }

    /// Pipeline without any handler.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn with_handler(
        mut self,
        action: PostAction,
        handler: impl PostProcessor + 'static,
    ) -> Self {
        self.register(action, handler);
        self
    }

    /// Register a handler, replacing any existing one for the action.
    pub fn register(&mut self, action: PostAction, handler: impl PostProcessor + 'static) {
        self.handlers.insert(action, Arc::new(handler));
    }

    pub fn has_handler(&self, action: &PostAction) -> bool {
        self.handlers.contains_key(action)
    }

    /// Apply one rule to a value.
    pub fn apply(
        &self,
        rule: &PostProcessingRule,
        value: ExtractedValue,
    ) -> Result<ExtractedValue, PostProcessError> {
        let handler = self
            .handlers
            .get(&rule.action)
            .ok_or_else(|| PostProcessError::MissingHandler(rule.action.to_string()))?;

        trace!("Applying '{}' to field '{}'", rule.action, rule.field);
        handler.process(value, &rule.parameters)
    }
}

impl Default for PostProcessingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PostProcessingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&str> = self.handlers.keys().map(PostAction::as_str).collect();
        actions.sort_unstable();
        f.debug_struct("PostProcessingPipeline")
            .field("actions", &actions)
            .finish()
    }
}
