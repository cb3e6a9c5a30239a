//! Declarative extraction templates.
//!
//! A template describes, for one document type, which fields to look for,
//! how to find each of them, how to validate the assembled record and which
//! post-processing steps to run. Templates are plain data: matching behavior
//! lives in [`crate::extraction`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::value::{CandidateValue, ExtractedValue, FieldType};
use crate::error::FieldError;

/// Complete extraction schema for one document type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionTemplate {
    /// Document type tag (e.g. `medical_bill`).
    pub document_type: String,

    /// Fields in extraction order.
    pub fields: Vec<FieldDefinition>,

    /// Document-level validation rules.
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,

    /// Post-processing steps, applied in order.
    #[serde(default)]
    pub post_processing: Vec<PostProcessingRule>,
}

impl ExtractionTemplate {
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            fields: Vec::new(),
            validation_rules: Vec::new(),
            post_processing: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_validation_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn with_post_processing(mut self, rule: PostProcessingRule) -> Self {
        self.post_processing.push(rule);
        self
    }

    /// Look up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of required fields, in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name.as_str())
    }

    /// Check structural invariants. Returns the first problem found.
    pub fn check(&self) -> Result<(), String> {
        if self.document_type.trim().is_empty() {
            return Err("document type is empty".to_string());
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(format!("field #{} has an empty name", i + 1));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("duplicate field '{}'", field.name));
            }
        }
        Ok(())
    }

    /// Apply a partial update; each present section replaces the current one.
    pub fn merged(&self, update: TemplateUpdate) -> Self {
        Self {
            document_type: self.document_type.clone(),
            fields: update.fields.unwrap_or_else(|| self.fields.clone()),
            validation_rules: update
                .validation_rules
                .unwrap_or_else(|| self.validation_rules.clone()),
            post_processing: update
                .post_processing
                .unwrap_or_else(|| self.post_processing.clone()),
        }
    }
}

/// Partial template update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<ValidationRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_processing: Option<Vec<PostProcessingRule>>,
}

/// One named, typed field of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, unique within the template.
    pub name: String,

    /// Semantic type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether absence is an error.
    #[serde(default)]
    pub required: bool,

    /// Candidate patterns; evaluated by ascending priority.
    pub patterns: Vec<ExtractionPattern>,

    /// Field-level validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,

    /// Value used when an optional field is not found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ExtractedValue>,

    /// Declared dependencies on other fields. Not consulted during matching.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            patterns: Vec::new(),
            validation: None,
            default_value: None,
            dependencies: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_pattern(mut self, pattern: ExtractionPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_default(mut self, value: ExtractedValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Patterns in evaluation order. Ties keep declaration order.
    /// The declared default, read as this field's type.
    pub fn typed_default(&self) -> Option<ExtractedValue> {
        self.default_value
            .clone()
            .map(|value| value.for_field(self.field_type))
    }

    pub fn ordered_patterns(&self) -> Vec<&ExtractionPattern> {
        let mut ordered: Vec<&ExtractionPattern> = self.patterns.iter().collect();
        ordered.sort_by_key(|p| p.priority);
        ordered
    }
}

/// One strategy plus payload for locating a field's value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionPattern {
    #[serde(flatten)]
    pub strategy: PatternStrategy,

    /// Contextual keywords. The keyword strategy treats them as alternative labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Lower numbers are evaluated first.
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Layout region, reserved for positional matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

fn default_priority() -> u32 {
    1
}

impl ExtractionPattern {
    pub fn new(strategy: PatternStrategy, priority: u32) -> Self {
        Self {
            strategy,
            keywords: Vec::new(),
            priority,
            region: None,
        }
    }

    /// Regex pattern from an already compiled expression.
    pub fn regex(regex: Regex, priority: u32) -> Self {
        Self::new(PatternStrategy::Regex(RegexPattern { regex }), priority)
    }

    /// Regex pattern compiled case-insensitively from source.
    pub fn regex_str(pattern: &str, priority: u32) -> Result<Self, FieldError> {
        Ok(Self::regex(compile_pattern(pattern)?, priority))
    }

    pub fn keyword(keyword: impl Into<String>, priority: u32) -> Self {
        Self::new(
            PatternStrategy::Keyword(KeywordPattern::new(keyword)),
            priority,
        )
    }

    pub fn table(table: TableKind, priority: u32) -> Self {
        Self::new(PatternStrategy::Table(TablePattern { table }), priority)
    }

    pub fn position(region: Region, priority: u32) -> Self {
        let mut pattern = Self::new(
            PatternStrategy::Position(PositionPattern::default()),
            priority,
        );
        pattern.region = Some(region);
        pattern
    }

    pub fn form(form: impl Into<String>, priority: u32) -> Self {
        Self::new(PatternStrategy::Form(FormPattern { form: form.into() }), priority)
    }

    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        if let PatternStrategy::Keyword(keyword) = &mut self.strategy {
            keyword.labels = OnceLock::new();
        }
        self
    }
}

/// Matching strategy and its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PatternStrategy {
    Regex(RegexPattern),
    Keyword(KeywordPattern),
    Position(PositionPattern),
    Table(TablePattern),
    Form(FormPattern),
}

impl PatternStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            PatternStrategy::Regex(_) => "regex",
            PatternStrategy::Keyword(_) => "keyword",
            PatternStrategy::Position(_) => "position",
            PatternStrategy::Table(_) => "table",
            PatternStrategy::Form(_) => "form",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexPattern {
    #[serde(rename = "pattern", with = "regex_serde")]
    pub regex: Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPattern {
    #[serde(rename = "pattern")]
    pub keyword: String,

    /// Label regexes for the keyword and the pattern's contextual keywords,
    /// compiled on first use.
    #[serde(skip)]
    pub(crate) labels: OnceLock<Vec<Regex>>,
}

impl KeywordPattern {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            labels: OnceLock::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionPattern {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablePattern {
    #[serde(rename = "pattern")]
    pub table: TableKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPattern {
    #[serde(rename = "pattern")]
    pub form: String,
}

/// Table shapes recognized by the table matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    #[serde(rename = "services_table")]
    Services,
    #[serde(rename = "medication_table")]
    Medications,
    #[serde(rename = "test_results_table")]
    TestResults,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Services => "services_table",
            TableKind::Medications => "medication_table",
            TableKind::TestResults => "test_results_table",
        }
    }
}

/// Bounding region in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Field-level constraints. Every supplied constraint must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "regex_serde::option")]
    pub format: Option<Regex>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,

    #[serde(skip)]
    pub custom: Option<CustomCheck>,
}

impl FieldValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_format(mut self, format: Regex) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_allowed_values(
        mut self,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom(mut self, check: CustomCheck) -> Self {
        self.custom = Some(check);
        self
    }

    /// Returns the description of every failed constraint.
    pub fn failures(&self, value: &CandidateValue) -> Vec<String> {
        let mut failures = Vec::new();
        let len = value.len();

        if let Some(min) = self.min_length {
            if len < min {
                failures.push(format!("length {} below minimum {}", len, min));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                failures.push(format!("length {} above maximum {}", len, max));
            }
        }
        if let Some(format) = &self.format {
            match value.as_text() {
                Some(text) if format.is_match(text) => {}
                _ => failures.push(format!("does not match format {}", format.as_str())),
            }
        }
        if !self.allowed_values.is_empty() {
            let allowed = value
                .as_text()
                .map(|t| self.allowed_values.iter().any(|v| v == t.trim()))
                .unwrap_or(false);
            if !allowed {
                failures.push("not an allowed value".to_string());
            }
        }
        if let Some(custom) = &self.custom {
            if !custom.check(value) {
                failures.push(format!("custom check '{}' failed", custom.name));
            }
        }

        failures
    }

    pub fn is_valid(&self, value: &CandidateValue) -> bool {
        self.failures(value).is_empty()
    }
}

type CheckFn = dyn Fn(&CandidateValue) -> bool + Send + Sync;

/// Named predicate over a field candidate.
#[derive(Clone)]
pub struct CustomCheck {
    pub name: String,
    check: Arc<CheckFn>,
}

impl CustomCheck {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&CandidateValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn check(&self, value: &CandidateValue) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck").field("name", &self.name).finish()
    }
}

/// Document-level rule evaluated against the assembled record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    pub name: String,

    /// Error message recorded when the rule fails.
    pub message: String,

    pub check: DocumentCheck,
}

impl ValidationRule {
    pub fn new(name: impl Into<String>, message: impl Into<String>, check: DocumentCheck) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            check,
        }
    }

    /// Evaluate the rule. `today` anchors date checks.
    pub fn passes(&self, data: &BTreeMap<String, ExtractedValue>, today: NaiveDate) -> bool {
        match &self.check {
            DocumentCheck::RequireAny { fields } => fields.iter().any(|f| data.contains_key(f)),
            DocumentCheck::Range { field, min, max } => match data.get(field) {
                None => true,
                Some(value) => match value.as_number() {
                    Some(n) => min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m),
                    None => false,
                },
            },
            DocumentCheck::NotInFuture { field } => match data.get(field) {
                None => true,
                Some(value) => value.as_date().is_some_and(|d| d <= today),
            },
            DocumentCheck::NonEmpty { field } => {
                data.get(field).is_none_or(|value| !value.is_empty())
            }
            DocumentCheck::Custom(rule) => rule.check(data),
        }
    }
}

/// Check performed by a [`ValidationRule`].
///
/// Field-scoped checks pass when their field is absent; absence of a
/// required field is reported separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentCheck {
    /// At least one of the fields is present.
    RequireAny { fields: Vec<String> },
    /// Numeric field within inclusive bounds.
    Range {
        field: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Date field not after today.
    NotInFuture { field: String },
    /// Text or rows field not empty.
    NonEmpty { field: String },
    #[serde(skip)]
    Custom(CustomRule),
}

type RuleFn = dyn Fn(&BTreeMap<String, ExtractedValue>) -> bool + Send + Sync;

/// Arbitrary predicate over the assembled record.
#[derive(Clone)]
pub struct CustomRule(Arc<RuleFn>);

impl CustomRule {
    pub fn new(
        check: impl Fn(&BTreeMap<String, ExtractedValue>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(check))
    }

    pub fn check(&self, data: &BTreeMap<String, ExtractedValue>) -> bool {
        (self.0)(data)
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomRule")
    }
}

/// Transformation applied to one extracted field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessingRule {
    pub field: String,
    pub action: PostAction,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl PostProcessingRule {
    pub fn new(field: impl Into<String>, action: PostAction) -> Self {
        Self {
            field: field.into(),
            action,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Post-processing action name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostAction {
    Normalize,
    Format,
    Calculate,
    Lookup,
    Transform,
    /// Action served by a handler registered at runtime.
    #[serde(untagged)]
    Custom(String),
}

impl PostAction {
    pub fn as_str(&self) -> &str {
        match self {
            PostAction::Normalize => "normalize",
            PostAction::Format => "format",
            PostAction::Calculate => "calculate",
            PostAction::Lookup => "lookup",
            PostAction::Transform => "transform",
            PostAction::Custom(name) => name,
        }
    }
}

impl fmt::Display for PostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile a field pattern. Field patterns always match case-insensitively.
pub fn compile_pattern(pattern: &str) -> Result<Regex, FieldError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| FieldError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Serde support for regex fields, stored as their source string.
mod regex_serde {
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::compile_pattern;

    pub fn serialize<S: Serializer>(regex: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(regex.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Regex, D::Error> {
        let source = String::deserialize(deserializer)?;
        compile_pattern(&source).map_err(serde::de::Error::custom)
    }

    /// Optional variant; format checks keep the case sensitivity written in the source.
    pub mod option {
        use regex::Regex;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            regex: &Option<Regex>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match regex {
                Some(r) => serializer.serialize_some(r.as_str()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Regex>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| Regex::new(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
