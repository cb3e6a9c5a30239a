//! Template registry keyed by document type.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::error::{ClaimexError, Result};
use crate::models::template::{ExtractionTemplate, TemplateUpdate};

use super::baseline;

type TemplateMap = HashMap<String, Arc<ExtractionTemplate>>;

/// Registered templates, one per document type.
///
/// Templates are immutable snapshots; registering or updating swaps the
/// stored `Arc`, so callers holding an older snapshot are unaffected.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<TemplateMap>,
}

impl TemplateRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the shipped `medical_bill`, `prescription` and
    /// `lab_result` templates.
    pub fn with_baseline_templates() -> Self {
        let registry = Self::new();
        {
            let mut templates = registry.write();
            for template in baseline::templates() {
                templates.insert(template.document_type.clone(), Arc::new(template));
            }
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, TemplateMap> {
        self.templates.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TemplateMap> {
        self.templates.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a template, replacing any template for the same type.
    /// Returns the replaced template.
    pub fn register(
        &self,
        template: ExtractionTemplate,
    ) -> Result<Option<Arc<ExtractionTemplate>>> {
        template.check().map_err(|reason| ClaimexError::InvalidTemplate {
            document_type: template.document_type.clone(),
            reason,
        })?;

        let document_type = template.document_type.clone();
        let replaced = self.write().insert(document_type.clone(), Arc::new(template));
        if replaced.is_some() {
            debug!("Replaced template '{}'", document_type);
        }
        Ok(replaced)
    }

    /// Template for a document type.
    pub fn get(&self, document_type: &str) -> Result<Arc<ExtractionTemplate>> {
        self.read()
            .get(document_type)
            .cloned()
            .ok_or_else(|| ClaimexError::TemplateNotFound(document_type.to_string()))
    }

    /// Merge a partial update into a registered template.
    pub fn update(
        &self,
        document_type: &str,
        update: TemplateUpdate,
    ) -> Result<Arc<ExtractionTemplate>> {
        let mut templates = self.write();
        let current = templates
            .get(document_type)
            .ok_or_else(|| ClaimexError::TemplateNotFound(document_type.to_string()))?;

        let merged = current.merged(update);
        merged.check().map_err(|reason| ClaimexError::InvalidTemplate {
            document_type: document_type.to_string(),
            reason,
        })?;

        let merged = Arc::new(merged);
        templates.insert(document_type.to_string(), Arc::clone(&merged));
        Ok(merged)
    }

    pub fn contains(&self, document_type: &str) -> bool {
        self.read().contains_key(document_type)
    }

    /// Registered document types.
    pub fn document_types(&self) -> BTreeSet<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Register a template from its JSON representation.
    pub fn register_json(&self, json: &str) -> Result<Option<Arc<ExtractionTemplate>>> {
        let template: ExtractionTemplate = serde_json::from_str(json)?;
        self.register(template)
    }

    /// Register every `*.json` template in a directory, in file name order.
    /// Returns the registered document types.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let template: ExtractionTemplate = serde_json::from_str(&content)?;
            debug!("Loaded template '{}' from {}", template.document_type, path.display());
            loaded.push(template.document_type.clone());
            self.register(template)?;
        }

        info!("Loaded {} templates from {}", loaded.len(), dir.display());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::template::{ExtractionPattern, FieldDefinition, TableKind};
    use crate::models::value::FieldType;

    fn discharge() -> ExtractionTemplate {
        ExtractionTemplate::new("discharge_summary").with_field(
            FieldDefinition::new("diagnosis", FieldType::Text)
                .required()
                .with_pattern(ExtractionPattern::keyword("Chẩn đoán", 1)),
        )
    }

    #[test]
    fn test_baseline_types() {
        let registry = TemplateRegistry::with_baseline_templates();
        let types: Vec<String> = registry.document_types().into_iter().collect();
        assert_eq!(types, vec!["lab_result", "medical_bill", "prescription"]);
    }

    #[test]
    fn test_register_replaces() {
        let registry = TemplateRegistry::new();
        assert!(registry.register(discharge()).unwrap().is_none());

        let replacement =
            discharge().with_field(FieldDefinition::new("doctorName", FieldType::Text));
        let replaced = registry.register(replacement).unwrap().unwrap();
        assert_eq!(replaced.fields.len(), 1);
        assert_eq!(registry.get("discharge_summary").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let registry = TemplateRegistry::new();
        let template = discharge().with_field(FieldDefinition::new("diagnosis", FieldType::Text));
        let err = registry.register(template).unwrap_err();
        assert!(matches!(err, ClaimexError::InvalidTemplate { .. }));
        assert!(!registry.contains("discharge_summary"));
    }

    #[test]
    fn test_get_missing() {
        let err = TemplateRegistry::new().get("invoice").unwrap_err();
        assert!(matches!(err, ClaimexError::TemplateNotFound(ref t) if t == "invoice"));
    }

    #[test]
    fn test_update_merges_sections() {
        let registry = TemplateRegistry::new();
        registry.register(discharge()).unwrap();
        let before = registry.get("discharge_summary").unwrap();

        let update = TemplateUpdate {
            fields: Some(vec![
                FieldDefinition::new("services", FieldType::Text)
                    .with_pattern(ExtractionPattern::table(TableKind::Services, 1)),
            ]),
            ..TemplateUpdate::default()
        };
        let updated = registry.update("discharge_summary", update).unwrap();

        assert_eq!(updated.fields[0].name, "services");
        assert_eq!(registry.get("discharge_summary").unwrap().fields[0].name, "services");
        assert_eq!(before.fields[0].name, "diagnosis");

        let err = registry.update("invoice", TemplateUpdate::default()).unwrap_err();
        assert!(matches!(err, ClaimexError::TemplateNotFound(_)));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("discharge.json"),
            serde_json::to_string(&discharge()).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = TemplateRegistry::new();
        let loaded = registry.load_dir(dir.path()).unwrap();
        assert_eq!(loaded, vec!["discharge_summary"]);
        assert!(registry.contains("discharge_summary"));
    }

    #[test]
    fn test_register_json_rejects_bad_regex() {
        let json = r#"{
            "document_type": "x",
            "fields": [{"name": "a", "type": "text",
                        "patterns": [{"strategy": "regex", "pattern": "(unclosed"}]}]
        }"#;
        let err = TemplateRegistry::new().register_json(json).unwrap_err();
        assert!(matches!(err, ClaimexError::Json(_)));
    }
}
