//! Shipped templates for Vietnamese medical documents.

use regex::Regex;

use crate::extraction::rules::patterns::{
    ANY_LABELED_DATE, BILL_DATE, BILL_NUMBER, DIAGNOSIS, DOCTOR_NAME, DOCTOR_TITLE_NAME,
    HOSPITAL_NAME, LAB_NAME, PATIENT_NAME, PRESCRIPTION_DATE, SIGNED_DATE, TEST_DATE,
    TOTAL_AMOUNT,
};
use crate::models::template::{
    DocumentCheck, ExtractionPattern, ExtractionTemplate, FieldDefinition, FieldValidation,
    PostAction, PostProcessingRule, TableKind, ValidationRule,
};
use crate::models::value::FieldType;

pub const MEDICAL_BILL: &str = "medical_bill";
pub const PRESCRIPTION: &str = "prescription";
pub const LAB_RESULT: &str = "lab_result";

fn regex(re: &Regex, priority: u32) -> ExtractionPattern {
    ExtractionPattern::regex(re.clone(), priority)
}

fn patient_name() -> FieldDefinition {
    FieldDefinition::new("patientName", FieldType::Text)
        .required()
        .with_pattern(regex(&PATIENT_NAME, 1))
        .with_pattern(ExtractionPattern::keyword("Họ tên", 3).with_keywords(["Bệnh nhân"]))
        .with_validation(FieldValidation::new().with_length(Some(2), Some(100)))
}

/// All shipped templates.
pub fn templates() -> Vec<ExtractionTemplate> {
    vec![medical_bill(), prescription(), lab_result()]
}

/// Hospital bill: totals and billed services.
pub fn medical_bill() -> ExtractionTemplate {
    ExtractionTemplate::new(MEDICAL_BILL)
        .with_field(
            FieldDefinition::new("hospitalName", FieldType::Text)
                .with_pattern(regex(&HOSPITAL_NAME, 1)),
        )
        .with_field(
            FieldDefinition::new("billNumber", FieldType::Text)
                .required()
                .with_pattern(regex(&BILL_NUMBER, 1)),
        )
        .with_field(
            FieldDefinition::new("billDate", FieldType::Date)
                .required()
                .with_pattern(regex(&BILL_DATE, 1))
                .with_pattern(regex(&ANY_LABELED_DATE, 2)),
        )
        .with_field(patient_name())
        .with_field(
            FieldDefinition::new("totalAmount", FieldType::Currency)
                .required()
                .with_pattern(regex(&TOTAL_AMOUNT, 1))
                .with_pattern(
                    ExtractionPattern::keyword("Tổng cộng", 2).with_keywords(["Thành tiền"]),
                ),
        )
        .with_field(
            FieldDefinition::new("services", FieldType::Text)
                .with_pattern(ExtractionPattern::table(TableKind::Services, 1))
                .with_dependencies(["totalAmount"]),
        )
        .with_validation_rule(ValidationRule::new(
            "positive_total",
            "Total amount must be positive",
            DocumentCheck::Range {
                field: "totalAmount".to_string(),
                min: Some(1.0),
                max: None,
            },
        ))
        .with_validation_rule(ValidationRule::new(
            "bill_date_not_in_future",
            "Bill date cannot be in the future",
            DocumentCheck::NotInFuture {
                field: "billDate".to_string(),
            },
        ))
}

/// Prescription: prescriber, diagnosis and medication list.
pub fn prescription() -> ExtractionTemplate {
    ExtractionTemplate::new(PRESCRIPTION)
        .with_field(
            FieldDefinition::new("doctorName", FieldType::Text)
                .required()
                .with_pattern(regex(&DOCTOR_NAME, 1))
                .with_pattern(regex(&DOCTOR_TITLE_NAME, 2)),
        )
        .with_field(patient_name())
        .with_field(
            FieldDefinition::new("prescriptionDate", FieldType::Date)
                .required()
                .with_pattern(regex(&PRESCRIPTION_DATE, 1))
                .with_pattern(regex(&ANY_LABELED_DATE, 2))
                .with_pattern(regex(&SIGNED_DATE, 3)),
        )
        .with_field(
            FieldDefinition::new("medications", FieldType::Text)
                .required()
                .with_pattern(ExtractionPattern::table(TableKind::Medications, 1)),
        )
        .with_field(
            FieldDefinition::new("diagnosis", FieldType::Text)
                .with_pattern(regex(&DIAGNOSIS, 1)),
        )
        .with_validation_rule(ValidationRule::new(
            "has_medications",
            "Prescription must list at least one medication",
            DocumentCheck::NonEmpty {
                field: "medications".to_string(),
            },
        ))
        .with_post_processing(
            PostProcessingRule::new("medications", PostAction::Normalize)
                .with_parameter("type", "medication_list"),
        )
}

/// Lab report: laboratory, test date and measurements.
pub fn lab_result() -> ExtractionTemplate {
    ExtractionTemplate::new(LAB_RESULT)
        .with_field(
            FieldDefinition::new("labName", FieldType::Text)
                .with_pattern(regex(&LAB_NAME, 1)),
        )
        .with_field(patient_name())
        .with_field(
            FieldDefinition::new("testDate", FieldType::Date)
                .required()
                .with_pattern(regex(&TEST_DATE, 1))
                .with_pattern(regex(&ANY_LABELED_DATE, 2)),
        )
        .with_field(
            FieldDefinition::new("results", FieldType::Text)
                .required()
                .with_pattern(ExtractionPattern::table(TableKind::TestResults, 1)),
        )
        .with_validation_rule(ValidationRule::new(
            "has_results",
            "Lab report must contain at least one test result",
            DocumentCheck::NonEmpty {
                field: "results".to_string(),
            },
        ))
        .with_post_processing(
            PostProcessingRule::new("results", PostAction::Normalize)
                .with_parameter("type", "lab_results"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_templates_are_well_formed() {
        for template in templates() {
            assert!(template.check().is_ok(), "{}", template.document_type);
            assert!(template.required_fields().any(|f| f == "patientName"));
        }
    }

    #[test]
    fn test_field_names() {
        let names = |t: ExtractionTemplate| -> Vec<String> {
            t.fields.into_iter().map(|f| f.name).collect()
        };
        assert_eq!(
            names(medical_bill()),
            vec!["hospitalName", "billNumber", "billDate", "patientName", "totalAmount", "services"]
        );
        assert_eq!(
            names(prescription()),
            vec!["doctorName", "patientName", "prescriptionDate", "medications", "diagnosis"]
        );
        assert_eq!(names(lab_result()), vec!["labName", "patientName", "testDate", "results"]);
    }

    #[test]
    fn test_templates_survive_json() {
        for template in templates() {
            let json = serde_json::to_string(&template).unwrap();
            let back: ExtractionTemplate = serde_json::from_str(&json).unwrap();
            assert_eq!(back.fields.len(), template.fields.len());
            assert_eq!(back.validation_rules.len(), template.validation_rules.len());
        }
    }
}
