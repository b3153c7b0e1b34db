//! Schema Validation - Rule/Report Separation
//!
//! Rules inspect field definitions and produce structured violations.
//! The registry decides what to do with a report (reject the edit).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::fields::{ColumnType, FieldSchema, FieldType, TableColumn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaViolation {
    pub rule: String,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaReport {
    pub valid: bool,
    pub violations: Vec<SchemaViolation>,
}

impl SchemaReport {
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{} [{}]: {}", v.field, v.rule, v.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A well-formedness rule for a single field definition.
pub trait SchemaRule {
    fn name(&self) -> &'static str;
    fn check(&self, field: &FieldSchema) -> Vec<SchemaViolation>;

    fn violation(&self, field: &str, message: impl Into<String>) -> SchemaViolation
    where
        Self: Sized,
    {
        SchemaViolation {
            rule: self.name().to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// --- Concrete Rules ---

pub struct KeyPresentRule;

impl SchemaRule for KeyPresentRule {
    fn name(&self) -> &'static str { "key_present" }

    fn check(&self, field: &FieldSchema) -> Vec<SchemaViolation> {
        if field.key.trim().is_empty() {
            vec![self.violation(&field.label, "field key must not be empty")]
        } else {
            vec![]
        }
    }
}

pub struct UnitOptionsRule;

impl SchemaRule for UnitOptionsRule {
    fn name(&self) -> &'static str { "unit_options" }

    fn check(&self, field: &FieldSchema) -> Vec<SchemaViolation> {
        if field.unit_mode.uses_units() && field.unit_options.is_empty() {
            vec![self.violation(&field.key, "unit mode requires at least one unit option")]
        } else {
            vec![]
        }
    }
}

pub struct DropdownOptionsRule;

impl SchemaRule for DropdownOptionsRule {
    fn name(&self) -> &'static str { "dropdown_options" }

    fn check(&self, field: &FieldSchema) -> Vec<SchemaViolation> {
        if field.field_type == FieldType::Dropdown && field.dropdown_options.is_empty() {
            vec![self.violation(&field.key, "dropdown requires at least one option")]
        } else {
            vec![]
        }
    }
}

pub struct MultiKeysRule;

impl SchemaRule for MultiKeysRule {
    fn name(&self) -> &'static str { "multi_keys" }

    fn check(&self, field: &FieldSchema) -> Vec<SchemaViolation> {
        if field.is_multi && field.multi_keys.is_empty() {
            return vec![self.violation(&field.key, "multi-value field requires sub-keys")];
        }
        let mut seen = HashSet::new();
        field
            .multi_keys
            .iter()
            .filter(|k| !seen.insert(k.as_str()))
            .map(|k| self.violation(&field.key, format!("duplicate sub-key '{}'", k)))
            .collect()
    }
}

pub struct TableShapeRule;

impl TableShapeRule {
    fn check_column(&self, field: &str, column: &TableColumn) -> Vec<SchemaViolation> {
        let mut violations = vec![];
        let name = format!("{}.{}", field, column.key);
        if column.key.trim().is_empty() {
            violations.push(self.violation(field, "table column key must not be empty"));
        }
        if column.unit_mode.uses_units() && column.unit_options.is_empty() {
            violations.push(self.violation(&name, "unit mode requires at least one unit option"));
        }
        if column.column_type == ColumnType::Dropdown && column.dropdown_options.is_empty() {
            violations.push(self.violation(&name, "dropdown column requires at least one option"));
        }
        violations
    }
}

impl SchemaRule for TableShapeRule {
    fn name(&self) -> &'static str { "table_shape" }

    fn check(&self, field: &FieldSchema) -> Vec<SchemaViolation> {
        if field.field_type != FieldType::Table {
            return vec![];
        }
        let Some(table) = &field.table_schema else {
            return vec![self.violation(&field.key, "table field requires a table schema")];
        };
        if table.columns.is_empty() {
            return vec![self.violation(&field.key, "table requires at least one column")];
        }

        let mut violations = vec![];
        let mut seen = HashSet::new();
        for column in &table.columns {
            if !seen.insert(column.key.as_str()) {
                violations.push(self.violation(
                    &field.key,
                    format!("duplicate column key '{}'", column.key),
                ));
            }
            violations.extend(self.check_column(&field.key, column));
        }
        violations
    }
}

/// Validator runs every rule per field, then the list-level key uniqueness check.
pub struct SchemaValidator {
    rules: Vec<Box<dyn SchemaRule>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(KeyPresentRule),
                Box::new(UnitOptionsRule),
                Box::new(DropdownOptionsRule),
                Box::new(MultiKeysRule),
                Box::new(TableShapeRule),
            ],
        }
    }

    pub fn validate(&self, fields: &[FieldSchema]) -> SchemaReport {
        let mut violations = vec![];

        for field in fields {
            for rule in &self.rules {
                violations.extend(rule.check(field));
            }
        }

        let mut seen = HashSet::new();
        for field in fields {
            if !field.key.is_empty() && !seen.insert(field.key.as_str()) {
                violations.push(SchemaViolation {
                    rule: "unique_keys".to_string(),
                    field: field.key.clone(),
                    message: "field key appears more than once".to_string(),
                });
            }
        }

        SchemaReport {
            valid: violations.is_empty(),
            violations,
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
