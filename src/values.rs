//! Value Model - typed field values and default synthesis

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{FieldSchema, FieldType};

/// A single cell of a multi-value field or a table row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

pub type TableRow = BTreeMap<String, Option<Scalar>>;

/// Stored values of a sheet, keyed by field key.
pub type SheetValues = BTreeMap<String, FieldValue>;

/// The stored answer for one field, tagged by the shape it takes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldValue {
    Text {
        value: Option<String>,
    },
    Number {
        value: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Date {
        value: Option<NaiveDate>,
    },
    Boolean {
        value: Option<bool>,
    },
    Dropdown {
        value: Option<String>,
    },
    Multi {
        values: BTreeMap<String, Option<Scalar>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Table {
        rows: Vec<TableRow>,
    },
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text { .. } => "TEXT",
            FieldValue::Number { .. } => "NUMBER",
            FieldValue::Date { .. } => "DATE",
            FieldValue::Boolean { .. } => "BOOLEAN",
            FieldValue::Dropdown { .. } => "DROPDOWN",
            FieldValue::Multi { .. } => "MULTI",
            FieldValue::Table { .. } => "TABLE",
        }
    }

    /// Canonical "no answer yet" value for a field.
    ///
    /// Booleans always start at `false`. Text and dropdowns start as an empty
    /// string, dates as null. Table rows are empty objects, one per default
    /// row; columns are filled in by the caller.
    ///
    /// Assumes a well-formed schema: a multi-value field without sub-keys
    /// simply yields an empty mapping.
    pub fn default_for(field: &FieldSchema) -> Self {
        match field.field_type {
            FieldType::Boolean => FieldValue::Boolean { value: Some(false) },
            FieldType::Number if field.is_multi => FieldValue::Multi {
                values: field.multi_keys.iter().map(|k| (k.clone(), None)).collect(),
                unit: field.default_unit(),
            },
            FieldType::Number => FieldValue::Number {
                value: None,
                unit: field.default_unit(),
            },
            FieldType::Table => {
                let row_count = field
                    .table_schema
                    .as_ref()
                    .map_or(0, |t| t.default_rows.len());
                FieldValue::Table {
                    rows: vec![TableRow::new(); row_count],
                }
            }
            FieldType::Date => FieldValue::Date { value: None },
            FieldType::Text => FieldValue::Text { value: Some(String::new()) },
            FieldType::Dropdown => FieldValue::Dropdown { value: Some(String::new()) },
        }
    }
}

/// Default values for every field of a template version, keyed by field key.
pub fn initial_values(fields: &[FieldSchema]) -> SheetValues {
    fields
        .iter()
        .map(|f| (f.key.clone(), FieldValue::default_for(f)))
        .collect()
}
