//! Field Schema - the shape of one data-entry slot
//!
//! A field is immutable once it belongs to a published template version.
//! Editing a field means publishing a new version (see `templates`).

use serde::{Deserialize, Serialize};

use crate::templates::TemplateId;

pub type FieldId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Dropdown,
    Boolean,
    Table,
}

/// Whether a numeric value carries a unit, and whether one must be picked.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitMode {
    #[default]
    None,
    Optional,
    Required,
}

impl UnitMode {
    pub fn uses_units(&self) -> bool {
        !matches!(self, UnitMode::None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(default)]
    pub id: FieldId,
    #[serde(default)]
    pub template_id: TemplateId,
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Display and evaluation order, unique within a template.
    #[serde(default)]
    pub order_no: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    #[serde(default)]
    pub is_multi: bool,
    /// Sub-value names, only meaningful when `is_multi`.
    #[serde(default)]
    pub multi_keys: Vec<String>,
    #[serde(default)]
    pub unit_mode: UnitMode,
    #[serde(default)]
    pub unit_options: Vec<String>,
    #[serde(default)]
    pub dropdown_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_schema: Option<TableSchema>,
}

impl FieldSchema {
    /// A detached field with no id, template or order assigned yet.
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: FieldId::new(),
            template_id: TemplateId::new(),
            key: key.into(),
            label: label.into(),
            field_type,
            required: false,
            order_no: 0,
            group_key: None,
            is_multi: false,
            multi_keys: vec![],
            unit_mode: UnitMode::None,
            unit_options: vec![],
            dropdown_options: vec![],
            table_schema: None,
        }
    }

    /// Copy this definition under a new identity, keeping every schema attribute.
    pub fn attach(&self, id: FieldId, template_id: &str, order_no: u32) -> Self {
        Self {
            id,
            template_id: template_id.to_string(),
            order_no,
            ..self.clone()
        }
    }

    /// The unit a fresh value starts with.
    ///
    /// Required units default to the first configured option (empty when
    /// none are configured); optional and absent units start unset.
    pub fn default_unit(&self) -> Option<String> {
        match self.unit_mode {
            UnitMode::Required => Some(self.unit_options.first().cloned().unwrap_or_default()),
            UnitMode::Optional | UnitMode::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowMode {
    #[default]
    Configurable,
}

/// Rows x columns. Row count is chosen by the caller, columns are fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(default)]
    pub row_mode: RowMode,
    #[serde(default)]
    pub default_rows: Vec<String>,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Number,
    Text,
    Dropdown,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub unit_mode: UnitMode,
    #[serde(default)]
    pub unit_options: Vec<String>,
    #[serde(default)]
    pub dropdown_options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_deserializes_with_defaults() {
        let json = r#"{"key": "operator", "label": "Operator", "type": "TEXT"}"#;
        let field: FieldSchema = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Text);
        assert_eq!(field.unit_mode, UnitMode::None);
        assert!(field.id.is_empty());
        assert!(field.multi_keys.is_empty());
        assert!(field.table_schema.is_none());
    }

    #[test]
    fn test_field_serializes_camel_case() {
        let field = FieldSchema {
            unit_mode: UnitMode::Required,
            unit_options: vec!["C".into()],
            ..FieldSchema::new("ambientTemp", "Ambient Temp", FieldType::Number)
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["type"], "NUMBER");
        assert_eq!(value["unitMode"], "REQUIRED");
        assert_eq!(value["unitOptions"][0], "C");
        assert!(value.get("groupKey").is_none());
    }

    #[test]
    fn test_default_unit() {
        let mut field = FieldSchema::new("t", "T", FieldType::Number);
        assert_eq!(field.default_unit(), None);

        field.unit_mode = UnitMode::Optional;
        field.unit_options = vec!["V".into(), "mV".into()];
        assert_eq!(field.default_unit(), None);

        field.unit_mode = UnitMode::Required;
        assert_eq!(field.default_unit(), Some("V".to_string()));

        field.unit_options.clear();
        assert_eq!(field.default_unit(), Some(String::new()));
    }

    #[test]
    fn test_attach_keeps_schema() {
        let field = FieldSchema {
            dropdown_options: vec!["A".into(), "B".into()],
            ..FieldSchema::new("band", "Band", FieldType::Dropdown)
        };
        let attached = field.attach("f-1".into(), "t-1", 20);
        assert_eq!(attached.id, "f-1");
        assert_eq!(attached.template_id, "t-1");
        assert_eq!(attached.order_no, 20);
        assert_eq!(attached.dropdown_options, field.dropdown_options);
        assert_eq!(attached.key, "band");
    }
}
