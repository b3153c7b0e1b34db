//! Template System - Append-Only Versions
//!
//! A template is identified by a stable business `code`. Every edit publishes
//! a new immutable version; existing versions are never patched or deleted,
//! so sheets keep citing the exact schema they were recorded under.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::fields::FieldSchema;
use crate::hashing::schema_fingerprint;
use crate::store::{MemoryTemplateRepository, TemplateRepository};
use crate::validation::SchemaValidator;

pub type TemplateId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    Input,
    Output,
}

impl std::str::FromStr for TemplateKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INPUT" => Ok(TemplateKind::Input),
            "OUTPUT" => Ok(TemplateKind::Output),
            other => Err(CoreError::Validation(format!("unknown template kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub code: String,
    pub name: String,
    pub kind: TemplateKind,
    pub version: u32,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    #[serde(default)]
    pub base_template_id: Option<TemplateId>,
    pub code: String,
    pub name: String,
    pub kind: TemplateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceFieldsRequest {
    pub template_id: TemplateId,
    pub fields: Vec<FieldSchema>,
}

/// Template registry - owns version lineage and field schemas
pub struct TemplateRegistry<R = MemoryTemplateRepository> {
    repo: R,
    validator: SchemaValidator,
    order_no_step: u32,
    validate_schemas: bool,
}

impl TemplateRegistry<MemoryTemplateRepository> {
    pub fn new() -> Self {
        Self::with_repository(MemoryTemplateRepository::new(), &CoreConfig::default())
    }
}

impl<R: TemplateRepository> TemplateRegistry<R> {
    pub fn with_repository(repo: R, config: &CoreConfig) -> Self {
        Self {
            repo,
            validator: SchemaValidator::new(),
            order_no_step: config.order_no_step,
            validate_schemas: config.validate_field_schemas,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// All templates, optionally of one kind: by code, newest version first.
    pub fn list(&self, kind: Option<TemplateKind>) -> Vec<Template> {
        let mut templates: Vec<_> = self
            .repo
            .all()
            .into_iter()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .collect();
        templates.sort_by(|a, b| a.code.cmp(&b.code).then(b.version.cmp(&a.version)));
        templates
    }

    pub fn get(&self, id: &str) -> Option<Template> {
        self.repo.get(id)
    }

    /// Fields of one exact version ordered by `order_no`. Unknown ids yield nothing.
    pub fn fields(&self, id: &str) -> Vec<FieldSchema> {
        let Some(template) = self.repo.get(id) else {
            debug!(template_id = id, "fields requested for unknown template");
            return vec![];
        };
        let mut fields = template.fields;
        fields.sort_by_key(|f| f.order_no);
        fields
    }

    pub fn latest_version(&self, code: &str) -> Option<Template> {
        self.repo
            .all()
            .into_iter()
            .filter(|t| t.code == code)
            .max_by_key(|t| t.version)
    }

    fn next_version(&self, code: &str) -> u32 {
        self.repo.max_version(code).map_or(1, |v| v + 1)
    }

    /// Publish the next version of `code`, cloning fields from a base version when given.
    pub fn create_version(&mut self, request: &CreateVersionRequest) -> Result<Template> {
        let base_fields = match &request.base_template_id {
            Some(base_id) => {
                let base = self
                    .repo
                    .get(base_id)
                    .ok_or_else(|| CoreError::not_found("Template", base_id.clone()))?;
                base.fields
            }
            None => vec![],
        };

        let id = Uuid::new_v4().to_string();
        let fields = base_fields
            .iter()
            .map(|f| f.attach(Uuid::new_v4().to_string(), &id, f.order_no))
            .collect();

        let template = Template {
            id,
            code: request.code.clone(),
            name: request.name.clone(),
            kind: request.kind,
            version: self.next_version(&request.code),
            fields,
        };
        self.repo.insert(template.clone())?;

        info!(
            template_id = %template.id,
            code = %template.code,
            version = template.version,
            base = ?request.base_template_id,
            "template version created"
        );
        Ok(template)
    }

    /// Publish a new version of a template whose fields are exactly `request.fields`.
    ///
    /// The source version is left untouched. Order numbers are reassigned in
    /// input order as multiples of the configured step; ids are fresh.
    pub fn replace_fields(&mut self, request: &ReplaceFieldsRequest) -> Result<Template> {
        let current = self
            .repo
            .get(&request.template_id)
            .ok_or_else(|| CoreError::not_found("Template", request.template_id.clone()))?;

        if self.order_no_step == 0 {
            return Err(CoreError::Validation("order number step must be positive".into()));
        }
        if self.validate_schemas {
            let report = self.validator.validate(&request.fields);
            if !report.valid {
                return Err(CoreError::Validation(report.summary()));
            }
        }

        let order_nos = (1u32..)
            .take(request.fields.len())
            .map(|i| i.checked_mul(self.order_no_step))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CoreError::Validation("order number overflow".into()))?;

        let id = Uuid::new_v4().to_string();
        let fields = request
            .fields
            .iter()
            .zip(order_nos)
            .map(|(f, order_no)| f.attach(Uuid::new_v4().to_string(), &id, order_no))
            .collect();

        let template = Template {
            id,
            code: current.code.clone(),
            name: current.name.clone(),
            kind: current.kind,
            version: self.next_version(&current.code),
            fields,
        };
        self.repo.insert(template.clone())?;

        let changed = schema_fingerprint(&current.fields)? != schema_fingerprint(&template.fields)?;
        info!(
            template_id = %template.id,
            code = %template.code,
            version = template.version,
            from_version = current.version,
            fields = template.fields.len(),
            changed,
            "template fields saved as new version"
        );
        Ok(template)
    }

    /// Fingerprint of a version's schema, independent of ids and numbering.
    pub fn fingerprint(&self, id: &str) -> Result<String> {
        let template = self
            .repo
            .get(id)
            .ok_or_else(|| CoreError::not_found("Template", id))?;
        let mut fields = template.fields;
        fields.sort_by_key(|f| f.order_no);
        Ok(schema_fingerprint(&fields)?)
    }
}

impl Default for TemplateRegistry<MemoryTemplateRepository> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldType, UnitMode};

    fn create(registry: &mut TemplateRegistry, code: &str, kind: TemplateKind) -> Template {
        registry
            .create_version(&CreateVersionRequest {
                base_template_id: None,
                code: code.into(),
                name: format!("{} template", code),
                kind,
            })
            .unwrap()
    }

    fn replace(registry: &mut TemplateRegistry, id: &str, fields: Vec<FieldSchema>) -> Result<Template> {
        registry.replace_fields(&ReplaceFieldsRequest {
            template_id: id.into(),
            fields,
        })
    }

    #[test]
    fn test_versions_increase_per_code() {
        let mut registry = TemplateRegistry::new();
        let a1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let a2 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let b1 = create(&mut registry, "CAL-OUT", TemplateKind::Output);
        assert_eq!((a1.version, a2.version, b1.version), (1, 2, 1));
        assert_ne!(a1.id, a2.id);
        assert_eq!(registry.latest_version("CAL-IN").unwrap().id, a2.id);
    }

    #[test]
    fn test_list_orders_by_code_then_newest() {
        let mut registry = TemplateRegistry::new();
        create(&mut registry, "B", TemplateKind::Input);
        create(&mut registry, "A", TemplateKind::Output);
        create(&mut registry, "B", TemplateKind::Input);

        let listed: Vec<_> = registry
            .list(None)
            .iter()
            .map(|t| (t.code.clone(), t.version))
            .collect();
        assert_eq!(
            listed,
            vec![("A".to_string(), 1), ("B".to_string(), 2), ("B".to_string(), 1)]
        );
        assert_eq!(registry.list(Some(TemplateKind::Output)).len(), 1);
    }

    #[test]
    fn test_replace_fields_creates_new_version() {
        let mut registry = TemplateRegistry::new();
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let v2 = replace(
            &mut registry,
            &v1.id,
            vec![
                FieldSchema::new("operator", "Operator", FieldType::Text),
                FieldSchema::new("passed", "Passed", FieldType::Boolean),
            ],
        )
        .unwrap();

        assert_eq!(v2.version, 2);
        assert_eq!(v2.code, v1.code);
        let orders: Vec<_> = v2.fields.iter().map(|f| f.order_no).collect();
        assert_eq!(orders, vec![10, 20]);
        assert!(v2.fields.iter().all(|f| f.template_id == v2.id && !f.id.is_empty()));
        assert!(registry.fields(&v1.id).is_empty());
    }

    #[test]
    fn test_clone_from_base_gets_fresh_ids() {
        let mut registry = TemplateRegistry::new();
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let v2 = replace(
            &mut registry,
            &v1.id,
            vec![FieldSchema::new("operator", "Operator", FieldType::Text)],
        )
        .unwrap();

        let v3 = registry
            .create_version(&CreateVersionRequest {
                base_template_id: Some(v2.id.clone()),
                code: "CAL-IN".into(),
                name: "Calibration input".into(),
                kind: TemplateKind::Input,
            })
            .unwrap();

        assert_eq!(v3.version, 3);
        assert_eq!(v3.fields.len(), 1);
        assert_ne!(v3.fields[0].id, v2.fields[0].id);
        assert_eq!(v3.fields[0].template_id, v3.id);
        assert_eq!(v3.fields[0].order_no, v2.fields[0].order_no);
        assert_eq!(registry.fingerprint(&v2.id).unwrap(), registry.fingerprint(&v3.id).unwrap());
    }

    #[test]
    fn test_unknown_ids() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.fields("missing").is_empty());
        let err = replace(&mut registry, "missing", vec![]).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(registry.fingerprint("missing").is_err());
        let err = registry
            .create_version(&CreateVersionRequest {
                base_template_id: Some("missing".into()),
                code: "X".into(),
                name: "X".into(),
                kind: TemplateKind::Input,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(registry.list(None).is_empty());
    }

    #[test]
    fn test_malformed_fields_rejected_without_consuming_version() {
        let mut registry = TemplateRegistry::new();
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let bad = FieldSchema {
            unit_mode: UnitMode::Required,
            ..FieldSchema::new("temp", "Temp", FieldType::Number)
        };
        let err = replace(&mut registry, &v1.id, vec![bad]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(create(&mut registry, "CAL-IN", TemplateKind::Input).version, 2);
    }

    fn configured(order_no_step: u32, validate_field_schemas: bool) -> TemplateRegistry {
        let config = CoreConfig {
            order_no_step,
            validate_field_schemas,
            ..CoreConfig::default()
        };
        TemplateRegistry::with_repository(MemoryTemplateRepository::new(), &config)
    }

    fn two_fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("a", "A", FieldType::Text),
            FieldSchema::new("b", "B", FieldType::Text),
        ]
    }

    #[test]
    fn test_zero_step_rejected() {
        let mut registry = configured(0, true);
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let err = replace(&mut registry, &v1.id, two_fields()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(registry.list(None).len(), 1);
    }

    #[test]
    fn test_custom_step_spaces_order_numbers() {
        let mut registry = configured(5, true);
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let v2 = replace(&mut registry, &v1.id, two_fields()).unwrap();
        let orders: Vec<_> = v2.fields.iter().map(|f| f.order_no).collect();
        assert_eq!(orders, vec![5, 10]);
    }

    #[test]
    fn test_order_number_overflow_is_an_error() {
        let mut registry = configured(3_000_000_000, true);
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let err = replace(&mut registry, &v1.id, two_fields()).unwrap_err();
        match err {
            CoreError::Validation(message) => assert_eq!(message, "order number overflow"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(create(&mut registry, "CAL-IN", TemplateKind::Input).version, 2);

        let single = replace(&mut registry, &v1.id, vec![FieldSchema::new("a", "A", FieldType::Text)])
            .unwrap();
        assert_eq!(single.fields[0].order_no, 3_000_000_000);
    }

    #[test]
    fn test_schema_checks_can_be_disabled() {
        let mut registry = configured(10, false);
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let malformed = vec![
            FieldSchema::new("band", "Band", FieldType::Dropdown),
            FieldSchema::new("band", "Band again", FieldType::Text),
        ];
        let v2 = replace(&mut registry, &v1.id, malformed).unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.fields.len(), 2);
    }

    #[test]
    fn test_fingerprint_follows_field_order() {
        let mut registry = TemplateRegistry::new();
        let v1 = create(&mut registry, "CAL-IN", TemplateKind::Input);
        let v2 = replace(&mut registry, &v1.id, two_fields()).unwrap();
        let v3 = replace(&mut registry, &v1.id, two_fields().into_iter().rev().collect()).unwrap();
        let v4 = replace(&mut registry, &v1.id, two_fields()).unwrap();
        assert_eq!(registry.fingerprint(&v2.id).unwrap(), registry.fingerprint(&v4.id).unwrap());
        assert_ne!(registry.fingerprint(&v2.id).unwrap(), registry.fingerprint(&v3.id).unwrap());
        assert!(registry.fingerprint(&v1.id).is_ok());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("input".parse::<TemplateKind>().unwrap(), TemplateKind::Input);
        assert_eq!("OUTPUT".parse::<TemplateKind>().unwrap(), TemplateKind::Output);
        assert!("both".parse::<TemplateKind>().is_err());
    }
}
