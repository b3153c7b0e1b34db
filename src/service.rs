//! Scale Service - Single Entry Point
//!
//! Every call crosses this boundary with owned values: inputs are copied in,
//! results are independent copies, so callers can never reach stored state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::fields::FieldSchema;
use crate::items::{ItemMaster, ItemTree, ItemTreeNode};
use crate::mappings::{MappingStore, PartTemplateMapping, SaveMappingRequest, TemplatesForPart};
use crate::sheets::{NewSheet, Sheet, SheetDetail, SheetKind, SheetMeta, SheetStore};
use crate::store::{
    MappingRepository, MemoryMappingRepository, MemorySheetRepository, MemoryTemplateRepository,
    SheetRepository, TemplateRepository,
};
use crate::templates::{
    CreateVersionRequest, ReplaceFieldsRequest, Template, TemplateKind, TemplateRegistry,
};
use crate::values::{initial_values, SheetValues};
use crate::{ENGINE_VERSION, MIN_SNAPSHOT_VERSION};

/// Full state of the in-memory stores, as written between CLI invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub engine_version: String,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
    #[serde(default)]
    pub mappings: Vec<PartTemplateMapping>,
}

/// Templates configured for the part an item belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplates {
    pub part_id: String,
    pub input_templates: Vec<Template>,
    pub output_templates: Vec<Template>,
}

pub struct ScaleService<
    T = MemoryTemplateRepository,
    S = MemorySheetRepository,
    M = MemoryMappingRepository,
> {
    templates: TemplateRegistry<T>,
    sheets: SheetStore<S>,
    mappings: MappingStore<M>,
    items: ItemTree,
}

impl ScaleService {
    pub fn new(config: &CoreConfig, items: ItemTree) -> Self {
        Self::with_repositories(
            MemoryTemplateRepository::new(),
            MemorySheetRepository::new(),
            MemoryMappingRepository::new(),
            items,
            config,
        )
    }

    pub fn from_snapshot(snapshot: Snapshot, config: &CoreConfig, items: ItemTree) -> Result<Self> {
        check_snapshot_version(&snapshot.engine_version)?;
        let service = Self::with_repositories(
            MemoryTemplateRepository::with_templates(snapshot.templates)?,
            MemorySheetRepository::with_sheets(snapshot.sheets)?,
            MemoryMappingRepository::with_mappings(snapshot.mappings),
            items,
            config,
        );
        debug!(engine_version = %snapshot.engine_version, "snapshot restored");
        Ok(service)
    }

    /// Restore from a snapshot file; a missing file starts empty.
    pub fn open(path: &Path, config: &CoreConfig, items: ItemTree) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no snapshot found, starting empty");
            return Ok(Self::new(config, items));
        }
        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        Self::from_snapshot(snapshot, config, items)
    }
}

impl<T, S, M> ScaleService<T, S, M>
where
    T: TemplateRepository,
    S: SheetRepository,
    M: MappingRepository,
{
    pub fn with_repositories(
        templates: T,
        sheets: S,
        mappings: M,
        items: ItemTree,
        config: &CoreConfig,
    ) -> Self {
        Self {
            templates: TemplateRegistry::with_repository(templates, config),
            sheets: SheetStore::with_repository(sheets),
            mappings: MappingStore::with_repository(mappings),
            items,
        }
    }

    // --- Templates ---

    pub fn list_templates(&self, kind: Option<TemplateKind>) -> Vec<Template> {
        self.templates.list(kind)
    }

    pub fn get_template_fields(&self, template_id: &str) -> Vec<FieldSchema> {
        self.templates.fields(template_id)
    }

    pub fn latest_template(&self, code: &str) -> Option<Template> {
        self.templates.latest_version(code)
    }

    pub fn create_template_version(&mut self, request: &CreateVersionRequest) -> Result<Template> {
        self.templates.create_version(request)
    }

    pub fn save_fields_as_new_version(&mut self, request: &ReplaceFieldsRequest) -> Result<Template> {
        self.templates.replace_fields(request)
    }

    pub fn template_fingerprint(&self, template_id: &str) -> Result<String> {
        self.templates.fingerprint(template_id)
    }

    /// Default value for every field of a template version.
    pub fn initial_values(&self, template_id: &str) -> Result<SheetValues> {
        if self.templates.get(template_id).is_none() {
            return Err(CoreError::not_found("Template", template_id));
        }
        Ok(initial_values(&self.templates.fields(template_id)))
    }

    // --- Sheets ---

    pub fn create_sheet(&mut self, payload: &NewSheet) -> Result<Sheet> {
        let template = self
            .templates
            .get(&payload.template_id)
            .ok_or_else(|| CoreError::not_found("Template", payload.template_id.clone()))?;
        self.sheets.create(payload, &template)
    }

    pub fn get_sheet(&self, sheet_id: &str) -> Result<SheetDetail> {
        self.sheets.get(sheet_id)
    }

    pub fn list_item_sheets(&self, item_id: &str, kind: SheetKind) -> Vec<SheetMeta> {
        self.sheets.list_for_item(item_id, kind)
    }

    pub fn list_input_outputs(&self, parent_sheet_id: &str) -> Vec<SheetMeta> {
        self.sheets.list_outputs(parent_sheet_id)
    }

    // --- Part mappings ---

    pub fn list_part_template_mappings(&self) -> Vec<PartTemplateMapping> {
        self.mappings.list()
    }

    pub fn get_templates_for_part(&self, part_id: &str) -> TemplatesForPart {
        self.mappings.for_part(part_id)
    }

    pub fn save_part_template_mapping(&mut self, request: &SaveMappingRequest) -> PartTemplateMapping {
        self.mappings.save(request)
    }

    /// Resolve item -> part -> mapped templates. Ids no longer in the registry are skipped.
    pub fn templates_for_item(&self, item_id: &str) -> Result<ItemTemplates> {
        let item = self
            .items
            .get(item_id)
            .ok_or_else(|| CoreError::not_found("Item", item_id))?;
        let ids = self.mappings.for_part(&item.part_id);
        let resolve = |ids: &[String]| -> Vec<Template> {
            ids.iter().filter_map(|id| self.templates.get(id)).collect()
        };
        Ok(ItemTemplates {
            input_templates: resolve(&ids.input_template_ids),
            output_templates: resolve(&ids.output_template_ids),
            part_id: item.part_id,
        })
    }

    // --- Items ---

    pub fn get_items_tree(&self) -> Vec<ItemTreeNode> {
        self.items.tree()
    }

    pub fn get_item_by_id(&self, item_id: &str) -> Option<ItemMaster> {
        self.items.get(item_id)
    }

    pub fn list_part_ids(&self) -> Vec<String> {
        self.items.part_ids()
    }

    // --- Snapshots ---

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            engine_version: ENGINE_VERSION.to_string(),
            templates: self.templates.repository().all(),
            sheets: self.sheets.repository().all(),
            mappings: self.mappings.repository().all(),
        }
    }

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        fs::write(path, content)?;
        debug!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

fn check_snapshot_version(found: &str) -> Result<()> {
    let engine = semver::Version::parse(ENGINE_VERSION)
        .map_err(|_| CoreError::Validation("invalid engine version".into()))?;
    let min = semver::Version::parse(MIN_SNAPSHOT_VERSION)
        .map_err(|_| CoreError::Validation("invalid minimum snapshot version".into()))?;
    let snapshot = semver::Version::parse(found)
        .map_err(|_| CoreError::Validation(format!("invalid snapshot version '{}'", found)))?;

    if snapshot > engine || snapshot < min {
        return Err(CoreError::IncompatibleSnapshot {
            found: found.to_string(),
            required: format!(">={}, <={}", MIN_SNAPSHOT_VERSION, ENGINE_VERSION),
        });
    }
    Ok(())
}
