//! Repository seams and the in-memory implementations behind them.
//!
//! Each repository owns its uniqueness rule so a transactional backend can
//! map it onto a unique index or conditional write:
//! templates on `(code, version)`, output sheets on
//! `(parent_sheet_id, output_template_id)`, mappings on `part_id`.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::mappings::PartTemplateMapping;
use crate::sheets::Sheet;
use crate::templates::Template;

pub trait TemplateRepository {
    /// Every stored template, in insertion order.
    fn all(&self) -> Vec<Template>;
    fn get(&self, id: &str) -> Option<Template>;
    fn max_version(&self, code: &str) -> Option<u32>;
    /// Fails with `Conflict` when the id or `(code, version)` is taken.
    fn insert(&mut self, template: Template) -> Result<()>;
}

pub trait SheetRepository {
    /// Every stored sheet, in insertion order.
    fn all(&self) -> Vec<Sheet>;
    fn get(&self, id: &str) -> Option<Sheet>;
    fn by_item(&self, item_id: &str) -> Vec<Sheet>;
    fn by_parent(&self, parent_sheet_id: &str) -> Vec<Sheet>;
    /// Fails with `Conflict` when the id is taken or an output sheet already
    /// exists for the same parent and output template.
    fn insert_unique(&mut self, sheet: Sheet) -> Result<()>;
}

pub trait MappingRepository {
    /// Every mapping, ordered by part id.
    fn all(&self) -> Vec<PartTemplateMapping>;
    fn get(&self, part_id: &str) -> Option<PartTemplateMapping>;
    /// Insert or fully replace the mapping for its part.
    fn upsert(&mut self, mapping: PartTemplateMapping) -> PartTemplateMapping;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateRepository {
    templates: Vec<Template>,
}

impl MemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: Vec<Template>) -> Result<Self> {
        let mut repo = Self::new();
        for template in templates {
            repo.insert(template)?;
        }
        Ok(repo)
    }
}

impl TemplateRepository for MemoryTemplateRepository {
    fn all(&self) -> Vec<Template> {
        self.templates.clone()
    }

    fn get(&self, id: &str) -> Option<Template> {
        self.templates.iter().find(|t| t.id == id).cloned()
    }

    fn max_version(&self, code: &str) -> Option<u32> {
        self.templates
            .iter()
            .filter(|t| t.code == code)
            .map(|t| t.version)
            .max()
    }

    fn insert(&mut self, template: Template) -> Result<()> {
        if self.templates.iter().any(|t| t.id == template.id) {
            return Err(CoreError::Conflict(format!(
                "template id {} already exists",
                template.id
            )));
        }
        if self
            .templates
            .iter()
            .any(|t| t.code == template.code && t.version == template.version)
        {
            return Err(CoreError::Conflict(format!(
                "template {} version {} already exists",
                template.code, template.version
            )));
        }
        self.templates.push(template);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySheetRepository {
    sheets: Vec<Sheet>,
}

impl MemorySheetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheets(sheets: Vec<Sheet>) -> Result<Self> {
        let mut repo = Self::new();
        for sheet in sheets {
            repo.insert_unique(sheet)?;
        }
        Ok(repo)
    }
}

impl SheetRepository for MemorySheetRepository {
    fn all(&self) -> Vec<Sheet> {
        self.sheets.clone()
    }

    fn get(&self, id: &str) -> Option<Sheet> {
        self.sheets.iter().find(|s| s.id == id).cloned()
    }

    fn by_item(&self, item_id: &str) -> Vec<Sheet> {
        self.sheets
            .iter()
            .filter(|s| s.item_id == item_id)
            .cloned()
            .collect()
    }

    fn by_parent(&self, parent_sheet_id: &str) -> Vec<Sheet> {
        self.sheets
            .iter()
            .filter(|s| s.parent_sheet_id.as_deref() == Some(parent_sheet_id))
            .cloned()
            .collect()
    }

    fn insert_unique(&mut self, sheet: Sheet) -> Result<()> {
        if self.sheets.iter().any(|s| s.id == sheet.id) {
            return Err(CoreError::Conflict(format!("sheet id {} already exists", sheet.id)));
        }
        if let (Some(parent), Some(output)) = (&sheet.parent_sheet_id, &sheet.output_template_id) {
            let duplicate = self.sheets.iter().any(|s| {
                s.parent_sheet_id.as_ref() == Some(parent)
                    && s.output_template_id.as_ref() == Some(output)
            });
            if duplicate {
                return Err(CoreError::Conflict(format!(
                    "output already exists for input sheet {} and output template {}",
                    parent, output
                )));
            }
        }
        self.sheets.push(sheet);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryMappingRepository {
    mappings: BTreeMap<String, PartTemplateMapping>,
}

impl MemoryMappingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mappings(mappings: Vec<PartTemplateMapping>) -> Self {
        let mut repo = Self::new();
        for mapping in mappings {
            repo.upsert(mapping);
        }
        repo
    }
}

impl MappingRepository for MemoryMappingRepository {
    fn all(&self) -> Vec<PartTemplateMapping> {
        self.mappings.values().cloned().collect()
    }

    fn get(&self, part_id: &str) -> Option<PartTemplateMapping> {
        self.mappings.get(part_id).cloned()
    }

    fn upsert(&mut self, mapping: PartTemplateMapping) -> PartTemplateMapping {
        self.mappings.insert(mapping.part_id.clone(), mapping.clone());
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TemplateKind;
    use crate::values::SheetValues;
    use chrono::Utc;

    fn template(id: &str, code: &str, version: u32) -> Template {
        Template {
            id: id.to_string(),
            code: code.to_string(),
            name: code.to_string(),
            kind: TemplateKind::Input,
            version,
            fields: vec![],
        }
    }

    fn sheet(id: &str, parent: Option<&str>, output: Option<&str>) -> Sheet {
        Sheet {
            id: id.to_string(),
            item_id: "item-1".to_string(),
            template_id: "t".to_string(),
            template_code: "CAL".to_string(),
            template_version: 1,
            created_at: Utc::now(),
            sheet_date: None,
            parent_sheet_id: parent.map(str::to_string),
            output_template_id: output.map(str::to_string),
            values: SheetValues::new(),
        }
    }

    #[test]
    fn test_template_code_version_unique() {
        let mut repo = MemoryTemplateRepository::new();
        repo.insert(template("a", "CAL", 1)).unwrap();
        let err = repo.insert(template("b", "CAL", 1)).unwrap_err();
        assert!(err.to_string().contains("CAL version 1"));
        repo.insert(template("c", "CAL", 3)).unwrap();
        assert_eq!(repo.max_version("CAL"), Some(3));
        assert_eq!(repo.max_version("OTHER"), None);
    }

    #[test]
    fn test_sheet_pair_unique() {
        let mut repo = MemorySheetRepository::new();
        repo.insert_unique(sheet("in", None, None)).unwrap();
        repo.insert_unique(sheet("out-1", Some("in"), Some("t-out"))).unwrap();
        assert!(repo.insert_unique(sheet("out-2", Some("in"), Some("t-out"))).is_err());
        repo.insert_unique(sheet("out-3", Some("in"), Some("t-other"))).unwrap();
        assert_eq!(repo.by_parent("in").len(), 2);
        assert_eq!(repo.by_item("item-1").len(), 3);
    }

    #[test]
    fn test_mapping_upsert_replaces() {
        let mut repo = MemoryMappingRepository::new();
        let first = PartTemplateMapping {
            part_id: "P100".into(),
            input_template_ids: vec!["a".into()],
            output_template_ids: vec![],
            updated_at: Utc::now(),
        };
        repo.upsert(first.clone());
        repo.upsert(PartTemplateMapping {
            input_template_ids: vec!["b".into()],
            ..first
        });
        let all = repo.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].input_template_ids, vec!["b".to_string()]);
    }
}
