//! Part-Template Mapping - which templates apply to which part
//!
//! A pure association store keyed by part id. Template ids are not checked
//! against the registry here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{MappingRepository, MemoryMappingRepository};
use crate::templates::TemplateId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartTemplateMapping {
    pub part_id: String,
    #[serde(default)]
    pub input_template_ids: Vec<TemplateId>,
    #[serde(default)]
    pub output_template_ids: Vec<TemplateId>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemplatesForPart {
    pub input_template_ids: Vec<TemplateId>,
    pub output_template_ids: Vec<TemplateId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMappingRequest {
    pub part_id: String,
    #[serde(default)]
    pub input_template_ids: Vec<TemplateId>,
    #[serde(default)]
    pub output_template_ids: Vec<TemplateId>,
}

pub struct MappingStore<R = MemoryMappingRepository> {
    repo: R,
}

impl MappingStore<MemoryMappingRepository> {
    pub fn new() -> Self {
        Self::with_repository(MemoryMappingRepository::new())
    }
}

impl<R: MappingRepository> MappingStore<R> {
    pub fn with_repository(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn list(&self) -> Vec<PartTemplateMapping> {
        self.repo.all()
    }

    /// Empty id sets when no mapping exists for the part yet.
    pub fn for_part(&self, part_id: &str) -> TemplatesForPart {
        self.repo
            .get(part_id)
            .map(|m| TemplatesForPart {
                input_template_ids: m.input_template_ids,
                output_template_ids: m.output_template_ids,
            })
            .unwrap_or_default()
    }

    /// Replace both id sets for the part wholesale and stamp `updated_at`.
    pub fn save(&mut self, request: &SaveMappingRequest) -> PartTemplateMapping {
        let mapping = PartTemplateMapping {
            part_id: request.part_id.clone(),
            input_template_ids: dedup(&request.input_template_ids),
            output_template_ids: dedup(&request.output_template_ids),
            updated_at: Utc::now(),
        };
        let saved = self.repo.upsert(mapping);
        info!(
            part_id = %saved.part_id,
            inputs = saved.input_template_ids.len(),
            outputs = saved.output_template_ids.len(),
            "part template mapping saved"
        );
        saved
    }
}

impl Default for MappingStore<MemoryMappingRepository> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep first occurrences, preserving order.
fn dedup(ids: &[TemplateId]) -> Vec<TemplateId> {
    let mut out: Vec<TemplateId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(part: &str, inputs: &[&str], outputs: &[&str]) -> SaveMappingRequest {
        SaveMappingRequest {
            part_id: part.into(),
            input_template_ids: inputs.iter().map(|s| s.to_string()).collect(),
            output_template_ids: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_unknown_part_is_empty() {
        let store = MappingStore::new();
        assert_eq!(store.for_part("P999"), TemplatesForPart::default());
    }

    #[test]
    fn test_save_replaces_without_union() {
        let mut store = MappingStore::new();
        store.save(&request("P100", &["a", "b"], &["x"]));
        let saved = store.save(&request("P100", &["c"], &[]));

        assert_eq!(saved.input_template_ids, vec!["c".to_string()]);
        let all = store.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].input_template_ids, vec!["c".to_string()]);
        assert!(all[0].output_template_ids.is_empty());
    }

    #[test]
    fn test_ids_deduplicated_in_order() {
        let mut store = MappingStore::new();
        let saved = store.save(&request("P100", &["b", "a", "b"], &[]));
        assert_eq!(saved.input_template_ids, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_list_ordered_by_part() {
        let mut store = MappingStore::new();
        store.save(&request("P200", &[], &[]));
        store.save(&request("P100", &[], &[]));
        let parts: Vec<_> = store.list().into_iter().map(|m| m.part_id).collect();
        assert_eq!(parts, vec!["P100", "P200"]);
    }
}
