//! Sheet Store - input/output linkage with a duplicate guard
//!
//! An OUTPUT sheet points at exactly one INPUT sheet and one output template.
//! At most one OUTPUT sheet may exist per `(parent_sheet_id, output_template_id)`.
//! Sheets are immutable once created.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::items::ItemId;
use crate::store::{MemorySheetRepository, SheetRepository};
use crate::templates::{Template, TemplateId};
use crate::values::SheetValues;

pub type SheetId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetKind {
    Input,
    Output,
}

impl std::str::FromStr for SheetKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INPUT" => Ok(SheetKind::Input),
            "OUTPUT" => Ok(SheetKind::Output),
            other => Err(CoreError::Validation(format!("unknown sheet kind '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: SheetId,
    pub item_id: ItemId,
    pub template_id: TemplateId,
    pub template_code: String,
    /// Copied from the template at creation time.
    pub template_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_sheet_id: Option<SheetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_template_id: Option<TemplateId>,
    #[serde(default)]
    pub values: SheetValues,
}

impl Sheet {
    pub fn kind(&self) -> SheetKind {
        if self.parent_sheet_id.is_some() {
            SheetKind::Output
        } else {
            SheetKind::Input
        }
    }

    /// `sheet_date` when recorded (at midnight UTC), otherwise `created_at`.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.sheet_date
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(self.created_at)
    }

    pub fn meta(&self) -> SheetMeta {
        SheetMeta {
            id: self.id.clone(),
            item_id: self.item_id.clone(),
            template_id: self.template_id.clone(),
            template_code: self.template_code.clone(),
            template_version: self.template_version,
            kind: self.kind(),
            created_at: self.created_at,
            sheet_date: self.sheet_date,
            parent_sheet_id: self.parent_sheet_id.clone(),
            output_template_id: self.output_template_id.clone(),
        }
    }
}

/// Sheet without its values, as returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetMeta {
    pub id: SheetId,
    pub item_id: ItemId,
    pub template_id: TemplateId,
    pub template_code: String,
    pub template_version: u32,
    pub kind: SheetKind,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_sheet_id: Option<SheetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_template_id: Option<TemplateId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetDetail {
    pub sheet: SheetMeta,
    pub values: SheetValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSheet {
    pub item_id: ItemId,
    pub template_id: TemplateId,
    #[serde(default)]
    pub values: SheetValues,
    #[serde(default)]
    pub parent_sheet_id: Option<SheetId>,
    #[serde(default)]
    pub output_template_id: Option<TemplateId>,
    #[serde(default)]
    pub sheet_date: Option<NaiveDate>,
}

pub struct SheetStore<R = MemorySheetRepository> {
    repo: R,
}

impl SheetStore<MemorySheetRepository> {
    pub fn new() -> Self {
        Self::with_repository(MemorySheetRepository::new())
    }
}

impl<R: SheetRepository> SheetStore<R> {
    pub fn with_repository(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Create a sheet against an already-resolved template version.
    ///
    /// Output sheets need both `parent_sheet_id` and `output_template_id`,
    /// and the parent must be an existing input sheet.
    pub fn create(&mut self, payload: &NewSheet, template: &Template) -> Result<Sheet> {
        if payload.template_id != template.id {
            return Err(CoreError::Validation(format!(
                "payload template {} does not match resolved template {}",
                payload.template_id, template.id
            )));
        }

        match (&payload.parent_sheet_id, &payload.output_template_id) {
            (Some(parent_id), Some(_)) => {
                let parent = self
                    .repo
                    .get(parent_id)
                    .ok_or_else(|| CoreError::not_found("Sheet", parent_id.clone()))?;
                if parent.kind() != SheetKind::Input {
                    return Err(CoreError::Validation(format!(
                        "parent sheet {} is not an input sheet",
                        parent_id
                    )));
                }
            }
            (Some(_), None) => {
                return Err(CoreError::Validation(
                    "outputTemplateId is required for an output sheet".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(CoreError::Validation(
                    "parentSheetId is required when outputTemplateId is given".into(),
                ));
            }
            (None, None) => {}
        }

        let sheet = Sheet {
            id: Uuid::new_v4().to_string(),
            item_id: payload.item_id.clone(),
            template_id: template.id.clone(),
            template_code: template.code.clone(),
            template_version: template.version,
            created_at: Utc::now(),
            sheet_date: payload.sheet_date,
            parent_sheet_id: payload.parent_sheet_id.clone(),
            output_template_id: payload.output_template_id.clone(),
            values: payload.values.clone(),
        };

        if let Err(err) = self.repo.insert_unique(sheet.clone()) {
            warn!(
                parent_sheet_id = ?sheet.parent_sheet_id,
                output_template_id = ?sheet.output_template_id,
                error = %err,
                "sheet rejected"
            );
            return Err(err);
        }

        info!(
            sheet_id = %sheet.id,
            item_id = %sheet.item_id,
            template_id = %sheet.template_id,
            kind = ?sheet.kind(),
            "sheet created"
        );
        Ok(sheet)
    }

    pub fn get(&self, sheet_id: &str) -> Result<SheetDetail> {
        let sheet = self
            .repo
            .get(sheet_id)
            .ok_or_else(|| CoreError::not_found("Sheet", sheet_id))?;
        Ok(SheetDetail {
            sheet: sheet.meta(),
            values: sheet.values,
        })
    }

    /// Sheets of one kind for an item, most recent first.
    pub fn list_for_item(&self, item_id: &str, kind: SheetKind) -> Vec<SheetMeta> {
        let sheets = self
            .repo
            .by_item(item_id)
            .into_iter()
            .filter(|s| s.kind() == kind)
            .collect();
        debug!(item_id, ?kind, "listing item sheets");
        most_recent_first(sheets)
    }

    /// Output sheets recorded against one input sheet, most recent first.
    pub fn list_outputs(&self, parent_sheet_id: &str) -> Vec<SheetMeta> {
        let sheets = self
            .repo
            .by_parent(parent_sheet_id)
            .into_iter()
            .filter(|s| s.kind() == SheetKind::Output)
            .collect();
        most_recent_first(sheets)
    }
}

impl Default for SheetStore<MemorySheetRepository> {
    fn default() -> Self {
        Self::new()
    }
}

/// Order by effective date descending; ties go to the later insertion.
fn most_recent_first(mut sheets: Vec<Sheet>) -> Vec<SheetMeta> {
    sheets.reverse();
    sheets.sort_by_key(|s| Reverse(s.effective_at()));
    sheets.iter().map(Sheet::meta).collect()
}
