//! Item Tree - read-only Part -> Serial -> Bridge index
//!
//! Built once from the item master list. Inactive items stay addressable by
//! id but are left out of the tree and the part id listing.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub type ItemId = String;

fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemMaster {
    pub id: ItemId,
    pub part_id: String,
    pub part_sn: String,
    pub bridge_name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Part,
    Serial,
    Bridge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemTreeNode {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Set on bridge leaves only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ItemTreeNode>,
}

impl ItemTreeNode {
    fn branch(key: String, label: String, node_type: NodeType) -> Self {
        Self { key, label, node_type, item_id: None, children: vec![] }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    items: Vec<ItemMaster>,
    index: HashMap<ItemId, usize>,
    roots: Vec<ItemTreeNode>,
}

impl ItemTree {
    /// Index the item master and group active items into the tree.
    ///
    /// Item ids are unique; a repeated id is a `Validation` error.
    pub fn build(items: Vec<ItemMaster>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), i).is_some() {
                return Err(CoreError::Validation(format!("duplicate item id '{}'", item.id)));
            }
        }

        let mut active: Vec<&ItemMaster> = items.iter().filter(|i| i.active).collect();
        active.sort_by(|a, b| {
            (&a.part_id, &a.part_sn, &a.bridge_name).cmp(&(&b.part_id, &b.part_sn, &b.bridge_name))
        });

        let mut roots: Vec<ItemTreeNode> = vec![];
        for item in active {
            if roots.last().map_or(true, |p| p.key != part_key(&item.part_id)) {
                roots.push(ItemTreeNode::branch(
                    part_key(&item.part_id),
                    format!("Part {}", item.part_id),
                    NodeType::Part,
                ));
            }
            let Some(part) = roots.last_mut() else { continue };

            let serial_key = format!("sn-{}", item.part_sn);
            if part.children.last().map_or(true, |s| s.key != serial_key) {
                part.children.push(ItemTreeNode::branch(
                    serial_key,
                    item.part_sn.clone(),
                    NodeType::Serial,
                ));
            }
            let Some(serial) = part.children.last_mut() else { continue };

            serial.children.push(ItemTreeNode {
                key: format!("bridge-{}", item.id),
                label: item.bridge_name.clone(),
                node_type: NodeType::Bridge,
                item_id: Some(item.id.clone()),
                children: vec![],
            });
        }

        Ok(Self { items, index, roots })
    }

    /// Load the item master from a JSON array; a missing file gives an empty tree.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let items: Vec<ItemMaster> = serde_json::from_str(&content)?;
        Self::build(items)
    }

    pub fn tree(&self) -> Vec<ItemTreeNode> {
        self.roots.clone()
    }

    pub fn get(&self, item_id: &str) -> Option<ItemMaster> {
        self.index.get(item_id).map(|&i| self.items[i].clone())
    }

    /// Distinct part ids of active items, ascending.
    pub fn part_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.active)
            .map(|i| i.part_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn part_key(part_id: &str) -> String {
    format!("part-{}", part_id)
}
