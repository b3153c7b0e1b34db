//! Scale Sheets Core - Versioned Measurement Templates
//!
//! # Ground Rules
//! 1. Templates Are Append-Only
//! 2. Sheets Cite Exact Versions
//! 3. One Output Per Input And Output Template
//! 4. Defaults Come From The Schema
//! 5. Every Boundary Returns Owned Copies

pub mod config;
pub mod error;
pub mod fields;
pub mod values;
pub mod validation;
pub mod templates;
pub mod sheets;
pub mod mappings;
pub mod items;
pub mod store;
pub mod hashing;
pub mod service;

pub use config::CoreConfig;
pub use error::{CoreError, ErrorKind, Result};
pub use fields::{FieldSchema, FieldType, TableSchema, TableColumn, ColumnType, UnitMode};
pub use values::{FieldValue, Scalar, SheetValues};
pub use validation::{SchemaReport, SchemaValidator, SchemaViolation};
pub use templates::{Template, TemplateId, TemplateKind, TemplateRegistry, CreateVersionRequest, ReplaceFieldsRequest};
pub use sheets::{Sheet, SheetDetail, SheetKind, SheetMeta, SheetStore, NewSheet};
pub use mappings::{MappingStore, PartTemplateMapping, SaveMappingRequest, TemplatesForPart};
pub use items::{ItemMaster, ItemTree, ItemTreeNode, NodeType};
pub use hashing::{canonical_json, schema_fingerprint};
pub use service::{ScaleService, Snapshot, ItemTemplates};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_SNAPSHOT_VERSION: &str = "1.0.0";
