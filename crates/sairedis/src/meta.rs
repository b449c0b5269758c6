//! Metadata provider seam.
//!
//! The synchronization core treats the attribute schema as opaque,
//! queryable facts: which object types exist, whether an attribute is
//! read-only or create-only, which API release introduced it, and what
//! its default value is. A [`MetadataProvider`] supplies those facts;
//! [`StaticMetadataProvider`] is the table-driven implementation used
//! by tests and the virtual-switch simulation.

use std::collections::HashMap;

use crate::attr::{AttrId, AttrValue};
use crate::object_type::ObjectType;
use crate::version::ApiVersion;

/// Structural facts about an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeInfo {
    /// SAI-style type name.
    pub name: &'static str,
    /// True for composite-key entry types, false for oid-style types.
    pub is_entry: bool,
}

impl ObjectTypeInfo {
    pub fn of(object_type: ObjectType) -> Self {
        Self {
            name: object_type.name(),
            is_entry: object_type.is_entry(),
        }
    }
}

/// Per-attribute metadata facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMetadata {
    /// Attribute id name, used for once-only version-gate logging.
    pub attr_id_name: String,
    /// API release that introduced the attribute.
    pub release: ApiVersion,
    /// Scheduled for the release *after* `release` relative to the
    /// currently compiled metadata.
    pub is_next_release: bool,
    pub is_read_only: bool,
    pub is_create_only: bool,
}

impl AttrMetadata {
    pub fn new(attr_id_name: impl Into<String>, release: ApiVersion) -> Self {
        Self {
            attr_id_name: attr_id_name.into(),
            release,
            is_next_release: false,
            is_read_only: false,
            is_create_only: false,
        }
    }

    pub fn next_release(mut self) -> Self {
        self.is_next_release = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    pub fn create_only(mut self) -> Self {
        self.is_create_only = true;
        self
    }
}

/// Source of object-type and attribute facts.
///
/// Must be available before any dispatch or version-gate decision.
pub trait MetadataProvider: Send + Sync {
    /// Structural facts for an object type, or `None` if the type is
    /// unknown to this metadata build.
    fn object_type_info(&self, object_type: ObjectType) -> Option<ObjectTypeInfo>;

    /// Metadata for one attribute of an object type.
    fn attr_metadata(&self, object_type: ObjectType, attr_id: AttrId) -> Option<&AttrMetadata>;

    /// Default value for an attribute omitted by the caller but needed
    /// to complete a candidate's attribute set during reconciliation
    /// scoring. `None` when no default is defined.
    fn default_attr_value(&self, object_type: ObjectType, attr_id: AttrId) -> Option<AttrValue>;
}

/// Table-driven metadata provider.
///
/// Knows every type in [`crate::object_type::ALL_OBJECT_TYPES`] by
/// default; attribute metadata and defaults are registered explicitly.
#[derive(Debug, Default)]
pub struct StaticMetadataProvider {
    attrs: HashMap<(ObjectType, AttrId), AttrMetadata>,
    defaults: HashMap<(ObjectType, AttrId), AttrValue>,
}

impl StaticMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata for one attribute.
    pub fn with_attr(mut self, object_type: ObjectType, attr_id: AttrId, meta: AttrMetadata) -> Self {
        self.attrs.insert((object_type, attr_id), meta);
        self
    }

    /// Registers a default value for an attribute.
    pub fn with_default(mut self, object_type: ObjectType, attr_id: AttrId, value: AttrValue) -> Self {
        self.defaults.insert((object_type, attr_id), value);
        self
    }
}

impl MetadataProvider for StaticMetadataProvider {
    fn object_type_info(&self, object_type: ObjectType) -> Option<ObjectTypeInfo> {
        Some(ObjectTypeInfo::of(object_type))
    }

    fn attr_metadata(&self, object_type: ObjectType, attr_id: AttrId) -> Option<&AttrMetadata> {
        self.attrs.get(&(object_type, attr_id))
    }

    fn default_attr_value(&self, object_type: ObjectType, attr_id: AttrId) -> Option<AttrValue> {
        self.defaults.get(&(object_type, attr_id)).cloned()
    }
}
