//! SAI metadata model shared between the control plane and syncd.
//!
//! This crate carries the pieces both sides of the sairedis channel need
//! to agree on: the object-type taxonomy (oid-style vs entry-style), the
//! virtual/real object id newtypes, the attribute value model, the
//! metadata provider seam, and the API version gate used during
//! capability discovery.
//!
//! The actual attribute schema of each object type is *not* defined
//! here; it is supplied by a [`meta::MetadataProvider`] implementation
//! and treated as opaque, queryable facts.

pub mod attr;
pub mod meta;
pub mod object_id;
pub mod object_type;
pub mod version;

pub use attr::{Attr, AttrId, AttrValue};
pub use meta::{AttrMetadata, MetadataProvider, ObjectTypeInfo, StaticMetadataProvider};
pub use object_id::{ObjectIdKind, Rid, Vid};
pub use object_type::ObjectType;
pub use version::{ApiVersion, AttrVersionChecker, VersionError};
