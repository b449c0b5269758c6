//! Attribute value model.
//!
//! Attributes are (id, tagged value) pairs. The core never interprets
//! an attribute beyond its value type; whether an attribute is
//! read-only, create-only, or gated by an API version is a metadata
//! fact supplied by the [`crate::meta::MetadataProvider`].
//!
//! The value type is generic over the object id space: the wire side
//! carries `AttrValue<Vid>`, the driver side `AttrValue<Rid>`. The
//! translation between the two happens in syncd just before and after
//! the driver call.

use serde::{Deserialize, Serialize};

use crate::object_id::{ObjectIdKind, Vid};

/// Attribute identifier within an object type's schema.
pub type AttrId = u32;

/// A tagged attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrValue<Id = Vid> {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    S32(i32),
    Mac([u8; 6]),
    Ip(std::net::IpAddr),
    Oid(Id),
    OidList(Vec<Id>),
    U32List(Vec<u32>),
    Chardata(String),
}

impl<Id: ObjectIdKind> AttrValue<Id> {
    /// Returns true if this value references other objects by id.
    pub fn is_oid_valued(&self) -> bool {
        matches!(self, AttrValue::Oid(_) | AttrValue::OidList(_))
    }

    /// Returns the referenced ids, if any. Null ids are skipped: a
    /// null reference needs no resolution.
    pub fn referenced_ids(&self) -> Vec<Id> {
        match self {
            AttrValue::Oid(id) if !id.is_null() => vec![*id],
            AttrValue::OidList(ids) => ids.iter().copied().filter(|id| !id.is_null()).collect(),
            _ => Vec::new(),
        }
    }

    /// Rewrites every embedded object id through `f`, failing on the
    /// first id `f` cannot translate.
    pub fn try_map_ids<J, E>(&self, f: &mut impl FnMut(Id) -> Result<J, E>) -> Result<AttrValue<J>, E> {
        Ok(match self {
            AttrValue::Bool(v) => AttrValue::Bool(*v),
            AttrValue::U8(v) => AttrValue::U8(*v),
            AttrValue::U16(v) => AttrValue::U16(*v),
            AttrValue::U32(v) => AttrValue::U32(*v),
            AttrValue::U64(v) => AttrValue::U64(*v),
            AttrValue::S32(v) => AttrValue::S32(*v),
            AttrValue::Mac(v) => AttrValue::Mac(*v),
            AttrValue::Ip(v) => AttrValue::Ip(*v),
            AttrValue::Oid(id) => AttrValue::Oid(f(*id)?),
            AttrValue::OidList(ids) => {
                AttrValue::OidList(ids.iter().map(|id| f(*id)).collect::<Result<_, _>>()?)
            }
            AttrValue::U32List(v) => AttrValue::U32List(v.clone()),
            AttrValue::Chardata(v) => AttrValue::Chardata(v.clone()),
        })
    }
}

/// A single attribute: id plus value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr<Id = Vid> {
    pub id: AttrId,
    pub value: AttrValue<Id>,
}

impl<Id: ObjectIdKind> Attr<Id> {
    pub fn new(id: AttrId, value: AttrValue<Id>) -> Self {
        Self { id, value }
    }

    /// Shorthand for an oid-valued attribute.
    pub fn oid(id: AttrId, object_id: Id) -> Self {
        Self::new(id, AttrValue::Oid(object_id))
    }

    /// Shorthand for a u32-valued attribute.
    pub fn u32(id: AttrId, value: u32) -> Self {
        Self::new(id, AttrValue::U32(value))
    }

    /// Shorthand for a bool-valued attribute.
    pub fn bool(id: AttrId, value: bool) -> Self {
        Self::new(id, AttrValue::Bool(value))
    }

    /// See [`AttrValue::try_map_ids`].
    pub fn try_map_ids<J, E>(&self, f: &mut impl FnMut(Id) -> Result<J, E>) -> Result<Attr<J>, E> {
        Ok(Attr {
            id: self.id,
            value: self.value.try_map_ids(f)?,
        })
    }
}
