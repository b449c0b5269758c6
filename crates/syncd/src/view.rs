//! ASIC view model.
//!
//! An [`AsicView`] is the complete recorded set of objects and their
//! attributes at a point in time, indexed by (object-type, key). Two
//! views coexist during reconciliation: the *current* view (believed
//! state of the live ASIC) and the *temporary* view (declared desired
//! state built up in init-view mode).
//!
//! Keys are a closed tagged union: one `Oid` variant for oid-style
//! objects plus one composite-key variant per entry type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sonic_sairedis::{Attr, AttrId, AttrValue, ObjectIdKind, ObjectType, Vid};

/// An IP prefix (address plus mask length), the route key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpPrefix {
    pub addr: std::net::IpAddr,
    pub mask_len: u8,
}

impl IpPrefix {
    pub fn new(addr: std::net::IpAddr, mask_len: u8) -> Self {
        Self { addr, mask_len }
    }
}

impl std::fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask_len)
    }
}

// ============================================================================
// Entry keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteEntry<Id = Vid> {
    pub switch_id: Id,
    pub vr: Id,
    pub destination: IpPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighborEntry<Id = Vid> {
    pub switch_id: Id,
    pub rif: Id,
    pub ip: std::net::IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FdbEntry<Id = Vid> {
    pub switch_id: Id,
    pub bv_id: Id,
    pub mac: [u8; 6],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsegEntry<Id = Vid> {
    pub switch_id: Id,
    pub label: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MySidEntry<Id = Vid> {
    pub switch_id: Id,
    pub vr: Id,
    pub locator_block_len: u8,
    pub locator_node_len: u8,
    pub function_len: u8,
    pub args_len: u8,
    pub sid: std::net::IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionLookupEntry<Id = Vid> {
    pub switch_id: Id,
    pub vni: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EniEtherAddressMapEntry<Id = Vid> {
    pub switch_id: Id,
    pub mac: [u8; 6],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VipEntry<Id = Vid> {
    pub switch_id: Id,
    pub vip: std::net::IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InboundRoutingEntry<Id = Vid> {
    pub switch_id: Id,
    pub eni_id: Id,
    pub vni: u32,
    pub sip: std::net::IpAddr,
    pub sip_mask: std::net::IpAddr,
    pub priority: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaValidationEntry<Id = Vid> {
    pub switch_id: Id,
    pub vnet_id: Id,
    pub sip: std::net::IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundRoutingEntry<Id = Vid> {
    pub switch_id: Id,
    pub eni_id: Id,
    pub destination: IpPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundCaToPaEntry<Id = Vid> {
    pub switch_id: Id,
    pub dst_vnet_id: Id,
    pub dip: std::net::IpAddr,
}

// ============================================================================
// Polymorphic key
// ============================================================================

/// The polymorphic object key: an opaque handle for oid-style objects,
/// a composite value key for entry-style objects.
///
/// This is a closed set. Supporting a new entry type means adding one
/// variant here (and one dispatch case), not changing any algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKey<Id = Vid> {
    Oid(Id),
    Route(RouteEntry<Id>),
    Neighbor(NeighborEntry<Id>),
    Fdb(FdbEntry<Id>),
    Inseg(InsegEntry<Id>),
    MySid(MySidEntry<Id>),
    DirectionLookup(DirectionLookupEntry<Id>),
    EniEtherAddressMap(EniEtherAddressMapEntry<Id>),
    Vip(VipEntry<Id>),
    InboundRouting(InboundRoutingEntry<Id>),
    PaValidation(PaValidationEntry<Id>),
    OutboundRouting(OutboundRoutingEntry<Id>),
    OutboundCaToPa(OutboundCaToPaEntry<Id>),
}

impl<Id: ObjectIdKind> ObjectKey<Id> {
    /// The entry object type this key belongs to, or `None` for the
    /// oid variant (valid for any oid-style type).
    pub fn entry_type(&self) -> Option<ObjectType> {
        Some(match self {
            ObjectKey::Oid(_) => return None,
            ObjectKey::Route(_) => ObjectType::RouteEntry,
            ObjectKey::Neighbor(_) => ObjectType::NeighborEntry,
            ObjectKey::Fdb(_) => ObjectType::FdbEntry,
            ObjectKey::Inseg(_) => ObjectType::InsegEntry,
            ObjectKey::MySid(_) => ObjectType::MySidEntry,
            ObjectKey::DirectionLookup(_) => ObjectType::DirectionLookupEntry,
            ObjectKey::EniEtherAddressMap(_) => ObjectType::EniEtherAddressMapEntry,
            ObjectKey::Vip(_) => ObjectType::VipEntry,
            ObjectKey::InboundRouting(_) => ObjectType::InboundRoutingEntry,
            ObjectKey::PaValidation(_) => ObjectType::PaValidationEntry,
            ObjectKey::OutboundRouting(_) => ObjectType::OutboundRoutingEntry,
            ObjectKey::OutboundCaToPa(_) => ObjectType::OutboundCaToPaEntry,
        })
    }

    /// Returns true if this key is the right style and kind for the
    /// given object type.
    pub fn matches_type(&self, object_type: ObjectType) -> bool {
        match self.entry_type() {
            None => !object_type.is_entry(),
            Some(t) => t == object_type,
        }
    }

    /// The opaque handle, for oid-style keys.
    pub fn as_oid(&self) -> Option<Id> {
        match self {
            ObjectKey::Oid(id) => Some(*id),
            _ => None,
        }
    }

    /// Object ids embedded in a composite key (the objects this entry
    /// references). Empty for the oid variant: an oid key is the
    /// object's own identity, not a reference. Null ids are skipped.
    pub fn referenced_ids(&self) -> Vec<Id> {
        let raw: Vec<Id> = match self {
            ObjectKey::Oid(_) => Vec::new(),
            ObjectKey::Route(e) => vec![e.switch_id, e.vr],
            ObjectKey::Neighbor(e) => vec![e.switch_id, e.rif],
            ObjectKey::Fdb(e) => vec![e.switch_id, e.bv_id],
            ObjectKey::Inseg(e) => vec![e.switch_id],
            ObjectKey::MySid(e) => vec![e.switch_id, e.vr],
            ObjectKey::DirectionLookup(e) => vec![e.switch_id],
            ObjectKey::EniEtherAddressMap(e) => vec![e.switch_id],
            ObjectKey::Vip(e) => vec![e.switch_id],
            ObjectKey::InboundRouting(e) => vec![e.switch_id, e.eni_id],
            ObjectKey::PaValidation(e) => vec![e.switch_id, e.vnet_id],
            ObjectKey::OutboundRouting(e) => vec![e.switch_id, e.eni_id],
            ObjectKey::OutboundCaToPa(e) => vec![e.switch_id, e.dst_vnet_id],
        };
        raw.into_iter().filter(|id| !id.is_null()).collect()
    }

    /// Rewrites every embedded object id through `f`, failing on the
    /// first id `f` cannot translate.
    pub fn try_map_ids<J, E>(&self, f: &mut impl FnMut(Id) -> Result<J, E>) -> Result<ObjectKey<J>, E> {
        Ok(match *self {
            ObjectKey::Oid(id) => ObjectKey::Oid(f(id)?),
            ObjectKey::Route(e) => ObjectKey::Route(RouteEntry {
                switch_id: f(e.switch_id)?,
                vr: f(e.vr)?,
                destination: e.destination,
            }),
            ObjectKey::Neighbor(e) => ObjectKey::Neighbor(NeighborEntry {
                switch_id: f(e.switch_id)?,
                rif: f(e.rif)?,
                ip: e.ip,
            }),
            ObjectKey::Fdb(e) => ObjectKey::Fdb(FdbEntry {
                switch_id: f(e.switch_id)?,
                bv_id: f(e.bv_id)?,
                mac: e.mac,
            }),
            ObjectKey::Inseg(e) => ObjectKey::Inseg(InsegEntry {
                switch_id: f(e.switch_id)?,
                label: e.label,
            }),
            ObjectKey::MySid(e) => ObjectKey::MySid(MySidEntry {
                switch_id: f(e.switch_id)?,
                vr: f(e.vr)?,
                locator_block_len: e.locator_block_len,
                locator_node_len: e.locator_node_len,
                function_len: e.function_len,
                args_len: e.args_len,
                sid: e.sid,
            }),
            ObjectKey::DirectionLookup(e) => ObjectKey::DirectionLookup(DirectionLookupEntry {
                switch_id: f(e.switch_id)?,
                vni: e.vni,
            }),
            ObjectKey::EniEtherAddressMap(e) => {
                ObjectKey::EniEtherAddressMap(EniEtherAddressMapEntry {
                    switch_id: f(e.switch_id)?,
                    mac: e.mac,
                })
            }
            ObjectKey::Vip(e) => ObjectKey::Vip(VipEntry {
                switch_id: f(e.switch_id)?,
                vip: e.vip,
            }),
            ObjectKey::InboundRouting(e) => ObjectKey::InboundRouting(InboundRoutingEntry {
                switch_id: f(e.switch_id)?,
                eni_id: f(e.eni_id)?,
                vni: e.vni,
                sip: e.sip,
                sip_mask: e.sip_mask,
                priority: e.priority,
            }),
            ObjectKey::PaValidation(e) => ObjectKey::PaValidation(PaValidationEntry {
                switch_id: f(e.switch_id)?,
                vnet_id: f(e.vnet_id)?,
                sip: e.sip,
            }),
            ObjectKey::OutboundRouting(e) => ObjectKey::OutboundRouting(OutboundRoutingEntry {
                switch_id: f(e.switch_id)?,
                eni_id: f(e.eni_id)?,
                destination: e.destination,
            }),
            ObjectKey::OutboundCaToPa(e) => ObjectKey::OutboundCaToPa(OutboundCaToPaEntry {
                switch_id: f(e.switch_id)?,
                dst_vnet_id: f(e.dst_vnet_id)?,
                dip: e.dip,
            }),
        })
    }
}

// ============================================================================
// View objects
// ============================================================================

/// Sentinel identities for objects that pre-exist on the ASIC.
///
/// A default object matches its counterpart by kind rather than by
/// attribute scoring, and is never removed even when the temporary
/// view has no counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultObjectKind {
    Switch,
    DefaultVirtualRouter,
    DefaultTrapGroup,
    DefaultVlan,
    DefaultStpInstance,
    CpuPort,
}

/// One recorded object: type, key, post-validation attribute snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewObject {
    pub object_type: ObjectType,
    pub key: ObjectKey,
    /// Ordered attribute list. Values stored here have already passed
    /// read-only/create-only validation.
    pub attrs: Vec<Attr>,
    pub default_kind: Option<DefaultObjectKind>,
}

impl ViewObject {
    pub fn new(object_type: ObjectType, key: ObjectKey) -> Self {
        Self {
            object_type,
            key,
            attrs: Vec::new(),
            default_kind: None,
        }
    }

    pub fn with_attrs(mut self, attrs: Vec<Attr>) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_default_kind(mut self, kind: DefaultObjectKind) -> Self {
        self.default_kind = Some(kind);
        self
    }

    pub fn is_default(&self) -> bool {
        self.default_kind.is_some()
    }

    /// The object's VID, for oid-style objects.
    pub fn oid(&self) -> Option<Vid> {
        self.key.as_oid()
    }

    pub fn attr(&self, id: AttrId) -> Option<&AttrValue> {
        self.attrs.iter().find(|a| a.id == id).map(|a| &a.value)
    }

    /// Replaces the attribute value in place, or appends a new one.
    /// Keeps the list order stable for existing ids.
    pub fn set_attr(&mut self, attr: Attr) {
        match self.attrs.iter_mut().find(|a| a.id == attr.id) {
            Some(existing) => existing.value = attr.value,
            None => self.attrs.push(attr),
        }
    }

    /// All VIDs this object references: composite-key ids plus
    /// oid-valued attributes. Deduplicated, first-seen order.
    pub fn referenced_vids(&self) -> Vec<Vid> {
        let mut out: Vec<Vid> = Vec::new();
        let mut push = |vid: Vid| {
            if !out.contains(&vid) {
                out.push(vid);
            }
        };
        for vid in self.key.referenced_ids() {
            push(vid);
        }
        for attr in &self.attrs {
            for vid in attr.value.referenced_ids() {
                push(vid);
            }
        }
        out
    }

    /// Number of oid-valued attributes carrying at least one non-null
    /// reference. Drives the dependency ordering of the matcher.
    pub fn oid_attr_count(&self) -> usize {
        self.attrs
            .iter()
            .filter(|a| !a.value.referenced_ids().is_empty())
            .count()
    }
}

// ============================================================================
// View store
// ============================================================================

/// Append/update/delete store of view objects keyed by
/// (object-type, key), preserving insertion order.
///
/// Order is stable across `upsert` of an existing key; `erase` leaves
/// a tombstone so later objects keep their position.
#[derive(Debug, Default, Clone)]
pub struct AsicView {
    slots: Vec<Option<ViewObject>>,
    index: HashMap<(ObjectType, ObjectKey), usize>,
}

impl AsicView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, object_type: ObjectType, key: &ObjectKey) -> bool {
        self.index.contains_key(&(object_type, *key))
    }

    /// Inserts or replaces an object. Returns the previous object for
    /// the same key, if any.
    pub fn upsert(&mut self, object: ViewObject) -> Option<ViewObject> {
        let index_key = (object.object_type, object.key);
        match self.index.get(&index_key) {
            Some(&slot) => self.slots[slot].replace(object),
            None => {
                self.index.insert(index_key, self.slots.len());
                self.slots.push(Some(object));
                None
            }
        }
    }

    pub fn erase(&mut self, object_type: ObjectType, key: &ObjectKey) -> Option<ViewObject> {
        let slot = self.index.remove(&(object_type, *key))?;
        self.slots[slot].take()
    }

    pub fn find(&self, object_type: ObjectType, key: &ObjectKey) -> Option<&ViewObject> {
        let slot = *self.index.get(&(object_type, *key))?;
        self.slots[slot].as_ref()
    }

    pub fn find_mut(&mut self, object_type: ObjectType, key: &ObjectKey) -> Option<&mut ViewObject> {
        let slot = *self.index.get(&(object_type, *key))?;
        self.slots[slot].as_mut()
    }

    /// Looks up an oid-style object by its VID.
    pub fn find_oid(&self, vid: Vid) -> Option<&ViewObject> {
        let object_type = vid.object_type()?;
        self.find(object_type, &ObjectKey::Oid(vid))
    }

    /// All live objects, insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &ViewObject> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Live objects of one type, insertion order.
    pub fn all_of_type(&self, object_type: ObjectType) -> impl Iterator<Item = &ViewObject> {
        self.objects().filter(move |o| o.object_type == object_type)
    }

    /// Distinct object types present, ascending discriminant order.
    pub fn object_types(&self) -> Vec<ObjectType> {
        let mut types: Vec<ObjectType> = Vec::new();
        for obj in self.objects() {
            if !types.contains(&obj.object_type) {
                types.push(obj.object_type);
            }
        }
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr};

    fn route_key(vr: Vid, octet: u8) -> ObjectKey {
        ObjectKey::Route(RouteEntry {
            switch_id: Vid::encode(ObjectType::Switch, 1),
            vr,
            destination: IpPrefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, octet)), 24),
        })
    }

    #[test]
    fn test_key_style_matching() {
        let vid = Vid::encode(ObjectType::Port, 1);
        let oid_key: ObjectKey = ObjectKey::Oid(vid);
        assert!(oid_key.matches_type(ObjectType::Port));
        assert!(oid_key.matches_type(ObjectType::Vlan));
        assert!(!oid_key.matches_type(ObjectType::RouteEntry));

        let vr = Vid::encode(ObjectType::VirtualRouter, 1);
        let key = route_key(vr, 0);
        assert!(key.matches_type(ObjectType::RouteEntry));
        assert!(!key.matches_type(ObjectType::NeighborEntry));
        assert!(!key.matches_type(ObjectType::Port));
    }

    #[test]
    fn test_entry_key_references() {
        let vr = Vid::encode(ObjectType::VirtualRouter, 1);
        let key = route_key(vr, 0);
        let refs = key.referenced_ids();
        assert!(refs.contains(&vr));
        assert_eq!(refs.len(), 2); // switch + vr

        let oid_key: ObjectKey = ObjectKey::Oid(Vid::encode(ObjectType::Port, 1));
        assert!(oid_key.referenced_ids().is_empty());
    }

    #[test]
    fn test_upsert_find_erase() {
        let mut view = AsicView::new();
        let vid = Vid::encode(ObjectType::Port, 1);
        let obj = ViewObject::new(ObjectType::Port, ObjectKey::Oid(vid))
            .with_attrs(vec![Attr::u32(1, 100_000)]);

        assert!(view.upsert(obj.clone()).is_none());
        assert_eq!(view.len(), 1);
        assert_eq!(view.find(ObjectType::Port, &ObjectKey::Oid(vid)), Some(&obj));
        assert_eq!(view.find_oid(vid), Some(&obj));

        let removed = view.erase(ObjectType::Port, &ObjectKey::Oid(vid));
        assert_eq!(removed, Some(obj));
        assert!(view.is_empty());
        assert_eq!(view.find_oid(vid), None);
    }

    #[test]
    fn test_insertion_order_stable_across_upsert() {
        let mut view = AsicView::new();
        let a = Vid::encode(ObjectType::Port, 1);
        let b = Vid::encode(ObjectType::Port, 2);
        let c = Vid::encode(ObjectType::Port, 3);

        for vid in [a, b, c] {
            view.upsert(ViewObject::new(ObjectType::Port, ObjectKey::Oid(vid)));
        }

        // Re-upserting `a` with new attrs must not move it to the back.
        view.upsert(
            ViewObject::new(ObjectType::Port, ObjectKey::Oid(a)).with_attrs(vec![Attr::u32(1, 9)]),
        );

        let order: Vec<Vid> = view
            .all_of_type(ObjectType::Port)
            .map(|o| o.oid().unwrap())
            .collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_order_survives_erase() {
        let mut view = AsicView::new();
        let a = Vid::encode(ObjectType::Vlan, 1);
        let b = Vid::encode(ObjectType::Vlan, 2);
        let c = Vid::encode(ObjectType::Vlan, 3);

        for vid in [a, b, c] {
            view.upsert(ViewObject::new(ObjectType::Vlan, ObjectKey::Oid(vid)));
        }
        view.erase(ObjectType::Vlan, &ObjectKey::Oid(b));

        let order: Vec<Vid> = view
            .all_of_type(ObjectType::Vlan)
            .map(|o| o.oid().unwrap())
            .collect();
        assert_eq!(order, vec![a, c]);
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_keys_unique_per_type_not_across_types() {
        let mut view = AsicView::new();
        let vid = Vid::encode(ObjectType::Port, 1);

        // Same raw key under two different types are distinct records.
        view.upsert(ViewObject::new(ObjectType::Port, ObjectKey::Oid(vid)));
        view.upsert(ViewObject::new(ObjectType::Vlan, ObjectKey::Oid(vid)));
        assert_eq!(view.len(), 2);

        // Same (type, key) replaces.
        view.upsert(ViewObject::new(ObjectType::Port, ObjectKey::Oid(vid)));
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_set_attr_preserves_order() {
        let mut obj = ViewObject::new(
            ObjectType::Port,
            ObjectKey::Oid(Vid::encode(ObjectType::Port, 1)),
        )
        .with_attrs(vec![Attr::u32(1, 10), Attr::u32(2, 20)]);

        obj.set_attr(Attr::u32(1, 11));
        obj.set_attr(Attr::u32(3, 30));

        let ids: Vec<AttrId> = obj.attrs.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(obj.attr(1), Some(&AttrValue::U32(11)));
    }

    #[test]
    fn test_referenced_vids_dedup() {
        let vr = Vid::encode(ObjectType::VirtualRouter, 1);
        let nh = Vid::encode(ObjectType::NextHop, 1);
        let obj = ViewObject::new(
            ObjectType::RouteEntry,
            route_key(vr, 1),
        )
        .with_attrs(vec![Attr::oid(1, nh), Attr::oid(2, nh)]);

        let refs = obj.referenced_vids();
        assert_eq!(refs.iter().filter(|v| **v == nh).count(), 1);
        assert!(refs.contains(&vr));
        assert_eq!(obj.oid_attr_count(), 2);
    }
}
