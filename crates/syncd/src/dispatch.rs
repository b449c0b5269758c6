//! Generic operation dispatch.
//!
//! Routes an operation described by (object-type, polymorphic key,
//! attribute list) to exactly one typed driver call, translating
//! between the caller's VID space and the driver's RID space on the
//! way through. Attribute validation is layered below; this module
//! only enforces the caller contract (known type, key style, attribute
//! list pairing).

use sonic_sairedis::{Attr, AttrId, MetadataProvider, ObjectType, Rid, Vid};

use crate::error::{SyncdError, SyncdResult};
use crate::translator::VirtualOidTranslator;
use crate::view::ObjectKey;

/// Attribute in driver (RID) space.
pub type DriverAttr = Attr<Rid>;
/// Object key in driver (RID) space.
pub type DriverKey = ObjectKey<Rid>;

/// The four logical operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaiOpKind {
    Create,
    Remove,
    Set,
    Get,
}

/// A decoded operation as received from the transport, in VID space.
#[derive(Debug, Clone)]
pub struct SaiOperation {
    pub kind: SaiOpKind,
    pub object_type: ObjectType,
    pub key: ObjectKey,
    /// Create: full attribute list. Set: exactly one. Otherwise empty.
    pub attrs: Vec<Attr>,
    /// Requested attribute ids, `Get` only.
    pub attr_ids: Vec<AttrId>,
}

impl SaiOperation {
    pub fn create(object_type: ObjectType, key: ObjectKey, attrs: Vec<Attr>) -> Self {
        Self {
            kind: SaiOpKind::Create,
            object_type,
            key,
            attrs,
            attr_ids: Vec::new(),
        }
    }

    pub fn remove(object_type: ObjectType, key: ObjectKey) -> Self {
        Self {
            kind: SaiOpKind::Remove,
            object_type,
            key,
            attrs: Vec::new(),
            attr_ids: Vec::new(),
        }
    }

    pub fn set(object_type: ObjectType, key: ObjectKey, attr: Attr) -> Self {
        Self {
            kind: SaiOpKind::Set,
            object_type,
            key,
            attrs: vec![attr],
            attr_ids: Vec::new(),
        }
    }

    pub fn get(object_type: ObjectType, key: ObjectKey, attr_ids: Vec<AttrId>) -> Self {
        Self {
            kind: SaiOpKind::Get,
            object_type,
            key,
            attrs: Vec::new(),
            attr_ids,
        }
    }
}

/// The driver/ASIC boundary: typed entry points per key style, plus
/// bulk and stat surfaces. Everything here speaks RID space.
pub trait SaiHandler: Send {
    fn create_oid(&mut self, object_type: ObjectType, attrs: &[DriverAttr]) -> SyncdResult<Rid>;
    fn remove_oid(&mut self, object_type: ObjectType, rid: Rid) -> SyncdResult<()>;
    fn set_oid(&mut self, object_type: ObjectType, rid: Rid, attr: &DriverAttr) -> SyncdResult<()>;
    fn get_oid(
        &mut self,
        object_type: ObjectType,
        rid: Rid,
        attr_ids: &[AttrId],
    ) -> SyncdResult<Vec<DriverAttr>>;

    fn create_entry(
        &mut self,
        object_type: ObjectType,
        key: &DriverKey,
        attrs: &[DriverAttr],
    ) -> SyncdResult<()>;
    fn remove_entry(&mut self, object_type: ObjectType, key: &DriverKey) -> SyncdResult<()>;
    fn set_entry(
        &mut self,
        object_type: ObjectType,
        key: &DriverKey,
        attr: &DriverAttr,
    ) -> SyncdResult<()>;
    fn get_entry(
        &mut self,
        object_type: ObjectType,
        key: &DriverKey,
        attr_ids: &[AttrId],
    ) -> SyncdResult<Vec<DriverAttr>>;

    /// Bulk entry creation. Drivers without a native bulk path fall
    /// back to per-item calls.
    fn bulk_create_entry(
        &mut self,
        object_type: ObjectType,
        entries: &[(DriverKey, Vec<DriverAttr>)],
    ) -> SyncdResult<()> {
        for (key, attrs) in entries {
            self.create_entry(object_type, key, attrs)?;
        }
        Ok(())
    }

    fn bulk_remove_entry(&mut self, object_type: ObjectType, keys: &[DriverKey]) -> SyncdResult<()> {
        for key in keys {
            self.remove_entry(object_type, key)?;
        }
        Ok(())
    }

    /// Counter read for countable entities.
    fn get_stats(
        &mut self,
        object_type: ObjectType,
        _rid: Rid,
        _counter_ids: &[u32],
    ) -> SyncdResult<Vec<u64>> {
        Err(SyncdError::NotImplemented(object_type))
    }

    fn clear_stats(
        &mut self,
        object_type: ObjectType,
        _rid: Rid,
        _counter_ids: &[u32],
    ) -> SyncdResult<()> {
        Err(SyncdError::NotImplemented(object_type))
    }
}

/// Per-call dispatch context borrowing the single-owner state.
///
/// Validates the operation, translates VID→RID, invokes exactly one
/// typed handler entry point, and maintains the identifier map for
/// oid create/remove. No side effects beyond that one handler call.
pub struct Dispatcher<'a, H: SaiHandler + ?Sized> {
    pub handler: &'a mut H,
    pub translator: &'a mut VirtualOidTranslator,
    pub metadata: &'a dyn MetadataProvider,
}

impl<H: SaiHandler + ?Sized> Dispatcher<'_, H> {
    /// Executes one operation. `Get` returns the fetched attributes
    /// (in VID space); other operations return an empty list.
    pub fn dispatch(&mut self, op: &SaiOperation) -> SyncdResult<Vec<Attr>> {
        let info = self
            .metadata
            .object_type_info(op.object_type)
            .ok_or(SyncdError::UnknownObjectType(op.object_type))?;

        if !op.key.matches_type(op.object_type) {
            return Err(SyncdError::InvalidArgument(format!(
                "key style does not match {}",
                op.object_type
            )));
        }
        // An oid key's encoded type tag must agree with the claimed
        // object type; the view indexes by that tag.
        if let Some(vid) = op.key.as_oid() {
            if vid.object_type() != Some(op.object_type) {
                return Err(SyncdError::InvalidArgument(format!(
                    "oid {} does not carry type {}",
                    vid, op.object_type
                )));
            }
        }
        self.check_attr_contract(op)?;

        if info.is_entry {
            self.dispatch_entry(op)
        } else {
            self.dispatch_oid(op)
        }
    }

    fn check_attr_contract(&self, op: &SaiOperation) -> SyncdResult<()> {
        let ok = match op.kind {
            SaiOpKind::Create => op.attr_ids.is_empty(),
            SaiOpKind::Remove => op.attrs.is_empty() && op.attr_ids.is_empty(),
            SaiOpKind::Set => op.attrs.len() == 1 && op.attr_ids.is_empty(),
            SaiOpKind::Get => op.attrs.is_empty(),
        };
        if ok {
            Ok(())
        } else {
            Err(SyncdError::InvalidArgument(format!(
                "inconsistent attribute list for {:?}",
                op.kind
            )))
        }
    }

    fn dispatch_oid(&mut self, op: &SaiOperation) -> SyncdResult<Vec<Attr>> {
        let vid = op.key.as_oid().expect("style checked");

        match op.kind {
            SaiOpKind::Create => {
                if self.translator.rid_of(vid).is_some() {
                    return Err(SyncdError::Conflict(format!("vid {} already created", vid)));
                }
                let attrs = self.to_driver_attrs(&op.attrs)?;
                let rid = self.handler.create_oid(op.object_type, &attrs)?;
                self.translator.bind(vid, rid)?;
                Ok(Vec::new())
            }
            SaiOpKind::Remove => {
                let rid = self.rid_of(vid)?;
                self.handler.remove_oid(op.object_type, rid)?;
                self.translator.unbind(vid)?;
                Ok(Vec::new())
            }
            SaiOpKind::Set => {
                let rid = self.rid_of(vid)?;
                let attr = self.to_driver_attr(&op.attrs[0])?;
                self.handler.set_oid(op.object_type, rid, &attr)?;
                Ok(Vec::new())
            }
            SaiOpKind::Get => {
                let rid = self.rid_of(vid)?;
                let fetched = self.handler.get_oid(op.object_type, rid, &op.attr_ids)?;
                self.to_wire_attrs(fetched)
            }
        }
    }

    fn dispatch_entry(&mut self, op: &SaiOperation) -> SyncdResult<Vec<Attr>> {
        let key = self.to_driver_key(&op.key)?;

        match op.kind {
            SaiOpKind::Create => {
                let attrs = self.to_driver_attrs(&op.attrs)?;
                self.handler.create_entry(op.object_type, &key, &attrs)?;
                Ok(Vec::new())
            }
            SaiOpKind::Remove => {
                self.handler.remove_entry(op.object_type, &key)?;
                Ok(Vec::new())
            }
            SaiOpKind::Set => {
                let attr = self.to_driver_attr(&op.attrs[0])?;
                self.handler.set_entry(op.object_type, &key, &attr)?;
                Ok(Vec::new())
            }
            SaiOpKind::Get => {
                let fetched = self.handler.get_entry(op.object_type, &key, &op.attr_ids)?;
                self.to_wire_attrs(fetched)
            }
        }
    }

    fn rid_of(&self, vid: Vid) -> SyncdResult<Rid> {
        self.translator
            .rid_of(vid)
            .ok_or_else(|| SyncdError::NotFound(format!("vid {} is not bound", vid)))
    }

    fn to_driver_attr(&self, attr: &Attr) -> SyncdResult<DriverAttr> {
        attr.try_map_ids(&mut |vid| self.translate_vid(vid))
    }

    fn to_driver_attrs(&self, attrs: &[Attr]) -> SyncdResult<Vec<DriverAttr>> {
        attrs.iter().map(|a| self.to_driver_attr(a)).collect()
    }

    fn to_driver_key(&self, key: &ObjectKey) -> SyncdResult<DriverKey> {
        key.try_map_ids(&mut |vid| self.translate_vid(vid))
    }

    fn translate_vid(&self, vid: Vid) -> SyncdResult<Rid> {
        if vid.is_null() {
            return Ok(Rid::NULL);
        }
        self.rid_of(vid)
    }

    fn to_wire_attrs(&self, fetched: Vec<DriverAttr>) -> SyncdResult<Vec<Attr>> {
        fetched
            .iter()
            .map(|a| {
                a.try_map_ids(&mut |rid| {
                    if rid.is_null() {
                        return Ok(Vid::NULL);
                    }
                    self.translator
                        .vid_of(rid)
                        .ok_or_else(|| SyncdError::NotFound(format!("rid {} is not bound", rid)))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::VirtualSwitchHandler;
    use crate::view::{IpPrefix, RouteEntry};
    use pretty_assertions::assert_eq;
    use sonic_sairedis::{AttrValue, StaticMetadataProvider};
    use std::net::{IpAddr, Ipv4Addr};

    fn setup() -> (VirtualSwitchHandler, VirtualOidTranslator, StaticMetadataProvider) {
        (
            VirtualSwitchHandler::new(),
            VirtualOidTranslator::new(),
            StaticMetadataProvider::new(),
        )
    }

    fn route_key(vr: Vid) -> ObjectKey {
        ObjectKey::Route(RouteEntry {
            switch_id: Vid::NULL,
            vr,
            destination: IpPrefix::new(IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0)), 16),
        })
    }

    #[test]
    fn test_oid_create_binds_translator() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::VirtualRouter);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::VirtualRouter,
                ObjectKey::Oid(vid),
                vec![Attr::bool(1, true)],
            ))
            .unwrap();

        let rid = translator.rid_of(vid).expect("bound after create");
        assert_eq!(translator.vid_of(rid), Some(vid));
        assert_eq!(handler.oid_count(), 1);
    }

    #[test]
    fn test_duplicate_oid_create_is_conflict() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Vlan);
        let op = SaiOperation::create(ObjectType::Vlan, ObjectKey::Oid(vid), vec![]);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher.dispatch(&op).unwrap();
        assert!(matches!(
            dispatcher.dispatch(&op),
            Err(SyncdError::Conflict(_))
        ));
    }

    #[test]
    fn test_remove_unbinds() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Vlan);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::Vlan,
                ObjectKey::Oid(vid),
                vec![],
            ))
            .unwrap();
        dispatcher
            .dispatch(&SaiOperation::remove(ObjectType::Vlan, ObjectKey::Oid(vid)))
            .unwrap();

        assert_eq!(translator.rid_of(vid), None);
        assert_eq!(handler.oid_count(), 0);
    }

    #[test]
    fn test_remove_unknown_vid_is_not_found() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Vlan);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        assert!(matches!(
            dispatcher.dispatch(&SaiOperation::remove(ObjectType::Vlan, ObjectKey::Oid(vid))),
            Err(SyncdError::NotFound(_))
        ));
    }

    #[test]
    fn test_entry_create_translates_key_references() {
        let (mut handler, mut translator, metadata) = setup();
        let vr = translator.allocate(ObjectType::VirtualRouter);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::VirtualRouter,
                ObjectKey::Oid(vr),
                vec![],
            ))
            .unwrap();
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::RouteEntry,
                route_key(vr),
                vec![],
            ))
            .unwrap();

        assert_eq!(handler.entry_count(), 1);
    }

    #[test]
    fn test_entry_create_with_unbound_reference_fails() {
        let (mut handler, mut translator, metadata) = setup();
        let vr = translator.allocate(ObjectType::VirtualRouter); // never created

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        assert!(matches!(
            dispatcher.dispatch(&SaiOperation::create(
                ObjectType::RouteEntry,
                route_key(vr),
                vec![],
            )),
            Err(SyncdError::NotFound(_))
        ));
        assert_eq!(handler.entry_count(), 0);
    }

    #[test]
    fn test_key_style_mismatch_is_invalid_argument() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Port);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };

        // Oid key for an entry type.
        assert!(matches!(
            dispatcher.dispatch(&SaiOperation::create(
                ObjectType::RouteEntry,
                ObjectKey::Oid(vid),
                vec![],
            )),
            Err(SyncdError::InvalidArgument(_))
        ));

        // Entry key for an oid type.
        assert!(matches!(
            dispatcher.dispatch(&SaiOperation::create(
                ObjectType::Port,
                route_key(Vid::NULL),
                vec![],
            )),
            Err(SyncdError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oid_type_tag_must_match_object_type() {
        let (mut handler, mut translator, metadata) = setup();
        let vlan_vid = translator.allocate(ObjectType::Vlan);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        assert!(matches!(
            dispatcher.dispatch(&SaiOperation::create(
                ObjectType::Port,
                ObjectKey::Oid(vlan_vid),
                vec![],
            )),
            Err(SyncdError::InvalidArgument(_))
        ));
        assert_eq!(handler.oid_count(), 0);
    }

    #[test]
    fn test_set_requires_exactly_one_attr() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Port);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        let mut op = SaiOperation::set(ObjectType::Port, ObjectKey::Oid(vid), Attr::u32(1, 1));
        op.attrs.push(Attr::u32(2, 2));
        assert!(matches!(
            dispatcher.dispatch(&op),
            Err(SyncdError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_round_trips_oid_attrs_to_vid_space() {
        let (mut handler, mut translator, metadata) = setup();
        let vr = translator.allocate(ObjectType::VirtualRouter);
        let nh = translator.allocate(ObjectType::NextHop);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::VirtualRouter,
                ObjectKey::Oid(vr),
                vec![],
            ))
            .unwrap();
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::NextHop,
                ObjectKey::Oid(nh),
                vec![Attr::oid(5, vr)],
            ))
            .unwrap();

        let fetched = dispatcher
            .dispatch(&SaiOperation::get(
                ObjectType::NextHop,
                ObjectKey::Oid(nh),
                vec![5],
            ))
            .unwrap();
        assert_eq!(fetched, vec![Attr::oid(5, vr)]);
    }

    #[test]
    fn test_get_with_zero_ids_is_allowed() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Vlan);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::Vlan,
                ObjectKey::Oid(vid),
                vec![],
            ))
            .unwrap();
        let fetched = dispatcher
            .dispatch(&SaiOperation::get(ObjectType::Vlan, ObjectKey::Oid(vid), vec![]))
            .unwrap();
        assert!(fetched.is_empty());
    }

    #[test]
    fn test_set_value_u32() {
        let (mut handler, mut translator, metadata) = setup();
        let vid = translator.allocate(ObjectType::Port);

        let mut dispatcher = Dispatcher {
            handler: &mut handler,
            translator: &mut translator,
            metadata: &metadata,
        };
        dispatcher
            .dispatch(&SaiOperation::create(
                ObjectType::Port,
                ObjectKey::Oid(vid),
                vec![Attr::u32(1, 10_000)],
            ))
            .unwrap();
        dispatcher
            .dispatch(&SaiOperation::set(
                ObjectType::Port,
                ObjectKey::Oid(vid),
                Attr::u32(1, 100_000),
            ))
            .unwrap();

        let fetched = dispatcher
            .dispatch(&SaiOperation::get(ObjectType::Port, ObjectKey::Oid(vid), vec![1]))
            .unwrap();
        assert_eq!(fetched[0].value, AttrValue::U32(100_000));
    }
}
