//! In-memory ASIC driver.
//!
//! Stands in for a vendor SDK in tests and in simulation runs of the
//! daemon. Keeps every created object in a hash map and enforces the
//! reference discipline a real SDK would: an oid-valued attribute or
//! key field must name a live RID.

use std::collections::HashMap;

use log::trace;
use sonic_sairedis::{AttrId, ObjectType, Rid};

use crate::dispatch::{DriverAttr, DriverKey, SaiHandler};
use crate::error::{SyncdError, SyncdResult};

#[derive(Debug, Clone)]
struct OidRecord {
    object_type: ObjectType,
    attrs: Vec<DriverAttr>,
}

/// Software switch state, RID space only.
#[derive(Debug, Default)]
pub struct VirtualSwitchHandler {
    next_rid: u64,
    oids: HashMap<Rid, OidRecord>,
    entries: HashMap<(ObjectType, DriverKey), Vec<DriverAttr>>,
}

impl VirtualSwitchHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn oid_count(&self) -> usize {
        self.oids.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_rid(&self, rid: Rid) -> bool {
        self.oids.contains_key(&rid)
    }

    pub fn contains_entry(&self, object_type: ObjectType, key: &DriverKey) -> bool {
        self.entries.contains_key(&(object_type, *key))
    }

    pub fn oid_attr(&self, rid: Rid, attr_id: AttrId) -> Option<&DriverAttr> {
        self.oids
            .get(&rid)?
            .attrs
            .iter()
            .find(|a| a.id == attr_id)
    }

    fn check_references(&self, attrs: &[DriverAttr]) -> SyncdResult<()> {
        for attr in attrs {
            for rid in attr.value.referenced_ids() {
                if !self.oids.contains_key(&rid) {
                    return Err(SyncdError::Driver(format!(
                        "attribute {} references unknown rid {}",
                        attr.id, rid
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_key_references(&self, key: &DriverKey) -> SyncdResult<()> {
        for rid in key.referenced_ids() {
            if !self.oids.contains_key(&rid) {
                return Err(SyncdError::Driver(format!(
                    "entry key references unknown rid {}",
                    rid
                )));
            }
        }
        Ok(())
    }

    fn oid_mut(&mut self, object_type: ObjectType, rid: Rid) -> SyncdResult<&mut OidRecord> {
        let record = self
            .oids
            .get_mut(&rid)
            .ok_or_else(|| SyncdError::Driver(format!("unknown rid {}", rid)))?;
        if record.object_type != object_type {
            return Err(SyncdError::Driver(format!(
                "rid {} is a {}, not a {}",
                rid, record.object_type, object_type
            )));
        }
        Ok(record)
    }
}

impl SaiHandler for VirtualSwitchHandler {
    fn create_oid(&mut self, object_type: ObjectType, attrs: &[DriverAttr]) -> SyncdResult<Rid> {
        self.check_references(attrs)?;
        self.next_rid += 1;
        let rid = Rid::from_raw(0x1_0000_0000 + self.next_rid);
        trace!("vs: create {} -> {}", object_type, rid);
        self.oids.insert(
            rid,
            OidRecord {
                object_type,
                attrs: attrs.to_vec(),
            },
        );
        Ok(rid)
    }

    fn remove_oid(&mut self, object_type: ObjectType, rid: Rid) -> SyncdResult<()> {
        self.oid_mut(object_type, rid)?;
        trace!("vs: remove {} {}", object_type, rid);
        self.oids.remove(&rid);
        Ok(())
    }

    fn set_oid(&mut self, object_type: ObjectType, rid: Rid, attr: &DriverAttr) -> SyncdResult<()> {
        self.check_references(std::slice::from_ref(attr))?;
        let record = self.oid_mut(object_type, rid)?;
        match record.attrs.iter_mut().find(|a| a.id == attr.id) {
            Some(existing) => existing.value = attr.value.clone(),
            None => record.attrs.push(attr.clone()),
        }
        Ok(())
    }

    fn get_oid(
        &mut self,
        object_type: ObjectType,
        rid: Rid,
        attr_ids: &[AttrId],
    ) -> SyncdResult<Vec<DriverAttr>> {
        let record = self.oid_mut(object_type, rid)?;
        attr_ids
            .iter()
            .map(|id| {
                record
                    .attrs
                    .iter()
                    .find(|a| a.id == *id)
                    .cloned()
                    .ok_or_else(|| SyncdError::Driver(format!("attribute {} not set on {}", id, rid)))
            })
            .collect()
    }

    fn create_entry(
        &mut self,
        object_type: ObjectType,
        key: &DriverKey,
        attrs: &[DriverAttr],
    ) -> SyncdResult<()> {
        self.check_key_references(key)?;
        self.check_references(attrs)?;
        let slot = (object_type, *key);
        if self.entries.contains_key(&slot) {
            return Err(SyncdError::Driver(format!(
                "{} entry already exists",
                object_type
            )));
        }
        self.entries.insert(slot, attrs.to_vec());
        Ok(())
    }

    fn remove_entry(&mut self, object_type: ObjectType, key: &DriverKey) -> SyncdResult<()> {
        self.entries
            .remove(&(object_type, *key))
            .map(|_| ())
            .ok_or_else(|| SyncdError::Driver(format!("{} entry not found", object_type)))
    }

    fn set_entry(
        &mut self,
        object_type: ObjectType,
        key: &DriverKey,
        attr: &DriverAttr,
    ) -> SyncdResult<()> {
        self.check_references(std::slice::from_ref(attr))?;
        let attrs = self
            .entries
            .get_mut(&(object_type, *key))
            .ok_or_else(|| SyncdError::Driver(format!("{} entry not found", object_type)))?;
        match attrs.iter_mut().find(|a| a.id == attr.id) {
            Some(existing) => existing.value = attr.value.clone(),
            None => attrs.push(attr.clone()),
        }
        Ok(())
    }

    fn get_entry(
        &mut self,
        object_type: ObjectType,
        key: &DriverKey,
        attr_ids: &[AttrId],
    ) -> SyncdResult<Vec<DriverAttr>> {
        let attrs = self
            .entries
            .get(&(object_type, *key))
            .ok_or_else(|| SyncdError::Driver(format!("{} entry not found", object_type)))?;
        attr_ids
            .iter()
            .map(|id| {
                attrs
                    .iter()
                    .find(|a| a.id == *id)
                    .cloned()
                    .ok_or_else(|| SyncdError::Driver(format!("attribute {} not set", id)))
            })
            .collect()
    }
}
