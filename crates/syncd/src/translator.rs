//! Virtual/real object id translation.
//!
//! Owns the VID allocation sequence and the bidirectional VID↔RID map.
//! The map is a partial bijection: no two live VIDs map to the same
//! RID and vice versa. Entry-style objects never appear here; their
//! identity is their composite key.
//!
//! Single-owner type: all mutation is serialized through the apply
//! thread, so there is no internal locking.

use std::collections::HashMap;

use log::debug;
use sonic_sairedis::{ObjectType, Rid, Vid};

use crate::error::{SyncdError, SyncdResult};

/// Allocates VIDs and maintains the VID↔RID bijection.
#[derive(Debug, Default)]
pub struct VirtualOidTranslator {
    vid_to_rid: HashMap<Vid, Rid>,
    rid_to_vid: HashMap<Rid, Vid>,
    next_sequence: HashMap<ObjectType, u64>,
}

impl VirtualOidTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produces a fresh VID never previously issued in this session,
    /// tagged with the object type. O(1) amortized.
    pub fn allocate(&mut self, object_type: ObjectType) -> Vid {
        let seq = self.next_sequence.entry(object_type).or_insert(0);
        *seq += 1;
        Vid::encode(object_type, *seq)
    }

    /// Records the VID↔RID pairing.
    ///
    /// Fails with `Conflict` if either side is already bound to a
    /// different counterpart.
    pub fn bind(&mut self, vid: Vid, rid: Rid) -> SyncdResult<()> {
        if let Some(existing) = self.vid_to_rid.get(&vid) {
            if *existing == rid {
                return Ok(());
            }
            return Err(SyncdError::Conflict(format!(
                "vid {} already bound to rid {}",
                vid, existing
            )));
        }
        if let Some(existing) = self.rid_to_vid.get(&rid) {
            return Err(SyncdError::Conflict(format!(
                "rid {} already bound to vid {}",
                rid, existing
            )));
        }

        debug!("bind {} <-> {}", vid, rid);
        self.vid_to_rid.insert(vid, rid);
        self.rid_to_vid.insert(rid, vid);
        Ok(())
    }

    /// Removes both directions of the mapping.
    ///
    /// A RID marked non-removable at the view level may still be
    /// unbound here: this is a logical detach, not a driver remove.
    pub fn unbind(&mut self, vid: Vid) -> SyncdResult<Rid> {
        let rid = self
            .vid_to_rid
            .remove(&vid)
            .ok_or_else(|| SyncdError::NotFound(format!("vid {} is not bound", vid)))?;
        self.rid_to_vid.remove(&rid);
        debug!("unbind {} <-> {}", vid, rid);
        Ok(rid)
    }

    /// O(1) forward lookup. Absence is an expected, checkable
    /// condition during reconciliation, hence `Option`.
    pub fn rid_of(&self, vid: Vid) -> Option<Rid> {
        self.vid_to_rid.get(&vid).copied()
    }

    /// O(1) reverse lookup.
    pub fn vid_of(&self, rid: Rid) -> Option<Vid> {
        self.rid_to_vid.get(&rid).copied()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.vid_to_rid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vid_to_rid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_allocate_is_fresh_and_typed() {
        let mut tr = VirtualOidTranslator::new();

        let a = tr.allocate(ObjectType::Port);
        let b = tr.allocate(ObjectType::Port);
        let c = tr.allocate(ObjectType::VirtualRouter);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.object_type(), Some(ObjectType::Port));
        assert_eq!(c.object_type(), Some(ObjectType::VirtualRouter));
    }

    #[test]
    fn test_bijection_round_trip() {
        let mut tr = VirtualOidTranslator::new();
        let vid = tr.allocate(ObjectType::Port);
        let rid = Rid::from_raw(0x1000);

        tr.bind(vid, rid).unwrap();
        assert_eq!(tr.rid_of(vid), Some(rid));
        assert_eq!(tr.vid_of(rid), Some(vid));
        assert_eq!(tr.vid_of(tr.rid_of(vid).unwrap()), Some(vid));
    }

    #[test]
    fn test_rebind_same_pair_is_idempotent() {
        let mut tr = VirtualOidTranslator::new();
        let vid = tr.allocate(ObjectType::Port);
        let rid = Rid::from_raw(1);

        tr.bind(vid, rid).unwrap();
        assert!(tr.bind(vid, rid).is_ok());
        assert_eq!(tr.len(), 1);
    }

    #[test]
    fn test_rebind_conflict() {
        let mut tr = VirtualOidTranslator::new();
        let vid1 = tr.allocate(ObjectType::Port);
        let vid2 = tr.allocate(ObjectType::Port);
        let rid1 = Rid::from_raw(1);
        let rid2 = Rid::from_raw(2);

        tr.bind(vid1, rid1).unwrap();

        // vid already bound to a different rid
        assert!(matches!(tr.bind(vid1, rid2), Err(SyncdError::Conflict(_))));
        // rid already bound to a different vid
        assert!(matches!(tr.bind(vid2, rid1), Err(SyncdError::Conflict(_))));
    }

    #[test]
    fn test_unbind_removes_both_directions() {
        let mut tr = VirtualOidTranslator::new();
        let vid = tr.allocate(ObjectType::Vlan);
        let rid = Rid::from_raw(0x42);

        tr.bind(vid, rid).unwrap();
        assert_eq!(tr.unbind(vid).unwrap(), rid);

        assert_eq!(tr.rid_of(vid), None);
        assert_eq!(tr.vid_of(rid), None);
        assert!(tr.is_empty());
    }

    #[test]
    fn test_unbind_absent_is_not_found() {
        let mut tr = VirtualOidTranslator::new();
        let vid = tr.allocate(ObjectType::Vlan);
        assert!(matches!(tr.unbind(vid), Err(SyncdError::NotFound(_))));
    }

    #[test]
    fn test_rid_reusable_after_unbind() {
        let mut tr = VirtualOidTranslator::new();
        let vid1 = tr.allocate(ObjectType::Port);
        let vid2 = tr.allocate(ObjectType::Port);
        let rid = Rid::from_raw(9);

        tr.bind(vid1, rid).unwrap();
        tr.unbind(vid1).unwrap();
        tr.bind(vid2, rid).unwrap();
        assert_eq!(tr.vid_of(rid), Some(vid2));
    }
}
