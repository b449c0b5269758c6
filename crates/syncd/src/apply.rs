//! Diff execution.
//!
//! Takes the operation list produced by view comparison and drives it
//! into the ASIC, building the post-apply identifier map as it goes.
//! Matched objects keep their live RIDs under their new (temporary
//! view) VIDs; created objects get fresh RIDs from the driver; removed
//! objects resolve through the pre-apply map, since their VIDs belong
//! to the outgoing view.

use log::{debug, info};
use sonic_sairedis::{Attr, Rid, Vid};

use crate::compare::{ViewDiff, ViewOp};
use crate::dispatch::SaiHandler;
use crate::error::{SyncdError, SyncdResult};
use crate::translator::VirtualOidTranslator;
use crate::view::ObjectKey;

/// Counts of driver operations performed by one apply.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    pub matched: usize,
    pub creates: usize,
    pub sets: usize,
    pub removes: usize,
}

/// Executes `diff` against `handler`.
///
/// Returns the translator for the new view: every matched or created
/// temporary VID bound to its live RID. The caller swaps its state to
/// the new translator only when this returns `Ok`; on error the driver
/// may have performed a prefix of the diff, and the caller keeps the
/// old state and surfaces the failure.
pub fn apply_diff<H: SaiHandler + ?Sized>(
    diff: &ViewDiff,
    old_translator: &VirtualOidTranslator,
    handler: &mut H,
) -> SyncdResult<(VirtualOidTranslator, ApplyStats)> {
    let mut translator = VirtualOidTranslator::new();
    let mut stats = ApplyStats {
        matched: diff.matches.len(),
        ..ApplyStats::default()
    };

    // Matched pairs keep their RID under the new VID.
    for (&tmp_vid, &cur_vid) in &diff.matches {
        let rid = old_translator.rid_of(cur_vid).ok_or_else(|| {
            SyncdError::NotFound(format!("matched vid {} has no live rid", cur_vid))
        })?;
        translator.bind(tmp_vid, rid)?;
    }

    for op in &diff.ops {
        match op {
            ViewOp::Create {
                object_type,
                key,
                attrs,
            } => {
                let driver_attrs = map_attrs(attrs, &translator)?;
                match key.as_oid() {
                    Some(vid) => {
                        let rid = handler.create_oid(*object_type, &driver_attrs)?;
                        debug!("apply: created {} {} as {}", object_type, vid, rid);
                        translator.bind(vid, rid)?;
                    }
                    None => {
                        let driver_key = map_key(key, &translator)?;
                        handler.create_entry(*object_type, &driver_key, &driver_attrs)?;
                    }
                }
                stats.creates += 1;
            }
            ViewOp::Set {
                object_type,
                key,
                attr,
            } => {
                let driver_attr = map_attrs(std::slice::from_ref(attr), &translator)?.remove(0);
                match key.as_oid() {
                    Some(vid) => {
                        let rid = resolve(vid, &translator)?;
                        handler.set_oid(*object_type, rid, &driver_attr)?;
                    }
                    None => {
                        let driver_key = map_key(key, &translator)?;
                        handler.set_entry(*object_type, &driver_key, &driver_attr)?;
                    }
                }
                stats.sets += 1;
            }
            ViewOp::Remove { object_type, key } => {
                // Remove keys live in the outgoing view's id space.
                match key.as_oid() {
                    Some(vid) => {
                        let rid = resolve(vid, old_translator)?;
                        handler.remove_oid(*object_type, rid)?;
                    }
                    None => {
                        let driver_key = map_key(key, old_translator)?;
                        handler.remove_entry(*object_type, &driver_key)?;
                    }
                }
                stats.removes += 1;
            }
        }
    }

    info!(
        "apply: {} matched, {} created, {} set, {} removed",
        stats.matched, stats.creates, stats.sets, stats.removes
    );
    Ok((translator, stats))
}

fn resolve(vid: Vid, translator: &VirtualOidTranslator) -> SyncdResult<Rid> {
    if vid.is_null() {
        return Ok(Rid::NULL);
    }
    translator
        .rid_of(vid)
        .ok_or(SyncdError::DependencyUnresolved(vid))
}

fn map_attrs(attrs: &[Attr], translator: &VirtualOidTranslator) -> SyncdResult<Vec<Attr<Rid>>> {
    attrs
        .iter()
        .map(|a| a.try_map_ids(&mut |vid| resolve(vid, translator)))
        .collect()
}

fn map_key(key: &ObjectKey, translator: &VirtualOidTranslator) -> SyncdResult<ObjectKey<Rid>> {
    key.try_map_ids(&mut |vid| resolve(vid, translator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::VirtualSwitchHandler;
    use crate::view::{IpPrefix, RouteEntry};
    use pretty_assertions::assert_eq;
    use sonic_sairedis::ObjectType;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn vid(t: ObjectType, seq: u64) -> Vid {
        Vid::encode(t, seq)
    }

    #[test]
    fn test_create_binds_in_dependency_order() {
        let vr = vid(ObjectType::VirtualRouter, 1);
        let rif = vid(ObjectType::RouterInterface, 1);
        let diff = ViewDiff {
            ops: vec![
                ViewOp::Create {
                    object_type: ObjectType::VirtualRouter,
                    key: ObjectKey::Oid(vr),
                    attrs: vec![],
                },
                ViewOp::Create {
                    object_type: ObjectType::RouterInterface,
                    key: ObjectKey::Oid(rif),
                    attrs: vec![Attr::oid(1, vr)],
                },
            ],
            matches: HashMap::new(),
        };

        let mut vs = VirtualSwitchHandler::new();
        let old = VirtualOidTranslator::new();
        let (translator, stats) = apply_diff(&diff, &old, &mut vs).unwrap();

        assert_eq!(stats.creates, 2);
        assert_eq!(translator.len(), 2);
        let rif_rid = translator.rid_of(rif).unwrap();
        assert_eq!(
            vs.oid_attr(rif_rid, 1).unwrap().value,
            sonic_sairedis::AttrValue::Oid(translator.rid_of(vr).unwrap())
        );
    }

    #[test]
    fn test_matched_object_keeps_rid_and_takes_set() {
        let mut vs = VirtualSwitchHandler::new();
        let live_rid = vs
            .create_oid(ObjectType::Port, &[Attr::u32(1, 10_000)])
            .unwrap();

        let cur_vid = vid(ObjectType::Port, 1);
        let tmp_vid = vid(ObjectType::Port, 7);
        let mut old = VirtualOidTranslator::new();
        old.bind(cur_vid, live_rid).unwrap();

        let diff = ViewDiff {
            ops: vec![ViewOp::Set {
                object_type: ObjectType::Port,
                key: ObjectKey::Oid(tmp_vid),
                attr: Attr::u32(1, 100_000),
            }],
            matches: HashMap::from([(tmp_vid, cur_vid)]),
        };

        let (translator, stats) = apply_diff(&diff, &old, &mut vs).unwrap();
        assert_eq!(stats, ApplyStats { matched: 1, creates: 0, sets: 1, removes: 0 });
        assert_eq!(translator.rid_of(tmp_vid), Some(live_rid));
        assert_eq!(
            vs.oid_attr(live_rid, 1).unwrap().value,
            sonic_sairedis::AttrValue::U32(100_000)
        );
    }

    #[test]
    fn test_remove_resolves_through_old_translator() {
        let mut vs = VirtualSwitchHandler::new();
        let vr_rid = vs.create_oid(ObjectType::VirtualRouter, &[]).unwrap();
        let cur_vr = vid(ObjectType::VirtualRouter, 1);
        let mut old = VirtualOidTranslator::new();
        old.bind(cur_vr, vr_rid).unwrap();

        let key = ObjectKey::Route(RouteEntry {
            switch_id: Vid::NULL,
            vr: cur_vr,
            destination: IpPrefix::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 24),
        });
        let driver_key = map_key(&key, &old).unwrap();
        vs.create_entry(ObjectType::RouteEntry, &driver_key, &[]).unwrap();

        let diff = ViewDiff {
            ops: vec![
                ViewOp::Remove {
                    object_type: ObjectType::RouteEntry,
                    key,
                },
                ViewOp::Remove {
                    object_type: ObjectType::VirtualRouter,
                    key: ObjectKey::Oid(cur_vr),
                },
            ],
            matches: HashMap::new(),
        };

        let (translator, stats) = apply_diff(&diff, &old, &mut vs).unwrap();
        assert_eq!(stats.removes, 2);
        assert!(translator.is_empty());
        assert_eq!(vs.oid_count(), 0);
        assert_eq!(vs.entry_count(), 0);
    }

    #[test]
    fn test_unresolvable_reference_fails_before_driver_call() {
        let dangling = vid(ObjectType::VirtualRouter, 99);
        let diff = ViewDiff {
            ops: vec![ViewOp::Create {
                object_type: ObjectType::RouterInterface,
                key: ObjectKey::Oid(vid(ObjectType::RouterInterface, 1)),
                attrs: vec![Attr::oid(1, dangling)],
            }],
            matches: HashMap::new(),
        };

        let mut vs = VirtualSwitchHandler::new();
        let old = VirtualOidTranslator::new();
        assert_eq!(
            apply_diff(&diff, &old, &mut vs).unwrap_err(),
            SyncdError::DependencyUnresolved(dangling)
        );
        assert_eq!(vs.oid_count(), 0);
    }
}
