//! View comparison: the reconciliation engine.
//!
//! Given the *current* view (believed ASIC state) and a *temporary*
//! view (declared desired state), computes a best-effort matching
//! between the two and emits the minimal operation diff: matched
//! objects are reused, unmatched temporary objects become creates,
//! unclaimed current objects become removes, attribute drift on a
//! matched pair becomes sets.
//!
//! Entry-style objects match by key equality — their key *is* their
//! identity. Oid-style objects have no comparable identity across
//! views (temporary VIDs are unrelated to current VIDs), so identity
//! is inferred by scoring attribute agreement. Matching is a
//! deterministic greedy pass: ties are broken by an explicit policy,
//! never by container iteration order.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::warn;
use sonic_sairedis::{Attr, AttrValue, MetadataProvider, ObjectType, Vid};

use crate::error::{SyncdError, SyncdResult};
use crate::view::{AsicView, ObjectKey, ViewObject};

/// One operation in the reconciliation diff.
///
/// `Create` and `Set` identify objects in temporary-view id space (the
/// apply engine resolves those ids through the match map and pending
/// creates); `Remove` identifies objects in current-view id space.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    Create {
        object_type: ObjectType,
        key: ObjectKey,
        attrs: Vec<Attr>,
    },
    Set {
        object_type: ObjectType,
        key: ObjectKey,
        attr: Attr,
    },
    Remove {
        object_type: ObjectType,
        key: ObjectKey,
    },
}

impl ViewOp {
    pub fn is_create(&self) -> bool {
        matches!(self, ViewOp::Create { .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, ViewOp::Remove { .. })
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ViewOp::Set { .. })
    }
}

/// Result of comparing two views.
#[derive(Debug, Default)]
pub struct ViewDiff {
    /// Operations in execution order: creates (reference-ordered),
    /// then sets, then removes (entries before the oids they
    /// reference).
    pub ops: Vec<ViewOp>,
    /// Temporary-view VID → current-view VID for every matched
    /// oid-style pair. The match relation is a partial injection.
    pub matches: HashMap<Vid, Vid>,
}

impl ViewDiff {
    pub fn create_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_create()).count()
    }

    pub fn remove_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_remove()).count()
    }

    pub fn set_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_set()).count()
    }

    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Computes the reconciliation diff between `current` and `temporary`.
///
/// Fails with `DependencyUnresolved` if any referenced id resolves to
/// neither a matched current object nor a pending create; nothing is
/// ever partially emitted.
pub fn compare_views(
    current: &AsicView,
    temporary: &AsicView,
    metadata: &dyn MetadataProvider,
) -> SyncdResult<ViewDiff> {
    let mut matcher = Matcher {
        current,
        temporary,
        metadata,
        matches: HashMap::new(),
        claimed: HashSet::new(),
        sets: Vec::new(),
    };

    matcher.match_defaults();
    matcher.match_oid_objects();
    let (entry_creates, entry_removes) = matcher.match_entries()?;

    let oid_creates = matcher.pending_oid_creates();
    let creates = order_creates(oid_creates, entry_creates, &matcher.matches)?;
    let removes = order_removes(current, entry_removes, &matcher.claimed);

    let mut ops = creates;
    ops.extend(matcher.sets);
    ops.extend(removes);

    Ok(ViewDiff {
        ops,
        matches: matcher.matches,
    })
}

struct Matcher<'a> {
    current: &'a AsicView,
    temporary: &'a AsicView,
    metadata: &'a dyn MetadataProvider,
    /// temporary VID → current VID
    matches: HashMap<Vid, Vid>,
    /// current VIDs already claimed by a match
    claimed: HashSet<Vid>,
    sets: Vec<ViewOp>,
}

impl<'a> Matcher<'a> {
    /// Default/pre-existing objects match by sentinel kind, never by
    /// scoring.
    fn match_defaults(&mut self) {
        for tmp in self.temporary.objects() {
            let Some(tmp_vid) = tmp.oid() else { continue };
            let Some(kind) = tmp.default_kind else { continue };

            let counterpart = self
                .current
                .all_of_type(tmp.object_type)
                .find(|cur| cur.default_kind == Some(kind));

            if let Some(cur) = counterpart {
                let Some(cur_vid) = cur.oid() else { continue };
                if self.claimed.insert(cur_vid) {
                    self.matches.insert(tmp_vid, cur_vid);
                    self.emit_attr_sets(tmp, cur);
                }
            }
        }
    }

    /// Greedy scored matching per object type, processed in dependency
    /// order: types whose temporary objects carry no oid-valued
    /// attributes first, so dependents can rely on already-resolved
    /// references.
    fn match_oid_objects(&mut self) {
        let types: Vec<ObjectType> = self
            .temporary
            .object_types()
            .into_iter()
            .chain(self.current.object_types())
            .filter(|t| !t.is_entry())
            .unique()
            .sorted_by_key(|t| {
                let depth = self
                    .temporary
                    .all_of_type(*t)
                    .map(|o| o.oid_attr_count())
                    .max()
                    .unwrap_or(0);
                (depth, *t)
            })
            .collect();

        for object_type in types {
            let temps: Vec<&ViewObject> = self.temporary.all_of_type(object_type).collect();
            for tmp in temps {
                let Some(tmp_vid) = tmp.oid() else { continue };
                if self.matches.contains_key(&tmp_vid) {
                    continue;
                }

                if let Some((cur_vid, cur)) = self.best_candidate(object_type, tmp) {
                    self.matches.insert(tmp_vid, cur_vid);
                    self.claimed.insert(cur_vid);
                    self.emit_attr_sets(tmp, cur);
                }
            }
        }
    }

    /// Selects the best unclaimed current-view candidate for one
    /// temporary object.
    ///
    /// Tie-break policy, in order: higher score; fewer unresolved
    /// oid-valued attributes in the comparison; lowest current-view
    /// insertion index (candidates are scanned in insertion order and
    /// only a strictly better candidate displaces the incumbent).
    fn best_candidate(
        &self,
        object_type: ObjectType,
        tmp: &ViewObject,
    ) -> Option<(Vid, &'a ViewObject)> {
        let mut best: Option<(Vid, &'a ViewObject, usize, usize)> = None;

        for cur in self.current.all_of_type(object_type) {
            if cur.is_default() {
                continue; // defaults match by sentinel only
            }
            let Some(cur_vid) = cur.oid() else { continue };
            if self.claimed.contains(&cur_vid) {
                continue;
            }

            let (score, unresolved) = self.score_candidate(tmp, cur);
            let better = match best {
                None => true,
                Some((_, _, best_score, best_unresolved)) => {
                    score > best_score || (score == best_score && unresolved < best_unresolved)
                }
            };
            if better {
                best = Some((cur_vid, cur, score, unresolved));
            }
        }

        best.map(|(vid, cur, _, _)| (vid, cur))
    }

    /// Scores one (temporary, current) pair.
    ///
    /// Score is the count of attributes whose values compare equal
    /// after resolving oid references through the partial match built
    /// so far — monotonic in the number of exactly-equal attributes,
    /// with no additional weighting. `unresolved` counts attributes
    /// that could not be compared because a referenced temporary id
    /// has no match yet.
    fn score_candidate(&self, tmp: &ViewObject, cur: &ViewObject) -> (usize, usize) {
        let mut score = 0;
        let mut unresolved = 0;

        for attr in &tmp.attrs {
            // An attribute omitted on the current object but mandatory
            // for scoring is completed from metadata defaults, never
            // assumed zero.
            let cur_value = match cur.attr(attr.id) {
                Some(v) => v.clone(),
                None => match self.metadata.default_attr_value(cur.object_type, attr.id) {
                    Some(v) => v,
                    None => continue, // not comparable
                },
            };

            match self.resolve_value(&attr.value) {
                Resolved::Value(resolved) => {
                    if resolved == cur_value {
                        score += 1;
                    }
                }
                Resolved::Unresolved => unresolved += 1,
            }
        }

        (score, unresolved)
    }

    /// Rewrites a temporary-view attribute value into current-view id
    /// space through the partial match map.
    fn resolve_value(&self, value: &AttrValue) -> Resolved {
        let result = value.try_map_ids::<Vid, ()>(&mut |vid| {
            if vid.is_null() {
                Ok(Vid::NULL)
            } else {
                self.matches.get(&vid).copied().ok_or(())
            }
        });
        match result {
            Ok(resolved) => Resolved::Value(resolved),
            Err(()) => Resolved::Unresolved,
        }
    }

    /// Emits set operations for attribute drift on a matched pair.
    /// Single-attribute mismatches during scoring are absorbed; here
    /// they become explicit sets unless the attribute cannot be set.
    fn emit_attr_sets(&mut self, tmp: &ViewObject, cur: &ViewObject) {
        for attr in &tmp.attrs {
            let equal = match self.resolve_value(&attr.value) {
                Resolved::Value(resolved) => cur.attr(attr.id) == Some(&resolved),
                // Reference to a pending create: the value cannot be
                // current on the ASIC, so it needs a set.
                Resolved::Unresolved => false,
            };
            if equal {
                continue;
            }

            if let Some(meta) = self.metadata.attr_metadata(tmp.object_type, attr.id) {
                if meta.is_create_only {
                    warn!(
                        "matched {} differs in create-only attribute {}; cannot update",
                        tmp.object_type, meta.attr_id_name
                    );
                    continue;
                }
                if meta.is_read_only {
                    warn!(
                        "read-only attribute {} present in temporary view; skipped",
                        meta.attr_id_name
                    );
                    continue;
                }
            }

            self.sets.push(ViewOp::Set {
                object_type: tmp.object_type,
                key: tmp.key,
                attr: attr.clone(),
            });
        }
    }

    /// Matches entry-style objects by exact key equality, after
    /// rewriting the temporary key's embedded ids through the match
    /// map. Returns (creates, removed current-space keys).
    fn match_entries(&mut self) -> SyncdResult<(Vec<ViewOp>, Vec<(ObjectType, ObjectKey)>)> {
        let mut creates = Vec::new();
        let mut claimed_keys: HashSet<(ObjectType, ObjectKey)> = HashSet::new();

        let temps: Vec<&ViewObject> = self
            .temporary
            .objects()
            .filter(|o| o.object_type.is_entry())
            .collect();

        for tmp in temps {
            let resolved_key = tmp.key.try_map_ids::<Vid, ()>(&mut |vid| {
                if vid.is_null() {
                    Ok(Vid::NULL)
                } else {
                    self.matches.get(&vid).copied().ok_or(())
                }
            });

            let matched = match resolved_key {
                Ok(key) => self.current.find(tmp.object_type, &key).map(|cur| (key, cur)),
                // A key referencing a pending create cannot name an
                // existing entry.
                Err(()) => None,
            };

            match matched {
                Some((key, cur)) => {
                    claimed_keys.insert((tmp.object_type, key));
                    self.emit_attr_sets(tmp, cur);
                }
                None => creates.push(ViewOp::Create {
                    object_type: tmp.object_type,
                    key: tmp.key,
                    attrs: tmp.attrs.clone(),
                }),
            }
        }

        let removes = self
            .current
            .objects()
            .filter(|o| o.object_type.is_entry())
            .filter(|o| !claimed_keys.contains(&(o.object_type, o.key)))
            .map(|o| (o.object_type, o.key))
            .collect();

        Ok((creates, removes))
    }

    /// Unmatched temporary oid objects, in insertion order.
    fn pending_oid_creates(&self) -> Vec<ViewOp> {
        self.temporary
            .objects()
            .filter(|o| !o.object_type.is_entry())
            .filter(|o| o.oid().is_some_and(|vid| !self.matches.contains_key(&vid)))
            .map(|o| ViewOp::Create {
                object_type: o.object_type,
                key: o.key,
                attrs: o.attrs.clone(),
            })
            .collect()
    }
}

enum Resolved {
    Value(AttrValue),
    Unresolved,
}

/// Orders creates so that every referenced object exists before its
/// referent: oid creates topologically by their reference graph, entry
/// creates afterwards (entries only reference oids, never each other).
///
/// A reference that is neither a matched current object nor a pending
/// create is a hard `DependencyUnresolved` error.
fn order_creates(
    oid_creates: Vec<ViewOp>,
    entry_creates: Vec<ViewOp>,
    matches: &HashMap<Vid, Vid>,
) -> SyncdResult<Vec<ViewOp>> {
    let pending: HashSet<Vid> = oid_creates
        .iter()
        .filter_map(|op| match op {
            ViewOp::Create { key, .. } => key.as_oid(),
            _ => None,
        })
        .collect();

    let deps_of = |key: &ObjectKey, attrs: &[Attr]| -> SyncdResult<Vec<Vid>> {
        let mut deps = Vec::new();
        let refs = key
            .referenced_ids()
            .into_iter()
            .chain(attrs.iter().flat_map(|a| a.value.referenced_ids()));
        for vid in refs {
            if matches.contains_key(&vid) {
                continue; // resolves to an existing current object
            }
            if pending.contains(&vid) {
                deps.push(vid);
                continue;
            }
            return Err(SyncdError::DependencyUnresolved(vid));
        }
        Ok(deps)
    };

    // Kahn's algorithm over the pending-create graph, stable in input
    // (temporary-view insertion) order.
    let mut remaining: Vec<ViewOp> = oid_creates;
    let mut created: HashSet<Vid> = HashSet::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut progressed = false;
        let mut still_blocked = Vec::new();

        for op in remaining {
            let ViewOp::Create { key, attrs, .. } = &op else {
                unreachable!()
            };
            let ready = deps_of(key, attrs)?.iter().all(|d| created.contains(d));
            if ready {
                created.insert(key.as_oid().expect("oid create"));
                ordered.push(op);
                progressed = true;
            } else {
                still_blocked.push(op);
            }
        }

        if !progressed {
            // Reference cycle among pending creates.
            let ViewOp::Create { key, .. } = &still_blocked[0] else {
                unreachable!()
            };
            return Err(SyncdError::DependencyUnresolved(
                key.as_oid().expect("oid create"),
            ));
        }
        remaining = still_blocked;
    }

    // Entry creates keep input order; verify their references resolve.
    for op in &entry_creates {
        let ViewOp::Create { key, attrs, .. } = op else {
            unreachable!()
        };
        deps_of(key, attrs)?;
    }
    ordered.extend(entry_creates);
    Ok(ordered)
}

/// Orders removals: entry removes first (an entry references the oids
/// in its key), then oid removes such that every object is removed
/// before the objects it references. Defaults are never removed.
fn order_removes(
    current: &AsicView,
    entry_removes: Vec<(ObjectType, ObjectKey)>,
    claimed: &HashSet<Vid>,
) -> Vec<ViewOp> {
    let mut ops: Vec<ViewOp> = entry_removes
        .into_iter()
        .map(|(object_type, key)| ViewOp::Remove { object_type, key })
        .collect();

    let removed: Vec<&ViewObject> = current
        .objects()
        .filter(|o| !o.object_type.is_entry())
        .filter(|o| !o.is_default())
        .filter(|o| o.oid().is_some_and(|vid| !claimed.contains(&vid)))
        .collect();
    let removed_vids: HashSet<Vid> = removed.iter().filter_map(|o| o.oid()).collect();

    // refcount[v] = removed objects still referencing v; an object is
    // removable once nothing left references it.
    let mut refcount: HashMap<Vid, usize> = HashMap::new();
    for obj in &removed {
        for vid in obj.referenced_vids() {
            if removed_vids.contains(&vid) {
                *refcount.entry(vid).or_insert(0) += 1;
            }
        }
    }

    let mut remaining: Vec<&ViewObject> = removed;
    while !remaining.is_empty() {
        let mut progressed = false;
        let mut blocked = Vec::new();

        for obj in remaining {
            let vid = obj.oid().expect("oid object");
            if refcount.get(&vid).copied().unwrap_or(0) == 0 {
                for dep in obj.referenced_vids() {
                    if let Some(count) = refcount.get_mut(&dep) {
                        *count = count.saturating_sub(1);
                    }
                }
                ops.push(ViewOp::Remove {
                    object_type: obj.object_type,
                    key: obj.key,
                });
                progressed = true;
            } else {
                blocked.push(obj);
            }
        }

        if !progressed {
            warn!("reference cycle among removed objects; falling back to insertion order");
            for obj in blocked {
                ops.push(ViewOp::Remove {
                    object_type: obj.object_type,
                    key: obj.key,
                });
            }
            break;
        }
        remaining = blocked;
    }

    ops
}
