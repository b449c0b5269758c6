//! Synchronization engine.
//!
//! Single-owner facade over the dispatcher, the view model, and the
//! reconciliation pipeline. All mutation goes through one apply thread;
//! driver callback threads never touch this type (they talk to the
//! notification queue instead).
//!
//! Two modes:
//! - **Normal**: operations dispatch straight to the driver and are
//!   recorded in the current view.
//! - **InitView**: operations are recorded in the temporary view only;
//!   nothing reaches the driver until `apply_view` reconciles the two
//!   views and executes the diff.

use log::{info, warn};
use sonic_sairedis::{
    ApiVersion, Attr, AttrVersionChecker, MetadataProvider, ObjectType, Rid, Vid,
};

use crate::apply::{apply_diff, ApplyStats};
use crate::compare::compare_views;
use crate::dispatch::{Dispatcher, SaiHandler, SaiOpKind, SaiOperation};
use crate::error::{SyncdError, SyncdResult};
use crate::translator::VirtualOidTranslator;
use crate::view::{AsicView, ViewObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Normal,
    InitView,
}

/// The apply-thread state machine.
pub struct SyncdEngine<H: SaiHandler, M: MetadataProvider> {
    handler: H,
    metadata: M,
    translator: VirtualOidTranslator,
    current: AsicView,
    temporary: AsicView,
    mode: EngineMode,
    version: AttrVersionChecker,
}

impl<H: SaiHandler, M: MetadataProvider> SyncdEngine<H, M> {
    pub fn new(handler: H, metadata: M) -> Self {
        Self {
            handler,
            metadata,
            translator: VirtualOidTranslator::new(),
            current: AsicView::new(),
            temporary: AsicView::new(),
            mode: EngineMode::Normal,
            version: AttrVersionChecker::new(),
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn current_view(&self) -> &AsicView {
        &self.current
    }

    pub fn translator(&self) -> &VirtualOidTranslator {
        &self.translator
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Issues a fresh VID for a client-side object handle.
    pub fn allocate_vid(&mut self, object_type: ObjectType) -> Vid {
        self.translator.allocate(object_type)
    }

    /// Enables the attribute version gate with the negotiated version.
    pub fn negotiate_api_version(&mut self, version: ApiVersion) {
        info!("negotiated SAI API version {}", version);
        self.version.enable(version);
    }

    /// Registers a pre-existing default object: recorded in the current
    /// view with its sentinel kind and bound to its live RID. Default
    /// objects survive every view apply.
    pub fn seed_default(&mut self, object: ViewObject, rid: Rid) -> SyncdResult<()> {
        let vid = object
            .oid()
            .ok_or_else(|| SyncdError::InvalidArgument("default object must be oid-style".into()))?;
        if vid.object_type() != Some(object.object_type) {
            return Err(SyncdError::InvalidArgument(format!(
                "oid {} does not carry type {}",
                vid, object.object_type
            )));
        }
        if !object.is_default() {
            return Err(SyncdError::InvalidArgument(
                "seed_default requires a default kind".into(),
            ));
        }
        self.translator.bind(vid, rid)?;
        self.current.upsert(object);
        Ok(())
    }

    /// Processes one decoded operation according to the current mode.
    ///
    /// `Get` returns the fetched attributes (version-gated when a
    /// negotiated version is set); other operations return an empty
    /// list.
    pub fn process(&mut self, op: &SaiOperation) -> SyncdResult<Vec<Attr>> {
        match self.mode {
            EngineMode::InitView => self.record_declared(op),
            EngineMode::Normal => {
                self.check_view_consistency(op)?;
                let mut dispatcher = Dispatcher {
                    handler: &mut self.handler,
                    translator: &mut self.translator,
                    metadata: &self.metadata,
                };
                let fetched = dispatcher.dispatch(op)?;
                self.record_applied(op);
                self.filter_by_version(op.object_type, fetched)
            }
        }
    }

    /// Enters init-view mode with an empty temporary view. Default
    /// objects are carried over so reconciliation always finds their
    /// counterparts.
    pub fn init_view(&mut self) -> SyncdResult<()> {
        if self.mode == EngineMode::InitView {
            return Err(SyncdError::InvalidArgument("already in init view".into()));
        }
        info!("entering init view");
        self.temporary = AsicView::new();
        for object in self.current.objects().filter(|o| o.is_default()) {
            self.temporary.upsert(object.clone());
        }
        self.mode = EngineMode::InitView;
        Ok(())
    }

    /// Reconciles the temporary view against the current view and
    /// executes the diff. On success the temporary view becomes the
    /// current view and the engine returns to normal mode; on failure
    /// all engine state is left untouched and the error is terminal
    /// for the whole batch.
    pub fn apply_view(&mut self) -> SyncdResult<ApplyStats> {
        if self.mode != EngineMode::InitView {
            return Err(SyncdError::InvalidArgument(
                "apply view without init view".into(),
            ));
        }

        let diff = compare_views(&self.current, &self.temporary, &self.metadata)?;
        info!(
            "view diff: {} creates, {} sets, {} removes",
            diff.create_count(),
            diff.set_count(),
            diff.remove_count()
        );

        let (translator, stats) = apply_diff(&diff, &self.translator, &mut self.handler)?;

        self.translator = translator;
        self.current = std::mem::take(&mut self.temporary);
        self.mode = EngineMode::Normal;
        self.version.reset();
        Ok(stats)
    }

    /// Records a declared operation into the temporary view without
    /// touching the driver.
    fn record_declared(&mut self, op: &SaiOperation) -> SyncdResult<Vec<Attr>> {
        self.metadata
            .object_type_info(op.object_type)
            .ok_or(SyncdError::UnknownObjectType(op.object_type))?;
        if !op.key.matches_type(op.object_type) {
            return Err(SyncdError::InvalidArgument(format!(
                "key style does not match {}",
                op.object_type
            )));
        }
        if let Some(vid) = op.key.as_oid() {
            if vid.object_type() != Some(op.object_type) {
                return Err(SyncdError::InvalidArgument(format!(
                    "oid {} does not carry type {}",
                    vid, op.object_type
                )));
            }
        }

        match op.kind {
            SaiOpKind::Create => {
                if self.temporary.contains(op.object_type, &op.key) {
                    return Err(SyncdError::Conflict(format!(
                        "{} already declared",
                        op.object_type
                    )));
                }
                self.temporary.upsert(
                    ViewObject::new(op.object_type, op.key).with_attrs(op.attrs.clone()),
                );
                Ok(Vec::new())
            }
            SaiOpKind::Set => {
                if op.attrs.len() != 1 {
                    return Err(SyncdError::InvalidArgument(
                        "set requires exactly one attribute".into(),
                    ));
                }
                let object = self
                    .temporary
                    .find_mut(op.object_type, &op.key)
                    .ok_or_else(|| {
                        SyncdError::NotFound(format!("{} not declared", op.object_type))
                    })?;
                object.set_attr(op.attrs[0].clone());
                Ok(Vec::new())
            }
            SaiOpKind::Remove => {
                self.temporary
                    .erase(op.object_type, &op.key)
                    .ok_or_else(|| {
                        SyncdError::NotFound(format!("{} not declared", op.object_type))
                    })?;
                Ok(Vec::new())
            }
            SaiOpKind::Get => Err(SyncdError::InvalidArgument(
                "get is not available in init view".into(),
            )),
        }
    }

    /// Normal-mode consistency checks against the current view, done
    /// before the driver sees the operation.
    fn check_view_consistency(&self, op: &SaiOperation) -> SyncdResult<()> {
        match op.kind {
            SaiOpKind::Create => {
                if self.current.contains(op.object_type, &op.key) {
                    return Err(SyncdError::Conflict(format!(
                        "{} already exists in view",
                        op.object_type
                    )));
                }
            }
            SaiOpKind::Remove | SaiOpKind::Set => {
                if !self.current.contains(op.object_type, &op.key) {
                    return Err(SyncdError::NotFound(format!(
                        "{} not present in view",
                        op.object_type
                    )));
                }
            }
            SaiOpKind::Get => {}
        }
        Ok(())
    }

    /// Mirrors a successfully dispatched operation into the current
    /// view.
    fn record_applied(&mut self, op: &SaiOperation) {
        match op.kind {
            SaiOpKind::Create => {
                self.current.upsert(
                    ViewObject::new(op.object_type, op.key).with_attrs(op.attrs.clone()),
                );
            }
            SaiOpKind::Set => {
                if let Some(object) = self.current.find_mut(op.object_type, &op.key) {
                    object.set_attr(op.attrs[0].clone());
                }
            }
            SaiOpKind::Remove => {
                self.current.erase(op.object_type, &op.key);
            }
            SaiOpKind::Get => {}
        }
    }

    /// Drops fetched attributes the negotiated version cannot use.
    /// Gated attributes are skipped, never a failed operation.
    fn filter_by_version(
        &mut self,
        object_type: ObjectType,
        fetched: Vec<Attr>,
    ) -> SyncdResult<Vec<Attr>> {
        if !self.version.is_enabled() {
            return Ok(fetched);
        }
        let mut kept = Vec::with_capacity(fetched.len());
        for attr in fetched {
            let meta = self.metadata.attr_metadata(object_type, attr.id);
            if self.version.is_sufficient_version(meta)? {
                kept.push(attr);
            } else {
                warn!(
                    "skipping attribute {} of {}: gated by negotiated version",
                    attr.id, object_type
                );
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::VirtualSwitchHandler;
    use crate::view::{DefaultObjectKind, InsegEntry, ObjectKey};
    use pretty_assertions::assert_eq;
    use sonic_sairedis::{AttrMetadata, StaticMetadataProvider};

    fn engine() -> SyncdEngine<VirtualSwitchHandler, StaticMetadataProvider> {
        SyncdEngine::new(VirtualSwitchHandler::new(), StaticMetadataProvider::new())
    }

    fn inseg(label: u32) -> ObjectKey {
        ObjectKey::Inseg(InsegEntry {
            switch_id: Vid::NULL,
            label,
        })
    }

    // ========== Normal mode ==========

    #[test]
    fn test_normal_mode_dispatches_and_records() {
        let mut eng = engine();
        let vid = eng.allocate_vid(ObjectType::VirtualRouter);

        eng.process(&SaiOperation::create(
            ObjectType::VirtualRouter,
            ObjectKey::Oid(vid),
            vec![],
        ))
        .unwrap();

        assert!(eng.current_view().contains(ObjectType::VirtualRouter, &ObjectKey::Oid(vid)));
        assert!(eng.translator().rid_of(vid).is_some());
        assert_eq!(eng.handler().oid_count(), 1);
    }

    #[test]
    fn test_normal_mode_duplicate_create_is_conflict() {
        let mut eng = engine();
        let vid = eng.allocate_vid(ObjectType::Vlan);
        let op = SaiOperation::create(ObjectType::Vlan, ObjectKey::Oid(vid), vec![]);

        eng.process(&op).unwrap();
        assert!(matches!(eng.process(&op), Err(SyncdError::Conflict(_))));
        assert_eq!(eng.handler().oid_count(), 1);
    }

    #[test]
    fn test_normal_mode_remove_absent_is_not_found() {
        let mut eng = engine();
        let vid = eng.allocate_vid(ObjectType::Vlan);
        assert!(matches!(
            eng.process(&SaiOperation::remove(ObjectType::Vlan, ObjectKey::Oid(vid))),
            Err(SyncdError::NotFound(_))
        ));
    }

    #[test]
    fn test_foreign_type_tag_rejected_and_never_recorded() {
        let mut eng = engine();
        let vlan_vid = eng.allocate_vid(ObjectType::Vlan);

        // The key's encoded type tag disagrees with the claimed type.
        assert!(matches!(
            eng.process(&SaiOperation::create(
                ObjectType::Port,
                ObjectKey::Oid(vlan_vid),
                vec![],
            )),
            Err(SyncdError::InvalidArgument(_))
        ));
        assert!(eng.current_view().is_empty());
        assert_eq!(eng.handler().oid_count(), 0);

        // A later warm boot reconciles cleanly.
        eng.init_view().unwrap();
        let port = eng.allocate_vid(ObjectType::Port);
        eng.process(&SaiOperation::create(
            ObjectType::Port,
            ObjectKey::Oid(port),
            vec![],
        ))
        .unwrap();
        let stats = eng.apply_view().unwrap();
        assert_eq!(stats.creates, 1);
    }

    #[test]
    fn test_foreign_type_tag_rejected_in_init_view() {
        let mut eng = engine();
        eng.init_view().unwrap();
        let vlan_vid = eng.allocate_vid(ObjectType::Vlan);
        assert!(matches!(
            eng.process(&SaiOperation::create(
                ObjectType::Port,
                ObjectKey::Oid(vlan_vid),
                vec![],
            )),
            Err(SyncdError::InvalidArgument(_))
        ));
        assert!(eng.apply_view().unwrap().creates == 0);
    }

    // ========== Init view / apply view ==========

    #[test]
    fn test_three_entry_creates_apply_in_input_order() {
        let mut eng = engine();
        eng.init_view().unwrap();

        for label in [100, 200, 300] {
            eng.process(&SaiOperation::create(
                ObjectType::InsegEntry,
                inseg(label),
                vec![],
            ))
            .unwrap();
        }

        let stats = eng.apply_view().unwrap();
        assert_eq!(stats.creates, 3);
        assert_eq!(stats.removes, 0);
        assert_eq!(eng.mode(), EngineMode::Normal);
        assert_eq!(eng.handler().entry_count(), 3);
        for label in [100, 200, 300] {
            assert!(eng.current_view().contains(ObjectType::InsegEntry, &inseg(label)));
        }
    }

    #[test]
    fn test_init_view_does_not_touch_driver() {
        let mut eng = engine();
        eng.init_view().unwrap();
        eng.process(&SaiOperation::create(
            ObjectType::InsegEntry,
            inseg(5),
            vec![],
        ))
        .unwrap();
        assert_eq!(eng.handler().entry_count(), 0);
    }

    #[test]
    fn test_apply_without_init_is_invalid() {
        let mut eng = engine();
        assert!(matches!(
            eng.apply_view(),
            Err(SyncdError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_default_objects_survive_apply() {
        let mut eng = engine();
        let switch_vid = Vid::encode(ObjectType::Switch, 1);
        let switch_rid = Rid::from_raw(0x21);
        eng.seed_default(
            ViewObject::new(ObjectType::Switch, ObjectKey::Oid(switch_vid))
                .with_default_kind(DefaultObjectKind::Switch),
            switch_rid,
        )
        .unwrap();

        eng.init_view().unwrap();
        let stats = eng.apply_view().unwrap();

        assert_eq!(stats.removes, 0);
        assert_eq!(stats.matched, 1);
        assert_eq!(eng.translator().rid_of(switch_vid), Some(switch_rid));
        assert!(eng
            .current_view()
            .contains(ObjectType::Switch, &ObjectKey::Oid(switch_vid)));
    }

    #[test]
    fn test_warm_boot_redeclaration_reuses_live_objects() {
        let mut eng = engine();

        // Cold boot: create a virtual router in normal mode.
        let old_vid = eng.allocate_vid(ObjectType::VirtualRouter);
        eng.process(&SaiOperation::create(
            ObjectType::VirtualRouter,
            ObjectKey::Oid(old_vid),
            vec![Attr::u32(1, 9000)],
        ))
        .unwrap();
        let live_rid = eng.translator().rid_of(old_vid).unwrap();

        // Warm boot: redeclare the same intent under a new VID.
        eng.init_view().unwrap();
        let new_vid = eng.allocate_vid(ObjectType::VirtualRouter);
        eng.process(&SaiOperation::create(
            ObjectType::VirtualRouter,
            ObjectKey::Oid(new_vid),
            vec![Attr::u32(1, 9000)],
        ))
        .unwrap();

        let stats = eng.apply_view().unwrap();
        assert_eq!(stats.creates, 0);
        assert_eq!(stats.removes, 0);
        assert_eq!(eng.translator().rid_of(new_vid), Some(live_rid));
    }

    // ========== Version gate ==========

    #[test]
    fn test_get_filters_version_gated_attrs() {
        let metadata = StaticMetadataProvider::new()
            .with_attr(
                ObjectType::Port,
                1,
                AttrMetadata::new("SAI_PORT_ATTR_SPEED", ApiVersion::new(1, 8, 0)),
            )
            .with_attr(
                ObjectType::Port,
                2,
                AttrMetadata::new("SAI_PORT_ATTR_NEW_FEATURE", ApiVersion::new(1, 12, 0)),
            );
        let mut eng = SyncdEngine::new(VirtualSwitchHandler::new(), metadata);
        eng.negotiate_api_version(ApiVersion::new(1, 10, 0));

        let vid = eng.allocate_vid(ObjectType::Port);
        eng.process(&SaiOperation::create(
            ObjectType::Port,
            ObjectKey::Oid(vid),
            vec![Attr::u32(1, 40_000), Attr::u32(2, 7)],
        ))
        .unwrap();

        let fetched = eng
            .process(&SaiOperation::get(
                ObjectType::Port,
                ObjectKey::Oid(vid),
                vec![1, 2],
            ))
            .unwrap();
        assert_eq!(fetched, vec![Attr::u32(1, 40_000)]);
    }
}
