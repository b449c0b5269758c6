//! SONiC syncd - ASIC Synchronization Engine
//!
//! This is the Rust implementation of the syncd synchronization core,
//! responsible for translating control-plane object operations into
//! driver calls and for reconciling declared state against the live
//! ASIC across warm restarts.
//!
//! # Architecture
//!
//! ```text
//! [transport] ──> [Dispatcher] ──> [SaiHandler] ──> [ASIC]
//!                      │                 │
//!                [SyncdEngine]     (callback threads)
//!                 │    │    │            │
//!         [AsicView] [VID↔RID]   [NotificationQueue]
//!                 │                      │
//!           [compare/apply] <── [NotificationProcessor]
//! ```
//!
//! # Key Components
//!
//! - [`engine::SyncdEngine`]: apply-thread state machine (normal and
//!   init-view modes, view apply)
//! - [`translator::VirtualOidTranslator`]: VID↔RID bijection
//! - [`compare`]: candidate matching between current and temporary
//!   ASIC views
//! - [`notification`]: bounded queue, wakeup signal, and callback
//!   dispatch for driver events
//! - [`vendor::VirtualSwitchHandler`]: in-memory driver used by tests
//!   and simulation runs

pub mod apply;
pub mod compare;
pub mod decay;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod notification;
pub mod translator;
pub mod vendor;
pub mod view;

pub use apply::ApplyStats;
pub use compare::{compare_views, ViewDiff, ViewOp};
pub use dispatch::{DriverAttr, DriverKey, SaiHandler, SaiOpKind, SaiOperation};
pub use engine::{EngineMode, SyncdEngine};
pub use error::{SyncdError, SyncdResult};
pub use translator::VirtualOidTranslator;
pub use vendor::VirtualSwitchHandler;
pub use view::{AsicView, DefaultObjectKind, ObjectKey, ViewObject};
