//! Notification consumption.
//!
//! The processor runs on the apply thread: it drains the queue after
//! each signal, translates event ids from RID to VID, applies the
//! metadata-processing step (derived state such as host-tx-ready
//! pending flags), and finally invokes the registered user callback
//! for the event kind. An absent callback is a silent no-op.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use sonic_sairedis::{Rid, Vid};

use crate::notification::event::{
    FdbEventEntry, HaSetEventKind, HealthSeverity, HostTxReadyStatus, NotificationEvent,
    OperStatus,
};
use crate::notification::queue::{NotificationQueue, NotificationSignal};
use crate::translator::VirtualOidTranslator;

/// Per-kind user callbacks, all optional.
#[derive(Default)]
pub struct SwitchNotifications {
    pub on_port_state_change: Option<Box<dyn Fn(Vid, OperStatus) + Send>>,
    pub on_port_host_tx_ready: Option<Box<dyn Fn(Vid, Vid, HostTxReadyStatus) + Send>>,
    pub on_switch_state_change: Option<Box<dyn Fn(Vid, OperStatus) + Send>>,
    pub on_switch_shutdown_request: Option<Box<dyn Fn(Vid) + Send>>,
    pub on_switch_asic_sdk_health_event: Option<Box<dyn Fn(Vid, HealthSeverity, &str) + Send>>,
    pub on_ha_set_event: Option<Box<dyn Fn(Vid, HaSetEventKind) + Send>>,
    pub on_fdb_event: Option<Box<dyn Fn(&[FdbEventEntry]) + Send>>,
}

/// Single consumer of the notification queue.
pub struct NotificationProcessor {
    queue: Arc<NotificationQueue<NotificationEvent<Rid>>>,
    signal: Arc<NotificationSignal>,
    callbacks: SwitchNotifications,
    /// Ports whose host-tx-ready confirmation is still outstanding.
    pending_host_tx: HashSet<Vid>,
    processed: u64,
}

impl NotificationProcessor {
    pub fn new(
        queue: Arc<NotificationQueue<NotificationEvent<Rid>>>,
        signal: Arc<NotificationSignal>,
        callbacks: SwitchNotifications,
    ) -> Self {
        Self {
            queue,
            signal,
            callbacks,
            pending_host_tx: HashSet::new(),
            processed: 0,
        }
    }

    pub fn queue(&self) -> &Arc<NotificationQueue<NotificationEvent<Rid>>> {
        &self.queue
    }

    pub fn signal(&self) -> &Arc<NotificationSignal> {
        &self.signal
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Marks a port as awaiting host-tx-ready confirmation.
    pub fn expect_host_tx_ready(&mut self, port: Vid) {
        self.pending_host_tx.insert(port);
    }

    pub fn is_host_tx_pending(&self, port: Vid) -> bool {
        self.pending_host_tx.contains(&port)
    }

    /// Drains the queue fully, processing events in enqueue order.
    /// Returns the number of events processed.
    pub fn drain(&mut self, translator: &VirtualOidTranslator) -> usize {
        let mut count = 0;
        while let Some(event) = self.queue.dequeue() {
            self.process_event(event, translator);
            count += 1;
        }
        count
    }

    /// Blocks on the signal, then drains. One loop iteration of the
    /// consumer thread.
    pub fn wait_and_drain(&mut self, translator: &VirtualOidTranslator) -> usize {
        self.signal.wait();
        self.drain(translator)
    }

    fn process_event(&mut self, event: NotificationEvent<Rid>, translator: &VirtualOidTranslator) {
        let event = event.map_ids(&mut |rid| {
            if rid.is_null() {
                return Vid::NULL;
            }
            translator.vid_of(rid).unwrap_or_else(|| {
                warn!("notification references unknown rid {}", rid);
                Vid::NULL
            })
        });

        debug!(
            "notification: {:?} (primary object {:?})",
            std::mem::discriminant(&event),
            event.primary_object()
        );
        self.apply_metadata_step(&event);
        self.execute_callback(&event);
        self.processed += 1;
    }

    /// Derived-state updates that must happen whether or not a user
    /// callback is registered.
    fn apply_metadata_step(&mut self, event: &NotificationEvent) {
        match event {
            NotificationEvent::PortHostTxReady { port, .. } => {
                self.pending_host_tx.remove(port);
            }
            NotificationEvent::PortStateChange {
                port,
                status: OperStatus::Down,
            } => {
                // A downed port will re-confirm tx readiness when it
                // comes back up.
                self.pending_host_tx.remove(port);
            }
            _ => {}
        }
    }

    fn execute_callback(&self, event: &NotificationEvent) {
        match event {
            NotificationEvent::PortStateChange { port, status } => {
                if let Some(cb) = &self.callbacks.on_port_state_change {
                    cb(*port, *status);
                }
            }
            NotificationEvent::PortHostTxReady {
                switch_id,
                port,
                status,
            } => {
                if let Some(cb) = &self.callbacks.on_port_host_tx_ready {
                    cb(*switch_id, *port, *status);
                }
            }
            NotificationEvent::SwitchStateChange { switch_id, status } => {
                if let Some(cb) = &self.callbacks.on_switch_state_change {
                    cb(*switch_id, *status);
                }
            }
            NotificationEvent::SwitchShutdownRequest { switch_id } => {
                if let Some(cb) = &self.callbacks.on_switch_shutdown_request {
                    cb(*switch_id);
                }
            }
            NotificationEvent::SwitchAsicSdkHealthEvent {
                switch_id,
                severity,
                description,
            } => {
                if let Some(cb) = &self.callbacks.on_switch_asic_sdk_health_event {
                    cb(*switch_id, *severity, description);
                }
            }
            NotificationEvent::HaSetEvent { ha_set_id, event } => {
                if let Some(cb) = &self.callbacks.on_ha_set_event {
                    cb(*ha_set_id, *event);
                }
            }
            NotificationEvent::FdbEvent { entries } => {
                if let Some(cb) = &self.callbacks.on_fdb_event {
                    cb(entries);
                }
            }
        }
    }
}
