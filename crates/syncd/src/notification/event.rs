//! Decoded notification events.
//!
//! Events arrive from the driver in RID space and are delivered to
//! user callbacks in VID space; the type is generic over the id kind
//! so the same payload definitions serve both sides. Every variant
//! owns its payload outright.

use serde::{Deserialize, Serialize};
use sonic_sairedis::{ObjectIdKind, Vid};

use crate::view::FdbEntry;

/// Operational status of a port or switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperStatus {
    Up,
    Down,
    Unknown,
}

/// Host interface transmit readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostTxReadyStatus {
    Ready,
    NotReady,
}

/// Severity reported by the ASIC SDK health channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthSeverity {
    Ok,
    Warning,
    Fatal,
}

/// HA-set role/peer transition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaSetEventKind {
    StateChanged,
    SplitBrainDetected,
    PeerLost,
}

/// FDB learn/age/move/flush event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FdbEventKind {
    Learned,
    Aged,
    Moved,
    Flushed,
}

/// One FDB event record; a single notification may carry many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdbEventEntry<Id = Vid> {
    pub kind: FdbEventKind,
    pub entry: FdbEntry<Id>,
    pub bridge_port: Id,
}

/// A decoded driver notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent<Id = Vid> {
    PortStateChange {
        port: Id,
        status: OperStatus,
    },
    PortHostTxReady {
        switch_id: Id,
        port: Id,
        status: HostTxReadyStatus,
    },
    SwitchStateChange {
        switch_id: Id,
        status: OperStatus,
    },
    SwitchShutdownRequest {
        switch_id: Id,
    },
    SwitchAsicSdkHealthEvent {
        switch_id: Id,
        severity: HealthSeverity,
        description: String,
    },
    HaSetEvent {
        ha_set_id: Id,
        event: HaSetEventKind,
    },
    FdbEvent {
        entries: Vec<FdbEventEntry<Id>>,
    },
}

impl<Id: ObjectIdKind> NotificationEvent<Id> {
    /// The switch this event belongs to, when the payload carries one.
    pub fn switch_id(&self) -> Option<Id> {
        match self {
            NotificationEvent::PortStateChange { .. } => None,
            NotificationEvent::PortHostTxReady { switch_id, .. }
            | NotificationEvent::SwitchStateChange { switch_id, .. }
            | NotificationEvent::SwitchShutdownRequest { switch_id }
            | NotificationEvent::SwitchAsicSdkHealthEvent { switch_id, .. } => Some(*switch_id),
            NotificationEvent::HaSetEvent { .. } => None,
            NotificationEvent::FdbEvent { entries } => {
                entries.first().map(|e| e.entry.switch_id)
            }
        }
    }

    /// One representative object id, for coarse routing and logging.
    pub fn primary_object(&self) -> Option<Id> {
        match self {
            NotificationEvent::PortStateChange { port, .. }
            | NotificationEvent::PortHostTxReady { port, .. } => Some(*port),
            NotificationEvent::SwitchStateChange { switch_id, .. }
            | NotificationEvent::SwitchShutdownRequest { switch_id }
            | NotificationEvent::SwitchAsicSdkHealthEvent { switch_id, .. } => Some(*switch_id),
            NotificationEvent::HaSetEvent { ha_set_id, .. } => Some(*ha_set_id),
            NotificationEvent::FdbEvent { entries } => entries.first().map(|e| e.bridge_port),
        }
    }

    /// Rewrites every object id through `f`. Infallible: unresolvable
    /// ids are the resolver's problem (it substitutes a null id).
    pub fn map_ids<J: ObjectIdKind>(
        self,
        f: &mut impl FnMut(Id) -> J,
    ) -> NotificationEvent<J> {
        match self {
            NotificationEvent::PortStateChange { port, status } => {
                NotificationEvent::PortStateChange {
                    port: f(port),
                    status,
                }
            }
            NotificationEvent::PortHostTxReady {
                switch_id,
                port,
                status,
            } => NotificationEvent::PortHostTxReady {
                switch_id: f(switch_id),
                port: f(port),
                status,
            },
            NotificationEvent::SwitchStateChange { switch_id, status } => {
                NotificationEvent::SwitchStateChange {
                    switch_id: f(switch_id),
                    status,
                }
            }
            NotificationEvent::SwitchShutdownRequest { switch_id } => {
                NotificationEvent::SwitchShutdownRequest {
                    switch_id: f(switch_id),
                }
            }
            NotificationEvent::SwitchAsicSdkHealthEvent {
                switch_id,
                severity,
                description,
            } => NotificationEvent::SwitchAsicSdkHealthEvent {
                switch_id: f(switch_id),
                severity,
                description,
            },
            NotificationEvent::HaSetEvent { ha_set_id, event } => {
                NotificationEvent::HaSetEvent {
                    ha_set_id: f(ha_set_id),
                    event,
                }
            }
            NotificationEvent::FdbEvent { entries } => NotificationEvent::FdbEvent {
                entries: entries
                    .into_iter()
                    .map(|e| FdbEventEntry {
                        kind: e.kind,
                        entry: FdbEntry {
                            switch_id: f(e.entry.switch_id),
                            bv_id: f(e.entry.bv_id),
                            mac: e.entry.mac,
                        },
                        bridge_port: f(e.bridge_port),
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_sairedis::{ObjectType, Rid};

    #[test]
    fn test_switch_and_primary_ids() {
        let port = Vid::encode(ObjectType::Port, 3);
        let event = NotificationEvent::PortStateChange {
            port,
            status: OperStatus::Up,
        };
        assert_eq!(event.switch_id(), None);
        assert_eq!(event.primary_object(), Some(port));

        let switch = Vid::encode(ObjectType::Switch, 1);
        let event: NotificationEvent = NotificationEvent::SwitchShutdownRequest {
            switch_id: switch,
        };
        assert_eq!(event.switch_id(), Some(switch));
        assert_eq!(event.primary_object(), Some(switch));
    }

    #[test]
    fn test_map_ids_rewrites_every_field() {
        let event = NotificationEvent::FdbEvent {
            entries: vec![FdbEventEntry {
                kind: FdbEventKind::Learned,
                entry: FdbEntry {
                    switch_id: Rid::from_raw(1),
                    bv_id: Rid::from_raw(2),
                    mac: [0, 1, 2, 3, 4, 5],
                },
                bridge_port: Rid::from_raw(3),
            }],
        };

        let mapped = event.map_ids(&mut |rid: Rid| Vid::from_raw(rid.as_raw() * 10));
        let NotificationEvent::FdbEvent { entries } = mapped else {
            panic!("variant changed by map");
        };
        assert_eq!(entries[0].entry.switch_id, Vid::from_raw(10));
        assert_eq!(entries[0].entry.bv_id, Vid::from_raw(20));
        assert_eq!(entries[0].bridge_port, Vid::from_raw(30));
    }

    #[test]
    fn test_serde_round_trip() {
        let event: NotificationEvent = NotificationEvent::SwitchAsicSdkHealthEvent {
            switch_id: Vid::encode(ObjectType::Switch, 1),
            severity: HealthSeverity::Warning,
            description: "ecc corrected".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("switch_asic_sdk_health_event"));
        let back: NotificationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
