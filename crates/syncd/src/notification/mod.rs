//! Asynchronous notification pipeline.
//!
//! Driver callback threads decode events and push them onto a bounded
//! queue, then raise a signal. The single consumer (the apply thread)
//! blocks on the signal, drains the queue fully, and for each event
//! runs a metadata-processing step followed by the registered user
//! callback. Back-pressure is applied by dropping, never by blocking
//! the driver's callback thread.

mod event;
mod processor;
mod queue;

pub use event::{
    FdbEventEntry, FdbEventKind, HaSetEventKind, HealthSeverity, HostTxReadyStatus,
    NotificationEvent, OperStatus,
};
pub use processor::{NotificationProcessor, SwitchNotifications};
pub use queue::{NotificationQueue, NotificationSignal};
