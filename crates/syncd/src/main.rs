//! SONiC syncd entry point.
//!
//! Bootstraps the synchronization engine against the in-memory
//! virtual-switch driver and runs the notification consumer loop.
//! The wire transport is external; this binary demonstrates the
//! init-view/apply-view lifecycle the transport would drive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use sonic_sairedis::{ApiVersion, ObjectType, Rid, StaticMetadataProvider, Vid};
use sonic_syncd::notification::{
    NotificationEvent, NotificationProcessor, NotificationQueue, NotificationSignal, OperStatus,
    SwitchNotifications,
};
use sonic_syncd::view::{DefaultObjectKind, ObjectKey, ViewObject};
use sonic_syncd::{SaiOperation, SyncdEngine, VirtualSwitchHandler};

/// SONiC ASIC Synchronization Daemon
#[derive(Parser, Debug)]
#[command(name = "syncd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Notification queue capacity
    #[arg(short = 'q', long, default_value = "1024")]
    queue_capacity: usize,

    /// Start in warm boot mode (init view, reconcile, apply)
    #[arg(long)]
    warm_boot: bool,

    /// Negotiated SAI API version (major.minor.revision)
    #[arg(long)]
    api_version: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("====================================================================");
    info!("Starting SONiC syncd (Rust implementation)");
    info!("====================================================================");
    info!("Notification queue capacity: {}", args.queue_capacity);
    if args.warm_boot {
        info!("Warm boot mode: ENABLED");
    }

    let metadata = StaticMetadataProvider::new();
    let mut engine = SyncdEngine::new(VirtualSwitchHandler::new(), metadata);

    if let Some(version) = &args.api_version {
        let version: ApiVersion = version
            .parse()
            .with_context(|| format!("bad --api-version {}", version))?;
        engine.negotiate_api_version(version);
    }

    // The switch object pre-exists on the ASIC; register it as a
    // default so every view apply preserves it.
    let switch_vid = Vid::encode(ObjectType::Switch, 1);
    engine.seed_default(
        ViewObject::new(ObjectType::Switch, ObjectKey::Oid(switch_vid))
            .with_default_kind(DefaultObjectKind::Switch),
        Rid::from_raw(0x1),
    )?;

    if args.warm_boot {
        info!("Warm boot: entering init view");
        engine.init_view()?;
        let stats = engine.apply_view()?;
        info!(
            "Warm boot reconciliation complete: {} matched, {} created, {} removed",
            stats.matched, stats.creates, stats.removes
        );
    } else {
        // Cold boot smoke pass: one port created straight through.
        let port = engine.allocate_vid(ObjectType::Port);
        engine.process(&SaiOperation::create(
            ObjectType::Port,
            ObjectKey::Oid(port),
            vec![],
        ))?;
        info!("Cold boot: created port {}", port);
    }

    // Notification pipeline: driver callback threads produce, the
    // apply thread consumes.
    let queue = Arc::new(NotificationQueue::new(args.queue_capacity));
    let signal = Arc::new(NotificationSignal::new());
    let callbacks = SwitchNotifications {
        on_port_state_change: Some(Box::new(|port, status| {
            info!("port {} is {:?}", port, status);
        })),
        on_switch_shutdown_request: Some(Box::new(|switch_id| {
            warn!("switch {} requested shutdown", switch_id);
        })),
        ..SwitchNotifications::default()
    };
    let mut processor =
        NotificationProcessor::new(Arc::clone(&queue), Arc::clone(&signal), callbacks);

    let shutdown = Arc::new(AtomicBool::new(false));
    let producer = {
        let queue = Arc::clone(&queue);
        let signal = Arc::clone(&signal);
        let shutdown = Arc::clone(&shutdown);
        std::thread::spawn(move || {
            // Simulated driver callback thread.
            queue.enqueue(NotificationEvent::PortStateChange {
                port: Rid::from_raw(0x1_0000_0001),
                status: OperStatus::Up,
            });
            signal.notify();
            while !shutdown.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(10));
            }
        })
    };

    info!("Starting notification consumer loop...");
    let mut idle_passes = 0;
    while idle_passes < 3 {
        if signal.wait_for(Duration::from_millis(100)) {
            let drained = processor.drain(engine.translator());
            info!("drained {} notification(s)", drained);
            idle_passes = 0;
        } else {
            idle_passes += 1;
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    producer
        .join()
        .map_err(|_| anyhow::anyhow!("notification producer panicked"))?;

    if queue.dropped() > 0 {
        warn!("{} notification(s) dropped at capacity", queue.dropped());
    }

    info!("====================================================================");
    info!("SONiC syncd shutdown complete");
    info!("====================================================================");
    Ok(())
}
