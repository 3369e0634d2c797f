//! Scan Bridge: connects a broadcast-driven barcode scanner service to
//! application code.
//!
//! Responsibilities:
//! - asking the scanner service to start a scan
//! - owning the single registration for result broadcasts
//! - filtering results, extracting the payload and notifying one listener
//!
//! Every public entry point is total. Faults surface through
//! [`ScanListener::on_error`] or, for teardown, through logs only.

use std::sync::Arc;

use transport_bus::Bus;

mod dispatcher;
mod error;
mod listener;
mod profile;
mod simulator;
mod status;
mod subscription;
mod trigger;

pub use dispatcher::ScanDispatcher;
pub use error::{ProfileError, ScanError, ScanResult};
pub use listener::{ChannelListener, FnListener, ScanEvent, ScanListener};
pub use profile::ScannerProfile;
pub use simulator::{SimulatedResult, SimulatedScanner};
pub use status::{StatusSink, TracingStatusSink};
pub use subscription::ReceiverSubscription;
pub use trigger::{ScanTrigger, START_SCANNING};

/// One scanner integration bound to one listener.
///
/// Dropping the bridge unregisters any live receiver through its
/// [`ReceiverSubscription`].
pub struct ScanBridge<B: Bus> {
    trigger: ScanTrigger<B>,
    subscription: ReceiverSubscription<B>,
}

impl<B: Bus> ScanBridge<B> {
    pub fn new(bus: Arc<B>, profile: &ScannerProfile, listener: Arc<dyn ScanListener>) -> Self {
        Self::with_status_sink(bus, profile, listener, Arc::new(TracingStatusSink))
    }

    pub fn with_status_sink(
        bus: Arc<B>,
        profile: &ScannerProfile,
        listener: Arc<dyn ScanListener>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            trigger: ScanTrigger::new(bus.clone(), profile, listener.clone(), status.clone()),
            subscription: ReceiverSubscription::new(bus, profile, listener, status),
        }
    }

    pub fn trigger_scan(&self) {
        self.trigger.trigger_scan();
    }

    pub fn register_receiver(&mut self) {
        self.subscription.register();
    }

    pub fn unregister_receiver(&mut self) {
        self.subscription.unregister();
    }

    pub fn is_registered(&self) -> bool {
        self.subscription.is_registered()
    }
}
