use std::sync::Arc;

use tracing::{debug, warn};
use transport_bus::{Bus, BusMessage, BusResult};

use crate::error::ScanError;
use crate::listener::ScanListener;
use crate::profile::ScannerProfile;
use crate::status::StatusSink;

pub const START_SCANNING: &str = "START_SCANNING";

/// Publishes one-shot scan requests. Fire-and-forget: nothing waits for the
/// hardware to answer.
pub struct ScanTrigger<B: Bus> {
    bus: Arc<B>,
    action: String,
    key: String,
    listener: Arc<dyn ScanListener>,
    status: Arc<dyn StatusSink>,
}

impl<B: Bus> ScanTrigger<B> {
    pub fn new(
        bus: Arc<B>,
        profile: &ScannerProfile,
        listener: Arc<dyn ScanListener>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            bus,
            action: profile.trigger_action.clone(),
            key: profile.trigger_key.clone(),
            listener,
            status,
        }
    }

    /// Never fails; publish faults are reported through the listener.
    pub fn trigger_scan(&self) {
        match self.publish() {
            Ok(()) => self.status.show("Scan triggered"),
            Err(err) => {
                let err = ScanError::Trigger(err);
                warn!(target = "scan.trigger", error = %err, "failed to trigger scan");
                self.listener.on_error(&err.to_string());
            }
        }
    }

    fn publish(&self) -> BusResult<()> {
        let request =
            BusMessage::new(self.action.clone()).with_extra(self.key.clone(), START_SCANNING);
        debug!(
            target = "scan.trigger",
            action = %self.action,
            key = %self.key,
            "sending scan trigger"
        );
        self.bus.send(request)
    }
}
