use std::sync::{Arc, Weak};

use bytes::Bytes;
use tracing::{debug, warn};
use transport_bus::{Bus, BusMessage, BusReceiver, BusResult, MessageFilter, ReceiverId};

use crate::profile::ScannerProfile;
use crate::trigger::START_SCANNING;

/// What the simulated hardware answers to a scan request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedResult {
    Payload(String),
    /// Payload key present with an empty string.
    Empty,
    /// Payload key left out of the result.
    Missing,
    /// Payload delivered as raw bytes instead of a string.
    WrongType,
    /// Requests are swallowed without a result broadcast.
    Silent,
}

struct Responder<B: Bus> {
    bus: Weak<B>,
    profile: ScannerProfile,
    result: SimulatedResult,
}

impl<B: Bus> Responder<B> {
    fn result_message(&self) -> Option<BusMessage> {
        let message = BusMessage::new(self.profile.result_action.clone());
        let key = self.profile.payload_key.clone();
        match &self.result {
            SimulatedResult::Payload(payload) => Some(message.with_extra(key, payload.as_str())),
            SimulatedResult::Empty => Some(message.with_extra(key, "")),
            SimulatedResult::Missing => Some(message),
            SimulatedResult::WrongType => Some(message.with_extra(
                key,
                Bytes::copy_from_slice(b"\x1bsimulated"),
            )),
            SimulatedResult::Silent => None,
        }
    }
}

impl<B: Bus> BusReceiver for Responder<B> {
    fn on_receive(&self, message: &BusMessage) {
        match message.extras.get_string(&self.profile.trigger_key) {
            Ok(Some(START_SCANNING)) => {}
            other => {
                debug!(target = "scan.simulator", command = ?other, "ignoring scanner command");
                return;
            }
        }
        let Some(reply) = self.result_message() else {
            debug!(target = "scan.simulator", "scan request swallowed");
            return;
        };
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        if let Err(err) = bus.send(reply) {
            warn!(target = "scan.simulator", error = %err, "failed to publish scan result");
        }
    }
}

/// Stand-in for the hardware scanner service: answers every
/// `START_SCANNING` trigger with a result broadcast.
pub struct SimulatedScanner<B: Bus> {
    bus: Arc<B>,
    id: ReceiverId,
}

impl<B: Bus + 'static> SimulatedScanner<B> {
    pub fn install(
        bus: Arc<B>,
        profile: &ScannerProfile,
        result: SimulatedResult,
    ) -> BusResult<Self> {
        let filter = MessageFilter::new().with_action(profile.trigger_action.clone());
        let responder = Responder {
            bus: Arc::downgrade(&bus),
            profile: profile.clone(),
            result,
        };
        let id = bus.register(filter, Arc::new(responder))?;
        debug!(target = "scan.simulator", receiver = %id, "simulated scanner installed");
        Ok(Self { bus, id })
    }

    pub fn uninstall(self) -> BusResult<()> {
        self.bus.unregister(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport_bus::LocalBus;

    #[tokio::test]
    async fn answers_start_requests_only() {
        let bus = Arc::new(LocalBus::new());
        let profile = ScannerProfile::default();
        let _scanner =
            SimulatedScanner::install(bus.clone(), &profile, SimulatedResult::Payload("42".into()))
                .expect("install");
        let mut tap = bus.tap();

        bus.send(
            BusMessage::new(profile.trigger_action.clone())
                .with_extra(profile.trigger_key.clone(), "STOP_SCANNING"),
        )
        .expect("send stop");
        bus.send(
            BusMessage::new(profile.trigger_action.clone())
                .with_extra(profile.trigger_key.clone(), START_SCANNING),
        )
        .expect("send start");

        let stop = tap.recv().await.expect("stop request");
        assert_eq!(stop.action(), Some(profile.trigger_action.as_str()));
        let start = tap.recv().await.expect("start request");
        assert_eq!(start.action(), Some(profile.trigger_action.as_str()));
        let reply = tap.recv().await.expect("scan result");
        assert_eq!(reply.action(), Some(profile.result_action.as_str()));
        assert_eq!(reply.extras.get_string(&profile.payload_key), Ok(Some("42")));
    }

    #[test]
    fn uninstall_removes_registration() {
        let bus = Arc::new(LocalBus::new());
        let scanner =
            SimulatedScanner::install(bus.clone(), &ScannerProfile::default(), SimulatedResult::Silent)
                .expect("install");
        assert_eq!(bus.receiver_count(), 1);
        scanner.uninstall().expect("uninstall");
        assert_eq!(bus.receiver_count(), 0);
    }
}
