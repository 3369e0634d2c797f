use std::sync::Arc;

use tracing::{debug, warn};
use transport_bus::{BusMessage, BusReceiver};

use crate::error::{ScanError, ScanResult};
use crate::listener::ScanListener;
use crate::profile::ScannerProfile;

/// Bus callback that turns result broadcasts into listener calls.
///
/// Holds no mutable state, so concurrent deliveries are independent.
pub struct ScanDispatcher {
    result_action: String,
    payload_key: String,
    listener: Arc<dyn ScanListener>,
}

impl ScanDispatcher {
    pub fn new(profile: &ScannerProfile, listener: Arc<dyn ScanListener>) -> Self {
        Self {
            result_action: profile.result_action.clone(),
            payload_key: profile.payload_key.clone(),
            listener,
        }
    }

    /// Returns `None` for broadcasts that are not scan results.
    fn extract(&self, message: &BusMessage) -> Option<ScanResult<String>> {
        let action = match message.action() {
            Some(action) if !action.is_empty() => action,
            _ => {
                warn!(target = "scan.dispatch", "received broadcast without action");
                return None;
            }
        };
        if action != self.result_action {
            debug!(
                target = "scan.dispatch",
                action,
                expected = %self.result_action,
                "ignoring broadcast for another consumer"
            );
            return None;
        }
        let payload = match message.extras.get_string(&self.payload_key) {
            Ok(payload) => payload,
            Err(err) => return Some(Err(err.into())),
        };
        Some(match payload {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(ScanError::NoData),
        })
    }
}

impl BusReceiver for ScanDispatcher {
    fn on_receive(&self, message: &BusMessage) {
        match self.extract(message) {
            None => {}
            Some(Ok(payload)) => {
                debug!(target = "scan.dispatch", payload = %payload, "barcode scanned");
                self.listener.on_barcode_scanned(&payload);
            }
            Some(Err(err)) => {
                warn!(target = "scan.dispatch", error = %err, "scan result rejected");
                self.listener.on_error(&err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::FnListener;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Calls {
        scanned: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    fn dispatcher() -> (Arc<Calls>, ScanDispatcher) {
        let calls = Arc::new(Calls::default());
        let listener = {
            let scanned = calls.clone();
            let errors = calls.clone();
            FnListener::new(
                move |payload: &str| scanned.scanned.lock().unwrap().push(payload.to_string()),
                move |message: &str| errors.errors.lock().unwrap().push(message.to_string()),
            )
        };
        let dispatcher = ScanDispatcher::new(&ScannerProfile::default(), Arc::new(listener));
        (calls, dispatcher)
    }

    fn result(profile: &ScannerProfile) -> BusMessage {
        BusMessage::new(profile.result_action.clone())
    }

    #[test]
    fn forwards_matching_payload_once() {
        let profile = ScannerProfile::default();
        let (calls, dispatcher) = dispatcher();

        dispatcher.on_receive(&result(&profile).with_extra(&profile.payload_key, "ABC-123"));

        assert_eq!(calls.scanned.lock().unwrap().as_slice(), ["ABC-123"]);
        assert!(calls.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn ignores_other_actions() {
        let profile = ScannerProfile::default();
        let (calls, dispatcher) = dispatcher();

        dispatcher.on_receive(
            &BusMessage::new("com.other.app.RESULT").with_extra(&profile.payload_key, "ABC"),
        );

        assert!(calls.scanned.lock().unwrap().is_empty());
        assert!(calls.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_action_is_dropped() {
        let profile = ScannerProfile::default();
        let (calls, dispatcher) = dispatcher();
        let mut message = BusMessage::default().with_extra(&profile.payload_key, "ABC");

        dispatcher.on_receive(&message);
        message.action = Some(String::new());
        dispatcher.on_receive(&message);

        assert!(calls.scanned.lock().unwrap().is_empty());
        assert!(calls.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_or_absent_payload_reports_no_data() {
        let profile = ScannerProfile::default();
        let (calls, dispatcher) = dispatcher();

        dispatcher.on_receive(&result(&profile));
        dispatcher.on_receive(&result(&profile).with_extra(&profile.payload_key, ""));

        assert!(calls.scanned.lock().unwrap().is_empty());
        assert_eq!(
            calls.errors.lock().unwrap().as_slice(),
            [
                "No data received from scanner.",
                "No data received from scanner."
            ]
        );
    }

    #[test]
    fn wrong_payload_type_reports_extraction_fault() {
        let profile = ScannerProfile::default();
        let (calls, dispatcher) = dispatcher();

        dispatcher.on_receive(
            &result(&profile).with_extra(&profile.payload_key, Bytes::from_static(b"\x01\x02")),
        );

        let errors = calls.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Error processing barcode scan: "));
        assert!(errors[0].contains("expected string but found bytes"));
        assert!(calls.scanned.lock().unwrap().is_empty());
    }
}
