use std::sync::Arc;

use tracing::{debug, warn};
use transport_bus::{Bus, BusError, BusReceiver, MessageFilter, ReceiverId};

use crate::dispatcher::ScanDispatcher;
use crate::error::{ScanError, ScanResult};
use crate::listener::ScanListener;
use crate::profile::ScannerProfile;
use crate::status::StatusSink;

/// Owns the single result-broadcast registration of a bridge.
///
/// Dropping the subscription unregisters any live receiver.
pub struct ReceiverSubscription<B: Bus> {
    bus: Arc<B>,
    action: String,
    category: String,
    dispatcher: Arc<ScanDispatcher>,
    listener: Arc<dyn ScanListener>,
    status: Arc<dyn StatusSink>,
    active: Option<ReceiverId>,
}

impl<B: Bus> ReceiverSubscription<B> {
    pub fn new(
        bus: Arc<B>,
        profile: &ScannerProfile,
        listener: Arc<dyn ScanListener>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            bus,
            action: profile.result_action.clone(),
            category: profile.category.clone(),
            dispatcher: Arc::new(ScanDispatcher::new(profile, listener.clone())),
            listener,
            status,
            active: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.active.is_some()
    }

    /// Registers the dispatcher for result broadcasts. Faults, including a
    /// second registration while one is live, go to the listener.
    pub fn register(&mut self) {
        match self.try_register() {
            Ok(id) => {
                debug!(
                    target = "scan.subscription",
                    receiver = %id,
                    action = %self.action,
                    "receiver registered"
                );
                self.status.show("Barcode receiver registered");
            }
            Err(err) => {
                warn!(target = "scan.subscription", error = %err, "failed to register receiver");
                self.listener.on_error(&err.to_string());
            }
        }
    }

    /// Removes the registration. Faults are logged only, so this is safe to
    /// call from any teardown path.
    pub fn unregister(&mut self) {
        if let Err(err) = self.try_unregister() {
            warn!(target = "scan.subscription", error = %err, "failed to unregister receiver");
        }
    }

    fn try_register(&mut self) -> ScanResult<ReceiverId> {
        if self.active.is_some() {
            return Err(ScanError::AlreadyRegistered);
        }
        let filter = MessageFilter::new()
            .with_action(self.action.clone())
            .with_category(self.category.clone());
        let receiver: Arc<dyn BusReceiver> = self.dispatcher.clone();
        let id = self
            .bus
            .register(filter, receiver)
            .map_err(ScanError::Register)?;
        self.active = Some(id);
        Ok(id)
    }

    /// The id is kept when the bus fails for any reason other than not
    /// knowing it, so the registration can still be removed by a retry.
    fn try_unregister(&mut self) -> ScanResult<()> {
        let id = self.active.ok_or(ScanError::NotRegistered)?;
        match self.bus.unregister(id) {
            Ok(()) => {
                self.active = None;
                debug!(target = "scan.subscription", receiver = %id, "receiver unregistered");
                Ok(())
            }
            Err(err @ BusError::UnknownReceiver(_)) => {
                self.active = None;
                Err(ScanError::Unregister(err))
            }
            Err(err) => Err(ScanError::Unregister(err)),
        }
    }
}

impl<B: Bus> Drop for ReceiverSubscription<B> {
    fn drop(&mut self) {
        if self.active.is_some() {
            self.unregister();
        }
    }
}
