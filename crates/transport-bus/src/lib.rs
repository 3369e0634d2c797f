use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Category carried by filters that accept plain broadcasts.
pub const CATEGORY_DEFAULT: &str = "android.intent.category.DEFAULT";

/// A typed value stored under an extras key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraValue {
    String(String),
    Int(i64),
    Bool(bool),
    StringList(Vec<String>),
    Bytes(Bytes),
}

impl ExtraValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ExtraValue::String(_) => "string",
            ExtraValue::Int(_) => "int",
            ExtraValue::Bool(_) => "bool",
            ExtraValue::StringList(_) => "string list",
            ExtraValue::Bytes(_) => "bytes",
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::String(value.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::String(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        ExtraValue::Int(value)
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        ExtraValue::Bool(value)
    }
}

impl From<Bytes> for ExtraValue {
    fn from(value: Bytes) -> Self {
        ExtraValue::Bytes(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtraError {
    #[error("extra {key} expected {expected} but found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// String-keyed auxiliary values carried by a [`BusMessage`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extras {
    values: HashMap<String, ExtraValue>,
}

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.values.get(key)
    }

    /// Returns the string stored under `key`, `None` when absent, and an
    /// error when the key holds a value of another type.
    pub fn get_string(&self, key: &str) -> Result<Option<&str>, ExtraError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(ExtraValue::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(ExtraError::WrongType {
                key: key.to_string(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A broadcast flowing over the bus: an optional action, categories and extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusMessage {
    pub action: Option<String>,
    pub categories: BTreeSet<String>,
    pub extras: Extras,
}

impl BusMessage {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extras.insert(key, value);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }
}

/// Selects which broadcasts a registered receiver is handed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    actions: BTreeSet<String>,
    categories: BTreeSet<String>,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: impl Into<String>) {
        self.actions.insert(action.into());
    }

    pub fn add_category(&mut self, category: impl Into<String>) {
        self.categories.insert(category.into());
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.add_action(action);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.add_category(category);
        self
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    /// A message matches when its action is listed and every category it
    /// carries is listed too.
    pub fn matches(&self, message: &BusMessage) -> bool {
        let Some(action) = message.action() else {
            return false;
        };
        self.actions.contains(action) && message.categories.is_subset(&self.categories)
    }
}

/// Callback invoked by the bus for every matching broadcast.
pub trait BusReceiver: Send + Sync {
    fn on_receive(&self, message: &BusMessage);
}

impl<F> BusReceiver for F
where
    F: Fn(&BusMessage) + Send + Sync,
{
    fn on_receive(&self, message: &BusMessage) {
        (self)(message)
    }
}

/// Handle identifying one filter/receiver registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver-{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("bus channel closed")]
    Closed,
    #[error("receiver not registered: {0}")]
    UnknownReceiver(ReceiverId),
    #[error("bus transport error: {0}")]
    Transport(String),
}

pub type BusResult<T> = Result<T, BusError>;

pub trait Bus: Send + Sync {
    fn register(
        &self,
        filter: MessageFilter,
        receiver: Arc<dyn BusReceiver>,
    ) -> BusResult<ReceiverId>;
    fn unregister(&self, id: ReceiverId) -> BusResult<()>;
    fn send(&self, message: BusMessage) -> BusResult<()>;
}

struct Registration {
    filter: MessageFilter,
    receiver: Arc<dyn BusReceiver>,
}

/// Simple in-memory bus for tests and non-transport contexts.
///
/// Delivery happens on the sending thread once the registry lock is released,
/// so receivers are free to send or unregister from inside their callback.
pub struct LocalBus {
    registrations: parking_lot::RwLock<HashMap<ReceiverId, Registration>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    tap: broadcast::Sender<BusMessage>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self {
            registrations: parking_lot::RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            tap: broadcast::channel(64).0,
        }
    }
}

impl fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBus")
            .field("receivers", &self.receiver_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes every message sent on the bus, matched or not.
    pub fn tap(&self) -> broadcast::Receiver<BusMessage> {
        self.tap.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.registrations.read().len()
    }

    /// Rejects further sends and registrations and drops existing receivers.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.registrations.write().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.is_closed() {
            Err(BusError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Bus for LocalBus {
    fn register(
        &self,
        filter: MessageFilter,
        receiver: Arc<dyn BusReceiver>,
    ) -> BusResult<ReceiverId> {
        self.ensure_open()?;
        let id = ReceiverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(target = "bus.local", receiver = %id, filter = ?filter, "registered receiver");
        self.registrations
            .write()
            .insert(id, Registration { filter, receiver });
        Ok(id)
    }

    fn unregister(&self, id: ReceiverId) -> BusResult<()> {
        if self.registrations.write().remove(&id).is_none() {
            return Err(BusError::UnknownReceiver(id));
        }
        debug!(target = "bus.local", receiver = %id, "unregistered receiver");
        Ok(())
    }

    fn send(&self, message: BusMessage) -> BusResult<()> {
        self.ensure_open()?;
        let matched: Vec<Arc<dyn BusReceiver>> = {
            let guard = self.registrations.read();
            guard
                .values()
                .filter(|registration| registration.filter.matches(&message))
                .map(|registration| Arc::clone(&registration.receiver))
                .collect()
        };
        trace!(
            target = "bus.local",
            action = message.action().unwrap_or("<none>"),
            receivers = matched.len(),
            "delivering broadcast"
        );
        // no tap subscribers is fine
        let _ = self.tap.send(message.clone());
        for receiver in matched {
            receiver.on_receive(&message);
        }
        Ok(())
    }
}
