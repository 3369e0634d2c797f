use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

/// Application callbacks for scan outcomes.
pub trait ScanListener: Send + Sync {
    fn on_barcode_scanned(&self, payload: &str);
    fn on_error(&self, message: &str);
}

/// Adapts a pair of closures into a [`ScanListener`].
pub struct FnListener<S, E> {
    on_scanned: S,
    on_error: E,
}

impl<S, E> FnListener<S, E>
where
    S: Fn(&str) + Send + Sync,
    E: Fn(&str) + Send + Sync,
{
    pub fn new(on_scanned: S, on_error: E) -> Self {
        Self {
            on_scanned,
            on_error,
        }
    }
}

impl<S, E> ScanListener for FnListener<S, E>
where
    S: Fn(&str) + Send + Sync,
    E: Fn(&str) + Send + Sync,
{
    fn on_barcode_scanned(&self, payload: &str) {
        (self.on_scanned)(payload)
    }

    fn on_error(&self, message: &str) {
        (self.on_error)(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScanEvent {
    Scanned(String),
    Error(String),
}

/// Forwards listener callbacks as [`ScanEvent`]s to an async consumer.
#[derive(Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ScanEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScanEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ScanEvent) {
        if let Err(err) = self.tx.send(event) {
            trace!(target = "scan.listener", event = ?err.0, "scan event consumer gone");
        }
    }
}

impl ScanListener for ChannelListener {
    fn on_barcode_scanned(&self, payload: &str) {
        self.forward(ScanEvent::Scanned(payload.to_string()));
    }

    fn on_error(&self, message: &str) {
        self.forward(ScanEvent::Error(message.to_string()));
    }
}
