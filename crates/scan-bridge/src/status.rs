use tracing::info;

/// Receives human-readable status lines. Purely observational.
pub trait StatusSink: Send + Sync {
    fn show(&self, status: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn show(&self, status: &str) {
        (self)(status)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn show(&self, status: &str) {
        info!(target = "scan.status", "{status}");
    }
}
