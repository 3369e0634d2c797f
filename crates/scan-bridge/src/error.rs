use thiserror::Error;
use transport_bus::{BusError, ExtraError};

/// Faults raised while bridging scanner broadcasts. The `Display` text is what
/// listeners receive through `on_error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("No data received from scanner.")]
    NoData,
    #[error("Error processing barcode scan: {0}")]
    Extraction(#[from] ExtraError),
    #[error("Error triggering scan: {0}")]
    Trigger(#[source] BusError),
    #[error("Error registering receiver: {0}")]
    Register(#[source] BusError),
    #[error("Error registering receiver: receiver already registered")]
    AlreadyRegistered,
    #[error("Error unregistering receiver: {0}")]
    Unregister(#[source] BusError),
    #[error("Error unregistering receiver: receiver not registered")]
    NotRegistered,
}

pub type ScanResult<T> = Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("scanner profile field {0} must not be empty")]
    EmptyField(&'static str),
    #[error("invalid scanner profile document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_messages_carry_fault_detail() {
        assert_eq!(ScanError::NoData.to_string(), "No data received from scanner.");
        assert_eq!(
            ScanError::Trigger(BusError::Transport("radio offline".into())).to_string(),
            "Error triggering scan: bus transport error: radio offline"
        );
        assert_eq!(
            ScanError::Register(BusError::Closed).to_string(),
            "Error registering receiver: bus channel closed"
        );
    }
}
