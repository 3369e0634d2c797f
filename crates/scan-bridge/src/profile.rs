use std::env;

use serde::{Deserialize, Serialize};
use transport_bus::CATEGORY_DEFAULT;

use crate::error::ProfileError;

pub const DEFAULT_RESULT_ACTION: &str = "com.example.myprofile.SCAN";
pub const DEFAULT_PAYLOAD_KEY: &str = "com.symbol.datawedge.data_string";
pub const DEFAULT_TRIGGER_ACTION: &str = "com.symbol.datawedge.api.ACTION";
pub const DEFAULT_TRIGGER_KEY: &str = "com.symbol.datawedge.api.SOFT_SCAN_TRIGGER";

/// Protocol constants a scanner integration expects, resolved once and
/// shared by the trigger, the subscription and the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerProfile {
    /// Action a result broadcast must carry.
    pub result_action: String,
    /// Extras key holding the decoded payload.
    pub payload_key: String,
    /// Action of the scan-start request.
    pub trigger_action: String,
    /// Extras key naming the trigger command.
    pub trigger_key: String,
    /// Category added to the result filter.
    pub category: String,
}

impl Default for ScannerProfile {
    fn default() -> Self {
        Self {
            result_action: DEFAULT_RESULT_ACTION.to_string(),
            payload_key: DEFAULT_PAYLOAD_KEY.to_string(),
            trigger_action: DEFAULT_TRIGGER_ACTION.to_string(),
            trigger_key: DEFAULT_TRIGGER_KEY.to_string(),
            category: CATEGORY_DEFAULT.to_string(),
        }
    }
}

impl ScannerProfile {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a profile from `SCAN_BRIDGE_*` values, falling back to the
    /// DataWedge defaults for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            result_action: lookup("SCAN_BRIDGE_RESULT_ACTION").unwrap_or(defaults.result_action),
            payload_key: lookup("SCAN_BRIDGE_PAYLOAD_KEY").unwrap_or(defaults.payload_key),
            trigger_action: lookup("SCAN_BRIDGE_TRIGGER_ACTION")
                .unwrap_or(defaults.trigger_action),
            trigger_key: lookup("SCAN_BRIDGE_TRIGGER_KEY").unwrap_or(defaults.trigger_key),
            category: lookup("SCAN_BRIDGE_CATEGORY").unwrap_or(defaults.category),
        }
    }

    pub fn from_json(document: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(document)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let fields = [
            ("result_action", &self.result_action),
            ("payload_key", &self.payload_key),
            ("trigger_action", &self.trigger_action),
            ("trigger_key", &self.trigger_key),
            ("category", &self.category),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ProfileError::EmptyField(*name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("SCAN_BRIDGE_RESULT_ACTION", "acme.scan.RESULT"),
            ("SCAN_BRIDGE_PAYLOAD_KEY", "acme.data"),
        ]
        .into_iter()
        .collect();

        let profile = ScannerProfile::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(profile.result_action, "acme.scan.RESULT");
        assert_eq!(profile.payload_key, "acme.data");
        assert_eq!(profile.trigger_action, DEFAULT_TRIGGER_ACTION);
        assert_eq!(profile.category, CATEGORY_DEFAULT);
    }

    #[test]
    fn json_documents_fill_missing_fields() {
        let profile = ScannerProfile::from_json(r#"{"result_action": "acme.scan.RESULT"}"#)
            .expect("valid profile");
        assert_eq!(profile.result_action, "acme.scan.RESULT");
        assert_eq!(profile.trigger_key, DEFAULT_TRIGGER_KEY);
    }

    #[test]
    fn empty_fields_are_rejected() {
        let err = ScannerProfile::from_json(r#"{"payload_key": "  "}"#).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyField("payload_key")));

        let err = ScannerProfile::from_json("not json").unwrap_err();
        assert!(matches!(err, ProfileError::Parse(_)));
    }
}
