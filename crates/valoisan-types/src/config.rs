//! Relay configuration schema.
//!
//! Field names are snake_case; the config loader normalizes camelCase
//! keys before deserialization, and `#[serde(alias)]` accepts camelCase
//! when a value is deserialized directly. Unknown fields are ignored.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::state::{CANONICAL_STATE_KEY, LEGACY_STATE_KEY};

/// Page opened on a fresh install.
pub const DEFAULT_ONBOARDING_URL: &str = "./install.html";

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_canonical_state_key() -> String {
    CANONICAL_STATE_KEY.into()
}

fn default_legacy_state_key() -> String {
    LEGACY_STATE_KEY.into()
}

fn default_onboarding_url() -> String {
    DEFAULT_ONBOARDING_URL.into()
}

fn default_true() -> bool {
    true
}

/// Root configuration for the relay, state store and DOM helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// How long a correlator call waits for its reply.
    #[serde(default = "default_call_timeout_ms", alias = "callTimeoutMs")]
    pub call_timeout_ms: u64,

    /// Polling interval of the DOM wait helpers.
    #[serde(default = "default_poll_interval_ms", alias = "pollIntervalMs")]
    pub poll_interval_ms: u64,

    /// Default timeout of the DOM wait helpers.
    #[serde(default = "default_wait_timeout_ms", alias = "waitTimeoutMs")]
    pub wait_timeout_ms: u64,

    /// Canonical extension-storage key of the preference record.
    #[serde(default = "default_canonical_state_key", alias = "canonicalStateKey")]
    pub canonical_state_key: String,

    /// Page-local legacy mirror key of the preference record.
    #[serde(default = "default_legacy_state_key", alias = "legacyStateKey")]
    pub legacy_state_key: String,

    /// Page opened on a fresh install.
    #[serde(default = "default_onboarding_url", alias = "onboardingUrl")]
    pub onboarding_url: String,

    /// Attach a correlation id to every call.
    ///
    /// Disable only to talk to a background that predates correlation ids
    /// and rejects unknown fields.
    #[serde(default = "default_true", alias = "correlationIds")]
    pub correlation_ids: bool,

    /// Location of the on-disk canonical store used by native hosts.
    #[serde(default, alias = "storePath")]
    pub store_path: Option<PathBuf>,

    /// Location of `manifest.json` used by native hosts.
    #[serde(default, alias = "manifestPath")]
    pub manifest_path: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: default_call_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
            canonical_state_key: default_canonical_state_key(),
            legacy_state_key: default_legacy_state_key(),
            onboarding_url: default_onboarding_url(),
            correlation_ids: true,
            store_path: None,
            manifest_path: None,
        }
    }
}

impl RelayConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Reject values that would make the relay misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(RelayError::ConfigInvalid {
                reason: "poll_interval_ms must be greater than zero".into(),
            });
        }
        if self.call_timeout_ms == 0 {
            return Err(RelayError::ConfigInvalid {
                reason: "call_timeout_ms must be greater than zero".into(),
            });
        }
        if self.canonical_state_key.is_empty() || self.legacy_state_key.is_empty() {
            return Err(RelayError::ConfigInvalid {
                reason: "state keys must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.wait_timeout(), Duration::from_secs(10));
        assert_eq!(config.canonical_state_key, "state");
        assert_eq!(config.legacy_state_key, "___valoisan_state");
        assert_eq!(config.onboarding_url, "./install.html");
        assert!(config.correlation_ids);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_object_yields_defaults() {
        let config: RelayConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.call_timeout_ms, 10_000);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn accepts_both_key_styles() {
        let config: RelayConfig = serde_json::from_value(json!({
            "callTimeoutMs": 250,
            "poll_interval_ms": 20,
            "storePath": "/tmp/valoisan.json",
            "somethingNew": true
        }))
        .unwrap();
        assert_eq!(config.call_timeout_ms, 250);
        assert_eq!(config.poll_interval_ms, 20);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/valoisan.json")));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = RelayConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RelayError::ConfigInvalid { .. })
        ));
    }
}
