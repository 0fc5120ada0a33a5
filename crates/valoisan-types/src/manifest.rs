//! Extension manifest and install lifecycle types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// The extension's declared manifest (`manifest.json`).
///
/// Only the fields the relay reads are typed; everything else is kept in
/// [`extra`](ExtensionManifest::extra) so that `getManifest` can return
/// the manifest exactly as declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub manifest_version: u32,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtensionManifest {
    /// Create a minimal manifest.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            manifest_version: 3,
            name: name.into(),
            version: version.into(),
            description: None,
            extra: Map::new(),
        }
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The manifest as a JSON value, as returned by `runtime.getManifest()`.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Why the install hook fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    /// Fresh install.
    Install,
    /// Upgrade to a new extension version.
    Update,
    /// The browser itself was updated.
    #[serde(alias = "chrome_update")]
    BrowserUpdate,
    /// A shared module this extension depends on was updated.
    SharedModuleUpdate,
}

impl InstallReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallReason::Install => "install",
            InstallReason::Update => "update",
            InstallReason::BrowserUpdate => "browser_update",
            InstallReason::SharedModuleUpdate => "shared_module_update",
        }
    }
}

impl std::fmt::Display for InstallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of the install/upgrade lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallDetails {
    pub reason: InstallReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
}
