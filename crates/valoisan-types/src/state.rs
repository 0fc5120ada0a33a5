//! The persisted user preference record.
//!
//! Stored as a flat camelCase JSON object in two places: canonical
//! extension storage and a legacy page-local mirror. Renaming any field
//! here invalidates previously stored user state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Canonical extension-storage key for the preference record.
pub const CANONICAL_STATE_KEY: &str = "state";

/// Legacy page-local storage key.
///
/// DANGER: changing this value invalidates state for ALL extension users.
pub const LEGACY_STATE_KEY: &str = "___valoisan_state";

/// User preferences for the current page session.
///
/// Every field is optional. Keys this version does not know about are
/// kept in [`extra`](PreferenceState::extra) and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Whether the side pane is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane_visible: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_campaign_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_filter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_shown: Option<bool>,

    /// Onboarding step counter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Receive all messages, not only those matching the contact filter.
    /// Defaults to `true` at load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_all: Option<bool>,

    /// Unrecognized keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire names of the typed fields, in declaration order.
const KNOWN_FIELDS: &[&str] = &[
    "token",
    "baseUrl",
    "paneVisible",
    "currentCampaignId",
    "contactFilter",
    "dialogShown",
    "onboarding",
    "userEmail",
    "disabled",
    "receiveAll",
];

impl PreferenceState {
    /// Parse a stored record.
    ///
    /// `null` is an empty record. A known key whose value is `null` or does
    /// not fit the typed field is kept in `extra` as stored, so one odd
    /// value never costs the rest of the record. Non-objects are rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self::from_map(map)),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    fn from_map(mut map: Map<String, Value>) -> Self {
        let mut misfits = Map::new();
        for &key in KNOWN_FIELDS {
            let misfit = map
                .get(key)
                .is_some_and(|value| value.is_null() || !Self::field_fits(key, value));
            if misfit && let Some((key, value)) = map.remove_entry(key) {
                misfits.insert(key, value);
            }
        }

        let mut state: Self = serde_json::from_value(Value::Object(map)).unwrap_or_default();
        state.extra.extend(misfits);
        state
    }

    fn field_fits(key: &str, value: &Value) -> bool {
        let mut single = Map::new();
        single.insert(key.to_owned(), value.clone());
        serde_json::from_value::<Self>(Value::Object(single)).is_ok()
    }

    /// Parse a record from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Serialize to a JSON object.
    ///
    /// A typed field that is set wins over an `extra` entry of the same
    /// name.
    pub fn to_value(&self) -> Result<Value> {
        let typed = Self {
            extra: Map::new(),
            ..self.clone()
        };
        let mut value = serde_json::to_value(typed)?;
        if let Value::Object(map) = &mut value {
            for (key, extra) in &self.extra {
                map.entry(key.clone()).or_insert_with(|| extra.clone());
            }
        }
        Ok(value)
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    /// Whether the record has no entries at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply load-time defaults: `receiveAll` becomes `true` when absent.
    pub fn apply_defaults(&mut self) {
        if self.receive_all.is_none() {
            self.receive_all = Some(true);
        }
    }
}

/// Whether a stored record counts as empty: `null`, or an object with no
/// entries. Keys with `null` values still count.
pub fn is_empty_record(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
