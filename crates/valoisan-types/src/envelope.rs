//! The message envelope -- the only wire structure of the relay.
//!
//! Every message is a flat JSON object with a required `action` string.
//! Payload fields (`state`, `manifest`, ...) are merged at the top level,
//! not nested. Requests issued by the correlator additionally carry a
//! `correlationId` which the background echoes on its reply.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};

/// Name of the action field.
pub const ACTION_FIELD: &str = "action";

/// Name of the correlation id field.
pub const CORRELATION_FIELD: &str = "correlationId";

/// Suffix appended to a request action to form its reply action.
pub const RESPONSE_SUFFIX: &str = ":response";

/// Build the reply action for a request action: `"<action>:response"`.
pub fn response_action(action: &str) -> String {
    format!("{action}{RESPONSE_SUFFIX}")
}

/// A single relay message: `{ "action": string, ...fields }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation tag. For replies this is `"<request action>:response"`.
    pub action: String,

    /// Correlation id generated by the caller, echoed on the reply.
    ///
    /// Absent on messages produced by legacy peers. A non-string id is
    /// read as absent.
    #[serde(
        rename = "correlationId",
        default,
        deserialize_with = "string_or_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<String>,

    /// Payload fields, merged at the top level of the JSON object.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn string_or_absent<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => Some(id),
        _ => None,
    })
}

impl Envelope {
    /// Create an envelope with no payload.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            correlation_id: None,
            fields: Map::new(),
        }
    }

    /// Create an envelope and merge `data` into its top level.
    ///
    /// Keys named `action` or `correlationId` inside `data` are dropped:
    /// the envelope's own tags always win.
    pub fn with_data(action: impl Into<String>, data: Option<Map<String, Value>>) -> Self {
        let mut envelope = Self::new(action);
        if let Some(data) = data {
            for (key, value) in data {
                if key != ACTION_FIELD && key != CORRELATION_FIELD {
                    envelope.fields.insert(key, value);
                }
            }
        }
        envelope
    }

    /// Builder: set a single payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != ACTION_FIELD && key != CORRELATION_FIELD {
            self.fields.insert(key, value);
        }
        self
    }

    /// Builder: attach a correlation id.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Build the reply to this envelope.
    ///
    /// The reply action is `"<action>:response"` and the correlation id,
    /// if any, is echoed.
    pub fn reply(&self) -> Envelope {
        Envelope {
            action: response_action(&self.action),
            correlation_id: self.correlation_id.clone(),
            fields: Map::new(),
        }
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Remove and return a payload field.
    pub fn take_field(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// The request action this envelope answers, if it is a reply.
    pub fn responds_to(&self) -> Option<&str> {
        self.action.strip_suffix(RESPONSE_SUFFIX)
    }

    /// Whether this envelope is the reply to a call of `action`.
    ///
    /// When the reply carries a correlation id it must equal
    /// `correlation_id`. Replies without one match on the action alone.
    pub fn is_reply_to(&self, action: &str, correlation_id: Option<&str>) -> bool {
        if self.responds_to() != Some(action) {
            return false;
        }
        match (self.correlation_id.as_deref(), correlation_id) {
            (Some(theirs), Some(ours)) => theirs == ours,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Parse an envelope from an arbitrary JSON value.
    ///
    /// Fails unless the value is an object whose `action` is a string.
    pub fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Object(map) => match map.get(ACTION_FIELD) {
                Some(Value::String(_)) => Ok(serde_json::from_value(value)?),
                Some(_) => Err(RelayError::InvalidEnvelope {
                    reason: "action is not a string".into(),
                }),
                None => Err(RelayError::InvalidEnvelope {
                    reason: "missing action".into(),
                }),
            },
            _ => Err(RelayError::InvalidEnvelope {
                reason: "not a JSON object".into(),
            }),
        }
    }

    /// Parse an envelope from its JSON text form.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialize to JSON text (the custom-event detail encoding).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
