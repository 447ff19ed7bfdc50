//! The `{ok, result}` response envelope

use serde::Deserialize;
use serde_json::Value;

/// Wire-level wrapper every botstat.io response uses.
///
/// The shape of `result` depends on the endpoint: a typed record on
/// success, an error payload when `ok` is `false`, sometimes absent.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<Value>,
}

impl Envelope {
    /// Decode the `result` value into a typed record.
    ///
    /// An absent `result` decodes as JSON `null`, so records with only
    /// optional fields still deserialize.
    ///
    /// # Errors
    /// Returns an error if `result` does not match the target shape.
    pub fn decode<T: serde::de::DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.result.unwrap_or(Value::Null))
    }

    /// Extract the human-readable message from a failed envelope's `result`.
    ///
    /// Returns `None` when `result` is absent or matches none of the known
    /// payload shapes; callers fall back to the raw response text.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let payload: ErrorPayload =
            serde_json::from_value(self.result.clone()?).ok()?;
        Some(match payload {
            ErrorPayload::Object { message } => message,
            ErrorPayload::Text(text) => text,
        })
    }
}

/// Shapes the service uses for the `result` field of a failed envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    /// `{"result": {"message": "..."}}`
    Object { message: String },
    /// `{"result": "..."}`
    Text(String),
}
