use crate::constants::messages::VALIDATION_ERROR;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Uniform result of every tool and every backend call.
///
/// A successful envelope carries the operation's payload under its own key
/// (`statuses`, `ticket`, `sync_result`, ...); a failed one carries `error`
/// instead. Composite tools append further context keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            fields: Map::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: None,
            fields: Map::new(),
        }
    }

    /// Outcome of a multi-step tool. Carries no `error`; the aggregate's own
    /// keys say which steps failed.
    pub fn aggregate(success: bool) -> Self {
        Self {
            success,
            error: None,
            message: None,
            fields: Map::new(),
        }
    }

    /// Local argument check failed; nothing was sent to the backend.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::failure(VALIDATION_ERROR).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The named payload, only on success.
    pub fn payload(&self, key: &str) -> Option<&Value> {
        if self.success {
            self.fields.get(key)
        } else {
            None
        }
    }

    pub fn into_value(self) -> Value {
        let mut out = Map::new();
        out.insert("success".to_string(), Value::Bool(self.success));
        if let Some(error) = self.error {
            out.insert("error".to_string(), Value::String(error));
        }
        if let Some(message) = self.message {
            out.insert("message".to_string(), Value::String(message));
        }
        for (key, value) in self.fields {
            out.insert(key, value);
        }
        Value::Object(out)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        envelope.into_value()
    }
}
