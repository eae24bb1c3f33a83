//! Fire-and-forget notifications.

use crate::request::{Envelope, Params};
use crate::types::Version;
use crate::value::JsonValue;

/// A request-shaped message with no id. No response is ever sent or
/// expected for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub version: Version,
    pub method: String,
    pub params: Option<Params>,
}

impl Notification {
    pub fn new(version: Version, method: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            version,
            method: method.into(),
            params: params.filter(|p| !p.is_empty()),
        }
    }

    /// Get a parameter by name (if params are named)
    pub fn get_param(&self, name: &str) -> Option<&JsonValue> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are positional)
    pub fn get_param_index(&self, index: usize) -> Option<&JsonValue> {
        self.params.as_ref()?.get_index(index)
    }
}

impl From<Notification> for Envelope {
    fn from(notification: Notification) -> Self {
        Envelope {
            version: notification.version,
            id: None,
            method: notification.method,
            params: notification.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_wire_shape_has_null_id() {
        let envelope: Envelope = Notification::new(
            Version::V2,
            "log",
            Some(Params::Positional(vec![JsonValue::from("hello")])),
        )
        .into();
        let json = String::from_utf8(envelope.to_wire().unwrap()).unwrap();
        assert!(json.contains(r#""id":null"#));
        assert!(json.contains(r#""method":"log""#));
    }
}
