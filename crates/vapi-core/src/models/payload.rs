//! Upstream payload variants
//!
//! The call platform hands out two shapes of call data: entries from the
//! `/logs` endpoint, which nest the interesting fields under `requestBody`
//! and `responseBody`, and entries from the `/call` list endpoint (also what
//! webhooks deliver), which are flatter. A payload is only constructed once
//! a recognizable call identifier has been found in it.

use serde_json::Value;

/// Which upstream shape a payload came in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVariant {
    /// `/logs` entry
    Log,
    /// `/call` entry or webhook delivery
    Call,
}

impl PayloadVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Call => "call",
        }
    }
}

/// A call-shaped upstream payload with its resolved identifier
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamPayload {
    Log { id: String, body: Value },
    Call { id: String, body: Value },
}

impl UpstreamPayload {
    /// Accept a `/logs` entry carrying `callId` or `id`
    pub fn from_log(body: Value) -> Option<Self> {
        let id = identifier(body.get("callId")).or_else(|| identifier(body.get("id")))?;
        Some(Self::Log { id, body })
    }

    /// Accept a `/call` entry or webhook body carrying `id`.
    ///
    /// Only `id` qualifies the entry, but a `callId` next to it is the key,
    /// so the record merges with the same call seen through `/logs`.
    pub fn from_call(body: Value) -> Option<Self> {
        let generic = identifier(body.get("id"))?;
        let id = identifier(body.get("callId")).unwrap_or(generic);
        Some(Self::Call { id, body })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Log { id, .. } | Self::Call { id, .. } => id,
        }
    }

    pub fn variant(&self) -> PayloadVariant {
        match self {
            Self::Log { .. } => PayloadVariant::Log,
            Self::Call { .. } => PayloadVariant::Call,
        }
    }

    pub fn into_body(self) -> Value {
        match self {
            Self::Log { body, .. } | Self::Call { body, .. } => body,
        }
    }
}

/// A usable identifier: a non-empty string, or a number rendered as text
pub fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_prefers_call_id() {
        let payload = UpstreamPayload::from_log(json!({"callId": "c1", "id": "log-9"})).unwrap();
        assert_eq!(payload.id(), "c1");
        assert_eq!(payload.variant(), PayloadVariant::Log);

        let payload = UpstreamPayload::from_log(json!({"callId": "", "id": "log-9"})).unwrap();
        assert_eq!(payload.id(), "log-9");
    }

    #[test]
    fn test_entries_without_identifier_are_rejected() {
        assert!(UpstreamPayload::from_log(json!({"type": "Call"})).is_none());
        assert!(UpstreamPayload::from_log(json!("not an object")).is_none());
        assert!(UpstreamPayload::from_call(json!({"callId": "c1"})).is_none());
        assert!(UpstreamPayload::from_call(json!({"id": null})).is_none());
    }

    #[test]
    fn test_call_entry_prefers_call_id_when_present() {
        let payload =
            UpstreamPayload::from_call(json!({"id": "row-7", "callId": "c1", "assistantId": "A1"}))
                .unwrap();
        assert_eq!(payload.id(), "c1");
        assert_eq!(payload.variant(), PayloadVariant::Call);

        let payload = UpstreamPayload::from_call(json!({"id": "row-7", "callId": ""})).unwrap();
        assert_eq!(payload.id(), "row-7");
    }

    #[test]
    fn test_numeric_identifier() {
        let payload = UpstreamPayload::from_call(json!({"id": 42})).unwrap();
        assert_eq!(payload.id(), "42");
        assert_eq!(payload.variant().as_str(), "call");
    }
}
