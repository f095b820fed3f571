//! Response envelopes of the list endpoints

use serde_json::Value;

/// Body shape returned by a list endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum ListEnvelope {
    /// `{ "results": [...] }`
    Paged(Vec<Value>),
    /// A bare JSON array
    Bare(Vec<Value>),
    /// Anything else
    Unrecognized,
}

impl ListEnvelope {
    pub fn parse(body: Value) -> Self {
        match body {
            Value::Array(items) => Self::Bare(items),
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(items)) => Self::Paged(items),
                _ => Self::Unrecognized,
            },
            _ => Self::Unrecognized,
        }
    }

    /// Items of a `/logs` response; only the paged envelope is accepted
    pub fn into_log_items(self) -> Vec<Value> {
        match self {
            Self::Paged(items) => items,
            Self::Bare(_) | Self::Unrecognized => Vec::new(),
        }
    }

    /// Items of a `/call` response, paged or bare
    pub fn into_call_items(self) -> Vec<Value> {
        match self {
            Self::Paged(items) | Self::Bare(items) => items,
            Self::Unrecognized => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelopes() {
        let paged = ListEnvelope::parse(json!({"results": [{"id": "c1"}], "metadata": {}}));
        assert_eq!(paged.clone().into_log_items().len(), 1);
        assert_eq!(paged.into_call_items().len(), 1);

        let bare = ListEnvelope::parse(json!([{"id": "c1"}, {"id": "c2"}]));
        assert!(bare.clone().into_log_items().is_empty());
        assert_eq!(bare.into_call_items().len(), 2);

        let odd = ListEnvelope::parse(json!({"results": "nope"}));
        assert_eq!(odd, ListEnvelope::Unrecognized);
        assert!(odd.into_call_items().is_empty());
    }
}
