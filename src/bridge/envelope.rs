//! Wire envelopes exchanged with peers.
//!
//! Outbound requests and inbound replies are JSON objects. The correlation
//! identifier travels in the `ResponseID` field in both directions.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Field carrying the correlation identifier.
pub const RESPONSE_ID_FIELD: &str = "ResponseID";

/// Correlation identifier for one round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponseId(String);

impl ResponseId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResponseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of an inbound HTTP request, as forwarded to a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestMetadata {
    #[serde(rename = "RequestMethod")]
    pub method: String,
    /// Path only, without the query string.
    #[serde(rename = "FullURL")]
    pub path: String,
    #[serde(rename = "RequestBody")]
    pub body: String,
    #[serde(rename = "RequestHeaders")]
    pub headers: BTreeMap<String, String>,
}

/// Outbound message to a peer. Opaque to the correlation engine apart from
/// the `ResponseID` stamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestEnvelope {
    fields: Map<String, Value>,
}

impl RequestEnvelope {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Serialize a copy of this envelope with `id` stamped in.
    /// Any `ResponseID` already present is overwritten.
    pub fn stamped(&self, id: &ResponseId) -> String {
        let mut fields = self.fields.clone();
        fields.insert(RESPONSE_ID_FIELD.to_string(), Value::String(id.to_string()));
        Value::Object(fields).to_string()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<RequestMetadata> for RequestEnvelope {
    fn from(meta: RequestMetadata) -> Self {
        // A struct of strings always serializes to an object.
        let fields = match serde_json::to_value(meta) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        Self { fields }
    }
}

/// Reasons an inbound message cannot be routed.
#[derive(Debug, Error)]
pub enum MalformedReply {
    #[error("reply is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("reply is not a JSON object")]
    NotObject,

    #[error("reply has no string `ResponseID` field")]
    MissingResponseId,
}

/// Inbound reply from a peer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyEnvelope {
    response_id: ResponseId,
    body: Map<String, Value>,
}

impl ReplyEnvelope {
    /// Parse a raw frame into a routable reply.
    pub fn parse(raw: &[u8]) -> Result<Self, MalformedReply> {
        let body = match serde_json::from_slice::<Value>(raw)? {
            Value::Object(map) => map,
            _ => return Err(MalformedReply::NotObject),
        };

        let response_id = body
            .get(RESPONSE_ID_FIELD)
            .and_then(Value::as_str)
            .map(ResponseId::from)
            .ok_or(MalformedReply::MissingResponseId)?;

        Ok(Self { response_id, body })
    }

    pub fn response_id(&self) -> &ResponseId {
        &self.response_id
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// The full reply object, `ResponseID` included.
    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamped_envelope_carries_metadata_and_id() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let envelope = RequestEnvelope::from(RequestMetadata {
            method: "POST".into(),
            path: "/api/orders".into(),
            body: "{\"hello\":\"world\"}".into(),
            headers,
        });

        let id = ResponseId::from("abc-123");
        let value: Value = serde_json::from_str(&envelope.stamped(&id)).unwrap();

        assert_eq!(value["RequestMethod"], "POST");
        assert_eq!(value["FullURL"], "/api/orders");
        assert_eq!(value["RequestBody"], "{\"hello\":\"world\"}");
        assert_eq!(value["RequestHeaders"]["content-type"], "application/json");
        assert_eq!(value[RESPONSE_ID_FIELD], "abc-123");
        assert_eq!(value.as_object().map(Map::len), Some(5));
    }

    #[test]
    fn stamping_leaves_the_envelope_untouched() {
        let envelope = RequestEnvelope::default();
        let _ = envelope.stamped(&ResponseId::generate());
        assert!(envelope.fields().get(RESPONSE_ID_FIELD).is_none());
    }

    #[test]
    fn parse_rejects_unroutable_replies() {
        assert!(matches!(ReplyEnvelope::parse(b"Status check!"), Err(MalformedReply::NotJson(_))));
        assert!(matches!(ReplyEnvelope::parse(b"[1, 2]"), Err(MalformedReply::NotObject)));
        assert!(matches!(ReplyEnvelope::parse(b"{\"a\":1}"), Err(MalformedReply::MissingResponseId)));
        assert!(matches!(
            ReplyEnvelope::parse(b"{\"ResponseID\":42}"),
            Err(MalformedReply::MissingResponseId)
        ));
    }

    #[test]
    fn parse_keeps_the_whole_reply() {
        let reply = ReplyEnvelope::parse(br#"{"ResponseID":"r-1","status":"ok"}"#).unwrap();
        assert_eq!(reply.response_id().as_str(), "r-1");
        assert_eq!(reply.body()["status"], "ok");
        assert_eq!(reply.into_body()[RESPONSE_ID_FIELD], "r-1");
    }
}
