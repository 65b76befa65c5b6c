//! Sync frame model and protobuf codec for the player-view channel.
//!
//! This crate owns the wire representation shared by the scene engine (which
//! produces frames), the server relay (which forwards them) and the player
//! view (which consumes them). Payloads stay flexible (`serde_json::Value`)
//! while travelling as protobuf for compact binary transport.
//!
//! The channel is one-way: the DM side pushes, viewers never acknowledge.
//! Ordering is carried by `seq`, so a viewer can drop anything older than
//! what it already applied.

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full scene snapshot pushed from the DM view to player views.
pub const SCENE_SYNC: &str = "scene:sync";

/// Sent by a player view right after connecting.
pub const VIEWER_HELLO: &str = "viewer:hello";

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireFrame`.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The frame decoded but carries no syscall.
    #[error("frame has an empty syscall")]
    MissingSyscall,
}

/// A single message on the sync channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this frame.
    pub id: String,
    /// Sender-local sequence number; strictly increasing per sender.
    pub seq: u64,
    /// Milliseconds since the Unix epoch when the frame was created.
    pub ts: i64,
    /// Sender label (`"dm"`, `"player"`), if any.
    pub from: Option<String>,
    /// Namespaced operation name, e.g. `"scene:sync"`.
    pub syscall: String,
    /// Arbitrary JSON payload.
    pub data: Value,
}

impl Frame {
    /// Build a frame. The caller supplies id and timestamp so this crate stays
    /// free of clock and RNG dependencies (the engine also runs in wasm).
    pub fn new(id: impl Into<String>, seq: u64, ts: i64, syscall: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), seq, ts, from: None, syscall: syscall.into(), data }
    }

    /// Attach a sender label.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// The namespace part of the syscall (`"scene"` for `"scene:sync"`).
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.syscall.split(':').next().unwrap_or_default()
    }

    /// Whether this frame carries a full scene snapshot.
    #[must_use]
    pub fn is_scene_sync(&self) -> bool {
        self.syscall == SCENE_SYNC
    }
}

/// Encode a frame into protobuf bytes.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = frame_to_wire(frame);

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a growable Vec cannot hit `BufferTooSmall`.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::MissingSyscall`] when the frame has no syscall.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    if wire.syscall.is_empty() {
        return Err(CodecError::MissingSyscall);
    }
    Ok(wire_to_frame(wire))
}

fn frame_to_wire(frame: &Frame) -> WireFrame {
    WireFrame {
        id: frame.id.clone(),
        seq: frame.seq,
        ts: frame.ts,
        from: frame.from.clone(),
        syscall: frame.syscall.clone(),
        data: Some(json_to_proto_value(&frame.data)),
    }
}

fn wire_to_frame(wire: WireFrame) -> Frame {
    Frame {
        id: wire.id,
        seq: wire.seq,
        ts: wire.ts,
        from: wire.from,
        syscall: wire.syscall,
        data: wire
            .data
            .map_or(Value::Object(Map::new()), |v| proto_to_json_value(&v)),
    }
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(i32::from(prost_types::NullValue::NullValue)),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(v) => Kind::ListValue(prost_types::ListValue { values: v.iter().map(json_to_proto_value).collect() }),
        Value::Object(v) => Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        Kind::NullValue(_) => Value::Null,
        Kind::NumberValue(v) => number_to_json(*v),
        Kind::StringValue(v) => Value::String(v.clone()),
        Kind::BoolValue(v) => Value::Bool(*v),
        Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        Kind::ListValue(v) => Value::Array(v.values.iter().map(proto_to_json_value).collect()),
    }
}

/// Protobuf numbers are all doubles. Integral values come back as JSON
/// integers so grid coordinates and HP deserialize into integer fields.
#[allow(clippy::cast_possible_truncation)]
fn number_to_json(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
        return Value::from(v as i64);
    }
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(uint64, tag = "2")]
    seq: u64,
    #[prost(int64, tag = "3")]
    ts: i64,
    #[prost(string, optional, tag = "4")]
    from: Option<String>,
    #[prost(string, tag = "5")]
    syscall: String,
    #[prost(message, optional, tag = "6")]
    data: Option<prost_types::Value>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
