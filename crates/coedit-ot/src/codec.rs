//! JSON codec for operations and transport events.
//!
//! A discrete operation is an object with a `type` tag, a `path` array and
//! the payload fields of its kind; `noOp` is only written when set. A
//! compound operation is `{"type": "compound", "ops": [...]}`. Path elements
//! are strings (keys), non-negative integers (indices) or `[row, col]` pairs.

use chrono::{DateTime, Utc};
use coedit_model::{DataValue, Path, PathElement};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::events::{ClientOperationEvent, OperationAcknowledgement, ServerOperationEvent};
use crate::operation::{CompoundOperation, DiscreteOperation, Operation, OperationError, OperationKind};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("unknown operation type: {0}")]
    UnknownType(String),
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Path helpers ──────────────────────────────────────────────────────────

fn encode_path(path: &Path) -> Value {
    Value::Array(
        path.iter()
            .map(|el| match el {
                PathElement::Key(k) => Value::String(k.clone()),
                PathElement::Index(i) => json!(i),
                PathElement::Table(row, col) => json!([row, col]),
            })
            .collect(),
    )
}

fn decode_index(v: &Value) -> Option<usize> {
    v.as_u64().and_then(|n| usize::try_from(n).ok())
}

fn decode_path_element(v: &Value) -> Result<PathElement, CodecError> {
    match v {
        Value::String(s) => Ok(PathElement::Key(s.clone())),
        Value::Number(_) => decode_index(v)
            .map(PathElement::Index)
            .ok_or_else(|| CodecError::InvalidOperation(format!("bad path index {v}"))),
        Value::Array(pair) if pair.len() == 2 => match (decode_index(&pair[0]), decode_index(&pair[1])) {
            (Some(row), Some(col)) => Ok(PathElement::Table(row, col)),
            _ => Err(CodecError::InvalidOperation(format!("bad table cell {v}"))),
        },
        _ => Err(CodecError::InvalidOperation(format!("bad path element {v}"))),
    }
}

fn decode_path(v: &Value) -> Result<Path, CodecError> {
    let arr = v
        .as_array()
        .ok_or_else(|| CodecError::InvalidOperation("path must be an array".into()))?;
    arr.iter().map(decode_path_element).collect()
}

fn encode_date(d: &DateTime<Utc>) -> Value {
    Value::String(d.to_rfc3339())
}

fn decode_date(v: &Value) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(v.as_str()?)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize a discrete operation.
pub fn discrete_to_json(op: &DiscreteOperation) -> Value {
    let mut m = Map::new();
    m.insert("type".into(), json!(op.type_name()));
    m.insert("path".into(), encode_path(&op.path));
    if op.no_op {
        m.insert("noOp".into(), json!(true));
    }
    match &op.kind {
        OperationKind::StringInsert { index, value } | OperationKind::StringRemove { index, value } => {
            m.insert("index".into(), json!(index));
            m.insert("value".into(), json!(value));
        }
        OperationKind::StringSet { value } => {
            m.insert("value".into(), json!(value));
        }
        OperationKind::ArrayInsert { index, value } | OperationKind::ArrayReplace { index, value } => {
            m.insert("index".into(), json!(index));
            m.insert("value".into(), value.to_json());
        }
        OperationKind::ArrayRemove { index } => {
            m.insert("index".into(), json!(index));
        }
        OperationKind::ArrayMove { from, to } => {
            m.insert("from".into(), json!(from));
            m.insert("to".into(), json!(to));
        }
        OperationKind::ArraySet { value } => {
            m.insert("value".into(), Value::Array(value.iter().map(DataValue::to_json).collect()));
        }
        OperationKind::ObjectAddProperty { prop, value } | OperationKind::ObjectSetProperty { prop, value } => {
            m.insert("prop".into(), json!(prop));
            m.insert("value".into(), value.to_json());
        }
        OperationKind::ObjectRemoveProperty { prop } => {
            m.insert("prop".into(), json!(prop));
        }
        OperationKind::ObjectSet { value } => {
            m.insert(
                "value".into(),
                Value::Object(value.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            );
        }
        OperationKind::NumberDelta { delta } => {
            m.insert("delta".into(), json!(delta));
        }
        OperationKind::NumberSet { value } => {
            m.insert("value".into(), json!(value));
        }
        OperationKind::BooleanSet { value } => {
            m.insert("value".into(), json!(value));
        }
        OperationKind::DateSet { value } => {
            m.insert("value".into(), encode_date(value));
        }
    }
    Value::Object(m)
}

/// Serialize an operation.
pub fn to_json(op: &Operation) -> Value {
    match op {
        Operation::Discrete(op) => discrete_to_json(op),
        Operation::Compound(op) => json!({
            "type": "compound",
            "ops": op.ops().iter().map(discrete_to_json).collect::<Vec<_>>()
        }),
    }
}

pub fn client_event_to_json(event: &ClientOperationEvent) -> Value {
    json!({
        "docId": event.doc_id,
        "sessionId": event.session_id,
        "seqNo": event.seq_no,
        "contextVersion": event.context_version,
        "timestamp": encode_date(&event.timestamp),
        "operation": to_json(&event.operation)
    })
}

pub fn server_event_to_json(event: &ServerOperationEvent) -> Value {
    json!({
        "docId": event.doc_id,
        "clientId": event.client_id,
        "version": event.version,
        "timestamp": encode_date(&event.timestamp),
        "operation": to_json(&event.operation)
    })
}

pub fn acknowledgement_to_json(ack: &OperationAcknowledgement) -> Value {
    json!({
        "docId": ack.doc_id,
        "seqNo": ack.seq_no,
        "version": ack.version,
        "timestamp": encode_date(&ack.timestamp)
    })
}

// ── Deserialization ───────────────────────────────────────────────────────

fn required<'a>(obj: &'a Map<String, Value>, key: &str, op: &str) -> Result<&'a Value, CodecError> {
    obj.get(key)
        .ok_or_else(|| CodecError::InvalidOperation(format!("{op} requires '{key}'")))
}

fn required_index(obj: &Map<String, Value>, key: &str, op: &str) -> Result<usize, CodecError> {
    decode_index(required(obj, key, op)?)
        .ok_or_else(|| CodecError::InvalidOperation(format!("{op} '{key}' must be a non-negative integer")))
}

fn required_str(obj: &Map<String, Value>, key: &str, op: &str) -> Result<String, CodecError> {
    required(obj, key, op)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CodecError::InvalidOperation(format!("{op} '{key}' must be a string")))
}

fn required_f64(obj: &Map<String, Value>, key: &str, op: &str) -> Result<f64, CodecError> {
    required(obj, key, op)?
        .as_f64()
        .ok_or_else(|| CodecError::InvalidOperation(format!("{op} '{key}' must be a number")))
}

/// Deserialize a discrete operation.
pub fn discrete_from_json(v: &Value) -> Result<DiscreteOperation, CodecError> {
    let obj = v
        .as_object()
        .ok_or_else(|| CodecError::InvalidOperation("operation must be an object".into()))?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::InvalidOperation("missing 'type' field".into()))?;
    let path = decode_path(required(obj, "path", ty)?)?;
    let no_op = obj.get("noOp").and_then(Value::as_bool).unwrap_or(false);

    let kind = match ty {
        "string_insert" => OperationKind::StringInsert {
            index: required_index(obj, "index", ty)?,
            value: required_str(obj, "value", ty)?,
        },
        "string_remove" => OperationKind::StringRemove {
            index: required_index(obj, "index", ty)?,
            value: required_str(obj, "value", ty)?,
        },
        "string_set" => OperationKind::StringSet {
            value: required_str(obj, "value", ty)?,
        },
        "array_insert" => OperationKind::ArrayInsert {
            index: required_index(obj, "index", ty)?,
            value: DataValue::from_json(required(obj, "value", ty)?),
        },
        "array_remove" => OperationKind::ArrayRemove {
            index: required_index(obj, "index", ty)?,
        },
        "array_replace" => OperationKind::ArrayReplace {
            index: required_index(obj, "index", ty)?,
            value: DataValue::from_json(required(obj, "value", ty)?),
        },
        "array_move" => OperationKind::ArrayMove {
            from: required_index(obj, "from", ty)?,
            to: required_index(obj, "to", ty)?,
        },
        "array_set" => {
            let arr = required(obj, "value", ty)?
                .as_array()
                .ok_or_else(|| CodecError::InvalidOperation("array_set 'value' must be an array".into()))?;
            OperationKind::ArraySet {
                value: arr.iter().map(DataValue::from_json).collect(),
            }
        }
        "object_add_property" => OperationKind::ObjectAddProperty {
            prop: required_str(obj, "prop", ty)?,
            value: DataValue::from_json(required(obj, "value", ty)?),
        },
        "object_set_property" => OperationKind::ObjectSetProperty {
            prop: required_str(obj, "prop", ty)?,
            value: DataValue::from_json(required(obj, "value", ty)?),
        },
        "object_remove_property" => OperationKind::ObjectRemoveProperty {
            prop: required_str(obj, "prop", ty)?,
        },
        "object_set" => {
            let map = required(obj, "value", ty)?
                .as_object()
                .ok_or_else(|| CodecError::InvalidOperation("object_set 'value' must be an object".into()))?;
            OperationKind::ObjectSet {
                value: map
                    .iter()
                    .map(|(k, v)| (k.clone(), DataValue::from_json(v)))
                    .collect(),
            }
        }
        "number_delta" => OperationKind::NumberDelta {
            delta: required_f64(obj, "delta", ty)?,
        },
        "number_set" => OperationKind::NumberSet {
            value: required_f64(obj, "value", ty)?,
        },
        "boolean_set" => OperationKind::BooleanSet {
            value: required(obj, "value", ty)?
                .as_bool()
                .ok_or_else(|| CodecError::InvalidOperation("boolean_set 'value' must be a boolean".into()))?,
        },
        "date_set" => OperationKind::DateSet {
            value: decode_date(required(obj, "value", ty)?)
                .ok_or_else(|| CodecError::InvalidOperation("date_set 'value' must be an RFC 3339 date".into()))?,
        },
        other => return Err(CodecError::UnknownType(other.to_string())),
    };

    Ok(DiscreteOperation { path, no_op, kind })
}

/// Deserialize an operation.
pub fn from_json(v: &Value) -> Result<Operation, CodecError> {
    if v.get("type").and_then(Value::as_str) != Some("compound") {
        return discrete_from_json(v).map(Operation::Discrete);
    }
    let ops = v
        .get("ops")
        .and_then(Value::as_array)
        .ok_or_else(|| CodecError::InvalidOperation("compound requires 'ops' array".into()))?;
    let ops = ops.iter().map(discrete_from_json).collect::<Result<Vec<_>, _>>()?;
    Ok(Operation::Compound(CompoundOperation::new(ops)?))
}

/// Parse an operation from JSON text.
pub fn from_str(s: &str) -> Result<Operation, CodecError> {
    from_json(&serde_json::from_str(s)?)
}

fn event_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a Value, CodecError> {
    obj.get(key)
        .ok_or_else(|| CodecError::InvalidEvent(format!("missing '{key}'")))
}

fn event_str(obj: &Map<String, Value>, key: &str) -> Result<String, CodecError> {
    event_field(obj, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CodecError::InvalidEvent(format!("'{key}' must be a string")))
}

fn event_u64(obj: &Map<String, Value>, key: &str) -> Result<u64, CodecError> {
    event_field(obj, key)?
        .as_u64()
        .ok_or_else(|| CodecError::InvalidEvent(format!("'{key}' must be a non-negative integer")))
}

fn event_timestamp(obj: &Map<String, Value>) -> Result<DateTime<Utc>, CodecError> {
    decode_date(event_field(obj, "timestamp")?)
        .ok_or_else(|| CodecError::InvalidEvent("'timestamp' must be an RFC 3339 date".into()))
}

fn event_object(v: &Value) -> Result<&Map<String, Value>, CodecError> {
    v.as_object()
        .ok_or_else(|| CodecError::InvalidEvent("event must be an object".into()))
}

pub fn client_event_from_json(v: &Value) -> Result<ClientOperationEvent, CodecError> {
    let obj = event_object(v)?;
    Ok(ClientOperationEvent {
        doc_id: event_str(obj, "docId")?,
        session_id: event_str(obj, "sessionId")?,
        seq_no: event_u64(obj, "seqNo")?,
        context_version: event_u64(obj, "contextVersion")?,
        timestamp: event_timestamp(obj)?,
        operation: from_json(event_field(obj, "operation")?)?,
    })
}

pub fn server_event_from_json(v: &Value) -> Result<ServerOperationEvent, CodecError> {
    let obj = event_object(v)?;
    Ok(ServerOperationEvent {
        doc_id: event_str(obj, "docId")?,
        client_id: event_str(obj, "clientId")?,
        version: event_u64(obj, "version")?,
        timestamp: event_timestamp(obj)?,
        operation: from_json(event_field(obj, "operation")?)?,
    })
}

pub fn acknowledgement_from_json(v: &Value) -> Result<OperationAcknowledgement, CodecError> {
    let obj = event_object(v)?;
    Ok(OperationAcknowledgement {
        doc_id: event_str(obj, "docId")?,
        seq_no: event_u64(obj, "seqNo")?,
        version: event_u64(obj, "version")?,
        timestamp: event_timestamp(obj)?,
    })
}
