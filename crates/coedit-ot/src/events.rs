//! Messages exchanged with the transport layer.

use chrono::{DateTime, Utc};

use crate::operation::Operation;

/// An operation authored by this session, ready to send to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOperationEvent {
    pub doc_id: String,
    pub session_id: String,
    /// Position in this session's submission order, starting at 0.
    pub seq_no: u64,
    /// The document version the operation was computed against.
    pub context_version: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}

/// An operation committed by the server, as broadcast to every session.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerOperationEvent {
    pub doc_id: String,
    /// Session that authored the operation.
    pub client_id: String,
    /// Document version after applying the operation.
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}

/// A server operation that has not been transformed against local state yet.
pub type UnprocessedOperationEvent = ServerOperationEvent;

/// Server confirmation that one of this session's operations was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationAcknowledgement {
    pub doc_id: String,
    pub seq_no: u64,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
}

/// A remote operation transformed against local state, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedOperationEvent {
    pub client_id: String,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
}
