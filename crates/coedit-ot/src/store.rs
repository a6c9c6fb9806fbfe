//! Offline persistence of operations.
//!
//! Local operations are kept until the server acknowledges them so a session
//! can resubmit them after reconnecting; server operations form the committed
//! history of each document.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::events::{ClientOperationEvent, ServerOperationEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {doc_id} already has an operation at version {version}")]
    DuplicateVersion { doc_id: String, version: u64 },
}

pub trait OperationStore {
    /// Record an operation sent by this client and not yet acknowledged.
    fn put_local(&mut self, doc_id: &str, event: &ClientOperationEvent) -> Result<(), StoreError>;

    /// Forget a local operation once the server acknowledged it. Returns
    /// whether it was stored.
    fn remove_local(&mut self, doc_id: &str, session_id: &str, seq_no: u64) -> Result<bool, StoreError>;

    /// Unacknowledged local operations, ordered by session then seq no.
    fn local_operations(&self, doc_id: &str) -> Result<Vec<ClientOperationEvent>, StoreError>;

    /// Record a committed server operation.
    fn put_server(&mut self, doc_id: &str, event: &ServerOperationEvent) -> Result<(), StoreError>;

    /// Committed operations with `version >= from_version`, in version order.
    fn server_operations(&self, doc_id: &str, from_version: u64) -> Result<Vec<ServerOperationEvent>, StoreError>;

    /// Highest committed version stored for the document.
    fn latest_version(&self, doc_id: &str) -> Result<Option<u64>, StoreError>;
}

type LocalKey = (String, String, u64);
type ServerKey = (String, u64);

/// In-memory [`OperationStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryOperationStore {
    local: BTreeMap<LocalKey, ClientOperationEvent>,
    server: BTreeMap<ServerKey, ServerOperationEvent>,
}

impl MemoryOperationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OperationStore for MemoryOperationStore {
    fn put_local(&mut self, doc_id: &str, event: &ClientOperationEvent) -> Result<(), StoreError> {
        self.local.insert(
            (doc_id.to_string(), event.session_id.clone(), event.seq_no),
            event.clone(),
        );
        Ok(())
    }

    fn remove_local(&mut self, doc_id: &str, session_id: &str, seq_no: u64) -> Result<bool, StoreError> {
        Ok(self
            .local
            .remove(&(doc_id.to_string(), session_id.to_string(), seq_no))
            .is_some())
    }

    fn local_operations(&self, doc_id: &str) -> Result<Vec<ClientOperationEvent>, StoreError> {
        Ok(self
            .local
            .iter()
            .filter(|((doc, _, _), _)| doc == doc_id)
            .map(|(_, event)| event.clone())
            .collect())
    }

    fn put_server(&mut self, doc_id: &str, event: &ServerOperationEvent) -> Result<(), StoreError> {
        let key = (doc_id.to_string(), event.version);
        if self.server.contains_key(&key) {
            return Err(StoreError::DuplicateVersion {
                doc_id: doc_id.to_string(),
                version: event.version,
            });
        }
        self.server.insert(key, event.clone());
        Ok(())
    }

    fn server_operations(&self, doc_id: &str, from_version: u64) -> Result<Vec<ServerOperationEvent>, StoreError> {
        Ok(self
            .server
            .range((doc_id.to_string(), from_version)..=(doc_id.to_string(), u64::MAX))
            .map(|(_, event)| event.clone())
            .collect())
    }

    fn latest_version(&self, doc_id: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .server
            .range((doc_id.to_string(), 0)..=(doc_id.to_string(), u64::MAX))
            .next_back()
            .map(|((_, version), _)| *version))
    }
}
