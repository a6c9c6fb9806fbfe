//! Registry of the documents a client session has open.
//!
//! Each document gets its own [`ClientConcurrencyControl`] behind a mutex, so
//! events for one document are serialized while different documents can be
//! processed on different threads. All documents share one transformer.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

use crate::concurrency::{ClientConcurrencyControl, StateError};
use crate::config::EngineConfig;
use crate::transform::OperationTransformer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("document {0} is already open")]
    AlreadyOpen(String),
    #[error("document {0} is not open")]
    NotOpen(String),
    #[error(transparent)]
    State(#[from] StateError),
}

pub type SharedControl = Arc<Mutex<ClientConcurrencyControl>>;

#[derive(Debug)]
pub struct DocumentSessions {
    session_id: String,
    transformer: Arc<OperationTransformer>,
    documents: RwLock<HashMap<String, SharedControl>>,
}

impl DocumentSessions {
    pub fn new(session_id: impl Into<String>, config: &EngineConfig) -> Self {
        Self::with_transformer(session_id, Arc::new(OperationTransformer::new(&config.transform)))
    }

    pub fn with_transformer(session_id: impl Into<String>, transformer: Arc<OperationTransformer>) -> Self {
        Self {
            session_id: session_id.into(),
            transformer,
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transformer(&self) -> &Arc<OperationTransformer> {
        &self.transformer
    }

    /// Start tracking `doc_id` at `context_version`.
    pub fn open(&self, doc_id: &str, context_version: u64) -> Result<SharedControl, SessionError> {
        let mut documents = self.documents.write();
        if documents.contains_key(doc_id) {
            return Err(SessionError::AlreadyOpen(doc_id.to_string()));
        }
        let control = Arc::new(Mutex::new(ClientConcurrencyControl::new(
            doc_id,
            self.session_id.clone(),
            context_version,
            Arc::clone(&self.transformer),
        )));
        documents.insert(doc_id.to_string(), Arc::clone(&control));
        debug!(doc_id, context_version, "document opened");
        Ok(control)
    }

    pub fn get(&self, doc_id: &str) -> Option<SharedControl> {
        self.documents.read().get(doc_id).cloned()
    }

    pub fn is_open(&self, doc_id: &str) -> bool {
        self.documents.read().contains_key(doc_id)
    }

    pub fn open_documents(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop tracking `doc_id` and discard its state.
    ///
    /// Refuses while a compound batch is open. Returns how many in-flight
    /// operations were dropped.
    ///
    /// The document's mutex is taken before the registry lock and the
    /// registry is never held while waiting for a document, so other
    /// documents can be opened and closed meanwhile. The caller must not
    /// hold the guard of `doc_id` itself.
    pub fn close(&self, doc_id: &str) -> Result<usize, SessionError> {
        let control = self
            .get(doc_id)
            .ok_or_else(|| SessionError::NotOpen(doc_id.to_string()))?;
        let guard = control.lock();
        if guard.is_compound_operation_in_progress() {
            return Err(StateError::CompoundInProgress.into());
        }
        let dropped = guard.inflight_len();
        {
            let mut documents = self.documents.write();
            match documents.get(doc_id) {
                Some(current) if Arc::ptr_eq(current, &control) => {
                    documents.remove(doc_id);
                }
                _ => return Err(SessionError::NotOpen(doc_id.to_string())),
            }
        }
        drop(guard);

        if dropped > 0 {
            warn!(doc_id, dropped, "document closed with operations in flight");
        } else {
            debug!(doc_id, "document closed");
        }
        Ok(dropped)
    }
}
