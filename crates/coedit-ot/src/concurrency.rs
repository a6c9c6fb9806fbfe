//! Client-side concurrency control for one open document.
//!
//! Keeps three FIFO queues:
//!
//! - in-flight: local operations sent to the server and not yet acknowledged;
//! - the pending compound batch, while one is open;
//! - unapplied: remote operations already transformed against local state and
//!   waiting for the document layer to apply them.
//!
//! Every remote operation is transformed through the in-flight queue and the
//! pending batch before it is queued; every local operation is transformed
//! through the unapplied queue before it is sent. Fallible transitions compute
//! their new state first and only commit it once every transform succeeded.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::{
    ClientOperationEvent, OperationAcknowledgement, ProcessedOperationEvent, ServerOperationEvent,
};
use crate::operation::{CompoundOperation, DiscreteOperation, Operation};
use crate::transform::{OperationTransformer, TransformError};

/// The server broke an ordering guarantee. The session cannot continue and
/// must be reset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("acknowledgement received with no operation in flight")]
    UnexpectedAcknowledgement,
    #[error("acknowledgement for seq {received}, oldest in-flight operation is seq {expected}")]
    OutOfOrderAcknowledgement { expected: u64, received: u64 },
    #[error("version {received} skips ahead of expected version {expected}")]
    VersionGap { expected: u64, received: u64 },
    #[error("version {received} is already incorporated, expected version {expected}")]
    StaleVersion { expected: u64, received: u64 },
}

/// The caller used the compound API out of order. Engine state is untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("a compound operation is already in progress")]
    CompoundInProgress,
    #[error("no compound operation is in progress")]
    NoCompoundInProgress,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl ConcurrencyError {
    /// Fatal errors mean the causal ordering is broken and the session must
    /// be reset.
    pub fn is_fatal(&self) -> bool {
        match self {
            ConcurrencyError::Protocol(_) | ConcurrencyError::Transform(_) => true,
            ConcurrencyError::State(_) => false,
        }
    }
}

/// What [`ClientConcurrencyControl::process_incoming_operation`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming {
    /// The event echoed one of our own operations.
    Acknowledged { seq_no: u64 },
    /// A remote operation was transformed and queued for application.
    Queued,
}

type CommitListener = Box<dyn FnMut(bool) + Send + Sync>;

pub struct ClientConcurrencyControl {
    doc_id: String,
    session_id: String,
    transformer: Arc<OperationTransformer>,
    context_version: u64,
    next_seq_no: u64,
    inflight: VecDeque<(u64, Operation)>,
    pending_compound: Vec<DiscreteOperation>,
    compound_in_progress: bool,
    unapplied: VecDeque<ProcessedOperationEvent>,
    committed: bool,
    next_listener_id: u64,
    listeners: BTreeMap<u64, CommitListener>,
}

impl fmt::Debug for ClientConcurrencyControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConcurrencyControl")
            .field("doc_id", &self.doc_id)
            .field("session_id", &self.session_id)
            .field("context_version", &self.context_version)
            .field("next_seq_no", &self.next_seq_no)
            .field("inflight", &self.inflight.len())
            .field("pending_compound", &self.pending_compound.len())
            .field("compound_in_progress", &self.compound_in_progress)
            .field("unapplied", &self.unapplied.len())
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

impl ClientConcurrencyControl {
    pub fn new(
        doc_id: impl Into<String>,
        session_id: impl Into<String>,
        context_version: u64,
        transformer: Arc<OperationTransformer>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            session_id: session_id.into(),
            transformer,
            context_version,
            next_seq_no: 0,
            inflight: VecDeque::new(),
            pending_compound: Vec::new(),
            compound_in_progress: false,
            unapplied: VecDeque::new(),
            committed: true,
            next_listener_id: 1,
            listeners: BTreeMap::new(),
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn context_version(&self) -> u64 {
        self.context_version
    }

    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    pub fn has_next_incoming_operation(&self) -> bool {
        !self.unapplied.is_empty()
    }

    pub fn is_compound_operation_in_progress(&self) -> bool {
        self.compound_in_progress
    }

    /// True when every local operation has been acknowledged.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn on_commit_state_changed<F>(&mut self, listener: F) -> u64
    where
        F: FnMut(bool) + Send + Sync + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_commit_state_changed(&mut self, listener_id: u64) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    fn set_committed(&mut self, committed: bool) {
        if self.committed == committed {
            return;
        }
        self.committed = committed;
        debug!(doc_id = %self.doc_id, committed, "commit state changed");
        for listener in self.listeners.values_mut() {
            listener(committed);
        }
    }

    fn refresh_committed(&mut self) {
        let clean = self.inflight.is_empty() && self.pending_compound.is_empty();
        self.set_committed(clean);
    }

    pub fn start_compound_operation(&mut self) -> Result<(), ConcurrencyError> {
        if self.compound_in_progress {
            return Err(StateError::CompoundInProgress.into());
        }
        self.compound_in_progress = true;
        self.pending_compound.clear();
        debug!(doc_id = %self.doc_id, "compound operation started");
        Ok(())
    }

    /// Submit a locally applied operation.
    ///
    /// Returns the event to send, or `None` while a compound batch is open.
    pub fn process_outgoing_operation(
        &mut self,
        operation: Operation,
    ) -> Result<Option<ClientOperationEvent>, ConcurrencyError> {
        let mut operation = operation;
        let mut remotes = Vec::with_capacity(self.unapplied.len());
        for event in &self.unapplied {
            let (remote, local) = self.transformer.transform(&event.operation, &operation)?;
            remotes.push(remote);
            operation = local;
        }
        for (event, remote) in self.unapplied.iter_mut().zip(remotes) {
            event.operation = remote;
        }

        if self.compound_in_progress {
            self.pending_compound.extend(operation.discrete_ops().iter().cloned());
            debug!(
                doc_id = %self.doc_id,
                batch_len = self.pending_compound.len(),
                "operation added to compound batch"
            );
            self.set_committed(false);
            return Ok(None);
        }

        let event = self.send(operation);
        self.set_committed(false);
        Ok(Some(event))
    }

    pub fn complete_compound_operation(&mut self) -> Result<Option<ClientOperationEvent>, ConcurrencyError> {
        if !self.compound_in_progress {
            return Err(StateError::NoCompoundInProgress.into());
        }
        self.compound_in_progress = false;
        let ops = std::mem::take(&mut self.pending_compound);
        let Ok(compound) = CompoundOperation::new(ops) else {
            debug!(doc_id = %self.doc_id, "empty compound operation completed");
            return Ok(None);
        };
        Ok(Some(self.send(Operation::Compound(compound))))
    }

    /// Drop the open batch without sending it.
    pub fn abandon_compound_operation(&mut self) -> Result<Vec<DiscreteOperation>, ConcurrencyError> {
        if !self.compound_in_progress {
            return Err(StateError::NoCompoundInProgress.into());
        }
        self.compound_in_progress = false;
        let dropped = std::mem::take(&mut self.pending_compound);
        debug!(doc_id = %self.doc_id, dropped = dropped.len(), "compound operation abandoned");
        self.refresh_committed();
        Ok(dropped)
    }

    fn send(&mut self, operation: Operation) -> ClientOperationEvent {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        self.inflight.push_back((seq_no, operation.clone()));
        debug!(
            doc_id = %self.doc_id,
            seq_no,
            op = operation.type_name(),
            inflight = self.inflight.len(),
            "operation sent"
        );
        ClientOperationEvent {
            doc_id: self.doc_id.clone(),
            session_id: self.session_id.clone(),
            seq_no,
            context_version: self.context_version,
            timestamp: Utc::now(),
            operation,
        }
    }

    fn check_version(&self, version: u64) -> Result<(), ConcurrencyError> {
        let expected = self.context_version + 1;
        let violation = if version > expected {
            ProtocolViolation::VersionGap {
                expected,
                received: version,
            }
        } else if version < expected {
            ProtocolViolation::StaleVersion {
                expected,
                received: version,
            }
        } else {
            return Ok(());
        };
        warn!(doc_id = %self.doc_id, %violation, "rejecting server event");
        Err(violation.into())
    }

    /// Handle an operation broadcast by the server.
    ///
    /// An event authored by this session acknowledges the oldest in-flight
    /// operation; any other event is transformed and queued for application.
    pub fn process_incoming_operation(&mut self, event: ServerOperationEvent) -> Result<Incoming, ConcurrencyError> {
        self.check_version(event.version)?;

        if event.client_id == self.session_id {
            let Some((seq_no, _)) = self.inflight.pop_front() else {
                let violation = ProtocolViolation::UnexpectedAcknowledgement;
                warn!(doc_id = %self.doc_id, version = event.version, %violation, "rejecting server event");
                return Err(violation.into());
            };
            self.context_version = event.version;
            debug!(doc_id = %self.doc_id, seq_no, version = event.version, "operation acknowledged");
            self.refresh_committed();
            return Ok(Incoming::Acknowledged { seq_no });
        }

        let mut remote = event.operation;
        let mut inflight = Vec::with_capacity(self.inflight.len());
        for (seq_no, local) in &self.inflight {
            let (next, local) = self.transformer.transform(&remote, local)?;
            inflight.push((*seq_no, local));
            remote = next;
        }
        let mut pending = None;
        if !self.pending_compound.is_empty() {
            let batch = Operation::Compound(CompoundOperation::from_transformed(self.pending_compound.clone()));
            let (next, batch) = self.transformer.transform(&remote, &batch)?;
            pending = Some(batch.discrete_ops().to_vec());
            remote = next;
        }

        self.inflight = inflight.into();
        if let Some(pending) = pending {
            self.pending_compound = pending;
        }
        self.context_version = event.version;
        debug!(
            doc_id = %self.doc_id,
            client_id = %event.client_id,
            version = event.version,
            op = remote.type_name(),
            no_op = remote.is_no_op(),
            "remote operation queued"
        );
        self.unapplied.push_back(ProcessedOperationEvent {
            client_id: event.client_id,
            version: event.version,
            timestamp: event.timestamp,
            operation: remote,
        });
        Ok(Incoming::Queued)
    }

    /// Handle an explicit acknowledgement of one of this session's operations.
    pub fn process_acknowledgement(&mut self, ack: &OperationAcknowledgement) -> Result<(), ConcurrencyError> {
        let Some(&(expected, _)) = self.inflight.front() else {
            let violation = ProtocolViolation::UnexpectedAcknowledgement;
            warn!(doc_id = %self.doc_id, seq_no = ack.seq_no, %violation, "rejecting acknowledgement");
            return Err(violation.into());
        };
        if expected != ack.seq_no {
            let violation = ProtocolViolation::OutOfOrderAcknowledgement {
                expected,
                received: ack.seq_no,
            };
            warn!(doc_id = %self.doc_id, %violation, "rejecting acknowledgement");
            return Err(violation.into());
        }
        self.check_version(ack.version)?;

        self.inflight.pop_front();
        self.context_version = ack.version;
        debug!(doc_id = %self.doc_id, seq_no = ack.seq_no, version = ack.version, "operation acknowledged");
        self.refresh_committed();
        Ok(())
    }

    /// Dequeue the oldest transformed remote operation.
    pub fn get_next_incoming_operation(&mut self) -> Option<ProcessedOperationEvent> {
        self.unapplied.pop_front()
    }

    /// Drop all queued state and restart from `context_version`.
    ///
    /// Returns the operations that were never acknowledged, oldest first, for
    /// resubmission. An open compound batch is closed and returned last.
    pub fn reset(&mut self, context_version: u64) -> Vec<Operation> {
        let mut resubmit: Vec<Operation> = self.inflight.drain(..).map(|(_, op)| op).collect();
        let pending = std::mem::take(&mut self.pending_compound);
        if let Ok(compound) = CompoundOperation::new(pending) {
            resubmit.push(Operation::Compound(compound));
        }
        self.compound_in_progress = false;
        self.unapplied.clear();
        self.context_version = context_version;
        debug!(
            doc_id = %self.doc_id,
            context_version,
            resubmit = resubmit.len(),
            "concurrency control reset"
        );
        self.refresh_committed();
        resubmit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;
    use coedit_model::path;
    use std::sync::Mutex;

    fn ccc() -> ClientConcurrencyControl {
        ClientConcurrencyControl::new("doc", "me", 0, Arc::new(OperationTransformer::default()))
    }

    fn remote(version: u64, op: DiscreteOperation) -> ServerOperationEvent {
        ServerOperationEvent {
            doc_id: "doc".into(),
            client_id: "other".into(),
            version,
            timestamp: Utc::now(),
            operation: op.into(),
        }
    }

    fn echo(version: u64) -> ServerOperationEvent {
        ServerOperationEvent {
            client_id: "me".into(),
            ..remote(version, DiscreteOperation::number_delta(path!["n"], 0.0))
        }
    }

    fn ack(seq_no: u64, version: u64) -> OperationAcknowledgement {
        OperationAcknowledgement {
            doc_id: "doc".into(),
            seq_no,
            version,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn outgoing_operations_get_increasing_seq_numbers() {
        let mut ccc = ccc();
        for expected in 0..3 {
            let event = ccc
                .process_outgoing_operation(DiscreteOperation::number_delta(path!["n"], 1.0).into())
                .unwrap()
                .unwrap();
            assert_eq!(event.seq_no, expected);
            assert_eq!(event.context_version, 0);
        }
        assert_eq!(ccc.inflight_len(), 3);
    }

    #[test]
    fn nested_compound_is_a_state_error() {
        let mut ccc = ccc();
        ccc.start_compound_operation().unwrap();
        let err = ccc.start_compound_operation().unwrap_err();
        assert_eq!(err, ConcurrencyError::State(StateError::CompoundInProgress));
        assert!(!err.is_fatal());
        assert!(ccc.is_compound_operation_in_progress());
    }

    #[test]
    fn completing_without_start_is_a_state_error() {
        let err = ccc().complete_compound_operation().unwrap_err();
        assert_eq!(err, ConcurrencyError::State(StateError::NoCompoundInProgress));
    }

    #[test]
    fn empty_compound_sends_nothing() {
        let mut ccc = ccc();
        ccc.start_compound_operation().unwrap();
        assert_eq!(ccc.complete_compound_operation().unwrap(), None);
        assert_eq!(ccc.inflight_len(), 0);
        assert!(ccc.is_committed());
    }

    #[test]
    fn ack_without_inflight_is_fatal() {
        let mut ccc = ccc();
        let err = ccc.process_incoming_operation(echo(1)).unwrap_err();
        assert_eq!(err, ConcurrencyError::Protocol(ProtocolViolation::UnexpectedAcknowledgement));
        assert!(err.is_fatal());
        assert_eq!(ccc.context_version(), 0);
    }

    #[test]
    fn version_must_follow_context() {
        let mut ccc = ccc();
        let op = DiscreteOperation::number_delta(path!["n"], 1.0);
        let err = ccc.process_incoming_operation(remote(3, op.clone())).unwrap_err();
        assert_eq!(
            err,
            ConcurrencyError::Protocol(ProtocolViolation::VersionGap { expected: 1, received: 3 })
        );
        ccc.process_incoming_operation(remote(1, op.clone())).unwrap();
        let err = ccc.process_incoming_operation(remote(1, op)).unwrap_err();
        assert_eq!(
            err,
            ConcurrencyError::Protocol(ProtocolViolation::StaleVersion { expected: 2, received: 1 })
        );
    }

    #[test]
    fn out_of_order_ack_is_rejected() {
        let mut ccc = ccc();
        for _ in 0..2 {
            ccc.process_outgoing_operation(DiscreteOperation::number_delta(path!["n"], 1.0).into())
                .unwrap();
        }
        let err = ccc.process_acknowledgement(&ack(1, 1)).unwrap_err();
        assert_eq!(
            err,
            ConcurrencyError::Protocol(ProtocolViolation::OutOfOrderAcknowledgement { expected: 0, received: 1 })
        );
        ccc.process_acknowledgement(&ack(0, 1)).unwrap();
        ccc.process_acknowledgement(&ack(1, 2)).unwrap();
        assert_eq!(ccc.context_version(), 2);
        assert!(ccc.is_committed());
    }

    #[test]
    fn remote_operation_is_transformed_through_inflight() {
        let mut ccc = ccc();
        ccc.process_outgoing_operation(DiscreteOperation::string_insert(path!["t"], 0, "ab").into())
            .unwrap();
        let outcome = ccc
            .process_incoming_operation(remote(1, DiscreteOperation::string_insert(path!["t"], 1, "X")))
            .unwrap();
        assert_eq!(outcome, Incoming::Queued);
        let processed = ccc.get_next_incoming_operation().unwrap();
        assert_eq!(
            processed.operation.as_discrete().unwrap().kind,
            OperationKind::StringInsert {
                index: 3,
                value: "X".into()
            }
        );
        assert_eq!(ccc.get_next_incoming_operation(), None);
    }

    #[test]
    fn outgoing_operation_is_transformed_through_unapplied() {
        let mut ccc = ccc();
        ccc.process_incoming_operation(remote(1, DiscreteOperation::array_insert(path!["l"], 0, "r")))
            .unwrap();
        let event = ccc
            .process_outgoing_operation(DiscreteOperation::array_remove(path!["l"], 0).into())
            .unwrap()
            .unwrap();
        assert_eq!(event.context_version, 1);
        assert_eq!(
            event.operation.as_discrete().unwrap().kind,
            OperationKind::ArrayRemove { index: 1 }
        );
        // An insert before the removed element is unaffected by it.
        let queued = ccc.get_next_incoming_operation().unwrap();
        assert_eq!(
            queued.operation.as_discrete().unwrap().kind,
            OperationKind::ArrayInsert {
                index: 0,
                value: "r".into()
            }
        );
    }

    #[test]
    fn failed_transform_leaves_state_untouched() {
        let mut ccc = ccc();
        ccc.process_outgoing_operation(DiscreteOperation::string_insert(path!["x"], 0, "a").into())
            .unwrap();
        let err = ccc
            .process_incoming_operation(remote(1, DiscreteOperation::array_remove(path!["x"], 0)))
            .unwrap_err();
        assert!(matches!(err, ConcurrencyError::Transform(_)));
        assert_eq!(ccc.context_version(), 0);
        assert_eq!(ccc.inflight_len(), 1);
        assert!(!ccc.has_next_incoming_operation());
    }

    #[test]
    fn commit_listeners_see_dirty_and_clean_transitions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut ccc = ccc();
        let sink = Arc::clone(&seen);
        let id = ccc.on_commit_state_changed(move |committed| sink.lock().unwrap().push(committed));

        for _ in 0..2 {
            ccc.process_outgoing_operation(DiscreteOperation::number_delta(path!["n"], 1.0).into())
                .unwrap();
        }
        ccc.process_incoming_operation(echo(1)).unwrap();
        ccc.process_incoming_operation(echo(2)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);

        assert!(ccc.off_commit_state_changed(id));
        ccc.process_outgoing_operation(DiscreteOperation::number_delta(path!["n"], 1.0).into())
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(!ccc.is_committed());
    }

    #[test]
    fn reset_returns_unacknowledged_operations() {
        let mut ccc = ccc();
        let a: Operation = DiscreteOperation::number_delta(path!["n"], 1.0).into();
        let b = DiscreteOperation::boolean_set(path!["b"], true);
        ccc.process_outgoing_operation(a.clone()).unwrap();
        ccc.start_compound_operation().unwrap();
        ccc.process_outgoing_operation(b.clone().into()).unwrap();

        let resubmit = ccc.reset(7);
        assert_eq!(resubmit.len(), 2);
        assert_eq!(resubmit[0], a);
        assert_eq!(resubmit[1].discrete_ops(), &[b]);
        assert_eq!(ccc.context_version(), 7);
        assert_eq!(ccc.inflight_len(), 0);
        assert!(!ccc.is_compound_operation_in_progress());
        assert!(ccc.is_committed());
    }
}
