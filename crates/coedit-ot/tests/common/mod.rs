#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use coedit_model::DataValue;
use coedit_ot::{
    apply, ClientConcurrencyControl, ClientOperationEvent, DiscreteOperation, Incoming, Operation,
    OperationTransformer, ServerOperationEvent,
};
use serde_json::{json, Value};

pub const DOC_ID: &str = "doc";

pub fn doc(value: Value) -> DataValue {
    DataValue::from(value)
}

pub fn initial_doc() -> DataValue {
    doc(json!({
        "text": "hello",
        "list": ["a", "b", "c", "d"],
        "n": 0,
        "props": {"x": 1},
        "grid": [[1, 2, 3], [4, 5, 6]]
    }))
}

/// Apply `first` then `second` to a copy of `base`.
pub fn apply_both(base: &DataValue, first: &Operation, second: &Operation) -> DataValue {
    let mut out = base.clone();
    apply(&mut out, first).expect("first operation applies");
    apply(&mut out, second).expect("second operation applies");
    out
}

/// Transform a concurrent pair and check both application orders agree.
pub fn assert_converges(
    transformer: &OperationTransformer,
    base: &DataValue,
    server: DiscreteOperation,
    client: DiscreteOperation,
) -> (DataValue, Operation, Operation) {
    let server = Operation::from(server);
    let client = Operation::from(client);
    let (server2, client2) = transformer.transform(&server, &client).expect("transform succeeds");
    let left = apply_both(base, &server, &client2);
    let right = apply_both(base, &client, &server2);
    assert_eq!(left.to_json(), right.to_json(), "server {server:?} client {client:?}");
    (left, server2, client2)
}

/// Authoritative server: orders submissions and transforms each one past the
/// history the submitter had not seen.
///
/// A client may only submit once its previous submission was acknowledged;
/// the history after its context version must hold other clients' operations.
pub struct Server {
    pub doc: DataValue,
    pub history: Vec<Operation>,
    transformer: Arc<OperationTransformer>,
}

impl Server {
    pub fn new(doc: DataValue, transformer: Arc<OperationTransformer>) -> Self {
        Self {
            doc,
            history: Vec::new(),
            transformer,
        }
    }

    pub fn version(&self) -> u64 {
        self.history.len() as u64
    }

    pub fn submit(&mut self, event: &ClientOperationEvent) -> ServerOperationEvent {
        let mut op = event.operation.clone();
        for committed in &self.history[event.context_version as usize..] {
            let (_, transformed) = self.transformer.transform(committed, &op).expect("server transform");
            op = transformed;
        }
        apply(&mut self.doc, &op).expect("server apply");
        self.history.push(op.clone());
        ServerOperationEvent {
            doc_id: DOC_ID.to_string(),
            client_id: event.session_id.clone(),
            version: self.version(),
            timestamp: Utc::now(),
            operation: op,
        }
    }
}

/// A client: its local document, its concurrency control and its inbox.
pub struct Client {
    pub doc: DataValue,
    pub ccc: ClientConcurrencyControl,
    pub inbox: VecDeque<ServerOperationEvent>,
    pub outbox: VecDeque<ClientOperationEvent>,
}

impl Client {
    pub fn new(id: &str, doc: DataValue, transformer: Arc<OperationTransformer>) -> Self {
        Self {
            doc,
            ccc: ClientConcurrencyControl::new(DOC_ID, id, 0, transformer),
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
        }
    }

    /// Apply a local edit and queue it for sending.
    pub fn edit(&mut self, op: impl Into<Operation>) {
        let op = op.into();
        apply(&mut self.doc, &op).expect("local apply");
        if let Some(event) = self.ccc.process_outgoing_operation(op).expect("outgoing") {
            self.outbox.push_back(event);
        }
    }

    /// Process the oldest server broadcast, if any.
    pub fn receive_one(&mut self) -> Option<Incoming> {
        let event = self.inbox.pop_front()?;
        Some(self.ccc.process_incoming_operation(event).expect("incoming"))
    }

    /// Apply every transformed remote operation to the local document.
    pub fn drain(&mut self) {
        while let Some(event) = self.ccc.get_next_incoming_operation() {
            apply(&mut self.doc, &event.operation).expect("remote apply");
        }
    }

    pub fn settle(&mut self) {
        while self.receive_one().is_some() {}
        self.drain();
    }
}

/// Submit the oldest queued event of the first client that has one and
/// broadcast the result. Returns false when nothing was queued.
pub fn deliver_one(server: &mut Server, clients: &mut [Client]) -> bool {
    let Some(event) = clients.iter_mut().find_map(|c| c.outbox.pop_front()) else {
        return false;
    };
    let broadcast = server.submit(&event);
    for client in clients.iter_mut() {
        client.inbox.push_back(broadcast.clone());
    }
    true
}

/// Deliver every queued submission.
pub fn pump(server: &mut Server, clients: &mut [Client]) {
    while deliver_one(server, clients) {}
}

/// Deliver and settle until every client has caught up with the server.
pub fn quiesce(server: &mut Server, clients: &mut [Client]) {
    loop {
        pump(server, clients);
        for client in clients.iter_mut() {
            client.settle();
        }
        if clients.iter().all(|c| c.outbox.is_empty()) {
            break;
        }
    }
}
