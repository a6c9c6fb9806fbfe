//! coedit-ot: operational transformation for collaborative documents.
//!
//! Provides the operation model, the path and operation transformers, the
//! per-document client concurrency control, and the pieces a host needs
//! around them: a JSON wire codec, a reference applier, an offline operation
//! store and a registry of open documents.
//!
//! # Example
//!
//! ```
//! use coedit_model::path;
//! use coedit_ot::{DiscreteOperation, Operation, OperationTransformer};
//!
//! let transformer = OperationTransformer::default();
//! let server: Operation = DiscreteOperation::string_insert(path!["title"], 0, "a").into();
//! let client: Operation = DiscreteOperation::string_insert(path!["title"], 0, "b").into();
//! let (_, client) = transformer.transform(&server, &client).unwrap();
//! assert_eq!(client, DiscreteOperation::string_insert(path!["title"], 1, "b").into());
//! ```

pub mod apply;
pub mod codec;
pub mod concurrency;
pub mod config;
pub mod events;
pub mod operation;
pub mod path_transform;
pub mod session;
pub mod store;
pub mod transform;

pub use apply::{apply, ApplyError};
pub use codec::CodecError;
pub use concurrency::{ClientConcurrencyControl, ConcurrencyError, Incoming, ProtocolViolation, StateError};
pub use config::{ConfigError, EngineConfig, Priority, TransformConfig};
pub use events::{
    ClientOperationEvent, OperationAcknowledgement, ProcessedOperationEvent, ServerOperationEvent,
    UnprocessedOperationEvent,
};
pub use operation::{CompoundOperation, DiscreteOperation, Operation, OperationError, OperationKind, TargetKind};
pub use path_transform::{transform_descendant_path, PathTransformation};
pub use session::{DocumentSessions, SessionError, SharedControl};
pub use store::{MemoryOperationStore, OperationStore, StoreError};
pub use transform::{OperationTransformer, TransformError};
