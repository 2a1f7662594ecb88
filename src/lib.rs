//! Pipedesk Store is the flat-file record store behind the Pipedesk CRM.
//!
//! All CRM state (contacts, companies, deals, tickets, activities, users)
//! lives in one pretty-printed JSON document. Every operation loads the whole
//! document, mutates a single collection, and writes the whole document back.
//! The file doubles as a human-readable fixture that can be inspected and
//! diffed in version control, which is why key order and record field order
//! survive a round trip untouched.
//!
//! There is no locking around the load-mutate-save cycle. Two concurrent
//! writers race, and the last save wins wholesale. That is the documented
//! baseline behavior of the store, not an accident.
//!
//! ## Core Components
//! - [`engine`]: The document model, storage backends, and the record service.
//! - [`sdk`]: Client libraries for both embedded and remote (TCP) modes.
//! - [`server`]: TCP daemon implementation.

pub mod engine;
pub mod sdk;
pub mod server;

use async_trait::async_trait;
use thiserror::Error;

pub use engine::document::{Document, Record};

/// Errors returned by the Pipedesk Store.
#[derive(Error, Debug)]
pub enum Error {
    /// The backing document could not be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// The backing document exists but is not a well-formed record document.
    #[error("corrupt document: {0}")]
    CorruptDocument(String),
    /// The resolved collection does not exist in the document.
    #[error("collection {0} not found")]
    CollectionNotFound(String),
    /// No record with the given id exists in the resolved collection.
    #[error("{entity_type} with id {id} not found")]
    RecordNotFound { entity_type: String, id: String },
    /// A caller-supplied company id collides with an existing record.
    #[error("company with id {0} already exists")]
    DuplicateId(String),
    /// The request is missing a required field.
    #[error("{0}")]
    Validation(String),
    /// An I/O error occurred during network communication.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for Pipedesk Store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Operator id stamped into records that arrive without an owner or assignee.
pub const DEFAULT_OPERATOR: &str = "admin";

/// Defines read access to the document.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Returns the entire document, verbatim.
    async fn fetch(&self) -> Result<Document>;
}

/// Defines the mutating record operations of the store.
#[async_trait]
pub trait RecordMutator: Send + Sync {
    /// Creates a record of the given entity type and returns it with its
    /// allocated id and defaults filled in.
    async fn create(&self, entity_type: &str, fields: Record) -> Result<Record>;
    /// Merges `fields` over the record with the given id and returns the
    /// updated record.
    async fn update(&self, entity_type: &str, id: &str, fields: Record) -> Result<Record>;
    /// Removes the record with the given id from its collection.
    async fn delete(&self, entity_type: &str, id: &str) -> Result<()>;
}

/// The primary interface for interacting with the Pipedesk Store.
///
/// Implemented by both the embedded [`engine::DataService`] and the remote
/// [`sdk::Client`], so callers can stay deployment-agnostic.
#[async_trait]
pub trait RecordStore: DocumentReader + RecordMutator {
    /// Returns an [`EntityScope`] that simplifies operations by pinning an
    /// entity type.
    fn entity(&self, entity_type: &str) -> Box<dyn EntityScope + '_>;
}

/// A simplified, scoped interface for a single entity type.
#[async_trait]
pub trait EntityScope: Send + Sync {
    /// Returns every record of the scoped collection, empty when the
    /// collection is absent.
    async fn records(&self) -> Result<Vec<Record>>;
    /// Creates a record in the scoped collection.
    async fn create(&self, fields: Record) -> Result<Record>;
    /// Updates the record with the given id in the scoped collection.
    async fn update(&self, id: &str, fields: Record) -> Result<Record>;
    /// Deletes the record with the given id from the scoped collection.
    async fn delete(&self, id: &str) -> Result<()>;
}
