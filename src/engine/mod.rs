pub mod document;
pub mod ident;
pub mod materialize;
pub mod service;
pub mod storage;

pub use document::{collection_name, Document, Record};
pub use service::DataService;
pub use storage::{FileStorage, MemoryStorage, Storage};
