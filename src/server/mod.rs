/// TCP server implementation for the Pipedesk Store daemon.
///
/// This module provides the [`Router`] which handles incoming TCP connections
/// and dispatches commands to the underlying store.
pub mod router;

pub use router::Router;
