use std::env;
use std::sync::Arc;

use crate::engine::{DataService, FileStorage};
use crate::sdk::Client;
use crate::{RecordStore, Result};

/// Initializes a [`RecordStore`] based on the environment.
///
/// `new` automatically detects whether to connect to a remote daemon or
/// open the data file directly:
///
/// 1. If the `PIPEDESK_ADDR` environment variable is set, it attempts to
///    connect to that address in **Remote Mode**.
/// 2. Otherwise, it initializes a [`DataService`] over [`FileStorage`] at
///    `data_path` in **Embedded Mode**, seeding an empty document when the
///    file does not exist yet. `PIPEDESK_OPERATOR` overrides the operator
///    id stamped into unowned records.
///
/// # Examples
///
/// ```no_run
/// use pipedesk_store::sdk;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = sdk::new("data/crm.json").await?;
///     Ok(())
/// }
/// ```
pub async fn new(data_path: &str) -> Result<Arc<dyn RecordStore>> {
    if let Ok(addr) = env::var("PIPEDESK_ADDR") {
        if !addr.is_empty() {
            match Client::connect(&addr).await {
                Ok(client) => return Ok(Arc::new(client)),
                Err(e) => {
                    log::warn!("Could not reach {}, falling back to embedded mode: {}", addr, e);
                }
            }
        }
    }

    let storage = FileStorage::new(data_path);
    storage.ensure_exists().await?;
    let service = match env::var("PIPEDESK_OPERATOR") {
        Ok(operator) if !operator.is_empty() => DataService::with_operator(storage, operator),
        _ => DataService::new(storage),
    };
    Ok(Arc::new(service))
}
