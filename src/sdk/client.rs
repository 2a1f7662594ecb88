use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::engine::document::collection_name;
use crate::{
    Document, DocumentReader, EntityScope, Error, Record, RecordMutator, RecordStore, Result,
};

/// Remote client speaking the line protocol of [`crate::server::Router`].
///
/// Holds one connection behind a mutex and reconnects transparently, so a
/// daemon restart costs callers a retry instead of an error.
pub struct Client {
    addr: String,
    inner: Mutex<Option<ClientInner>>,
}

struct ClientInner {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Client {
    /// Connects to a running daemon at `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self> {
        let inner = Client::connect_inner(addr).await?;
        Ok(Self {
            addr: addr.to_string(),
            inner: Mutex::new(Some(inner)),
        })
    }

    async fn send_and_receive(&self, cmd: String) -> Result<String> {
        let mut inner_guard = self.inner.lock().await;

        // Retry logic
        for i in 0..3 {
            if inner_guard.is_none() {
                match Client::connect_inner(&self.addr).await {
                    Ok(inner) => *inner_guard = Some(inner),
                    Err(e) => {
                        if i == 2 {
                            return Err(e);
                        }
                        tokio::time::sleep(std::time::Duration::from_millis((i + 1) * 200)).await;
                        continue;
                    }
                }
            }

            let inner = inner_guard.as_mut().unwrap();
            if inner
                .writer
                .write_all(format!("{}\n", cmd).as_bytes())
                .await
                .is_err()
            {
                *inner_guard = None;
                continue;
            }

            let mut resp = String::new();
            match inner.reader.read_line(&mut resp).await {
                Ok(0) => {
                    *inner_guard = None;
                    continue;
                }
                Ok(_) => {
                    let resp = resp.trim();
                    if let Some(message) = resp.strip_prefix("ERR") {
                        return Err(Error::Internal(message.trim_start().to_string()));
                    }
                    return Ok(resp.to_string());
                }
                Err(_) => {
                    *inner_guard = None;
                    continue;
                }
            }
        }

        Err(Error::Internal("failed after 3 attempts".to_string()))
    }

    async fn connect_inner(addr: &str) -> Result<ClientInner> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(ClientInner {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Fetches one collection deserialized into typed records.
    pub async fn records_as<T: DeserializeOwned>(&self, entity_type: &str) -> Result<Vec<T>> {
        let document = self.fetch().await?;
        let name = collection_name(entity_type);
        let records = match document.collection(&name) {
            Some(records) => records.clone(),
            None => Vec::new(),
        };
        records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(Error::from))
            .collect()
    }

    /// Creates a record from any serializable shape and returns the stored
    /// record, defaults and all.
    pub async fn create_as<T: Serialize>(&self, entity_type: &str, record: &T) -> Result<Record> {
        self.create(entity_type, to_fields(record)?).await
    }

    /// Updates a record from any serializable shape.
    pub async fn update_as<T: Serialize>(
        &self,
        entity_type: &str,
        id: &str,
        record: &T,
    ) -> Result<Record> {
        self.update(entity_type, id, to_fields(record)?).await
    }
}

fn to_fields<T: Serialize>(record: &T) -> Result<Record> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(fields) => Ok(fields),
        _ => Err(Error::Internal("record must serialize to an object".to_string())),
    }
}

fn parse_ok(resp: &str) -> Result<&str> {
    resp.strip_prefix("OK ")
        .ok_or_else(|| Error::Internal("Invalid response".to_string()))
}

#[async_trait]
impl DocumentReader for Client {
    async fn fetch(&self) -> Result<Document> {
        let resp = self.send_and_receive("FETCH".to_string()).await?;
        Ok(serde_json::from_str(parse_ok(&resp)?)?)
    }
}

#[async_trait]
impl RecordMutator for Client {
    async fn create(&self, entity_type: &str, fields: Record) -> Result<Record> {
        let payload = serde_json::to_string(&fields)?;
        let resp = self
            .send_and_receive(format!("CREATE {} {}", entity_type, payload))
            .await?;
        Ok(serde_json::from_str(parse_ok(&resp)?)?)
    }

    async fn update(&self, entity_type: &str, id: &str, fields: Record) -> Result<Record> {
        let payload = serde_json::to_string(&fields)?;
        let resp = self
            .send_and_receive(format!("UPDATE {} {} {}", entity_type, id, payload))
            .await?;
        Ok(serde_json::from_str(parse_ok(&resp)?)?)
    }

    async fn delete(&self, entity_type: &str, id: &str) -> Result<()> {
        self.send_and_receive(format!("DELETE {} {}", entity_type, id))
            .await?;
        Ok(())
    }
}

impl RecordStore for Client {
    fn entity(&self, entity_type: &str) -> Box<dyn EntityScope + '_> {
        Box::new(RemoteEntityScope {
            client: self,
            entity_type: entity_type.to_string(),
        })
    }
}

/// [`EntityScope`] over a remote daemon.
pub struct RemoteEntityScope<'a> {
    client: &'a Client,
    entity_type: String,
}

#[async_trait]
impl<'a> EntityScope for RemoteEntityScope<'a> {
    async fn records(&self) -> Result<Vec<Record>> {
        Ok(self.client.fetch().await?.records_of(&self.entity_type))
    }

    async fn create(&self, fields: Record) -> Result<Record> {
        self.client.create(&self.entity_type, fields).await
    }

    async fn update(&self, id: &str, fields: Record) -> Result<Record> {
        self.client.update(&self.entity_type, id, fields).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&self.entity_type, id).await
    }
}
