use std::sync::Arc;

use log::{error, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::{Record, RecordStore, Result};

pub struct Router {
    store: Arc<dyn RecordStore>,
    semaphore: Arc<Semaphore>,
}

impl Router {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            semaphore: Arc::new(Semaphore::new(100)),
        }
    }

    pub async fn listen(&self, port: &str) -> Result<()> {
        let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
        info!("Pipedesk Store listening on port {}", port);

        loop {
            let (socket, _) = listener.accept().await?;
            let store = self.store.clone();
            let sem = self.semaphore.clone();

            tokio::spawn(async move {
                let _permit = match sem.try_acquire() {
                    Ok(p) => p,
                    Err(_) => {
                        error!("Server busy: too many concurrent connections. Rejecting...");
                        // Ensure it's closed
                        let mut socket = socket;
                        let _ = socket.shutdown().await;
                        return;
                    }
                };

                if let Err(e) = handle_connection(socket, store).await {
                    error!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Splits the leading whitespace-delimited token off `input`, leaving the
/// rest verbatim. Payloads are JSON and may contain meaningful whitespace,
/// so the remainder is never re-tokenized.
fn split_token(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (input, ""),
    }
}

/// Serves one client connection: newline-delimited commands in, one
/// `OK`/`ERR` line out per command.
///
/// The command surface mirrors the four data operations:
/// `FETCH`, `CREATE <type> <fields-json>`, `UPDATE <type> <id> <fields-json>`
/// and `DELETE <type> <id>`, plus `PING` and `QUIT`.
pub async fn handle_connection(mut socket: TcpStream, store: Arc<dyn RecordStore>) -> Result<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (command, args) = split_token(trimmed);
        let response = match command.to_uppercase().as_str() {
            "FETCH" => match store.fetch().await {
                Ok(document) => format!("OK {}", serde_json::to_string(&document)?),
                Err(e) => format!("ERR {}", e.to_string().to_lowercase()),
            },
            "CREATE" => {
                let (entity_type, payload) = split_token(args);
                if entity_type.is_empty() || payload.is_empty() {
                    "ERR missing arguments".to_string()
                } else {
                    match serde_json::from_str::<Record>(payload) {
                        Ok(fields) => match store.create(entity_type, fields).await {
                            Ok(record) => format!("OK {}", serde_json::to_string(&record)?),
                            Err(e) => format!("ERR {}", e.to_string().to_lowercase()),
                        },
                        Err(_) => "ERR invalid json payload".to_string(),
                    }
                }
            }
            "UPDATE" => {
                let (entity_type, rest) = split_token(args);
                let (id, payload) = split_token(rest);
                if entity_type.is_empty() || id.is_empty() || payload.is_empty() {
                    "ERR missing arguments".to_string()
                } else {
                    match serde_json::from_str::<Record>(payload) {
                        Ok(fields) => match store.update(entity_type, id, fields).await {
                            Ok(record) => format!("OK {}", serde_json::to_string(&record)?),
                            Err(e) => format!("ERR {}", e.to_string().to_lowercase()),
                        },
                        Err(_) => "ERR invalid json payload".to_string(),
                    }
                }
            }
            "DELETE" => {
                let (entity_type, rest) = split_token(args);
                let (id, _) = split_token(rest);
                if entity_type.is_empty() || id.is_empty() {
                    "ERR missing arguments".to_string()
                } else {
                    match store.delete(entity_type, id).await {
                        Ok(_) => "OK".to_string(),
                        Err(e) => format!("ERR {}", e.to_string().to_lowercase()),
                    }
                }
            }
            "PING" => "PONG".to_string(),
            "QUIT" => break,
            _ => "ERR unknown command".to_string(),
        };

        writer.write_all(format!("{}\n", response).as_bytes()).await?;
    }
    Ok(())
}
