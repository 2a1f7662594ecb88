use std::sync::Arc;

use pipedesk_store::engine::{DataService, FileStorage, MemoryStorage};
use pipedesk_store::sdk::Client;
use pipedesk_store::{DocumentReader, RecordMutator, RecordStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Serialize)]
struct NewTicket {
    title: String,
}

#[derive(Deserialize, Debug)]
struct StoredTicket {
    id: String,
    title: String,
    status: String,
    priority: String,
    #[serde(rename = "assigneeId")]
    assignee_id: String,
}

async fn spawn_server(store: Arc<dyn RecordStore>) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let s = store.clone();
            tokio::spawn(async move {
                let _ = pipedesk_store::server::router::handle_connection(socket, s).await;
            });
        }
    });

    addr
}

fn fields(value: serde_json::Value) -> pipedesk_store::Record {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_typed_helpers() {
    let addr = spawn_server(Arc::new(DataService::new(MemoryStorage::seeded()))).await;
    let client = Client::connect(&addr.to_string()).await.unwrap();

    let ticket = NewTicket {
        title: "Login issue".to_string(),
    };
    let created = client.create_as("ticket", &ticket).await.unwrap();
    assert_eq!(created["id"], "1");

    let tickets: Vec<StoredTicket> = client.records_as("ticket").await.unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].id, "1");
    assert_eq!(tickets[0].title, "Login issue");
    assert_eq!(tickets[0].status, "New");
    assert_eq!(tickets[0].priority, "Medium");
    assert_eq!(tickets[0].assignee_id, "admin");
}

#[tokio::test]
async fn test_full_protocol_integration() {
    let addr = spawn_server(Arc::new(DataService::new(MemoryStorage::seeded()))).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut response = String::new();

    writer.write_all(b"PING\n").await.unwrap();
    reader.read_line(&mut response).await.unwrap();
    assert_eq!(response.trim(), "PONG");

    writer
        .write_all(b"CREATE ticket {\"title\": \"Login  issue\"}\n")
        .await
        .unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert!(response.starts_with("OK {"));
    assert!(response.contains("\"id\":\"1\""));
    // Whitespace inside JSON strings survives the framing.
    assert!(response.contains("Login  issue"));

    writer.write_all(b"FETCH\n").await.unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert!(response.starts_with("OK {"));
    assert!(response.contains("Login  issue"));

    writer
        .write_all(b"UPDATE ticket 1 {\"status\": \"Resolved\"}\n")
        .await
        .unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert!(response.contains("\"status\":\"Resolved\""));
    assert!(response.contains("\"id\":\"1\""));

    writer.write_all(b"DELETE ticket 1\n").await.unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert_eq!(response.trim(), "OK");

    writer.write_all(b"DELETE ticket 1\n").await.unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert_eq!(response.trim(), "ERR ticket with id 1 not found");

    writer.write_all(b"CREATE ticket not-json\n").await.unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert_eq!(response.trim(), "ERR invalid json payload");

    writer.write_all(b"CREATE company {}\n").await.unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert_eq!(response.trim(), "ERR company name is required");

    writer.write_all(b"BOGUS\n").await.unwrap();
    response.clear();
    reader.read_line(&mut response).await.unwrap();
    assert_eq!(response.trim(), "ERR unknown command");
}

#[tokio::test]
async fn test_ticket_lifecycle_against_file() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("crm.json");

    let storage = FileStorage::new(&data_path);
    storage.ensure_exists().await.unwrap();
    let addr = spawn_server(Arc::new(DataService::with_operator(storage, "sevda-danaie"))).await;
    let client = Client::connect(&addr.to_string()).await.unwrap();

    let created = client
        .create("ticket", fields(json!({ "title": "Login issue" })))
        .await
        .unwrap();
    assert_eq!(created["id"], "1");
    assert_eq!(created["status"], "New");
    assert_eq!(created["priority"], "Medium");
    assert_eq!(created["assigneeId"], "sevda-danaie");
    assert_eq!(created["createdAt"], created["updatedAt"]);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let updated = client
        .update("ticket", "1", fields(json!({ "status": "Resolved" })))
        .await
        .unwrap();
    assert_eq!(updated["id"], "1");
    assert_eq!(updated["title"], "Login issue");
    assert_eq!(updated["status"], "Resolved");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert!(updated["updatedAt"].as_str().unwrap() > created["createdAt"].as_str().unwrap());

    // The change is on disk, pretty-printed, before the call returns.
    let text = std::fs::read_to_string(&data_path).unwrap();
    assert!(text.contains("\"status\": \"Resolved\""));

    client.delete("ticket", "1").await.unwrap();
    let document = client.fetch().await.unwrap();
    assert!(document.tickets().is_empty());

    // A fresh storage over the same file observes the final state.
    let reopened = FileStorage::new(&data_path);
    let service = DataService::new(reopened);
    assert!(service.fetch().await.unwrap().tickets().is_empty());
}

#[tokio::test]
async fn test_company_slugs_over_the_wire() {
    let addr = spawn_server(Arc::new(DataService::new(MemoryStorage::seeded()))).await;
    let client = Client::connect(&addr.to_string()).await.unwrap();

    let first = client
        .create("company", fields(json!({ "name": "Acme Corp" })))
        .await
        .unwrap();
    let second = client
        .create("company", fields(json!({ "name": "Acme Corp" })))
        .await
        .unwrap();
    assert_eq!(first["id"], "acme-corp");
    assert_eq!(second["id"], "acme-corp-1");

    let err = client
        .create("company", fields(json!({ "id": "acme-corp", "name": "Acme Corp" })))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("company with id acme-corp already exists"));

    let document = client.fetch().await.unwrap();
    assert_eq!(document.companies().len(), 2);
}
