use std::env;
use std::sync::Arc;

use clap::Parser;
use pipedesk_store::engine::{DataService, FileStorage};
use pipedesk_store::server::Router;
use pipedesk_store::DocumentReader;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the backing JSON document.
    #[arg(short, long)]
    data: Option<String>,

    /// TCP port to listen on.
    #[arg(short, long)]
    port: Option<String>,

    /// Operator id stamped into unowned records.
    #[arg(short, long)]
    operator: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let data_path = args.data
        .or_else(|| env::var("PIPEDESK_DATA").ok())
        .unwrap_or_else(|| "data/crm.json".to_string());

    let port = args.port
        .or_else(|| env::var("PIPEDESK_PORT").ok())
        .unwrap_or_else(|| "7411".to_string());

    let operator = args.operator
        .or_else(|| env::var("PIPEDESK_OPERATOR").ok())
        .unwrap_or_else(|| pipedesk_store::DEFAULT_OPERATOR.to_string());

    let storage = FileStorage::new(&data_path);
    storage.ensure_exists().await?;
    let service = Arc::new(DataService::with_operator(storage, operator));

    println!("Starting Pipedesk Store daemon...");
    let document = service.fetch().await?;
    for (name, records) in document.collections() {
        println!("  {}: {} records", name, records.len());
    }
    println!("Pipedesk Store listening on :{} (TCP)", port);

    let router = Router::new(service);

    tokio::select! {
        res = router.listen(&port) => {
            if let Err(e) = res {
                eprintln!("TCP Server failed: {}", e);
            }
        }
        _ = signal::ctrl_c() => {
            println!("\nShutdown signal received. Exiting.");
        }
    }

    Ok(())
}
