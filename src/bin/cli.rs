use clap::{Parser, Subcommand};
use pipedesk_store::sdk;
use pipedesk_store::Record;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the backing JSON document (embedded mode).
    #[arg(short, long, default_value = "data/crm.json")]
    data: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Print the whole document.
    Fetch,
    /// Print every record of one entity type.
    List { entity_type: String },
    /// Create a record from a JSON object of fields.
    Create { entity_type: String, fields: String },
    /// Merge a JSON object of fields over an existing record.
    Update { entity_type: String, id: String, fields: String },
    /// Remove a record by id.
    Delete { entity_type: String, id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let store = sdk::new(&cli.data).await?;

    match cli.command {
        Commands::Fetch => {
            let document = store.fetch().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::List { entity_type } => {
            let records = store.entity(&entity_type).records().await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Create { entity_type, fields } => {
            let fields: Record = serde_json::from_str(&fields)?;
            let record = store.create(&entity_type, fields).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Update { entity_type, id, fields } => {
            let fields: Record = serde_json::from_str(&fields)?;
            let record = store.update(&entity_type, &id, fields).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Delete { entity_type, id } => {
            store.delete(&entity_type, &id).await?;
            println!("OK");
        }
    }

    Ok(())
}
