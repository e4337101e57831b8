mod drafts;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vehdraft_client::DraftApiClient;
use vehdraft_core::IdentifierType;

#[derive(Debug, Parser)]
#[command(name = "vehdraft-cli")]
#[command(about = "Vehicle listing draft command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Look a vehicle up across every source and print the certified fields
    Lookup {
        /// Registration plate (e.g. AB-123-CD) or VIN
        identifier: String,
        /// Identifier type: plate or vin
        #[arg(long, default_value = "plate")]
        kind: IdentifierType,
    },
    /// Load a saved draft and print it
    Restore {
        /// Listing id of the saved draft
        listing_id: String,
    },
    /// Apply field edits to a draft and save it
    Edit {
        /// Existing listing to edit; a new draft is created when omitted
        #[arg(long)]
        listing: Option<String>,
        /// Pre-fill the new draft from a plate lookup first
        #[arg(long, conflicts_with = "listing")]
        plate: Option<String>,
        /// Edits as name=value; an empty value clears the field
        #[arg(required = true)]
        edits: Vec<String>,
    },
    /// Look a vehicle up, then retry its degraded sources
    Resync {
        identifier: String,
        #[arg(long, default_value = "plate")]
        kind: IdentifierType,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("vehdraft-cli: no command given, see --help");
        return Ok(());
    };

    let config = vehdraft_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let client = DraftApiClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build draft API client: {e}"))?;

    match command {
        Commands::Lookup { identifier, kind } => {
            drafts::run_lookup(client, &identifier, kind).await?;
        }
        Commands::Restore { listing_id } => {
            drafts::run_restore(&config, client, &listing_id).await?;
        }
        Commands::Edit {
            listing,
            plate,
            edits,
        } => {
            drafts::run_edit(&config, client, listing.as_deref(), plate.as_deref(), &edits)
                .await?;
        }
        Commands::Resync { identifier, kind } => {
            drafts::run_resync(client, &identifier, kind).await?;
        }
    }

    Ok(())
}
