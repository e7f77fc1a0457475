pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;

use cli::Args;
use config::models::initialize_models;
use gateway::Gateway;
use history::{ initialize_history_store, HistoryConfig };
use llm::{ ProviderConfig, ProviderKind };
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let history_config = HistoryConfig::from_args(&args)?;
    let models = initialize_models(args.models_path.as_deref())?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("API Keys Configured: {}", args.api_keys.iter().filter(|k| !k.trim().is_empty()).count());
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Models Source: {}", args.models_path.as_deref().unwrap_or("built-in"));
    info!("Models: {}", models.ids().join(", "));
    info!("History Max Conversations: {}", history_config.max_conversations);
    info!("History Stored Turns: {}", history_config.max_stored_turns);
    info!("History Window: {}", history_config.read_window);
    info!("-------------------------");

    let providers: Vec<ProviderConfig> = ProviderKind::ALL.iter()
        .map(|&kind| ProviderConfig::from_args(kind, &args))
        .collect();
    let history = initialize_history_store(&history_config);
    let gateway = Arc::new(
        Gateway::from_configs(models, &providers, history, history_config.read_window)?
    );

    let server = Server::new(args.server_addr.clone(), gateway, args.api_keys.clone());
    server.run().await?;

    Ok(())
}
