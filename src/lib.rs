pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use cli::Args;
use config::RelayConfig;
use llm::chat::new_client as new_chat_client;
use log::info;
use relay::Relay;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = RelayConfig::from_args(&args)?;
    let chat_client = new_chat_client(&config.llm)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", config.llm.llm_type);
    info!("Chat Model: {}", chat_client.get_model());
    info!("Chat Base URL: {}", chat_client.get_base_url().unwrap_or_default());
    info!(
        "System Prompt: {}",
        args.system_prompt_path.as_deref().unwrap_or("built-in HealthConnect persona")
    );
    info!("First Chunk Timeout: {:?}", config.first_chunk_timeout);
    match config.max_messages {
        Some(limit) => info!("Max Messages: {}", limit),
        None => info!("Max Messages: unlimited"),
    }
    info!("Max Body Bytes: {}", args.max_body_bytes);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let relay = Relay::new(chat_client, &config);
    let server = Server::new(args.server_addr.clone(), relay, args);
    server.run().await?;

    Ok(())
}
