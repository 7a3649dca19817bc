pub mod cli;
pub mod client;
pub mod history;
pub mod llm;
pub mod models;
pub mod relay;
pub mod server;

use client::{ ChatSession, HttpRelayTransport };
use cli::{ Args, ChatArgs, Command, ServeArgs };
use history::{ ConversationStore, FileStorage };
use llm::{ LlmConfig, LlmType };
use llm::chat::new_client as new_chat_client;
use log::{ info, warn };
use relay::RelayService;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.chat_llm_type
        .parse()
        .map_err(|e| format!("Invalid chat LLM type: {}", e))?;
    let api_key = args.api_key.clone().filter(|k| !k.trim().is_empty());

    info!("--- Relay Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("API Key: {}", if api_key.is_some() { "set" } else { "not set" });
    info!("TLS Enabled: {}", args.enable_tls);
    info!("---------------------------");

    if api_key.is_none() && llm_type != LlmType::Ollama {
        warn!("No API key configured (GOOGLE_API_KEY). Every generation request will fail with 500.");
    }

    let chat_config = LlmConfig {
        llm_type,
        api_key,
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Model={}, BaseURL={}",
        chat_client.get_model(),
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );

    let relay = RelayService::new(chat_client);
    let server = Server::new(args.server_addr.clone(), relay, args);
    server.run().await
}

async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let storage = FileStorage::new(&args.history_dir)?;
    info!("Chat history stored in: {}", storage.dir().display());
    let store = ConversationStore::load(Box::new(storage));

    let transport = HttpRelayTransport::new(&args.relay_url)?;
    info!("Relay endpoint: {}", transport.endpoint());

    let session = ChatSession::new(store, Arc::new(transport));
    client::terminal::run(session).await
}
