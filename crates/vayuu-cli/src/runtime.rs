//! Wires the configured services together and runs the bot until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vayuu_ai::memory::ProfileStore;
use vayuu_ai::tools::{Workspace, default_registry};
use vayuu_ai::{
    AgentConfig, AgentExecutor, ChatTransport, ConversationLogger, InMemoryIndex, LlmClient,
    LlmProvider, LongTermMemory, OllamaEmbedding, QdrantIndex, ShortTermMemory, VectorIndex,
    create_llm_client,
};
use vayuu_storage::{UserDataStorage, open_database};

use crate::bot::BotHandler;
use crate::channel::TelegramChannel;
use crate::config::{AppConfig, VectorBackend};

pub fn build_llm(config: &AppConfig) -> Result<Arc<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse()?;
    let client = create_llm_client(
        provider,
        &config.api_key,
        Some(&config.api_base_url),
        &config.model,
    )?;
    Ok(client)
}

pub fn build_agent_config(config: &AppConfig) -> AgentConfig {
    AgentConfig::new()
        .with_workspace(config.workdir())
        .with_max_iterations(config.max_iterations)
        .with_max_consecutive_errors(config.max_consecutive_errors)
        .with_temperature(config.temperature)
        .with_context_tokens(config.context_tokens)
}

fn build_vector_index(config: &AppConfig) -> Arc<dyn VectorIndex> {
    let memory = &config.memory;
    match memory.vector_backend {
        VectorBackend::Qdrant => {
            let mut index = QdrantIndex::new(
                memory.qdrant_url.clone(),
                memory.collection.clone(),
                memory.embedding_dimension,
            );
            if let Some(key) = memory.qdrant_api_key.as_deref().filter(|k| !k.is_empty()) {
                index = index.with_api_key(key);
            }
            Arc::new(index)
        }
        VectorBackend::Memory => Arc::new(InMemoryIndex::new()),
    }
}

async fn connect_memory(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Arc<LongTermMemory>> {
    let memory = &config.memory;
    let database_path = config.database_path()?;
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let storage = UserDataStorage::new(open_database(&database_path)?)?;
    let profile: Arc<dyn ProfileStore> = Arc::new(storage);

    let embedder = Arc::new(OllamaEmbedding::new(
        memory.ollama_base_url.clone(),
        memory.embedding_model.clone(),
        memory.embedding_dimension,
    ));

    let manager = LongTermMemory::connect(embedder, build_vector_index(config), profile, llm)
        .await?;
    Ok(Arc::new(manager))
}

/// Run the Telegram bot until Ctrl-C.
pub async fn run(config: AppConfig) -> Result<()> {
    let workdir = config.workdir();
    std::fs::create_dir_all(&workdir)
        .with_context(|| format!("Failed to create workdir {}", workdir.display()))?;

    let llm = build_llm(&config)?;
    info!(provider = llm.provider(), model = llm.model(), "LLM client ready");

    let long_term = if config.memory.enabled {
        match connect_memory(&config, llm.clone()).await {
            Ok(memory) => Some(memory),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Long-term memory unavailable, continuing without it");
                None
            }
        }
    } else {
        info!("Long-term memory disabled");
        None
    };

    let channel = Arc::new(TelegramChannel::new(config.telegram_token.clone()));
    match channel.get_me().await {
        Ok(me) => info!(bot = ?me.username, "Connected to Telegram"),
        Err(e) => warn!(error = %format!("{e:#}"), "Telegram getMe failed"),
    }
    let transport: Arc<dyn ChatTransport> = channel.clone();

    let tools = default_registry(Workspace::new(workdir.clone()), Some(transport.clone()))?;
    info!(tools = ?tools.list(), "Tool registry ready");

    let logger = ConversationLogger::new(&workdir).with_max_size(config.log_max_size_bytes);
    let mut agent = AgentExecutor::new(llm, Arc::new(tools), build_agent_config(&config))
        .with_short_term_memory(Arc::new(ShortTermMemory::new(config.stm_capacity)))
        .with_logger(Arc::new(logger));
    if let Some(memory) = &long_term {
        agent = agent.with_long_term_memory(memory.clone());
    }

    let shutdown = CancellationToken::new();
    let handler = Arc::new(
        BotHandler::new(
            Arc::new(agent),
            transport,
            &config.allowed_username,
            Duration::from_secs(config.ai_timeout_secs),
        )
        .with_shutdown(shutdown.clone()),
    );

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
            shutdown.cancel();
        });
    }

    info!(allowed_username = %config.allowed_username, "Vayuu is running");
    channel
        .run_polling(shutdown, |message| {
            handler.dispatch(message);
        })
        .await;

    info!("Waiting for in-flight turns");
    handler.drain().await;

    if let Some(memory) = long_term
        && let Err(e) = memory.close().await
    {
        warn!(error = %e, "Failed to close long-term memory");
    }
    info!("Vayuu stopped");
    Ok(())
}
