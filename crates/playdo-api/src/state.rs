//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! `TutorService` is generic over repository/provider traits; AppState pins it
//! to the SQLite repository and the provider chosen at startup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use playdo_core::conversation::service::TutorService;
use playdo_core::llm::box_provider::BoxLlmProvider;
use playdo_infra::config::{anthropic_api_key, database_url, load_config, resolve_data_dir};
use playdo_infra::llm::create_provider;
use playdo_infra::sqlite::conversation::SqliteConversationRepository;
use playdo_infra::sqlite::pool::DatabasePool;
use playdo_types::config::PlaydoConfig;

/// Concrete type alias for the tutor service pinned to infra implementations.
pub type ConcreteTutorService = TutorService<SqliteConversationRepository, BoxLlmProvider>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub tutor_service: Arc<ConcreteTutorService>,
    pub config: Arc<PlaydoConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
    /// False when no upstream credentials were found at startup.
    pub upstream_configured: bool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;

        let db_url = database_url(&data_dir);
        let db_pool = DatabasePool::new(&db_url)
            .await
            .with_context(|| format!("failed to open database at {db_url}"))?;

        let api_key = anthropic_api_key();
        let upstream_configured = api_key.is_some();
        let provider = create_provider(&config, api_key)?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            model = %config.model,
            upstream_configured,
            "Application state initialized"
        );

        Ok(Self::new(db_pool, config, data_dir, provider, upstream_configured))
    }

    /// Wire the state from already-constructed parts.
    pub fn new(
        db_pool: DatabasePool,
        config: PlaydoConfig,
        data_dir: PathBuf,
        provider: BoxLlmProvider,
        upstream_configured: bool,
    ) -> Self {
        let repo = SqliteConversationRepository::new(db_pool.clone());
        let tutor_service = TutorService::new(repo, provider)
            .with_upstream_timeout(Duration::from_secs(config.upstream_timeout_secs));

        Self {
            tutor_service: Arc::new(tutor_service),
            config: Arc::new(config),
            data_dir,
            db_pool,
            upstream_configured,
        }
    }

    /// Fail with a helpful message when a command needs the upstream model.
    pub fn require_upstream(&self) -> anyhow::Result<()> {
        if !self.upstream_configured {
            anyhow::bail!(
                "ANTHROPIC_API_KEY is not set. Export it to talk to the tutor: export ANTHROPIC_API_KEY=sk-ant-..."
            );
        }
        Ok(())
    }
}
