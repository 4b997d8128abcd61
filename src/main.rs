use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fintrack::api::{self, AppState};
use fintrack::config::{CliArgs, Config};
use fintrack::credential::Sha256Hasher;
use fintrack::session::{LedgerCache, SessionStore};
use fintrack_core::storage::{CredentialHasher, UserRepository};
use fintrack_json::JsonFileRepository;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);

    init_tracing(&config);

    let hasher: Arc<dyn CredentialHasher> = Arc::new(Sha256Hasher::new());
    let repository: Arc<dyn UserRepository> =
        Arc::new(JsonFileRepository::new(config.storage.path.clone(), hasher));

    let state = Arc::new(AppState {
        repository,
        sessions: SessionStore::new(),
        ledgers: LedgerCache::new(),
        cookie_name: config.session.cookie_name.clone(),
    });

    let app = api::router(state);

    let addr = config.listen_addr();
    tracing::info!(%addr, store = %config.storage.path, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
