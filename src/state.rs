use std::{sync::Arc, time::Instant};

use crate::auth::{github::OAuthProvider, session::SessionKeys};
use crate::config::Config;
use crate::db::PortfolioStore;
use crate::notify::Notifier;
use crate::storage::ObjectStorage;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn PortfolioStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub oauth: Arc<dyn OAuthProvider>,
    pub sessions: SessionKeys,
    pub notifier: Notifier,
    pub started_at: Instant,
}

impl AppState {
    /// Session keys and the notifier are derived from `config`.
    pub fn new(
        config: Config,
        store: Arc<dyn PortfolioStore>,
        storage: Arc<dyn ObjectStorage>,
        oauth: Arc<dyn OAuthProvider>,
        http: reqwest::Client,
    ) -> Self {
        let sessions = SessionKeys::from_config(&config);
        let notifier = Notifier::new(http, config.notify_webhook_url.clone());
        Self {
            config: Arc::new(config),
            store,
            storage,
            oauth,
            sessions,
            notifier,
            started_at: Instant::now(),
        }
    }
}
