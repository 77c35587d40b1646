use std::sync::Arc;
use std::time::Duration;

use storechat_agent::{completion_client_from_config, ChatOrchestrator};
use storechat_core::config::AppConfig;
use storechat_orders::{http::build_client, OrderDirectory, OrderLookupClient};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub orders: Arc<OrderLookupClient>,
    pub orchestrator: Arc<ChatOrchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let store_client = build_client(Duration::from_secs(config.store.timeout_secs))
        .map_err(BootstrapError::HttpClient)?;
    let orders = Arc::new(OrderLookupClient::from_config(store_client, &config.store));

    let completion =
        completion_client_from_config(&config.llm).map_err(BootstrapError::HttpClient)?;
    let directory: Arc<dyn OrderDirectory> = orders.clone();
    let orchestrator =
        Arc::new(ChatOrchestrator::from_config(&config.chat, directory, completion));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        order_backend = %config.store.api_base_url,
        llm_provider = ?config.llm.provider,
        llm_model = %config.llm.model,
        locale = config.chat.locale.code(),
        "application components constructed"
    );

    Ok(Application { config, orders, orchestrator })
}

/// One token exchange at startup so the first customer does not pay for it. Failure is logged
/// and the cache retries on the next lookup.
pub async fn warm_up_token(orders: &OrderLookupClient) {
    match orders.tokens().get_token().await {
        Ok(_) => info!(
            event_name = "system.bootstrap.token_warmed",
            correlation_id = "bootstrap",
            "order backend token obtained at startup"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.token_warm_up_failed",
            correlation_id = "bootstrap",
            error = %error,
            "order backend token could not be obtained at startup"
        ),
    }
}
