use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use storechat_core::config::StoreConfig;
use storechat_core::domain::order::OrderRecord;
use storechat_core::errors::{OrderLookup, UpstreamError, UpstreamService};
use tracing::{debug, warn};

use crate::http::transport_error;
use crate::token::{ClientCredentialsExchanger, TokenCache, TokenExchanger};

const SERVICE: UpstreamService = UpstreamService::OrderBackend;

/// Looks orders up by the number a customer typed.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
    async fn find_order(&self, order_number: &str) -> Result<OrderLookup, UpstreamError>;

    /// Cheap readiness probe for health reporting. Must not touch the network.
    async fn credentials_ready(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct OrderSearchResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

pub struct OrderLookupClient<E = ClientCredentialsExchanger> {
    client: Client,
    api_base_url: String,
    tokens: Arc<TokenCache<E>>,
}

impl OrderLookupClient<ClientCredentialsExchanger> {
    pub fn from_config(client: Client, config: &StoreConfig) -> Self {
        let exchanger = ClientCredentialsExchanger::from_config(client.clone(), config);
        let tokens = Arc::new(TokenCache::from_config(exchanger, config));
        Self::new(client, config.api_base_url.clone(), tokens)
    }
}

impl<E> OrderLookupClient<E>
where
    E: TokenExchanger,
{
    pub fn new(client: Client, api_base_url: impl Into<String>, tokens: Arc<TokenCache<E>>) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self { client, api_base_url, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenCache<E>> {
        &self.tokens
    }
}

#[async_trait]
impl<E> OrderDirectory for OrderLookupClient<E>
where
    E: TokenExchanger + 'static,
{
    async fn find_order(&self, order_number: &str) -> Result<OrderLookup, UpstreamError> {
        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(error) => {
                warn!(
                    event_name = "orders.lookup.no_token",
                    order_number = %order_number,
                    error = %error,
                    "no order backend token available; reporting order as not found"
                );
                return Ok(OrderLookup::NotFound);
            }
        };

        let response = self
            .client
            .get(format!("{}/orders", self.api_base_url))
            .bearer_auth(token)
            .query(&[("search", order_number)])
            .send()
            .await
            .map_err(|error| transport_error(SERVICE, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(SERVICE, status.as_u16()));
        }

        let payload: OrderSearchResponse =
            response.json().await.map_err(|error| transport_error(SERVICE, &error))?;
        let orders = payload.data.unwrap_or_default();
        debug!(
            event_name = "orders.lookup.searched",
            order_number = %order_number,
            matches = orders.len(),
            "order search completed"
        );

        match orders.first() {
            None => Ok(OrderLookup::NotFound),
            Some(first) => OrderRecord::from_value(first)
                .map(OrderLookup::Found)
                .ok_or_else(|| UpstreamError::decode(SERVICE, "first matching order has no id")),
        }
    }

    async fn credentials_ready(&self) -> bool {
        self.tokens.has_fresh_token().await
    }
}
