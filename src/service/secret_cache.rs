use crate::domain::webhook::WebhookProvider;
use crate::repo::provider_config_repo::{ProviderConfig, ProviderConfigRepo};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// TTL'd cache over `webhook_providers`, keyed by the closed provider set so
/// it is bounded by construction. Secret rotation calls `invalidate`.
#[derive(Clone)]
pub struct SecretCache {
    pub provider_repo: ProviderConfigRepo,
    inner: Arc<RwLock<HashMap<WebhookProvider, (std::time::Instant, ProviderConfig)>>>,
    ttl: std::time::Duration,
}

impl SecretCache {
    pub fn new(provider_repo: ProviderConfigRepo, ttl: std::time::Duration) -> Self {
        Self {
            provider_repo,
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, provider: WebhookProvider) -> Result<Option<ProviderConfig>> {
        {
            let read = self.inner.read().await;
            if let Some((loaded_at, config)) = read.get(&provider) {
                if loaded_at.elapsed() <= self.ttl {
                    return Ok(Some(config.clone()));
                }
            }
        }

        let Some(config) = self.provider_repo.get(provider.as_str()).await? else {
            return Ok(None);
        };

        let mut write = self.inner.write().await;
        write.insert(provider, (std::time::Instant::now(), config.clone()));
        Ok(Some(config))
    }

    pub async fn invalidate(&self, provider: WebhookProvider) {
        let mut write = self.inner.write().await;
        write.remove(&provider);
    }
}
