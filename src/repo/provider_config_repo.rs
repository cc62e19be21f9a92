use anyhow::Result;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct ProviderConfigRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: String,
    pub secret: String,
    pub is_enabled: bool,
}

impl ProviderConfigRepo {
    pub async fn get(&self, provider: &str) -> Result<Option<ProviderConfig>> {
        let row = sqlx::query(
            "SELECT provider, secret, is_enabled FROM webhook_providers WHERE provider = $1",
        )
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ProviderConfig {
            provider: r.get("provider"),
            secret: r.get("secret"),
            is_enabled: r.get("is_enabled"),
        }))
    }

    pub async fn rotate_secret(&self, provider: &str, secret: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE webhook_providers SET secret = $2, updated_at = now() WHERE provider = $1",
        )
        .bind(provider)
        .bind(secret)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
