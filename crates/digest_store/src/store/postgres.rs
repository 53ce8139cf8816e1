use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::store::{ArtifactStore, Locator};

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct PgArtifactStore {
    pub pool: PgPool,
    public_base_url: Option<String>,
}

impl PgArtifactStore {
    /// Establish connection to database and create the artifacts table
    /// if not exists
    pub async fn init(database_url: &str, public_base_url: Option<String>) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgArtifactStore {
            pool,
            public_base_url,
        })
    }

    fn locator(&self, key: &str) -> Locator {
        Locator::for_key(
            self.public_base_url.as_deref(),
            key,
            format!("pg://artifacts/{key}"),
        )
    }
}

impl ArtifactStore for PgArtifactStore {
    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM artifacts WHERE key = $1)")
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, key, "Failed to check artifact"))
            .context("Failed to check artifact existence")
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        let body = sqlx::query_scalar::<_, Vec<u8>>("SELECT body FROM artifacts WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, key, "Failed to fetch artifact"))
            .context("Failed to fetch artifact")?;

        body.ok_or_else(|| anyhow::anyhow!("Artifact not found: {key}"))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<Locator> {
        let size = bytes.len();

        sqlx::query(
            r#"
            INSERT INTO artifacts (key, content_type, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET content_type = EXCLUDED.content_type,
                body = EXCLUDED.body,
                updated_at = now()
            "#,
        )
        .bind(key)
        .bind(content_type)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .inspect_err(|err| tracing::error!(error = ?err, key, "Failed to write artifact"))
        .context("Failed to write artifact")?;

        tracing::info!(key, size, content_type, "Stored artifact");
        Ok(self.locator(key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM artifacts WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .inspect_err(|err| tracing::error!(error = ?err, key, "Failed to delete artifact"))
            .context("Failed to delete artifact")?;

        Ok(())
    }
}
