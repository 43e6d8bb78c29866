use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventStoreError, PayloadRegistry, PostgresConfig, Result, StoredChange,
    TransactionId, Version,
    config::validate_identifier,
    store::{EventStore, check_expected_version, validate_changes_for_append},
};

/// SQL text for one table name, rendered once at construction.
struct Statements {
    table: String,
    schema: String,
    insert: String,
    fetch: String,
    latest_version: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            schema: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id BIGSERIAL PRIMARY KEY,
                    aggregate_type TEXT NOT NULL,
                    aggregate_id UUID NOT NULL,
                    version BIGINT NOT NULL CHECK (version > 0),
                    payload_type TEXT NOT NULL,
                    transaction_id TEXT NOT NULL,
                    payload JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    CONSTRAINT {table}_stream_version_key UNIQUE (aggregate_type, aggregate_id, version)
                );
                "#
            ),
            insert: format!(
                r#"
                INSERT INTO {table} (aggregate_type, aggregate_id, version, payload_type, transaction_id, payload, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#
            ),
            fetch: format!(
                r#"
                SELECT aggregate_type, aggregate_id, version, payload_type, transaction_id, payload, created_at
                FROM {table}
                WHERE aggregate_type = $1 AND aggregate_id = $2
                ORDER BY version ASC
                "#
            ),
            latest_version: format!(
                r#"
                SELECT version FROM {table}
                WHERE aggregate_type = $1 AND aggregate_id = $2
                ORDER BY version DESC
                LIMIT 1
                "#
            ),
        }
    }
}

/// PostgreSQL-backed store.
///
/// Each append runs in one transaction: the version pre-check, then the
/// ordered inserts. The table's unique `(aggregate_type, aggregate_id, version)`
/// constraint catches writers that race past the pre-check; its violations
/// surface as `ConcurrencyConflict`. Dropping an in-flight append rolls the
/// transaction back.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    registry: Arc<PayloadRegistry>,
    statements: Arc<Statements>,
}

impl PostgresEventStore {
    /// Creates a store over the default `aggregate_changes` table.
    pub fn new(pool: PgPool, registry: PayloadRegistry) -> Self {
        Self::build(pool, registry, &PostgresConfig::default().table)
    }

    /// Creates a store over a custom table.
    pub fn with_table(pool: PgPool, table: &str, registry: PayloadRegistry) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self::build(pool, registry, table))
    }

    /// Opens a connection pool described by `config`.
    pub async fn connect(config: &PostgresConfig, registry: PayloadRegistry) -> Result<Self> {
        config.validate()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        tracing::info!(table = %config.table, "connected postgres event store");
        Ok(Self::build(pool, registry, &config.table))
    }

    fn build(pool: PgPool, registry: PayloadRegistry, table: &str) -> Self {
        Self {
            pool,
            registry: Arc::new(registry),
            statements: Arc::new(Statements::new(table)),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.statements.table
    }

    pub fn registry(&self) -> &PayloadRegistry {
        &self.registry
    }

    /// Creates the change table and its uniqueness constraint if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(&self.statements.schema)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_change(row: PgRow) -> Result<StoredChange> {
        Ok(StoredChange {
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            version: Version::new(row.try_get("version")?),
            payload_type: row.try_get("payload_type")?,
            transaction_id: TransactionId::from(row.try_get::<String, _>("transaction_id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            payload: row.try_get("payload")?,
        })
    }
}

/// Maps a failed insert, turning unique-constraint violations into conflicts.
fn insert_error(
    error: sqlx::Error,
    aggregate_type: &str,
    aggregate_id: AggregateId,
    version: Version,
) -> EventStoreError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.is_unique_violation()
    {
        return EventStoreError::ConcurrencyConflict {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            expected: Version::new(version.as_i64() - 1),
            actual: version,
        };
    }
    EventStoreError::Database(error)
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, changes), fields(batch = changes.len()))]
    async fn append(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
        changes: Vec<StoredChange>,
        expected_version: Version,
    ) -> Result<Version> {
        if changes.is_empty() {
            return Ok(expected_version);
        }
        validate_changes_for_append(
            &self.registry,
            aggregate_type,
            aggregate_id,
            &changes,
            expected_version,
        )?;

        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar(&self.statements.latest_version)
            .bind(aggregate_type)
            .bind(aggregate_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        check_expected_version(
            aggregate_type,
            aggregate_id,
            current.map(Version::new),
            changes.len(),
            expected_version,
        )?;

        for change in &changes {
            sqlx::query(&self.statements.insert)
                .bind(aggregate_type)
                .bind(aggregate_id.as_uuid())
                .bind(change.version.as_i64())
                .bind(&change.payload_type)
                .bind(change.transaction_id.as_str())
                .bind(&change.payload)
                .bind(change.created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| insert_error(e, aggregate_type, aggregate_id, change.version))?;
        }

        tx.commit()
            .await
            .map_err(|e| insert_error(e, aggregate_type, aggregate_id, expected_version))?;

        metrics::counter!("event_store_appends_total", "backend" => "postgres").increment(1);
        tracing::debug!(version = %expected_version, "appended changes");
        Ok(expected_version)
    }

    async fn fetch(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredChange>> {
        let rows = sqlx::query(&self.statements.fetch)
            .bind(aggregate_type)
            .bind(aggregate_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_change).collect()
    }

    async fn latest_version(
        &self,
        aggregate_type: &str,
        aggregate_id: AggregateId,
    ) -> Result<Option<Version>> {
        let version: Option<i64> = sqlx::query_scalar(&self.statements.latest_version)
            .bind(aggregate_type)
            .bind(aggregate_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(version.map(Version::new))
    }
}
