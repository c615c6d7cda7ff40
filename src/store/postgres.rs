//! PostgreSQL DefinitionStore implementation.
//!
//! `migrate` provisions the definitions table and the row-change NOTIFY
//! trigger consumed by the Postgres change feed, so a fresh database is
//! usable without out-of-band setup.

use async_trait::async_trait;
use sea_query::{Order, PostgresQueryBuilder, Query};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use super::schema::{
    create_change_trigger, ErrorDefinitions, CREATE_DEFINITIONS_TABLE, CREATE_NOTIFY_FUNCTION,
    DROP_CHANGE_TRIGGER,
};
use super::{DefinitionRecord, DefinitionStore, Result};

/// PostgreSQL implementation of DefinitionStore.
pub struct PostgresDefinitionStore {
    pool: PgPool,
}

impl PostgresDefinitionStore {
    /// Create a new PostgreSQL definition store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the definitions table and its change-notification trigger.
    ///
    /// Idempotent; safe to run on every startup. `channel` is the NOTIFY
    /// channel the trigger publishes to.
    pub async fn migrate(&self, channel: &str) -> Result<()> {
        sqlx::query(CREATE_DEFINITIONS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_NOTIFY_FUNCTION)
            .execute(&self.pool)
            .await?;
        sqlx::query(DROP_CHANGE_TRIGGER).execute(&self.pool).await?;
        sqlx::query(&create_change_trigger(channel))
            .execute(&self.pool)
            .await?;
        info!(channel, "definition schema ready");
        Ok(())
    }
}

#[async_trait]
impl DefinitionStore for PostgresDefinitionStore {
    async fn fetch_all(&self) -> Result<Vec<DefinitionRecord>> {
        let query = Query::select()
            .columns([
                ErrorDefinitions::Code,
                ErrorDefinitions::Name,
                ErrorDefinitions::GrpcStatus,
                ErrorDefinitions::Message,
                ErrorDefinitions::CreatedAt,
                ErrorDefinitions::UpdatedAt,
            ])
            .from(ErrorDefinitions::Table)
            .order_by(ErrorDefinitions::Code, Order::Asc)
            .to_string(PostgresQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(DefinitionRecord {
                code: row.get("code"),
                name: row.get("name"),
                status: row.get("grpc_status"),
                message: row.get("message"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }
        debug!(count = records.len(), "fetched definitions");
        Ok(records)
    }
}
