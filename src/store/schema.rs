//! Database schema definitions using sea-query.
//!
//! Table and column identifiers for type-safe query building, plus the DDL
//! run by `PostgresDefinitionStore::migrate`.

use sea_query::Iden;

/// Error definitions table schema.
#[derive(Iden)]
pub enum ErrorDefinitions {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "code"]
    Code,
    #[iden = "name"]
    Name,
    #[iden = "grpc_status"]
    GrpcStatus,
    #[iden = "message"]
    Message,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// SQL for creating the definitions table.
pub const CREATE_DEFINITIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS error_definitions (
    id BIGSERIAL PRIMARY KEY,
    code INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL UNIQUE,
    grpc_status INTEGER NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// SQL for the trigger function emitting one NOTIFY per row-level change.
/// The payload is the JSON shape decoded by the Postgres change feed; the
/// channel name is passed as the trigger argument.
pub const CREATE_NOTIFY_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION error_definitions_notify() RETURNS trigger AS $$
BEGIN
    PERFORM pg_notify(
        TG_ARGV[0],
        json_build_object(
            'schema', TG_TABLE_SCHEMA,
            'table', TG_TABLE_NAME,
            'action', lower(TG_OP)
        )::text
    );
    RETURN NULL;
END;
$$ LANGUAGE plpgsql
"#;

/// SQL for dropping the change trigger before recreating it.
pub const DROP_CHANGE_TRIGGER: &str =
    "DROP TRIGGER IF EXISTS error_definitions_changed ON error_definitions";

/// Render the change trigger DDL for the given NOTIFY channel.
pub fn create_change_trigger(channel: &str) -> String {
    format!(
        "CREATE TRIGGER error_definitions_changed \
         AFTER INSERT OR UPDATE OR DELETE ON error_definitions \
         FOR EACH ROW EXECUTE FUNCTION error_definitions_notify('{}')",
        channel.replace('\'', "''")
    )
}
