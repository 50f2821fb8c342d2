use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::tables::{check_identifier, create_table_sql, ALL_TABLES, HISTORY_TABLE, STAGING_TABLE};

pub async fn run_postgres_migrations(pool: &PgPool, schema: &str) -> Result<()> {
    tracing::info!(schema = %schema, "Running PostgreSQL migrations");
    check_identifier(schema)?;

    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create schema {}", schema))?;

    for table in ALL_TABLES {
        sqlx::query(&create_table_sql(schema, table)?)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create table {}.{}", schema, table))?;
    }

    for statement in index_statements(schema) {
        sqlx::query(&statement).execute(pool).await?;
    }

    tracing::info!("PostgreSQL migrations completed successfully");
    Ok(())
}

/// The refresh scripts group and join on PON and snapshot time
fn index_statements(schema: &str) -> Vec<String> {
    vec![
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_pon_snapshot ON {schema}.{table}(pon, snapshot_time_utc)",
            schema = schema,
            table = HISTORY_TABLE
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_pon ON {schema}.{table}(pon)",
            schema = schema,
            table = STAGING_TABLE
        ),
    ]
}
