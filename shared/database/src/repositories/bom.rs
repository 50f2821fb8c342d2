//! BOM Repository
//!
//! Loads processed primary BOM rows into Postgres and runs the post-load
//! refresh scripts.

use anyhow::{Context, Result};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};

use bomflow_models::Table;

use crate::tables::{check_identifier, column_type, qualified, SqlValue, STAGING_TABLE};

/// Postgres caps a statement at 65535 bind parameters
const INSERT_BATCH_ROWS: usize = 1000;

const REFRESH_FINAL_SQL: &str = include_str!("../../sql/refresh_final_table.sql");
const INSERT_HISTORY_SQL: &str = include_str!("../../sql/insert_staging_into_history_table.sql");
const REFRESH_CURRENT_SQL: &str = include_str!("../../sql/refresh_final_current_table.sql");

pub struct BomRepository {
    pool: PgPool,
    schema: String,
}

impl BomRepository {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Replace the staging table contents with `table` in one transaction
    pub async fn replace_staging(&self, table: &Table) -> Result<u64> {
        let target = qualified(&self.schema, STAGING_TABLE)?;
        let rows = bind_rows(table)?;

        tracing::info!(table = %target, rows = rows.len(), "Replacing staging rows");

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;

        sqlx::query(&format!("DELETE FROM {}", target))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear {}", target))?;

        let mut inserted = 0;
        for chunk in rows.chunks(INSERT_BATCH_ROWS) {
            let result = insert_query(&target, table.columns(), chunk)
                .build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to load rows into {}", target))?;
            inserted += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit staging load")?;

        tracing::info!(table = %target, rows = inserted, "Staging rows loaded");
        Ok(inserted)
    }

    /// Full load: mirror staging into the final table
    pub async fn refresh_final(&self) -> Result<()> {
        self.run_script("refresh final table", REFRESH_FINAL_SQL).await
    }

    /// Upload load: append staging to the history table
    pub async fn insert_uploads_into_history(&self) -> Result<()> {
        self.run_script("insert staging into history table", INSERT_HISTORY_SQL).await
    }

    /// Rebuild the latest-rows-per-PON table
    pub async fn refresh_final_current(&self) -> Result<()> {
        self.run_script("refresh final current table", REFRESH_CURRENT_SQL).await
    }

    async fn run_script(&self, name: &str, script: &str) -> Result<()> {
        let sql = render_script(script, &self.schema)?;
        tracing::info!(script = name, schema = %self.schema, "Running SQL script");

        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        (&mut *tx)
            .execute(sql.as_str())
            .await
            .with_context(|| format!("Failed to {}", name))?;
        tx.commit().await.with_context(|| format!("Failed to commit {}", name))?;

        tracing::info!(script = name, "SQL script completed");
        Ok(())
    }
}

/// Convert every cell up front so a bad value fails before the transaction
fn bind_rows(table: &Table) -> Result<Vec<Vec<SqlValue>>> {
    let types = table
        .columns()
        .iter()
        .map(|column| {
            column_type(column)
                .map(|(sql_type, _)| sql_type)
                .with_context(|| format!("Column {} is not persisted", column))
        })
        .collect::<Result<Vec<_>>>()?;

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| {
            row.iter()
                .zip(&types)
                .map(|(cell, sql_type)| SqlValue::from_cell(cell, *sql_type))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {} cannot be stored", index))
        })
        .collect()
}

fn insert_query<'a>(target: &str, columns: &[String], rows: &'a [Vec<SqlValue>]) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {} ({}) ", target, columns.join(", ")));

    builder.push_values(rows, |mut values, row| {
        for value in row {
            match value.clone() {
                SqlValue::Text(v) => values.push_bind(v),
                SqlValue::BigInt(v) => values.push_bind(v),
                SqlValue::Double(v) => values.push_bind(v),
                SqlValue::TimestampTz(v) => values.push_bind(v),
            };
        }
    });

    builder
}

fn render_script(script: &str, schema: &str) -> Result<String> {
    check_identifier(schema)?;
    Ok(script.replace("{schema}", schema))
}
