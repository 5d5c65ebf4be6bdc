//! Schema Introspection Module
//!
//! Reads the live table/column layout of a project's data source. The drift
//! engine only depends on [`LiveSchemaFetcher`]; the PostgreSQL introspector
//! here is the default implementation.

use crate::db::queries;
use crate::error::AppError;
use crate::models::{ColumnSnapshot, Project, TableSnapshot};
use async_trait::async_trait;
use tracing::debug;

/// Fetches the current table/column list of a project's external data source
#[async_trait]
pub trait LiveSchemaFetcher: Send + Sync {
    async fn fetch_tables(&self, project: &Project) -> Result<Vec<TableSnapshot>, AppError>;
}

/// One row of `information_schema.columns`
#[derive(Debug, Clone)]
pub struct LiveColumnRow {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub data_type: String,
}

/// Schema introspector for PostgreSQL
pub struct PostgresIntrospector;

impl PostgresIntrospector {
    /// Introspect tables and columns of the given schemas
    pub async fn introspect_tables(
        client: &deadpool_postgres::Client,
        schemas: &[String],
    ) -> Result<Vec<TableSnapshot>, AppError> {
        let rows = client.query(queries::LIVE_COLUMNS, &[&schemas]).await?;

        let columns: Vec<LiveColumnRow> = rows
            .iter()
            .map(|row| LiveColumnRow {
                schema: row.get("table_schema"),
                table: row.get("table_name"),
                column: row.get("column_name"),
                data_type: row.get("data_type"),
            })
            .collect();

        let tables = Self::group_columns(columns);

        debug!(
            "Introspected {} tables across schemas [{}]",
            tables.len(),
            schemas.join(", ")
        );

        Ok(tables)
    }

    /// Fold ordered column rows into table snapshots.
    ///
    /// Tables outside `public` are named `schema.table` so the same table
    /// name in two schemas never collides.
    pub fn group_columns(rows: Vec<LiveColumnRow>) -> Vec<TableSnapshot> {
        let mut tables: Vec<TableSnapshot> = Vec::new();

        for row in rows {
            let name = Self::qualified_name(&row.schema, &row.table);
            let column = ColumnSnapshot::new(row.column, row.data_type);

            match tables.last_mut() {
                Some(table) if table.name == name => table.columns.push(column),
                _ => tables.push(TableSnapshot::new(name, vec![column])),
            }
        }

        tables
    }

    fn qualified_name(schema: &str, table: &str) -> String {
        if schema == "public" {
            table.to_string()
        } else {
            format!("{}.{}", schema, table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(schema: &str, table: &str, column: &str, data_type: &str) -> LiveColumnRow {
        LiveColumnRow {
            schema: schema.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            data_type: data_type.to_string(),
        }
    }

    #[test]
    fn test_group_columns_preserves_order() {
        let tables = PostgresIntrospector::group_columns(vec![
            row("public", "customers", "id", "integer"),
            row("public", "customers", "email", "text"),
            row("public", "orders", "id", "integer"),
            row("sales", "orders", "amount", "numeric"),
        ]);

        assert_eq!(
            tables,
            vec![
                TableSnapshot::new(
                    "customers",
                    vec![
                        ColumnSnapshot::new("id", "integer"),
                        ColumnSnapshot::new("email", "text"),
                    ]
                ),
                TableSnapshot::new("orders", vec![ColumnSnapshot::new("id", "integer")]),
                TableSnapshot::new("sales.orders", vec![ColumnSnapshot::new("amount", "numeric")]),
            ]
        );
    }

    #[test]
    fn test_group_columns_empty() {
        assert!(PostgresIntrospector::group_columns(vec![]).is_empty());
    }
}
