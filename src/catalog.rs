//! Catalog access
//!
//! Reads live table definitions and installed trigger names from the MySQL
//! `information_schema`. The generator only depends on the [`Catalog`] trait.

use crate::error::AppResult;
use crate::schema::{Field, Table};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use tracing::debug;

/// Source of table schemas and trigger names
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Columns of `table` in `schema`, in ordinal order; `None` if the table does not exist
    async fn columns(&self, table: &str, schema: &str) -> AppResult<Option<Table>>;

    /// Names of all triggers attached to `table`
    async fn trigger_names(&self, schema: &str, table: &str) -> AppResult<Vec<String>>;
}

// information_schema text columns may come back as binary depending on the
// server collation, so everything is cast to CHAR.
const COLUMNS_QUERY: &str = r#"
    SELECT
        CAST(c.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(c.COLUMN_KEY AS CHAR(16)) AS COLUMN_KEY,
        CAST(c.COLUMN_TYPE AS CHAR) AS COLUMN_TYPE
    FROM information_schema.COLUMNS c
    WHERE c.TABLE_NAME = ? AND c.TABLE_SCHEMA = ?
    ORDER BY c.ORDINAL_POSITION
"#;

const TRIGGERS_QUERY: &str = r#"
    SELECT CAST(t.TRIGGER_NAME AS CHAR(255)) AS TRIGGER_NAME
    FROM information_schema.`TRIGGERS` t
    WHERE t.EVENT_OBJECT_SCHEMA = ? AND t.EVENT_OBJECT_TABLE = ?
"#;

/// Catalog backed by a live MySQL server
pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_field(row: &MySqlRow) -> Result<Field, sqlx::Error> {
        let name: String = row.try_get("COLUMN_NAME")?;
        let data_type: String = row.try_get("COLUMN_TYPE")?;
        let key: Option<String> = row.try_get("COLUMN_KEY")?;
        Ok(Field::new(name, data_type).with_key(key.unwrap_or_default()))
    }
}

#[async_trait]
impl Catalog for MySqlCatalog {
    async fn columns(&self, table: &str, schema: &str) -> AppResult<Option<Table>> {
        let rows: Vec<MySqlRow> = sqlx::query(COLUMNS_QUERY)
            .bind(table)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;

        // MySQL tables always have at least one column
        if rows.is_empty() {
            debug!("Table {}.{} not found in catalog", schema, table);
            return Ok(None);
        }

        let fields = rows
            .iter()
            .map(Self::row_to_field)
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Loaded {} columns for {}.{}", fields.len(), schema, table);
        Ok(Some(Table::new(table, fields)))
    }

    async fn trigger_names(&self, schema: &str, table: &str) -> AppResult<Vec<String>> {
        let rows: Vec<MySqlRow> = sqlx::query(TRIGGERS_QUERY)
            .bind(schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        let names = rows
            .iter()
            .map(|row| row.try_get::<String, _>("TRIGGER_NAME"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Found {} triggers on {}.{}", names.len(), schema, table);
        Ok(names)
    }
}
