//! SQLite-backed [`LedgerStore`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};

use agromark_core::models::{LedgerRow, SqlResult, SqlRow, SqlValue};
use agromark_core::store::LedgerStore;

/// Unit separator used to pack category names into one column.
const CATEGORY_SEPARATOR: char = '\u{1f}';

const LEDGER_ROWS_SQL: &str = r#"
    SELECT
        mc.id AS id,
        mc."numeroNotaFiscal" AS invoice_number,
        p."razaoSocial" AS supplier_name,
        mc.descricao AS description,
        printf('%.2f', mc."valorTotal") AS total_value,
        GROUP_CONCAT(c.descricao, char(31)) AS categories
    FROM movimento_contas AS mc
    JOIN pessoa AS p ON p.id = mc."fornecedorId"
    LEFT JOIN movimento_classificacao AS mcl ON mcl."movimentoId" = mc.id
    LEFT JOIN classificacao AS c ON c.id = mcl."classificacaoId"
    GROUP BY mc.id
    ORDER BY mc.id
"#;

pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn ledger_rows(&self) -> Result<Vec<LedgerRow>> {
        let rows = sqlx::query(LEDGER_ROWS_SQL).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<LedgerRow> {
                let categories: Option<String> = row.try_get("categories")?;
                Ok(LedgerRow {
                    id: row.try_get("id")?,
                    invoice_number: row.try_get("invoice_number")?,
                    supplier_name: row.try_get("supplier_name")?,
                    description: row.try_get("description")?,
                    categories: categories
                        .map(|c| c.split(CATEGORY_SEPARATOR).map(str::to_string).collect())
                        .unwrap_or_default(),
                    total_value: row.try_get("total_value")?,
                })
            })
            .collect()
    }

    async fn execute_raw(&self, sql: &str) -> Result<SqlResult> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }
}

/// Convert a row of unknown shape, choosing each value's variant from its
/// runtime storage class.
fn decode_row(row: &SqliteRow) -> Result<SqlRow> {
    let mut out = SqlRow::new();

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let kind = raw.type_info().name().to_string();
            match kind.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get_unchecked(index)?),
                "REAL" | "NUMERIC" => SqlValue::Real(row.try_get_unchecked(index)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked(index)?),
                _ => SqlValue::Text(row.try_get_unchecked(index)?),
            }
        };
        out.push(column.name(), value);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::apply_schema;
    use crate::seed::seed_demo;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_store() -> SqliteLedgerStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        seed_demo(&pool).await.unwrap();
        SqliteLedgerStore::new(pool)
    }

    #[tokio::test]
    async fn test_ledger_rows_join_supplier_and_categories() {
        let store = seeded_store().await;
        let rows = store.ledger_rows().await.unwrap();

        assert_eq!(rows.len(), 6);
        let first = &rows[0];
        assert_eq!(first.invoice_number, "000101");
        assert_eq!(first.supplier_name, "Combustíveis do Vale");
        assert_eq!(first.categories, vec!["MANUTENÇÃO E OPERAÇÃO".to_string()]);
        assert_eq!(first.total_value, "4820.50");
        assert!(rows[5].description.is_none());
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_execute_raw_keeps_column_order_and_types() {
        let store = seeded_store().await;
        let result = store
            .execute_raw(
                r#"SELECT COUNT(*) AS total, 'x' AS label, NULL AS nada, 1.5 AS ratio, x'00ff' AS raw
                   FROM pessoa WHERE tipo = 'FORNECEDOR';"#,
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        let names: Vec<&str> = result[0].columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["total", "label", "nada", "ratio", "raw"]);
        assert_eq!(result[0].get("total"), Some(&SqlValue::Integer(5)));
        assert_eq!(result[0].get("label"), Some(&SqlValue::Text("x".into())));
        assert_eq!(result[0].get("nada"), Some(&SqlValue::Null));
        assert_eq!(result[0].get("ratio"), Some(&SqlValue::Real(1.5)));
        assert_eq!(result[0].get("raw"), Some(&SqlValue::Blob(vec![0, 255])));
    }

    #[tokio::test]
    async fn test_execute_raw_surfaces_database_message() {
        let store = seeded_store().await;
        let err = store
            .execute_raw("SELECT * FROM pessoas;")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no such table: pessoas"));
    }

    #[tokio::test]
    async fn test_ping() {
        let store = seeded_store().await;
        assert!(store.ping().await);
    }
}
