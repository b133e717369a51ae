//! Seed data: the default expense categories and a small demo ledger.
//!
//! Both operations are idempotent. Categories are upserted on their
//! `(descricao, tipo)` key; demo movements are skipped when their invoice
//! number already exists.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Expense categories every installation starts with.
pub const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "MANUTENÇÃO E OPERAÇÃO",
    "INFRAESTRUTURA E UTILIDADES",
    "INSUMOS AGRÍCOLAS",
    "RECURSOS HUMANOS",
    "SERVIÇOS OPERACIONAIS",
    "ADMINISTRATIVAS",
    "SEGUROS E PROTEÇÃO",
    "IMPOSTOS E TAXAS",
    "INVESTIMENTOS",
];

/// Insert the default DESPESA categories. Returns how many were new.
pub async fn seed_categories(pool: &SqlitePool) -> Result<u64> {
    let mut inserted = 0;
    for &descricao in DEFAULT_EXPENSE_CATEGORIES {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO classificacao (tipo, descricao) VALUES ('DESPESA', ?)",
        )
        .bind(descricao)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

const BILLED: (&str, &str, &str) = ("Minha Fazenda LTDA", "Fazenda São José", "12345678000199");

const SUPPLIERS: &[(&str, &str)] = &[
    ("Combustíveis do Vale", "00000000000101"),
    ("Sementes Boa Safra", "00000000000102"),
    ("Fertilizantes Goiás", "00000000000103"),
    ("Tratores e Peças SA", "00000000000104"),
    ("Companhia Energética Rural", "00000000000105"),
];

struct DemoMovement {
    invoice: &'static str,
    supplier: usize,
    issued: &'static str,
    description: Option<&'static str>,
    total: f64,
    category: &'static str,
    installments: &'static [(&'static str, f64, &'static str)],
}

const DEMO_MOVEMENTS: &[DemoMovement] = &[
    DemoMovement {
        invoice: "000101",
        supplier: 0,
        issued: "2024-03-05",
        description: Some("Óleo diesel S10 para tratores e colheitadeira"),
        total: 4820.50,
        category: "MANUTENÇÃO E OPERAÇÃO",
        installments: &[("2024-04-05", 4820.50, "PAGA")],
    },
    DemoMovement {
        invoice: "000102",
        supplier: 1,
        issued: "2024-03-12",
        description: Some("Sementes de soja certificadas"),
        total: 18900.00,
        category: "INSUMOS AGRÍCOLAS",
        installments: &[
            ("2024-04-12", 9450.00, "PAGA"),
            ("2024-05-12", 9450.00, "ABERTA"),
        ],
    },
    DemoMovement {
        invoice: "000103",
        supplier: 2,
        issued: "2024-04-02",
        description: Some("Adubo NPK 04-14-08"),
        total: 12350.00,
        category: "INSUMOS AGRÍCOLAS",
        installments: &[
            ("2024-05-02", 6175.00, "ABERTA"),
            ("2024-06-02", 6175.00, "ABERTA"),
        ],
    },
    DemoMovement {
        invoice: "000104",
        supplier: 3,
        issued: "2024-04-18",
        description: Some("Revisão do trator e troca de filtros"),
        total: 3275.90,
        category: "MANUTENÇÃO E OPERAÇÃO",
        installments: &[("2024-05-18", 3275.90, "ABERTA")],
    },
    DemoMovement {
        invoice: "000105",
        supplier: 4,
        issued: "2024-05-01",
        description: Some("Energia elétrica da sede e dos pivôs de irrigação"),
        total: 2140.37,
        category: "INFRAESTRUTURA E UTILIDADES",
        installments: &[("2024-05-20", 2140.37, "PAGA")],
    },
    DemoMovement {
        invoice: "000106",
        supplier: 0,
        issued: "2024-05-22",
        description: None,
        total: 1530.00,
        category: "MANUTENÇÃO E OPERAÇÃO",
        installments: &[("2024-06-22", 1530.00, "CANCELADA")],
    },
];

/// Counts reported by [`seed_demo`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DemoSeedReport {
    pub people: u64,
    pub movements: u64,
    pub installments: u64,
}

/// Insert demo counterparties, movements and installments.
pub async fn seed_demo(pool: &SqlitePool) -> Result<DemoSeedReport> {
    seed_categories(pool).await?;

    let mut tx = pool.begin().await?;
    let mut report = DemoSeedReport::default();

    report.people += sqlx::query(
        r#"INSERT OR IGNORE INTO pessoa (tipo, "razaoSocial", fantasia, documento)
           VALUES ('FATURADO', ?, ?, ?)"#,
    )
    .bind(BILLED.0)
    .bind(BILLED.1)
    .bind(BILLED.2)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let billed_id: i64 =
        sqlx::query_scalar("SELECT id FROM pessoa WHERE documento = ? AND tipo = 'FATURADO'")
            .bind(BILLED.2)
            .fetch_one(&mut *tx)
            .await?;

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, document) in SUPPLIERS {
        report.people += sqlx::query(
            r#"INSERT OR IGNORE INTO pessoa (tipo, "razaoSocial", fantasia, documento)
               VALUES ('FORNECEDOR', ?, ?, ?)"#,
        )
        .bind(*name)
        .bind(*name)
        .bind(*document)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let id: i64 =
            sqlx::query_scalar("SELECT id FROM pessoa WHERE documento = ? AND tipo = 'FORNECEDOR'")
                .bind(*document)
                .fetch_one(&mut *tx)
                .await?;
        supplier_ids.push(id);
    }

    for movement in DEMO_MOVEMENTS {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT COUNT(*) > 0 FROM movimento_contas WHERE "numeroNotaFiscal" = ?"#,
        )
        .bind(movement.invoice)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            continue;
        }

        let movement_id = sqlx::query(
            r#"INSERT INTO movimento_contas
                 (tipo, "numeroNotaFiscal", "dataEmissao", descricao, "valorTotal", "fornecedorId", "faturadoId")
               VALUES ('APAGAR', ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(movement.invoice)
        .bind(movement.issued)
        .bind(movement.description)
        .bind(movement.total)
        .bind(supplier_ids[movement.supplier])
        .bind(billed_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        report.movements += 1;

        let category_id: i64 = sqlx::query_scalar(
            "SELECT id FROM classificacao WHERE descricao = ? AND tipo = 'DESPESA'",
        )
        .bind(movement.category)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("missing category {}", movement.category))?;

        sqlx::query(
            r#"INSERT INTO movimento_classificacao ("movimentoId", "classificacaoId") VALUES (?, ?)"#,
        )
        .bind(movement_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        for (index, (due, value, status)) in movement.installments.iter().enumerate() {
            let balance = if *status == "PAGA" { 0.0 } else { *value };
            sqlx::query(
                r#"INSERT INTO parcela_contas
                     (identificacao, "dataVencimento", "valorParcela", "valorSaldo", "statusParcela", "movimentoId")
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(format!("{}/{}", index + 1, movement.installments.len()))
            .bind(*due)
            .bind(*value)
            .bind(balance)
            .bind(*status)
            .bind(movement_id)
            .execute(&mut *tx)
            .await?;
            report.installments += 1;
        }
    }

    tx.commit().await?;
    Ok(report)
}

/// Migrate the schema and insert the default categories.
pub async fn run_init(config: &Config) -> Result<u64> {
    migrate::run_migrations(config).await?;
    let pool = db::connect(config).await?;
    let inserted = seed_categories(&pool).await?;
    pool.close().await;
    Ok(inserted)
}

/// Migrate the schema and insert the demo ledger.
pub async fn run_seed_demo(config: &Config) -> Result<DemoSeedReport> {
    migrate::run_migrations(config).await?;
    let pool = db::connect(config).await?;
    let report = seed_demo(&pool).await?;
    pool.close().await;
    Ok(report)
}
