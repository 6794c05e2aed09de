// ==========================================
// 库存台账分析系统 - 事实仓储
// ==========================================
// 职责: stock_facts 追加写入 + import_batch 审计记录
// 红线: 事实表只追加，不提供更新/删除单行
// ==========================================

use crate::domain::dimension::StockFact;
use crate::domain::import::{ImportBatch, ImportSummary};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

/// 写入一条库存事实，返回新行 id
pub fn insert_fact_tx(conn: &Connection, fact: &StockFact) -> rusqlite::Result<i64> {
    conn.execute(
        r#"
        INSERT INTO stock_facts (
            period_id, material_id, location_id, warehouse_id,
            sped_classification_id, accounting_account_id,
            fiscal_classification_id, identification_id,
            quantity, average_cost, total_value
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            fact.period_id,
            fact.material_id,
            fact.location_id,
            fact.warehouse_id,
            fact.sped_classification_id,
            fact.accounting_account_id,
            fact.fiscal_classification_id,
            fact.identification_id,
            fact.quantity,
            fact.average_cost,
            fact.total_value,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 写入导入批次审计行
pub fn insert_import_batch_tx(conn: &Connection, summary: &ImportSummary) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO import_batch (
            batch_id, file_name, load_mode, total_rows, dropped_rows,
            rejected_rows, failed_rows, inserted_facts, failed_chunks,
            elapsed_ms, imported_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            summary.batch_id,
            summary.file_name,
            summary.mode.to_string(),
            summary.total_rows as i64,
            summary.dropped_rows as i64,
            summary.rejected_rows as i64,
            summary.failed_rows as i64,
            summary.inserted_facts as i64,
            summary.failed_chunks as i64,
            summary.elapsed_ms as i64,
            summary.imported_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

// ==========================================
// FactRepository
// ==========================================
pub struct FactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FactRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 事实行数
    pub fn count_facts(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM stock_facts", [], |row| row.get(0))?)
    }

    /// 按批次 id 查询导入记录
    pub fn find_import_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let batch = conn
            .query_row(
                r#"
                SELECT batch_id, file_name, load_mode, total_rows, dropped_rows,
                       rejected_rows, failed_rows, inserted_facts, failed_chunks,
                       elapsed_ms, imported_at
                FROM import_batch WHERE batch_id = ?1
                "#,
                params![batch_id],
                map_import_batch,
            )
            .optional()?;
        Ok(batch)
    }

    /// 最近的导入记录（按导入时间倒序）
    pub fn list_import_batches(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, load_mode, total_rows, dropped_rows,
                   rejected_rows, failed_rows, inserted_facts, failed_chunks,
                   elapsed_ms, imported_at
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], map_import_batch)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_import_batch(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImportBatch> {
    Ok(ImportBatch {
        batch_id: row.get(0)?,
        file_name: row.get(1)?,
        load_mode: row.get(2)?,
        total_rows: row.get(3)?,
        dropped_rows: row.get(4)?,
        rejected_rows: row.get(5)?,
        failed_rows: row.get(6)?,
        inserted_facts: row.get(7)?,
        failed_chunks: row.get(8)?,
        elapsed_ms: row.get(9)?,
        imported_at: row.get(10)?,
    })
}
