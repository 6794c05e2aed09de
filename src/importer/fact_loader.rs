// ==========================================
// 库存台账分析系统 - 事实写入器
// ==========================================
// 职责: 逐行解析外键并追加 stock_facts
// 规则:
// - 物料无法解析 → 拒绝（计数，不写入）
// - 其他维度无法解析 → 外键为 NULL
// - 单行外键解析或写库失败 → warn 并跳过，不中断本块
// ==========================================

use crate::domain::dimension::{DimensionCode, StockFact};
use crate::domain::import::FactLoadStats;
use crate::domain::ledger::LedgerRow;
use crate::domain::types::Dimension;
use crate::importer::error::ImportResult;
use crate::importer::lookup_resolver::LookupResolver;
use crate::repository::fact_repo::insert_fact_tx;
use rusqlite::Connection;
use tracing::{debug, warn};

pub struct FactLoader;

impl FactLoader {
    /// 由台账行构造事实；物料无法解析时返回 None
    pub fn build_fact(
        &self,
        conn: &Connection,
        resolver: &mut LookupResolver,
        row: &LedgerRow,
    ) -> ImportResult<Option<StockFact>> {
        let material_id = match row.material_code {
            Some(code) => resolver.resolve(conn, Dimension::Material, &DimensionCode::from(code))?,
            None => None,
        };
        let material_id = match material_id {
            Some(id) => id,
            None => return Ok(None),
        };

        let mut lookup = |dimension: Dimension, code: Option<DimensionCode>| -> ImportResult<Option<i64>> {
            match code {
                Some(code) => resolver.resolve(conn, dimension, &code),
                None => Ok(None),
            }
        };

        Ok(Some(StockFact {
            period_id: lookup(Dimension::Period, row.period.clone().map(DimensionCode::from))?,
            material_id,
            location_id: lookup(
                Dimension::Location,
                row.location_code.clone().map(DimensionCode::from),
            )?,
            warehouse_id: lookup(Dimension::Warehouse, row.warehouse_code.map(DimensionCode::from))?,
            sped_classification_id: lookup(
                Dimension::SpedClassification,
                row.sped_code.map(DimensionCode::from),
            )?,
            accounting_account_id: lookup(
                Dimension::AccountingAccount,
                row.account_code.map(DimensionCode::from),
            )?,
            fiscal_classification_id: lookup(
                Dimension::FiscalClassification,
                row.ncm.clone().map(DimensionCode::from),
            )?,
            identification_id: lookup(
                Dimension::Identification,
                row.identification_code.map(DimensionCode::from),
            )?,
            quantity: row.quantity,
            average_cost: row.average_cost,
            total_value: row.total_value,
        }))
    }

    /// 写入一批台账行（调用方负责事务）
    pub fn load_rows(
        &self,
        conn: &Connection,
        resolver: &mut LookupResolver,
        rows: &[LedgerRow],
    ) -> ImportResult<FactLoadStats> {
        let mut stats = FactLoadStats::default();

        for row in rows {
            let fact = match self.build_fact(conn, resolver, row) {
                Ok(Some(fact)) => fact,
                Ok(None) => {
                    stats.rejected += 1;
                    debug!(row = row.row_number, material_code = ?row.material_code, "物料未解析，拒绝该行");
                    continue;
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(row = row.row_number, error = %e, "外键解析失败，跳过该行");
                    continue;
                }
            };

            match insert_fact_tx(conn, &fact) {
                Ok(_) => stats.inserted += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(row = row.row_number, error = %e, "事实写入失败，跳过该行");
                }
            }
        }

        if stats.rejected > 0 {
            warn!(rejected_rows = stats.rejected, "存在物料无法解析的行");
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema, DEFAULT_SCHEMA_PATH};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        let schema = format!("{}/{}", env!("CARGO_MANIFEST_DIR"), DEFAULT_SCHEMA_PATH);
        ensure_schema(&conn, &schema).unwrap();
        conn
    }

    #[test]
    fn test_unresolved_material_is_rejected() {
        let conn = conn();
        let mut resolver = LookupResolver::new();
        let row = LedgerRow {
            material_code: Some(42),
            material_desc: Some("X".to_string()),
            quantity: Some(1.0),
            ..Default::default()
        };

        let stats = FactLoader.load_rows(&conn, &mut resolver, &[row]).unwrap();
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_unknown_optional_dimensions_become_null() {
        let conn = conn();
        let mut resolver = LookupResolver::new();
        let row = LedgerRow {
            period: Some("jan/23".to_string()),
            material_code: Some(1),
            material_desc: Some("X".to_string()),
            warehouse_code: Some(77),
            quantity: Some(-3.0),
            ..Default::default()
        };
        resolver.populate_materials(&conn, std::slice::from_ref(&row)).unwrap();

        let stats = FactLoader.load_rows(&conn, &mut resolver, &[row]).unwrap();
        assert_eq!(stats.inserted, 1);

        let (period_id, warehouse_id): (Option<i64>, Option<i64>) = conn
            .query_row("SELECT period_id, warehouse_id FROM stock_facts", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(period_id, None);
        assert_eq!(warehouse_id, None);
    }

    #[test]
    fn test_lookup_failure_skips_only_that_row() {
        let conn = conn();
        let mut resolver = LookupResolver::new();
        let row = |warehouse_code: Option<i64>| LedgerRow {
            material_code: Some(1),
            material_desc: Some("X".to_string()),
            warehouse_code,
            quantity: Some(2.0),
            ..Default::default()
        };
        let rows = vec![row(Some(9)), row(None)];
        resolver.populate_materials(&conn, &rows).unwrap();

        // 同名临时表遮蔽 warehouses，仓库编码查询报错
        conn.execute_batch("CREATE TEMP TABLE warehouses (note TEXT);")
            .unwrap();

        let stats = FactLoader.load_rows(&conn, &mut resolver, &rows).unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.rejected, 0);

        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM main.stock_facts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }
}
