// ==========================================
// 库存台账分析系统 - 分析查询仓储
// ==========================================
// 职责: 只读查询（事实视图 / 物料历史 / 汇总报表）
// 期间排序: 已解析期间按 (年, 月)，未解析期间置后
// ==========================================

use crate::domain::analytics::FactView;
use crate::domain::report::{
    FamilyMaterialCount, LowStockMaterial, MaterialValueRank, PeriodStock, StoreOverview,
    WarehouseStock,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const FACT_VIEW_SELECT: &str = r#"
    SELECT f.id, m.code, m.description, m.unit,
           fam.description, g.description, w.description,
           p.label, p.year, p.month,
           f.quantity, f.average_cost, f.total_value
    FROM stock_facts f
    JOIN materials m ON m.id = f.material_id
    LEFT JOIN material_groups g ON g.id = m.group_id
    LEFT JOIN families fam ON fam.id = g.family_id
    LEFT JOIN warehouses w ON w.id = f.warehouse_id
    LEFT JOIN periods p ON p.id = f.period_id
"#;

const PERIOD_ORDER: &str = "p.year IS NULL, p.year, p.month, p.label";

pub struct AnalyticsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AnalyticsRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事实视图
    // ==========================================

    /// 加载完整事实视图（分析引擎输入）
    pub fn load_fact_view(&self) -> RepositoryResult<Vec<FactView>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY f.id", FACT_VIEW_SELECT);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_fact_view)?;
        let facts = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(rows = facts.len(), "事实视图已加载");
        Ok(facts)
    }

    /// 单物料历史（按期间时间顺序）
    pub fn material_history(&self, material_code: i64) -> RepositoryResult<Vec<FactView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE m.code = ?1 ORDER BY {}, f.id",
            FACT_VIEW_SELECT, PERIOD_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![material_code], map_fact_view)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 汇总报表
    // ==========================================

    /// 库内各表记录数
    pub fn overview(&self) -> RepositoryResult<StoreOverview> {
        let conn = self.get_conn()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        };
        Ok(StoreOverview {
            materials: count("materials")?,
            families: count("families")?,
            groups: count("material_groups")?,
            warehouses: count("warehouses")?,
            periods: count("periods")?,
            stock_facts: count("stock_facts")?,
        })
    }

    /// 各物料族的物料数（降序）
    pub fn materials_per_family(&self) -> RepositoryResult<Vec<FamilyMaterialCount>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT fam.description, COUNT(m.id) AS material_count
            FROM materials m
            LEFT JOIN material_groups g ON g.id = m.group_id
            LEFT JOIN families fam ON fam.id = g.family_id
            GROUP BY fam.id
            ORDER BY material_count DESC, fam.description
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FamilyMaterialCount {
                family: row.get(0)?,
                material_count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 各期间库存汇总（时间顺序）
    pub fn stock_per_period(&self) -> RepositoryResult<Vec<PeriodStock>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT p.label, p.year, p.month,
                   COUNT(DISTINCT f.material_id),
                   COALESCE(SUM(f.quantity), 0),
                   COALESCE(SUM(f.total_value), 0),
                   AVG(f.average_cost)
            FROM periods p
            JOIN stock_facts f ON f.period_id = p.id
            GROUP BY p.id
            ORDER BY {}
            "#,
            PERIOD_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(PeriodStock {
                label: row.get(0)?,
                year: row.get(1)?,
                month: row.get(2)?,
                material_count: row.get(3)?,
                total_quantity: row.get(4)?,
                total_value: row.get(5)?,
                average_cost: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 金额最高的物料
    pub fn top_materials_by_value(&self, limit: usize) -> RepositoryResult<Vec<MaterialValueRank>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT m.code, m.description, fam.description,
                   COALESCE(SUM(f.total_value), 0) AS value,
                   COALESCE(SUM(f.quantity), 0),
                   AVG(f.average_cost)
            FROM materials m
            JOIN stock_facts f ON f.material_id = m.id
            LEFT JOIN material_groups g ON g.id = m.group_id
            LEFT JOIN families fam ON fam.id = g.family_id
            GROUP BY m.id
            ORDER BY value DESC, m.code
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(MaterialValueRank {
                material_code: row.get(0)?,
                material_desc: row.get(1)?,
                family: row.get(2)?,
                total_value: row.get(3)?,
                total_quantity: row.get(4)?,
                average_cost: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 库存不高于 min × (1 + margin) 的受控物料
    pub fn low_stock_materials(&self, margin: f64) -> RepositoryResult<Vec<LowStockMaterial>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT m.code, m.description, fam.description,
                   COALESCE(SUM(f.quantity), 0) AS current_quantity,
                   m.min_stock,
                   AVG(f.average_cost),
                   COALESCE(SUM(f.total_value), 0)
            FROM materials m
            LEFT JOIN stock_facts f ON f.material_id = m.id
            LEFT JOIN material_groups g ON g.id = m.group_id
            LEFT JOIN families fam ON fam.id = g.family_id
            WHERE m.min_stock_control = 1 AND m.min_stock IS NOT NULL
            GROUP BY m.id
            HAVING current_quantity <= m.min_stock * (1 + ?1)
            ORDER BY current_quantity ASC, m.code
            "#,
        )?;
        let rows = stmt.query_map(params![margin], |row| {
            Ok(LowStockMaterial {
                material_code: row.get(0)?,
                material_desc: row.get(1)?,
                family: row.get(2)?,
                current_quantity: row.get(3)?,
                min_stock: row.get(4)?,
                average_cost: row.get(5)?,
                total_value: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 各仓库库存汇总（金额降序）
    pub fn stock_per_warehouse(&self) -> RepositoryResult<Vec<WarehouseStock>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT w.description,
                   COUNT(DISTINCT f.material_id),
                   COALESCE(SUM(f.quantity), 0),
                   COALESCE(SUM(f.total_value), 0) AS value
            FROM stock_facts f
            LEFT JOIN warehouses w ON w.id = f.warehouse_id
            GROUP BY w.id
            ORDER BY value DESC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(WarehouseStock {
                warehouse: row.get(0)?,
                material_count: row.get(1)?,
                total_quantity: row.get(2)?,
                total_value: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_fact_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<FactView> {
    Ok(FactView {
        fact_id: row.get(0)?,
        material_code: row.get(1)?,
        material_desc: row.get(2)?,
        unit: row.get(3)?,
        family: row.get(4)?,
        group: row.get(5)?,
        warehouse: row.get(6)?,
        period: row.get(7)?,
        year: row.get(8)?,
        month: row.get(9)?,
        quantity: row.get(10)?,
        average_cost: row.get(11)?,
        total_value: row.get(12)?,
    })
}
