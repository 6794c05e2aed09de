// ==========================================
// 库存台账分析系统 - 维度仓储
// ==========================================
// 职责: 维度表的幂等写入 (INSERT OR IGNORE) 与 code → id 查询
// 红线: 已存在的 code 永不更新（首条描述生效）
// ==========================================
// `_tx` 系列函数接收 &Connection（Transaction 可 Deref），
// 供导入器在自身事务内调用
// ==========================================

use crate::domain::dimension::{DimensionCode, MaterialRecord, PeriodLabel};
use crate::domain::types::Dimension;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// 事务内写入函数
// ==========================================

/// 写入 (code, description) 型维度
///
/// 适用: 物料族 / 物料类型 / 仓库 / SPED / 会计科目 / NCM / 标识
/// 返回是否真正写入新行
pub fn insert_simple_dimension_tx(
    conn: &Connection,
    dimension: Dimension,
    code: &DimensionCode,
    description: Option<&str>,
) -> rusqlite::Result<bool> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}, description) VALUES (?1, ?2)",
        dimension.table(),
        dimension.code_column()
    );
    let changed = conn.execute(&sql, params![code, description])?;
    Ok(changed > 0)
}

/// 写入期间（年月由统一解析规则得出）
pub fn insert_period_tx(conn: &Connection, period: &PeriodLabel) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO periods (label, year, month) VALUES (?1, ?2, ?3)",
        params![period.label, period.year, period.month],
    )?;
    Ok(changed > 0)
}

/// 写入物料组（family_id 已由调用方解析，缺失为 NULL）
pub fn insert_group_tx(
    conn: &Connection,
    code: i64,
    description: Option<&str>,
    family_id: Option<i64>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO material_groups (code, description, family_id) VALUES (?1, ?2, ?3)",
        params![code, description, family_id],
    )?;
    Ok(changed > 0)
}

/// 写入库位（携带原始仓库编码）
pub fn insert_location_tx(
    conn: &Connection,
    code: &str,
    description: Option<&str>,
    warehouse_code: Option<i64>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO locations (code, description, warehouse_code) VALUES (?1, ?2, ?3)",
        params![code, description, warehouse_code],
    )?;
    Ok(changed > 0)
}

/// 写入物料（group_id / type_id 已由调用方解析）
pub fn insert_material_tx(
    conn: &Connection,
    material: &MaterialRecord,
    group_id: Option<i64>,
    type_id: Option<i64>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        r#"
        INSERT OR IGNORE INTO materials (
            code, description, group_id, type_id, unit, status,
            min_stock_control, min_stock, max_stock_control, max_stock, xyz_curve
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            material.code,
            material.description,
            group_id,
            type_id,
            material.unit,
            material.status,
            material.min_stock_control,
            material.min_stock,
            material.max_stock_control,
            material.max_stock,
            material.xyz_curve,
        ],
    )?;
    Ok(changed > 0)
}

/// 按业务编码查询代理键
pub fn find_id_tx(
    conn: &Connection,
    dimension: Dimension,
    code: &DimensionCode,
) -> rusqlite::Result<Option<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1",
        dimension.table(),
        dimension.code_column()
    );
    conn.query_row(&sql, params![code], |row| row.get(0)).optional()
}

// ==========================================
// DimensionRepository - 维度仓储（独立连接访问）
// ==========================================
pub struct DimensionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DimensionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询代理键
    pub fn find_id(&self, dimension: Dimension, code: &DimensionCode) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        Ok(find_id_tx(&conn, dimension, code)?)
    }

    /// 维度表行数
    pub fn count(&self, dimension: Dimension) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", dimension.table());
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// 查询维度描述
    pub fn find_description(
        &self,
        dimension: Dimension,
        code: &DimensionCode,
    ) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT description FROM {} WHERE {} = ?1",
            dimension.table(),
            dimension.code_column()
        );
        let desc = conn
            .query_row(&sql, params![code], |row| row.get::<_, Option<String>>(0))
            .optional()?;
        Ok(desc.flatten())
    }
}
