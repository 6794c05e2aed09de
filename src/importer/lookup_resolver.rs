// ==========================================
// 库存台账分析系统 - 维度解析器
// ==========================================
// 职责: 维度去重 + 幂等写入 + code → 代理键解析
// 红线: 唯一把业务编码转换为代理键的组件
// 缓存: 仅缓存命中的代理键，生命周期为一次导入
// ==========================================

use crate::domain::dimension::{DimensionCode, MaterialRecord, PeriodLabel};
use crate::domain::import::LookupStats;
use crate::domain::ledger::LedgerRow;
use crate::domain::types::Dimension;
use crate::importer::error::ImportResult;
use crate::repository::dimension_repo::{
    find_id_tx, insert_group_tx, insert_location_tx, insert_material_tx, insert_period_tx,
    insert_simple_dimension_tx,
};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, instrument};

/// 按文件顺序提取去重后的 (code, 附带值)，同 code 首条生效
fn distinct_by_code<K, V, F>(rows: &[LedgerRow], extract: F) -> Vec<(K, V)>
where
    K: Eq + Hash + Clone,
    F: Fn(&LedgerRow) -> Option<(K, V)>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if let Some((code, value)) = extract(row) {
            if seen.insert(code.clone()) {
                out.push((code, value));
            }
        }
    }
    out
}

/// 由台账行构造物料写入结构（缺少标识时为 None）
pub fn material_record(row: &LedgerRow) -> Option<MaterialRecord> {
    Some(MaterialRecord {
        code: row.material_code?,
        description: row.material_desc.clone()?,
        group_code: row.group_code,
        type_code: row.type_code,
        unit: row.unit.clone(),
        status: row.status.clone(),
        min_stock_control: row.min_stock_control,
        min_stock: row.min_stock,
        max_stock_control: row.max_stock_control,
        max_stock: row.max_stock,
        xyz_curve: row.xyz_curve.clone(),
    })
}

// ==========================================
// LookupResolver
// ==========================================
#[derive(Debug, Default)]
pub struct LookupResolver {
    cache: HashMap<(Dimension, DimensionCode), i64>,
}

impl LookupResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已缓存的代理键数量
    pub fn cached_keys(&self) -> usize {
        self.cache.len()
    }

    /// 解析代理键
    ///
    /// # 返回
    /// - Some(id): 维度行存在
    /// - None: 维度行不存在（不缓存，后续写入后可再次解析）
    pub fn resolve(
        &mut self,
        conn: &Connection,
        dimension: Dimension,
        code: &DimensionCode,
    ) -> ImportResult<Option<i64>> {
        let key = (dimension, code.clone());
        if let Some(id) = self.cache.get(&key) {
            return Ok(Some(*id));
        }

        let id = find_id_tx(conn, dimension, code)?;
        if let Some(id) = id {
            self.cache.insert(key, id);
        }
        Ok(id)
    }

    fn resolve_opt(
        &mut self,
        conn: &Connection,
        dimension: Dimension,
        code: Option<DimensionCode>,
    ) -> ImportResult<Option<i64>> {
        match code {
            Some(code) => self.resolve(conn, dimension, &code),
            None => Ok(None),
        }
    }

    /// 写入 (code, description) 型维度
    fn insert_simple<K, F>(
        &mut self,
        conn: &Connection,
        rows: &[LedgerRow],
        dimension: Dimension,
        stats: &mut LookupStats,
        extract: F,
    ) -> ImportResult<()>
    where
        K: Eq + Hash + Clone + Into<DimensionCode>,
        F: Fn(&LedgerRow) -> Option<(K, Option<String>)>,
    {
        let mut inserted = 0;
        for (code, description) in distinct_by_code(rows, extract) {
            let code: DimensionCode = code.into();
            if insert_simple_dimension_tx(conn, dimension, &code, description.as_deref())? {
                inserted += 1;
            }
        }
        stats.record(dimension, inserted);
        Ok(())
    }

    /// 写入全部参考维度与物料
    ///
    /// 顺序: 期间 → 物料族 → 物料组 → 类型 → 仓库 → 库位 → SPED → 科目 → NCM → 标识 → 物料
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub fn populate(&mut self, conn: &Connection, rows: &[LedgerRow]) -> ImportResult<LookupStats> {
        let mut stats = LookupStats::default();

        // ===== 期间 =====
        let mut inserted = 0;
        for (label, _) in distinct_by_code(rows, |r| r.period.clone().map(|p| (p, ()))) {
            if insert_period_tx(conn, &PeriodLabel::parse(&label))? {
                inserted += 1;
            }
        }
        stats.record(Dimension::Period, inserted);

        // ===== 物料族 =====
        self.insert_simple(conn, rows, Dimension::Family, &mut stats, |r| {
            r.family_code.map(|c| (c, r.family_desc.clone()))
        })?;

        // ===== 物料组（解析所属物料族）=====
        let mut inserted = 0;
        for (code, (description, family_code)) in distinct_by_code(rows, |r| {
            r.group_code
                .map(|c| (c, (r.group_desc.clone(), r.family_code)))
        }) {
            let family_id =
                self.resolve_opt(conn, Dimension::Family, family_code.map(DimensionCode::from))?;
            if insert_group_tx(conn, code, description.as_deref(), family_id)? {
                inserted += 1;
            }
        }
        stats.record(Dimension::Group, inserted);

        // ===== 物料类型 / 仓库 =====
        self.insert_simple(conn, rows, Dimension::MaterialType, &mut stats, |r| {
            r.type_code.map(|c| (c, r.type_desc.clone()))
        })?;
        self.insert_simple(conn, rows, Dimension::Warehouse, &mut stats, |r| {
            r.warehouse_code.map(|c| (c, r.warehouse_desc.clone()))
        })?;

        // ===== 库位（携带仓库编码，空编码跳过）=====
        let mut inserted = 0;
        for (code, (description, warehouse_code)) in distinct_by_code(rows, |r| {
            r.location_code
                .clone()
                .map(|c| (c, (r.location_desc.clone(), r.warehouse_code)))
        }) {
            if insert_location_tx(conn, &code, description.as_deref(), warehouse_code)? {
                inserted += 1;
            }
        }
        stats.record(Dimension::Location, inserted);

        // ===== 税务 / 会计 =====
        self.insert_simple(conn, rows, Dimension::SpedClassification, &mut stats, |r| {
            r.sped_code.map(|c| (c, r.sped_desc.clone()))
        })?;
        self.insert_simple(conn, rows, Dimension::AccountingAccount, &mut stats, |r| {
            r.account_code.map(|c| (c, r.account_desc.clone()))
        })?;
        self.insert_simple(conn, rows, Dimension::FiscalClassification, &mut stats, |r| {
            r.ncm
                .clone()
                .map(|c| (DimensionCode::Text(c), r.fiscal_desc.clone()))
        })?;
        self.insert_simple(conn, rows, Dimension::Identification, &mut stats, |r| {
            r.identification_code
                .map(|c| (c, r.identification_desc.clone()))
        })?;

        // ===== 物料 =====
        let materials = self.populate_materials(conn, rows)?;
        stats.record(Dimension::Material, materials);

        debug!(inserted = stats.total(), cached = self.cached_keys(), "维度写入完成");
        Ok(stats)
    }

    /// 写入物料（分块模式每块调用）
    ///
    /// 物料组/类型不存在时外键为 NULL
    pub fn populate_materials(&mut self, conn: &Connection, rows: &[LedgerRow]) -> ImportResult<usize> {
        let mut inserted = 0;
        for (_, material) in distinct_by_code(rows, |r| material_record(r).map(|m| (m.code, m))) {
            let group_id =
                self.resolve_opt(conn, Dimension::Group, material.group_code.map(DimensionCode::from))?;
            let type_id = self.resolve_opt(
                conn,
                Dimension::MaterialType,
                material.type_code.map(DimensionCode::from),
            )?;
            if insert_material_tx(conn, &material, group_id, type_id)? {
                inserted += 1;
            }
        }
        Ok(inserted)
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

    fn ledger_row(material: i64, group: Option<i64>, family: Option<i64>) -> LedgerRow {
        LedgerRow {
            period: Some("jan/23".to_string()),
            family_code: family,
            family_desc: family.map(|_| "FAMILIA".to_string()),
            group_code: group,
            group_desc: group.map(|_| "GRUPO".to_string()),
            material_code: Some(material),
            material_desc: Some(format!("MATERIAL {}", material)),
            location_code: Some("A1".to_string()),
            warehouse_code: Some(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_populate_is_idempotent() {
        let conn = conn();
        let rows = vec![
            ledger_row(1, Some(10), Some(100)),
            ledger_row(2, Some(10), Some(100)),
        ];

        let mut resolver = LookupResolver::new();
        let first = resolver.populate(&conn, &rows).unwrap();
        assert_eq!(first.periods, 1);
        assert_eq!(first.families, 1);
        assert_eq!(first.groups, 1);
        assert_eq!(first.locations, 1);
        assert_eq!(first.materials, 2);

        let mut resolver = LookupResolver::new();
        let second = resolver.populate(&conn, &rows).unwrap();
        assert_eq!(second.total(), 0);
    }

    #[test]
    fn test_group_links_family_and_material_links_group() {
        let conn = conn();
        let rows = vec![ledger_row(1, Some(10), Some(100))];
        let mut resolver = LookupResolver::new();
        resolver.populate(&conn, &rows).unwrap();

        let family_id: Option<i64> = conn
            .query_row("SELECT family_id FROM material_groups WHERE code = 10", [], |r| r.get(0))
            .unwrap();
        assert!(family_id.is_some());

        let group_id: Option<i64> = conn
            .query_row("SELECT group_id FROM materials WHERE code = 1", [], |r| r.get(0))
            .unwrap();
        assert!(group_id.is_some());
    }

    #[test]
    fn test_group_without_family_gets_null_fk() {
        let conn = conn();
        let rows = vec![ledger_row(1, Some(10), None)];
        let mut resolver = LookupResolver::new();
        resolver.populate(&conn, &rows).unwrap();

        let family_id: Option<i64> = conn
            .query_row("SELECT family_id FROM material_groups WHERE code = 10", [], |r| r.get(0))
            .unwrap();
        assert_eq!(family_id, None);
    }

    #[test]
    fn test_resolve_does_not_cache_misses() {
        let conn = conn();
        let mut resolver = LookupResolver::new();
        let code = DimensionCode::from(1);
        assert_eq!(resolver.resolve(&conn, Dimension::Material, &code).unwrap(), None);
        assert_eq!(resolver.cached_keys(), 0);

        resolver
            .populate_materials(&conn, &[ledger_row(1, None, None)])
            .unwrap();
        assert!(resolver.resolve(&conn, Dimension::Material, &code).unwrap().is_some());
        assert_eq!(resolver.cached_keys(), 1);
    }
}
