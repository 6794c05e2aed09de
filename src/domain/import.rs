// ==========================================
// 库存台账分析系统 - 导入批次模型
// ==========================================
// 职责: 维度写入统计 + 导入汇总（对应 import_batch 表）
// ==========================================

use crate::domain::types::{Dimension, LoadMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// LookupStats - 维度新增行数
// ==========================================
// 只统计本次真正写入的行；INSERT OR IGNORE 命中已存在 code 时不计数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStats {
    pub periods: usize,
    pub families: usize,
    pub groups: usize,
    pub material_types: usize,
    pub warehouses: usize,
    pub locations: usize,
    pub sped_classifications: usize,
    pub accounting_accounts: usize,
    pub fiscal_classifications: usize,
    pub identifications: usize,
    pub materials: usize,
}

impl LookupStats {
    pub fn record(&mut self, dimension: Dimension, inserted: usize) {
        let slot = match dimension {
            Dimension::Period => &mut self.periods,
            Dimension::Family => &mut self.families,
            Dimension::Group => &mut self.groups,
            Dimension::MaterialType => &mut self.material_types,
            Dimension::Warehouse => &mut self.warehouses,
            Dimension::Location => &mut self.locations,
            Dimension::SpedClassification => &mut self.sped_classifications,
            Dimension::AccountingAccount => &mut self.accounting_accounts,
            Dimension::FiscalClassification => &mut self.fiscal_classifications,
            Dimension::Identification => &mut self.identifications,
            Dimension::Material => &mut self.materials,
        };
        *slot += inserted;
    }

    pub fn merge(&mut self, other: &LookupStats) {
        self.periods += other.periods;
        self.families += other.families;
        self.groups += other.groups;
        self.material_types += other.material_types;
        self.warehouses += other.warehouses;
        self.locations += other.locations;
        self.sped_classifications += other.sped_classifications;
        self.accounting_accounts += other.accounting_accounts;
        self.fiscal_classifications += other.fiscal_classifications;
        self.identifications += other.identifications;
        self.materials += other.materials;
    }

    pub fn total(&self) -> usize {
        self.periods
            + self.families
            + self.groups
            + self.material_types
            + self.warehouses
            + self.locations
            + self.sped_classifications
            + self.accounting_accounts
            + self.fiscal_classifications
            + self.identifications
            + self.materials
    }
}

// ==========================================
// FactLoadStats - 事实写入统计（单块）
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactLoadStats {
    pub inserted: usize,
    pub rejected: usize, // 物料无法解析
    pub failed: usize,   // 单行写库失败
}

impl FactLoadStats {
    pub fn merge(&mut self, other: FactLoadStats) {
        self.inserted += other.inserted;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

// ==========================================
// ImportSummary - 导入汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub file_name: Option<String>,
    pub mode: LoadMode,
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub rejected_rows: usize,
    pub failed_rows: usize,
    pub inserted_facts: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub lookup: LookupStats,
    pub elapsed_ms: u128,
    pub imported_at: DateTime<Utc>,
}

// ==========================================
// ImportBatch - import_batch 表记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub file_name: Option<String>,
    pub load_mode: String,
    pub total_rows: i64,
    pub dropped_rows: i64,
    pub rejected_rows: i64,
    pub failed_rows: i64,
    pub inserted_facts: i64,
    pub failed_chunks: i64,
    pub elapsed_ms: Option<i64>,
    pub imported_at: String,
}
