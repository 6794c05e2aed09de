// ==========================================
// 库存台账分析系统 - 台账行模型
// ==========================================
// 职责: 固定 32 列布局 + 原始记录 + 清洗后的台账行
// 生命周期: 仅在导入流程内
// ==========================================

use serde::{Deserialize, Serialize};

/// 台账文件固定列数
pub const LEDGER_COLUMN_COUNT: usize = 32;

// ==========================================
// LedgerColumn - 台账列（按位置）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerColumn {
    Period,
    FamilyCode,
    FamilyDesc,
    GroupCode,
    GroupDesc,
    MaterialCode,
    MaterialDesc,
    TypeCode,
    TypeDesc,
    Status,
    Location,
    LocationDesc,
    LocationCode,
    WarehouseCode,
    WarehouseDesc,
    Unit,
    Quantity,
    AverageCost,
    TotalValue,
    SpedCode,
    SpedDesc,
    MinStockControl,
    MinStock,
    MaxStockControl,
    MaxStock,
    AccountCode,
    AccountDesc,
    Ncm,
    FiscalDesc,
    IdentificationCode,
    IdentificationDesc,
    XyzCurve,
}

impl LedgerColumn {
    /// 文件中的列顺序
    pub const ALL: [LedgerColumn; LEDGER_COLUMN_COUNT] = [
        LedgerColumn::Period,
        LedgerColumn::FamilyCode,
        LedgerColumn::FamilyDesc,
        LedgerColumn::GroupCode,
        LedgerColumn::GroupDesc,
        LedgerColumn::MaterialCode,
        LedgerColumn::MaterialDesc,
        LedgerColumn::TypeCode,
        LedgerColumn::TypeDesc,
        LedgerColumn::Status,
        LedgerColumn::Location,
        LedgerColumn::LocationDesc,
        LedgerColumn::LocationCode,
        LedgerColumn::WarehouseCode,
        LedgerColumn::WarehouseDesc,
        LedgerColumn::Unit,
        LedgerColumn::Quantity,
        LedgerColumn::AverageCost,
        LedgerColumn::TotalValue,
        LedgerColumn::SpedCode,
        LedgerColumn::SpedDesc,
        LedgerColumn::MinStockControl,
        LedgerColumn::MinStock,
        LedgerColumn::MaxStockControl,
        LedgerColumn::MaxStock,
        LedgerColumn::AccountCode,
        LedgerColumn::AccountDesc,
        LedgerColumn::Ncm,
        LedgerColumn::FiscalDesc,
        LedgerColumn::IdentificationCode,
        LedgerColumn::IdentificationDesc,
        LedgerColumn::XyzCurve,
    ];

    /// 列位置（0 起）
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// 标准列名（日志/DQ 提示用）
    pub fn name(&self) -> &'static str {
        match self {
            LedgerColumn::Period => "period",
            LedgerColumn::FamilyCode => "family_code",
            LedgerColumn::FamilyDesc => "family_desc",
            LedgerColumn::GroupCode => "group_code",
            LedgerColumn::GroupDesc => "group_desc",
            LedgerColumn::MaterialCode => "material_code",
            LedgerColumn::MaterialDesc => "material_desc",
            LedgerColumn::TypeCode => "type_code",
            LedgerColumn::TypeDesc => "type_desc",
            LedgerColumn::Status => "status",
            LedgerColumn::Location => "location",
            LedgerColumn::LocationDesc => "location_desc",
            LedgerColumn::LocationCode => "location_code",
            LedgerColumn::WarehouseCode => "warehouse_code",
            LedgerColumn::WarehouseDesc => "warehouse_desc",
            LedgerColumn::Unit => "unit",
            LedgerColumn::Quantity => "quantity",
            LedgerColumn::AverageCost => "average_cost",
            LedgerColumn::TotalValue => "total_value",
            LedgerColumn::SpedCode => "sped_code",
            LedgerColumn::SpedDesc => "sped_desc",
            LedgerColumn::MinStockControl => "min_stock_control",
            LedgerColumn::MinStock => "min_stock",
            LedgerColumn::MaxStockControl => "max_stock_control",
            LedgerColumn::MaxStock => "max_stock",
            LedgerColumn::AccountCode => "account_code",
            LedgerColumn::AccountDesc => "account_desc",
            LedgerColumn::Ncm => "ncm",
            LedgerColumn::FiscalDesc => "fiscal_desc",
            LedgerColumn::IdentificationCode => "identification_code",
            LedgerColumn::IdentificationDesc => "identification_desc",
            LedgerColumn::XyzCurve => "xyz_curve",
        }
    }
}

// ==========================================
// RawLedgerRecord - 文件解析产物
// ==========================================
// values 按 LedgerColumn::ALL 顺序排列，缺失列为 None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLedgerRecord {
    pub row_number: usize,
    pub values: Vec<Option<String>>,
}

impl RawLedgerRecord {
    pub fn get(&self, column: LedgerColumn) -> Option<&str> {
        self.values
            .get(column.index())
            .and_then(|v| v.as_deref())
    }
}

// ==========================================
// LedgerRow - 类型转换与清洗后的台账行
// ==========================================
// 数值列不可解析时为 None（不拒绝整行）
// material_code / material_desc 缺失的行在清洗阶段被剔除
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub row_number: usize,

    // ===== 期间 =====
    pub period: Option<String>,

    // ===== 分类层级 =====
    pub family_code: Option<i64>,
    pub family_desc: Option<String>,
    pub group_code: Option<i64>,
    pub group_desc: Option<String>,
    pub type_code: Option<i64>,
    pub type_desc: Option<String>,

    // ===== 物料 =====
    pub material_code: Option<i64>,
    pub material_desc: Option<String>,
    pub status: Option<String>,
    pub unit: Option<String>,
    pub min_stock_control: Option<bool>,
    pub min_stock: Option<f64>,
    pub max_stock_control: Option<bool>,
    pub max_stock: Option<f64>,
    pub xyz_curve: Option<String>,

    // ===== 仓库 / 库位 =====
    pub location_code: Option<String>,
    pub location_desc: Option<String>,
    pub warehouse_code: Option<i64>,
    pub warehouse_desc: Option<String>,

    // ===== 度量 =====
    pub quantity: Option<f64>,
    pub average_cost: Option<f64>,
    pub total_value: Option<f64>,

    // ===== 税务 / 会计 =====
    pub sped_code: Option<i64>,
    pub sped_desc: Option<String>,
    pub account_code: Option<i64>,
    pub account_desc: Option<String>,
    pub ncm: Option<String>,
    pub fiscal_desc: Option<String>,
    pub identification_code: Option<i64>,
    pub identification_desc: Option<String>,
}

impl LedgerRow {
    /// 是否具备入库所需的物料标识
    pub fn has_material_identity(&self) -> bool {
        self.material_code.is_some() && self.material_desc.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_matches_index() {
        for (idx, column) in LedgerColumn::ALL.iter().enumerate() {
            assert_eq!(column.index(), idx, "column {}", column.name());
        }
        assert_eq!(LedgerColumn::XyzCurve.index(), LEDGER_COLUMN_COUNT - 1);
    }

    #[test]
    fn test_raw_record_get_missing_column() {
        let record = RawLedgerRecord {
            row_number: 1,
            values: vec![Some("jan/23".to_string())],
        };
        assert_eq!(record.get(LedgerColumn::Period), Some("jan/23"));
        assert_eq!(record.get(LedgerColumn::MaterialCode), None);
    }

    #[test]
    fn test_material_identity() {
        let mut row = LedgerRow {
            material_code: Some(10),
            ..Default::default()
        };
        assert!(!row.has_material_identity());
        row.material_desc = Some("PARAFUSO".to_string());
        assert!(row.has_material_identity());
    }
}
