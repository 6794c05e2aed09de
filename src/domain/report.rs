// ==========================================
// 库存台账分析系统 - 查询报表行
// ==========================================
// 用途: 分析仓储只读查询的返回结构
// ==========================================

use serde::{Deserialize, Serialize};

/// 库内各表记录数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOverview {
    pub materials: i64,
    pub families: i64,
    pub groups: i64,
    pub warehouses: i64,
    pub periods: i64,
    pub stock_facts: i64,
}

/// 物料族下的物料数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMaterialCount {
    pub family: Option<String>,
    pub material_count: i64,
}

/// 期间库存汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStock {
    pub label: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub material_count: i64,
    pub total_quantity: f64,
    pub total_value: f64,
    pub average_cost: Option<f64>,
}

/// 物料金额排行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialValueRank {
    pub material_code: i64,
    pub material_desc: String,
    pub family: Option<String>,
    pub total_value: f64,
    pub total_quantity: f64,
    pub average_cost: Option<f64>,
}

/// 低于最低库存（含余量）的物料
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockMaterial {
    pub material_code: i64,
    pub material_desc: String,
    pub family: Option<String>,
    pub current_quantity: f64,
    pub min_stock: Option<f64>,
    pub average_cost: Option<f64>,
    pub total_value: f64,
}

/// 仓库库存汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub warehouse: Option<String>,
    pub material_count: i64,
    pub total_quantity: f64,
    pub total_value: f64,
}
