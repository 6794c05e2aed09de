// ==========================================
// 库存台账分析系统 - 分析结果模型
// ==========================================
// 职责: 分析引擎的输入视图与输出结构
// 用途: 引擎只读 FactView，结果直接序列化给展示层
// ==========================================

use crate::domain::dimension::PeriodLabel;
use crate::domain::types::{
    AbcClass, AlertKind, AlertLevel, SuggestionPriority, TrendDirection, TrendMetric, Variability,
};
use serde::{Deserialize, Serialize};

// ==========================================
// FactView - 事实 + 维度描述的物化连接
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactView {
    pub fact_id: i64,
    pub material_code: i64,
    pub material_desc: String,
    pub unit: Option<String>,
    pub family: Option<String>,
    pub group: Option<String>,
    pub warehouse: Option<String>,
    pub period: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub quantity: Option<f64>,
    pub average_cost: Option<f64>,
    pub total_value: Option<f64>,
}

impl FactView {
    /// 由已入库的年月构造期间（不重新解析标签）
    pub fn period_label(&self) -> Option<PeriodLabel> {
        self.period.as_ref().map(|label| PeriodLabel {
            label: label.clone(),
            year: self.year,
            month: self.month,
        })
    }
}

// ==========================================
// KPI 汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuePercentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_value: f64,
    pub material_count: usize,
    pub total_quantity: f64,
    pub value_per_unit: f64,
    pub active_materials: usize,
    pub active_periods: usize,
    pub quantity_per_material: f64,
    pub quantity_per_period: f64,
    pub period_variation: f64,
    pub percentiles: ValuePercentiles,
    pub coefficient_of_variation: f64, // 百分比
    pub seasonality_index: f64,
    pub concentration_index: f64, // Herfindahl
}

// ==========================================
// MaterialMovement - 单物料出入库聚合
// ==========================================
// 约定: 数量 > 0 为入库，< 0 为出库（原始台账未验证此约定）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialMovement {
    pub material_code: i64,
    pub material_desc: String,
    pub rows: usize,
    pub outflow_rows: usize,
    pub inflow: f64,
    pub outflow: f64, // 绝对值
    pub net_quantity: f64,
    pub total_value: f64,
    pub mean_cost: Option<f64>,
    pub cost_std: Option<f64>, // 至少 2 个成本值才有
}

// ==========================================
// ABC 分类
// ==========================================

/// 综合评分分类（出库量 + 金额）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementScore {
    pub material_code: i64,
    pub material_desc: String,
    pub outflow: f64,
    pub total_value: f64,
    pub outflow_score: f64,
    pub value_score: f64,
    pub composite_score: f64,
    pub class: AbcClass,
}

/// 累计金额分类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcEntry {
    pub material_code: i64,
    pub material_desc: String,
    pub total_value: f64,
    pub cumulative_value: f64,
    pub cumulative_share: f64, // 百分比
    pub class: AbcClass,
}

// ==========================================
// 趋势 / 预测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPoint {
    pub label: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub quantity: f64,
    pub total_value: f64,
    pub average_cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendSignal {
    SignificantRise, // 斜率 > 0 且 p < 0.05
    SignificantFall, // 斜率 < 0 且 p < 0.05
    NotSignificant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub material_code: i64,
    pub metric: TrendMetric,
    pub periods: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub p_value: f64,
    pub std_err: f64,
    pub direction: TrendDirection,
    pub signal: TrendSignal,
    pub next_period_forecast: f64,
    /// 启发式置信度 clamp(100 − |slope|×10, 0, 100)，非统计意义
    pub confidence: f64,
    pub moving_average: Vec<Option<f64>>,
    pub points: Vec<PeriodPoint>,
}

impl TrendReport {
    /// 回归线在期间序号 x 处的取值
    pub fn forecast_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendOutcome {
    Computed(TrendReport),
    InsufficientData { periods: usize, required: usize },
}

// ==========================================
// 再订货点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderPoint {
    pub material_code: i64,
    pub rows: usize,
    pub outflow_rows: usize,
    pub average_monthly_consumption: f64,
    pub daily_consumption: f64,
    pub safety_stock: f64,
    pub lead_time_days: f64,
    pub safety_fraction: f64,
    pub reorder_point: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotApplicableReason {
    TooFewRows,
    NoOutflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReorderAssessment {
    Computed(ReorderPoint),
    NotApplicable { reason: NotApplicableReason },
}

// ==========================================
// 采购建议
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseSuggestion {
    pub material_code: i64,
    pub description: String,
    pub estimated_on_hand: f64,
    pub reorder_point: f64,
    pub suggested_quantity: f64,
    pub average_monthly_consumption: f64,
    pub outflow_variation: f64,
    pub priority: SuggestionPriority,
    pub variability: Variability,
}

// ==========================================
// 告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub threshold: f64,
    pub material_codes: Vec<i64>,
    pub message: String,
}

// ==========================================
// 周转机会
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementOpportunities {
    pub low_turnover: Vec<MaterialMovement>,
    pub excess_stock: Vec<MaterialMovement>,
    pub high_movement: Vec<MaterialMovement>,
}
