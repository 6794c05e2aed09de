// ==========================================
// 库存台账分析系统 - 领域类型定义
// ==========================================
// 职责: 导入模式、维度种类、分析结果等级等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 加载模式 (Load Mode)
// ==========================================
// WholeFile: 整文件读入内存，仅适用于小文件
// Chunked: 固定行数分块流式处理，峰值内存 O(chunk_size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadMode {
    WholeFile,
    Chunked { chunk_size: usize },
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::WholeFile => write!(f, "WHOLE_FILE"),
            LoadMode::Chunked { chunk_size } => write!(f, "CHUNKED({})", chunk_size),
        }
    }
}

// ==========================================
// 维度种类 (Dimension)
// ==========================================
// 每个维度对应一张按 code 唯一的参考表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Period,
    Family,
    Group,
    MaterialType,
    Warehouse,
    Location,
    SpedClassification,
    AccountingAccount,
    FiscalClassification,
    Identification,
    Material,
}

impl Dimension {
    /// 对应的表名
    pub fn table(&self) -> &'static str {
        match self {
            Dimension::Period => "periods",
            Dimension::Family => "families",
            Dimension::Group => "material_groups",
            Dimension::MaterialType => "material_types",
            Dimension::Warehouse => "warehouses",
            Dimension::Location => "locations",
            Dimension::SpedClassification => "sped_classifications",
            Dimension::AccountingAccount => "accounting_accounts",
            Dimension::FiscalClassification => "fiscal_classifications",
            Dimension::Identification => "identifications",
            Dimension::Material => "materials",
        }
    }

    /// 唯一键列名
    pub fn code_column(&self) -> &'static str {
        match self {
            Dimension::Period => "label",
            Dimension::FiscalClassification => "ncm",
            _ => "code",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

// ==========================================
// ABC 等级
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl fmt::Display for AbcClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbcClass::A => write!(f, "A"),
            AbcClass::B => write!(f, "B"),
            AbcClass::C => write!(f, "C"),
        }
    }
}

// ==========================================
// 采购建议优先级 / 消耗波动性
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionPriority {
    High,   // 在手 < 0.5 × 再订货点
    Medium, // 其余
}

impl fmt::Display for SuggestionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionPriority::High => write!(f, "HIGH"),
            SuggestionPriority::Medium => write!(f, "MEDIUM"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Variability {
    High,
    Normal,
}

// ==========================================
// 趋势分析
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendMetric {
    Cost,     // 期间平均成本
    Quantity, // 期间数量合计
}

impl fmt::Display for TrendMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendMetric::Cost => write!(f, "COST"),
            TrendMetric::Quantity => write!(f, "QUANTITY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

// ==========================================
// 告警
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    LowMovement,     // 出库合计 < P10
    HighMovement,    // 出库合计 > P90
    UnstablePricing, // 成本标准差 > P80
    Inactive,        // 净数量为 0
}

impl AlertKind {
    pub fn level(&self) -> AlertLevel {
        match self {
            AlertKind::LowMovement => AlertLevel::Warning,
            AlertKind::HighMovement => AlertLevel::Info,
            AlertKind::UnstablePricing => AlertLevel::Error,
            AlertKind::Inactive => AlertLevel::Warning,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::LowMovement => write!(f, "LOW_MOVEMENT"),
            AlertKind::HighMovement => write!(f, "HIGH_MOVEMENT"),
            AlertKind::UnstablePricing => write!(f, "UNSTABLE_PRICING"),
            AlertKind::Inactive => write!(f, "INACTIVE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_table_and_code_column() {
        assert_eq!(Dimension::Group.table(), "material_groups");
        assert_eq!(Dimension::Period.code_column(), "label");
        assert_eq!(Dimension::FiscalClassification.code_column(), "ncm");
        assert_eq!(Dimension::Warehouse.code_column(), "code");
    }

    #[test]
    fn test_load_mode_display() {
        assert_eq!(LoadMode::WholeFile.to_string(), "WHOLE_FILE");
        assert_eq!(
            LoadMode::Chunked { chunk_size: 500 }.to_string(),
            "CHUNKED(500)"
        );
    }

    #[test]
    fn test_alert_level_mapping() {
        assert_eq!(AlertKind::UnstablePricing.level(), AlertLevel::Error);
        assert_eq!(AlertKind::HighMovement.level(), AlertLevel::Info);
    }
}
