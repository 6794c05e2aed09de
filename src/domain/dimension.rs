// ==========================================
// 库存台账分析系统 - 维度与事实模型
// ==========================================
// 职责: 维度编码、期间解析、物料与库存事实实体
// 红线: 期间标签只有一条解析规则（入库 / 年月提取 / 排序共用）
// ==========================================

use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// DimensionCode - 维度业务编码
// ==========================================
// 数值编码列落库为 INTEGER，库位/NCM/期间为 TEXT
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionCode {
    Int(i64),
    Text(String),
}

impl ToSql for DimensionCode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            DimensionCode::Int(v) => v.to_sql(),
            DimensionCode::Text(s) => s.to_sql(),
        }
    }
}

impl fmt::Display for DimensionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionCode::Int(v) => write!(f, "{}", v),
            DimensionCode::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for DimensionCode {
    fn from(v: i64) -> Self {
        DimensionCode::Int(v)
    }
}

impl From<String> for DimensionCode {
    fn from(v: String) -> Self {
        DimensionCode::Text(v)
    }
}

impl From<&str> for DimensionCode {
    fn from(v: &str) -> Self {
        DimensionCode::Text(v.to_string())
    }
}

// ==========================================
// PeriodLabel - 期间标签
// ==========================================
// 支持: jan/23, Jan/2023, 01/23, 1/2023
// 两位年份按 2000+ 处理；无法解析时 year/month 为 None，排序置后
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabel {
    pub label: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

impl PeriodLabel {
    pub fn parse(raw: &str) -> Self {
        let label = raw.trim().to_string();
        let parsed = Self::parse_year_month(&label);
        Self {
            year: parsed.map(|(y, _)| y),
            month: parsed.map(|(_, m)| m),
            label,
        }
    }

    fn parse_year_month(label: &str) -> Option<(i32, u32)> {
        let (month_part, year_part) = label.split_once('/')?;
        let month_part = month_part.trim();
        let year_part = year_part.trim();

        let month = if month_part.chars().all(|c| c.is_ascii_digit()) {
            month_part.parse::<u32>().ok().filter(|m| (1..=12).contains(m))?
        } else {
            let key: String = month_part.to_lowercase().chars().take(3).collect();
            MONTH_ABBREVIATIONS
                .iter()
                .position(|m| *m == key)
                .map(|idx| idx as u32 + 1)?
        };

        if year_part.is_empty() || !year_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let year = match year_part.len() {
            2 => 2000 + year_part.parse::<i32>().ok()?,
            4 => year_part.parse::<i32>().ok()?,
            _ => return None,
        };

        Some((year, month))
    }

    /// 是否成功解析出年月
    pub fn is_dated(&self) -> bool {
        self.year.is_some() && self.month.is_some()
    }

    /// 时间顺序键：已解析期间按 (年, 月)，未解析期间置后按标签排序
    pub fn chronological_key(&self) -> (bool, i32, u32, String) {
        (
            !self.is_dated(),
            self.year.unwrap_or(i32::MAX),
            self.month.unwrap_or(u32::MAX),
            self.label.clone(),
        )
    }
}

// ==========================================
// MaterialRecord - 物料维度写入结构
// ==========================================
// 首次出现即写入，后续同 code 记录忽略（首条描述生效）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub code: i64,
    pub description: String,
    pub group_code: Option<i64>,
    pub type_code: Option<i64>,
    pub unit: Option<String>,
    pub status: Option<String>,
    pub min_stock_control: Option<bool>,
    pub min_stock: Option<f64>,
    pub max_stock_control: Option<bool>,
    pub max_stock: Option<f64>,
    pub xyz_curve: Option<String>,
}

// ==========================================
// StockFact - 库存事实
// ==========================================
// 只追加；修正需以新期间写入新行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockFact {
    pub period_id: Option<i64>,
    pub material_id: i64,
    pub location_id: Option<i64>,
    pub warehouse_id: Option<i64>,
    pub sped_classification_id: Option<i64>,
    pub accounting_account_id: Option<i64>,
    pub fiscal_classification_id: Option<i64>,
    pub identification_id: Option<i64>,
    pub quantity: Option<f64>,
    pub average_cost: Option<f64>,
    pub total_value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_abbreviation() {
        let p = PeriodLabel::parse("jan/23");
        assert_eq!(p.year, Some(2023));
        assert_eq!(p.month, Some(1));

        let p = PeriodLabel::parse("Dez/2024");
        assert_eq!(p.year, Some(2024));
        assert_eq!(p.month, Some(12));
    }

    #[test]
    fn test_parse_numeric_month() {
        let p = PeriodLabel::parse("03/24");
        assert_eq!((p.year, p.month), (Some(2024), Some(3)));

        let p = PeriodLabel::parse("7/2022");
        assert_eq!((p.year, p.month), (Some(2022), Some(7)));
    }

    #[test]
    fn test_parse_invalid_labels() {
        for raw in ["", "2023", "13/23", "xyz/23", "jan/", "jan/123"] {
            let p = PeriodLabel::parse(raw);
            assert!(!p.is_dated(), "label {:?} should not parse", raw);
            assert_eq!(p.year, None);
            assert_eq!(p.month, None);
        }
    }

    #[test]
    fn test_chronological_order() {
        let mut labels = vec![
            PeriodLabel::parse("fev/23"),
            PeriodLabel::parse("???"),
            PeriodLabel::parse("dez/22"),
            PeriodLabel::parse("jan/23"),
        ];
        labels.sort_by_key(|p| p.chronological_key());
        let ordered: Vec<&str> = labels.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(ordered, vec!["dez/22", "jan/23", "fev/23", "???"]);
    }

    #[test]
    fn test_dimension_code_display() {
        assert_eq!(DimensionCode::from(42).to_string(), "42");
        assert_eq!(DimensionCode::from("A-01").to_string(), "A-01");
    }
}
