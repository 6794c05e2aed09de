// ==========================================
// 库存台账分析系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / UPPER / NULL 标准化 / 小数逗号 / 控制标记 / 剔除无标识行
// ==========================================

use crate::domain::ledger::LedgerRow;
use crate::importer::ledger_importer_trait::DataCleaner as DataCleanerTrait;
use tracing::warn;

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: Option<&str>, uppercase: bool) -> Option<String> {
        let trimmed = value?.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        })
    }

    fn parse_decimal(&self, value: Option<&str>) -> Option<f64> {
        let normalized = value?.trim().replace(',', ".");
        if normalized.is_empty() {
            return None;
        }
        normalized.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn parse_code(&self, value: Option<&str>) -> Option<i64> {
        self.parse_decimal(value).map(|v| v.trunc() as i64)
    }

    fn parse_flag(&self, value: Option<&str>) -> Option<bool> {
        let v = value?.trim().to_lowercase();
        match v.as_str() {
            "sim" | "s" | "true" | "1" => Some(true),
            "não" | "nao" | "n" | "false" | "0" => Some(false),
            _ => None,
        }
    }

    fn normalize_row(&self, row: LedgerRow) -> LedgerRow {
        let upper = |v: Option<String>| self.clean_text(v.as_deref(), true);
        LedgerRow {
            family_desc: upper(row.family_desc),
            group_desc: upper(row.group_desc),
            type_desc: upper(row.type_desc),
            material_desc: upper(row.material_desc),
            location_desc: upper(row.location_desc),
            warehouse_desc: upper(row.warehouse_desc),
            sped_desc: upper(row.sped_desc),
            account_desc: upper(row.account_desc),
            fiscal_desc: upper(row.fiscal_desc),
            identification_desc: upper(row.identification_desc),
            ..row
        }
    }

    fn retain_identified(&self, rows: Vec<LedgerRow>) -> (Vec<LedgerRow>, usize) {
        let initial = rows.len();
        let kept: Vec<LedgerRow> = rows
            .into_iter()
            .filter(|r| r.has_material_identity())
            .collect();
        let dropped = initial - kept.len();

        if dropped > 0 {
            warn!(dropped_rows = dropped, remaining = kept.len(), "剔除缺少物料编码或描述的行");
        }
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_comma() {
        let c = DataCleaner;
        assert_eq!(c.parse_decimal(Some("1234,56")), Some(1234.56));
        assert_eq!(c.parse_decimal(Some("-5")), Some(-5.0));
        assert_eq!(c.parse_decimal(Some("abc")), None);
        assert_eq!(c.parse_decimal(Some("   ")), None);
        // 千分位 + 小数逗号不做特殊处理
        assert_eq!(c.parse_decimal(Some("1.234,56")), None);
        assert_eq!(c.parse_decimal(None), None);
    }

    #[test]
    fn test_parse_code_truncates() {
        let c = DataCleaner;
        assert_eq!(c.parse_code(Some("1001")), Some(1001));
        assert_eq!(c.parse_code(Some("1001,0")), Some(1001));
        assert_eq!(c.parse_code(Some("X1")), None);
    }

    #[test]
    fn test_parse_flag() {
        let c = DataCleaner;
        assert_eq!(c.parse_flag(Some("Sim")), Some(true));
        assert_eq!(c.parse_flag(Some("S")), Some(true));
        assert_eq!(c.parse_flag(Some("NÃO")), Some(false));
        assert_eq!(c.parse_flag(Some("Não")), Some(false));
        assert_eq!(c.parse_flag(Some("nao")), Some(false));
        assert_eq!(c.parse_flag(Some("talvez")), None);
        assert_eq!(c.parse_flag(None), None);
    }

    #[test]
    fn test_normalize_uppercases_descriptions_only() {
        let c = DataCleaner;
        let row = LedgerRow {
            material_desc: Some(" parafuso ".to_string()),
            unit: Some("un".to_string()),
            ..Default::default()
        };
        let row = c.normalize_row(row);
        assert_eq!(row.material_desc.as_deref(), Some("PARAFUSO"));
        assert_eq!(row.unit.as_deref(), Some("un"));
    }

    #[test]
    fn test_retain_identified_counts_dropped() {
        let c = DataCleaner;
        let rows = vec![
            LedgerRow {
                material_code: Some(1),
                material_desc: Some("A".to_string()),
                ..Default::default()
            },
            LedgerRow {
                material_code: Some(2),
                ..Default::default()
            },
            LedgerRow {
                material_desc: Some("C".to_string()),
                ..Default::default()
            },
        ];
        let (kept, dropped) = c.retain_identified(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 2);
    }
}
