// ==========================================
// 库存台账分析系统 - KPI 引擎
// ==========================================
// 职责: 总量 / 分位数 / 变异系数 / 季节性 / 集中度 / 活跃度
// 输入: 事实视图
// 输出: KpiSummary（空输入 → 全 0）
// ==========================================

use crate::domain::analytics::{FactView, KpiSummary, ValuePercentiles};
use crate::engine::stats::{
    coefficient_of_variation, percentile, sample_coefficient_of_variation, ZERO_EPS,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::instrument;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < ZERO_EPS {
        0.0
    } else {
        numerator / denominator
    }
}

// ==========================================
// KpiEngine
// ==========================================
#[derive(Debug, Default)]
pub struct KpiEngine;

impl KpiEngine {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(rows = facts.len()))]
    pub fn compute(&self, facts: &[FactView]) -> KpiSummary {
        if facts.is_empty() {
            return KpiSummary::default();
        }

        let values: Vec<f64> = facts.iter().filter_map(|f| f.total_value).collect();
        let total_value: f64 = values.iter().sum();
        let total_quantity: f64 = facts.iter().filter_map(|f| f.quantity).sum();

        let materials: HashSet<i64> = facts.iter().map(|f| f.material_code).collect();
        let active_materials: HashSet<i64> = facts
            .iter()
            .filter(|f| f.quantity.map_or(false, |q| q != 0.0))
            .map(|f| f.material_code)
            .collect();

        // 期间数量汇总
        let mut period_quantity: HashMap<&str, f64> = HashMap::new();
        for f in facts {
            if let Some(label) = f.period.as_deref() {
                *period_quantity.entry(label).or_default() += f.quantity.unwrap_or(0.0);
            }
        }
        let period_totals: Vec<f64> = period_quantity.values().copied().collect();

        let material_count = materials.len();
        let active_periods = period_quantity.len();

        KpiSummary {
            total_value,
            material_count,
            total_quantity,
            value_per_unit: ratio(total_value, total_quantity),
            active_materials: active_materials.len(),
            active_periods,
            quantity_per_material: ratio(total_quantity, material_count as f64),
            quantity_per_period: ratio(total_quantity, active_periods as f64),
            period_variation: sample_coefficient_of_variation(&period_totals),
            percentiles: self.value_percentiles(&values),
            coefficient_of_variation: coefficient_of_variation(&values) * 100.0,
            seasonality_index: self.seasonality_index(facts),
            concentration_index: self.concentration_index(facts, total_value),
        }
    }

    fn value_percentiles(&self, values: &[f64]) -> ValuePercentiles {
        ValuePercentiles {
            p10: percentile(values, 0.10),
            p25: percentile(values, 0.25),
            p50: percentile(values, 0.50),
            p75: percentile(values, 0.75),
            p90: percentile(values, 0.90),
            p95: percentile(values, 0.95),
            p99: percentile(values, 0.99),
        }
    }

    /// 季节性指数: 按自然月汇总金额的样本 std / mean
    ///
    /// 无月份的行不参与；不足 2 个月份 → 0
    pub fn seasonality_index(&self, facts: &[FactView]) -> f64 {
        let mut by_month: BTreeMap<u32, f64> = BTreeMap::new();
        for f in facts {
            if let Some(month) = f.month {
                *by_month.entry(month).or_default() += f.total_value.unwrap_or(0.0);
            }
        }
        if by_month.len() < 2 {
            return 0.0;
        }
        let totals: Vec<f64> = by_month.values().copied().collect();
        sample_coefficient_of_variation(&totals)
    }

    /// Herfindahl 集中度: Σ(物料金额占比²)
    pub fn concentration_index(&self, facts: &[FactView], total_value: f64) -> f64 {
        if total_value.abs() < ZERO_EPS {
            return 0.0;
        }
        let mut by_material: HashMap<i64, f64> = HashMap::new();
        for f in facts {
            *by_material.entry(f.material_code).or_default() += f.total_value.unwrap_or(0.0);
        }
        by_material
            .values()
            .map(|v| (v / total_value).powi(2))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(code: i64, period: &str, month: u32, qty: f64, value: f64) -> FactView {
        FactView {
            material_code: code,
            period: Some(period.to_string()),
            month: Some(month),
            year: Some(2023),
            quantity: Some(qty),
            total_value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        assert_eq!(KpiEngine::new().compute(&[]), KpiSummary::default());
    }

    #[test]
    fn test_basic_kpis() {
        let facts = vec![
            fact(1, "jan/23", 1, 10.0, 100.0),
            fact(2, "jan/23", 1, 0.0, 100.0),
            fact(1, "fev/23", 2, 10.0, 200.0),
        ];
        let k = KpiEngine::new().compute(&facts);

        assert_eq!(k.total_value, 400.0);
        assert_eq!(k.material_count, 2);
        assert_eq!(k.total_quantity, 20.0);
        assert_eq!(k.value_per_unit, 20.0);
        assert_eq!(k.active_materials, 1);
        assert_eq!(k.active_periods, 2);
        assert_eq!(k.quantity_per_material, 10.0);
        assert_eq!(k.quantity_per_period, 10.0);
        assert_eq!(k.period_variation, 0.0);
        assert_eq!(k.percentiles.p50, 100.0);

        // 物料 1: 300/400，物料 2: 100/400
        assert!((k.concentration_index - 0.625).abs() < 1e-12);
        // 月份金额 [200, 200] → 0
        assert_eq!(k.seasonality_index, 0.0);
    }

    #[test]
    fn test_zero_quantity_guards_ratio() {
        let facts = vec![fact(1, "jan/23", 1, 0.0, 0.0)];
        let k = KpiEngine::new().compute(&facts);
        assert_eq!(k.value_per_unit, 0.0);
        assert_eq!(k.coefficient_of_variation, 0.0);
        assert_eq!(k.concentration_index, 0.0);
    }

    #[test]
    fn test_seasonality_requires_two_months() {
        let engine = KpiEngine::new();
        let one_month = vec![fact(1, "jan/23", 1, 1.0, 50.0), fact(2, "jan/24", 1, 1.0, 10.0)];
        assert_eq!(engine.seasonality_index(&one_month), 0.0);

        let two_months = vec![fact(1, "jan/23", 1, 1.0, 100.0), fact(1, "fev/23", 2, 1.0, 300.0)];
        // totals [100, 300]: mean 200, 样本 std 100·√2
        assert!((engine.seasonality_index(&two_months) - 2f64.sqrt() / 2.0).abs() < 1e-12);
    }
}
