// ==========================================
// 库存台账分析系统 - 补货引擎
// ==========================================
// 职责: 再订货点计算 + 采购建议
// 公式:
//   月均消耗 = mean(出库量)
//   日均消耗 = 月均消耗 / 30
//   安全库存 = 月均消耗 × 安全系数
//   再订货点 = 日均消耗 × 提前期(天) + 安全库存
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::analytics::{
    FactView, NotApplicableReason, PurchaseSuggestion, ReorderAssessment, ReorderPoint,
};
use crate::domain::types::{SuggestionPriority, Variability};
use crate::engine::movement::{group_by_material, outflows};
use crate::engine::stats::{mean, sample_coefficient_of_variation};
use std::cmp::Ordering;
use tracing::{debug, instrument};

const DAYS_PER_MONTH: f64 = 30.0;
const MIN_ROWS: usize = 2;

/// 出库波动超过该变异系数时放大建议量
const HIGH_VARIATION_CV: f64 = 0.3;
const HIGH_VARIATION_FACTOR: f64 = 1.5;

/// 在手低于再订货点该比例时为高优先级
const HIGH_PRIORITY_RATIO: f64 = 0.5;

// ==========================================
// ReplenishmentEngine
// ==========================================
#[derive(Debug, Clone)]
pub struct ReplenishmentEngine {
    lead_time_days: f64,
    safety_fraction: f64,
}

impl Default for ReplenishmentEngine {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ReplenishmentEngine {
    pub fn new(lead_time_days: f64, safety_fraction: f64) -> Self {
        Self {
            lead_time_days,
            safety_fraction,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.lead_time_days, config.safety_stock_fraction)
    }

    fn assess_rows(&self, material_code: i64, rows: &[&FactView]) -> ReorderAssessment {
        if rows.len() < MIN_ROWS {
            return ReorderAssessment::NotApplicable {
                reason: NotApplicableReason::TooFewRows,
            };
        }
        let out = outflows(rows);
        if out.is_empty() {
            return ReorderAssessment::NotApplicable {
                reason: NotApplicableReason::NoOutflow,
            };
        }

        let monthly = mean(&out);
        let daily = monthly / DAYS_PER_MONTH;
        let safety_stock = monthly * self.safety_fraction;

        ReorderAssessment::Computed(ReorderPoint {
            material_code,
            rows: rows.len(),
            outflow_rows: out.len(),
            average_monthly_consumption: monthly,
            daily_consumption: daily,
            safety_stock,
            lead_time_days: self.lead_time_days,
            safety_fraction: self.safety_fraction,
            reorder_point: daily * self.lead_time_days + safety_stock,
        })
    }

    /// 单物料再订货点
    #[instrument(skip(self, facts), fields(rows = facts.len()))]
    pub fn reorder_point(&self, material_code: i64, facts: &[FactView]) -> ReorderAssessment {
        let rows: Vec<&FactView> = facts
            .iter()
            .filter(|f| f.material_code == material_code)
            .collect();
        self.assess_rows(material_code, &rows)
    }

    /// 全部物料的采购建议（建议量降序）
    ///
    /// 仅在手 < 再订货点的物料产生建议
    #[instrument(skip_all, fields(rows = facts.len()))]
    pub fn purchase_suggestions(&self, facts: &[FactView]) -> Vec<PurchaseSuggestion> {
        let mut suggestions = Vec::new();

        for (code, rows) in group_by_material(facts) {
            let rp = match self.assess_rows(code, &rows) {
                ReorderAssessment::Computed(rp) => rp,
                ReorderAssessment::NotApplicable { .. } => continue,
            };

            let inflow: f64 = rows
                .iter()
                .filter_map(|f| f.quantity)
                .filter(|q| *q > 0.0)
                .sum();
            let out = outflows(&rows);
            let on_hand = inflow - out.iter().sum::<f64>();

            if on_hand >= rp.reorder_point {
                continue;
            }

            let variation = sample_coefficient_of_variation(&out);
            let variability = if variation > HIGH_VARIATION_CV {
                Variability::High
            } else {
                Variability::Normal
            };
            let mut quantity = rp.reorder_point - on_hand;
            if variability == Variability::High {
                quantity *= HIGH_VARIATION_FACTOR;
            }
            let priority = if on_hand < HIGH_PRIORITY_RATIO * rp.reorder_point {
                SuggestionPriority::High
            } else {
                SuggestionPriority::Medium
            };

            suggestions.push(PurchaseSuggestion {
                material_code: code,
                description: rows
                    .first()
                    .map(|f| f.material_desc.clone())
                    .unwrap_or_default(),
                estimated_on_hand: on_hand,
                reorder_point: rp.reorder_point,
                suggested_quantity: quantity,
                average_monthly_consumption: rp.average_monthly_consumption,
                outflow_variation: variation,
                priority,
                variability,
            });
        }

        suggestions.sort_by(|a, b| {
            b.suggested_quantity
                .partial_cmp(&a.suggested_quantity)
                .unwrap_or(Ordering::Equal)
                .then(a.material_code.cmp(&b.material_code))
        });
        debug!(count = suggestions.len(), "采购建议生成完成");
        suggestions
    }
}
