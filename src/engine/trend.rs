// ==========================================
// 库存台账分析系统 - 趋势预测引擎
// ==========================================
// 职责: 按期间聚合单物料序列 → 最小二乘回归 → 下一期预测
// 红线: 少于 4 个期间不做回归（InsufficientData）
// ==========================================
// 置信度 = clamp(100 − |slope| × 10, 0, 100)
// 该公式为经验值，与统计置信区间无关
// ==========================================

use crate::domain::analytics::{FactView, PeriodPoint, TrendOutcome, TrendReport, TrendSignal};
use crate::domain::types::{TrendDirection, TrendMetric};
use crate::engine::stats::{linear_regression, mean, ZERO_EPS};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 回归所需最少期间数
pub const MIN_TREND_PERIODS: usize = 4;

/// 显著性水平
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// 移动平均窗口
pub const MOVING_AVERAGE_WINDOW: usize = 3;

/// 按期间聚合（数量、金额求和，成本取均值），按时间顺序排列
///
/// 无期间的行不参与
pub fn period_series(facts: &[&FactView]) -> Vec<PeriodPoint> {
    struct Acc {
        year: Option<i32>,
        month: Option<u32>,
        quantity: f64,
        value: f64,
        costs: Vec<f64>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut acc: HashMap<String, Acc> = HashMap::new();
    for f in facts {
        let Some(label) = f.period.as_ref() else {
            continue;
        };
        let entry = acc.entry(label.clone()).or_insert_with(|| {
            order.push(label.clone());
            Acc {
                year: f.year,
                month: f.month,
                quantity: 0.0,
                value: 0.0,
                costs: Vec::new(),
            }
        });
        entry.quantity += f.quantity.unwrap_or(0.0);
        entry.value += f.total_value.unwrap_or(0.0);
        if let Some(cost) = f.average_cost {
            entry.costs.push(cost);
        }
    }

    let mut points: Vec<PeriodPoint> = order
        .into_iter()
        .filter_map(|label| {
            let a = acc.remove(&label)?;
            Some(PeriodPoint {
                label,
                year: a.year,
                month: a.month,
                quantity: a.quantity,
                total_value: a.value,
                average_cost: if a.costs.is_empty() {
                    None
                } else {
                    Some(mean(&a.costs))
                },
            })
        })
        .collect();

    points.sort_by_key(|p| {
        (
            p.year.is_none() || p.month.is_none(),
            p.year.unwrap_or(i32::MAX),
            p.month.unwrap_or(u32::MAX),
            p.label.clone(),
        )
    });
    points
}

/// 尾随移动平均（前 window−1 个位置为 None）
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                None
            } else {
                Some(mean(&values[i + 1 - window..=i]))
            }
        })
        .collect()
}

// ==========================================
// TrendEngine
// ==========================================
#[derive(Debug, Default)]
pub struct TrendEngine;

impl TrendEngine {
    pub fn new() -> Self {
        Self
    }

    /// 单物料趋势分析
    ///
    /// # 参数
    /// - facts: 事实视图（可含其他物料，内部按编码过滤）
    /// - metric: Cost 使用期间平均成本（无成本的期间剔除）/ Quantity 使用期间数量
    #[instrument(skip(self, facts), fields(rows = facts.len()))]
    pub fn analyze(&self, material_code: i64, facts: &[FactView], metric: TrendMetric) -> TrendOutcome {
        let rows: Vec<&FactView> = facts
            .iter()
            .filter(|f| f.material_code == material_code)
            .collect();

        let points: Vec<PeriodPoint> = period_series(&rows)
            .into_iter()
            .filter(|p| metric == TrendMetric::Quantity || p.average_cost.is_some())
            .collect();

        let n = points.len();
        if n < MIN_TREND_PERIODS {
            debug!(material_code, periods = n, "期间不足，跳过趋势分析");
            return TrendOutcome::InsufficientData {
                periods: n,
                required: MIN_TREND_PERIODS,
            };
        }

        let y: Vec<f64> = points
            .iter()
            .map(|p| match metric {
                TrendMetric::Quantity => p.quantity,
                TrendMetric::Cost => p.average_cost.unwrap_or(0.0),
            })
            .collect();
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();

        let fit = match linear_regression(&x, &y) {
            Some(fit) => fit,
            None => {
                return TrendOutcome::InsufficientData {
                    periods: n,
                    required: MIN_TREND_PERIODS,
                }
            }
        };

        let direction = if fit.slope > ZERO_EPS {
            TrendDirection::Rising
        } else if fit.slope < -ZERO_EPS {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };

        let signal = if fit.p_value < SIGNIFICANCE_LEVEL && direction == TrendDirection::Rising {
            TrendSignal::SignificantRise
        } else if fit.p_value < SIGNIFICANCE_LEVEL && direction == TrendDirection::Falling {
            TrendSignal::SignificantFall
        } else {
            TrendSignal::NotSignificant
        };

        TrendOutcome::Computed(TrendReport {
            material_code,
            metric,
            periods: n,
            slope: fit.slope,
            intercept: fit.intercept,
            r_value: fit.r_value,
            p_value: fit.p_value,
            std_err: fit.std_err,
            direction,
            signal,
            next_period_forecast: fit.slope * n as f64 + fit.intercept,
            confidence: (100.0 - fit.slope.abs() * 10.0).clamp(0.0, 100.0),
            moving_average: moving_average(&y, MOVING_AVERAGE_WINDOW),
            points,
        })
    }
}
