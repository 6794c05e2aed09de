// ==========================================
// 库存台账分析系统 - ABC 分类引擎
// ==========================================
// 两种口径:
// 1. 综合评分: 出库量与金额分别 min-max 归一化后取均值
//    C: ≤ 0.3 / B: (0.3, 0.7] / A: > 0.7
// 2. 累计金额: 金额降序累计占比
//    A: ≤ 80% / B: (80%, 95%] / C: 其余
// ==========================================

use crate::domain::analytics::{AbcEntry, FactView, MovementScore};
use crate::domain::types::AbcClass;
use crate::engine::movement::aggregate_movements;
use crate::engine::stats::{min_max_normalize, ZERO_EPS};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::instrument;

/// 综合评分分档
pub fn class_for_score(score: f64) -> AbcClass {
    if score > 0.7 {
        AbcClass::A
    } else if score > 0.3 {
        AbcClass::B
    } else {
        AbcClass::C
    }
}

/// 累计占比分档（百分比）
pub fn class_for_cumulative_share(share_pct: f64) -> AbcClass {
    if share_pct <= 80.0 {
        AbcClass::A
    } else if share_pct <= 95.0 {
        AbcClass::B
    } else {
        AbcClass::C
    }
}

// ==========================================
// ClassificationEngine
// ==========================================
#[derive(Debug, Default)]
pub struct ClassificationEngine;

impl ClassificationEngine {
    pub fn new() -> Self {
        Self
    }

    /// 综合评分分类（按评分降序）
    #[instrument(skip_all, fields(rows = facts.len()))]
    pub fn classify_by_movement(&self, facts: &[FactView]) -> Vec<MovementScore> {
        let movements = aggregate_movements(facts);
        let outflow: Vec<f64> = movements.iter().map(|m| m.outflow).collect();
        let value: Vec<f64> = movements.iter().map(|m| m.total_value).collect();
        let outflow_norm = min_max_normalize(&outflow);
        let value_norm = min_max_normalize(&value);

        let mut scores: Vec<MovementScore> = movements
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                let composite = (outflow_norm[i] + value_norm[i]) / 2.0;
                MovementScore {
                    material_code: m.material_code,
                    material_desc: m.material_desc,
                    outflow: m.outflow,
                    total_value: m.total_value,
                    outflow_score: outflow_norm[i],
                    value_score: value_norm[i],
                    composite_score: composite,
                    class: class_for_score(composite),
                }
            })
            .collect();

        scores.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(Ordering::Equal)
                .then(a.material_code.cmp(&b.material_code))
        });
        scores
    }

    /// 累计金额分类（按金额降序）
    ///
    /// 总金额 ≤ 0 时全部为 C
    #[instrument(skip_all, fields(rows = facts.len()))]
    pub fn classify_abc(&self, facts: &[FactView]) -> Vec<AbcEntry> {
        let mut by_material: BTreeMap<i64, (String, f64)> = BTreeMap::new();
        for f in facts {
            let entry = by_material
                .entry(f.material_code)
                .or_insert_with(|| (f.material_desc.clone(), 0.0));
            entry.1 += f.total_value.unwrap_or(0.0);
        }

        let mut ranked: Vec<(i64, String, f64)> = by_material
            .into_iter()
            .map(|(code, (desc, value))| (code, desc, value))
            .collect();
        ranked.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let total: f64 = ranked.iter().map(|r| r.2).sum();
        let mut cumulative = 0.0;

        ranked
            .into_iter()
            .map(|(code, desc, value)| {
                cumulative += value;
                let (share, class) = if total <= ZERO_EPS {
                    (0.0, AbcClass::C)
                } else {
                    let share = cumulative * 100.0 / total;
                    (share, class_for_cumulative_share(share))
                };
                AbcEntry {
                    material_code: code,
                    material_desc: desc,
                    total_value: value,
                    cumulative_value: cumulative,
                    cumulative_share: share,
                    class,
                }
            })
            .collect()
    }
}
