// ==========================================
// 库存台账分析系统 - 出入库聚合
// ==========================================
// 约定: quantity > 0 入库，< 0 出库（取绝对值）
// 输出按物料编码升序
// ==========================================

use crate::domain::analytics::{FactView, MaterialMovement};
use crate::engine::stats::{mean, sample_std};
use std::collections::BTreeMap;

/// 按物料编码分组（保持事实视图内的顺序）
pub fn group_by_material(facts: &[FactView]) -> BTreeMap<i64, Vec<&FactView>> {
    let mut groups: BTreeMap<i64, Vec<&FactView>> = BTreeMap::new();
    for fact in facts {
        groups.entry(fact.material_code).or_default().push(fact);
    }
    groups
}

/// 出库量列表（负数量的绝对值）
pub fn outflows(rows: &[&FactView]) -> Vec<f64> {
    rows.iter()
        .filter_map(|f| f.quantity)
        .filter(|q| *q < 0.0)
        .map(f64::abs)
        .collect()
}

/// 单物料聚合
pub fn summarize_material(code: i64, rows: &[&FactView]) -> MaterialMovement {
    let out = outflows(rows);
    let inflow: f64 = rows
        .iter()
        .filter_map(|f| f.quantity)
        .filter(|q| *q > 0.0)
        .sum();
    let outflow: f64 = out.iter().sum();
    let costs: Vec<f64> = rows.iter().filter_map(|f| f.average_cost).collect();

    MaterialMovement {
        material_code: code,
        material_desc: rows
            .first()
            .map(|f| f.material_desc.clone())
            .unwrap_or_default(),
        rows: rows.len(),
        outflow_rows: out.len(),
        inflow,
        outflow,
        net_quantity: rows.iter().filter_map(|f| f.quantity).sum(),
        total_value: rows.iter().filter_map(|f| f.total_value).sum(),
        mean_cost: if costs.is_empty() { None } else { Some(mean(&costs)) },
        cost_std: if costs.len() >= 2 {
            Some(sample_std(&costs))
        } else {
            None
        },
    }
}

/// 全部物料聚合
pub fn aggregate_movements(facts: &[FactView]) -> Vec<MaterialMovement> {
    group_by_material(facts)
        .into_iter()
        .map(|(code, rows)| summarize_material(code, &rows))
        .collect()
}
