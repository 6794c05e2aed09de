// ==========================================
// 库存台账分析系统 - 告警引擎
// ==========================================
// 告警规则（阈值按全部物料的分位数动态计算）:
//   LOW_MOVEMENT     出库合计 < P10
//   HIGH_MOVEMENT    出库合计 > P90
//   UNSTABLE_PRICING 成本标准差 > P80（仅 ≥2 个成本值的物料）
//   INACTIVE         净数量 = 0
// 空告警组不输出
// ==========================================

use crate::domain::analytics::{Alert, FactView, MaterialMovement, MovementOpportunities};
use crate::domain::types::AlertKind;
use crate::engine::movement::aggregate_movements;
use crate::engine::stats::{percentile, ZERO_EPS};
use tracing::{debug, instrument};

fn build_alert(kind: AlertKind, threshold: f64, codes: Vec<i64>) -> Option<Alert> {
    if codes.is_empty() {
        return None;
    }
    let message = match kind {
        AlertKind::LowMovement => format!("{} 个物料出库量低于 P10 阈值 {:.2}", codes.len(), threshold),
        AlertKind::HighMovement => format!("{} 个物料出库量高于 P90 阈值 {:.2}", codes.len(), threshold),
        AlertKind::UnstablePricing => {
            format!("{} 个物料成本波动高于 P80 阈值 {:.2}", codes.len(), threshold)
        }
        AlertKind::Inactive => format!("{} 个物料净数量为 0，无库存变动", codes.len()),
    };
    Some(Alert {
        kind,
        level: kind.level(),
        threshold,
        material_codes: codes,
        message,
    })
}

fn codes_where<F>(movements: &[MaterialMovement], pred: F) -> Vec<i64>
where
    F: Fn(&MaterialMovement) -> bool,
{
    movements
        .iter()
        .filter(|m| pred(m))
        .map(|m| m.material_code)
        .collect()
}

fn select<F>(movements: &[MaterialMovement], pred: F) -> Vec<MaterialMovement>
where
    F: Fn(&MaterialMovement) -> bool,
{
    movements.iter().filter(|m| pred(m)).cloned().collect()
}

// ==========================================
// AlertEngine
// ==========================================
#[derive(Debug, Default)]
pub struct AlertEngine;

impl AlertEngine {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(rows = facts.len()))]
    pub fn generate(&self, facts: &[FactView]) -> Vec<Alert> {
        let movements = aggregate_movements(facts);
        if movements.is_empty() {
            return Vec::new();
        }

        let outflow: Vec<f64> = movements.iter().map(|m| m.outflow).collect();
        let p10 = percentile(&outflow, 0.10);
        let p90 = percentile(&outflow, 0.90);

        let cost_std: Vec<f64> = movements.iter().filter_map(|m| m.cost_std).collect();
        let p80_cost = percentile(&cost_std, 0.80);

        let mut alerts = Vec::new();
        alerts.extend(build_alert(
            AlertKind::LowMovement,
            p10,
            codes_where(&movements, |m| m.outflow < p10),
        ));
        alerts.extend(build_alert(
            AlertKind::HighMovement,
            p90,
            codes_where(&movements, |m| m.outflow > p90),
        ));
        if !cost_std.is_empty() {
            alerts.extend(build_alert(
                AlertKind::UnstablePricing,
                p80_cost,
                codes_where(&movements, |m| m.cost_std.map_or(false, |s| s > p80_cost)),
            ));
        }
        alerts.extend(build_alert(
            AlertKind::Inactive,
            0.0,
            codes_where(&movements, |m| m.net_quantity.abs() < ZERO_EPS),
        ));

        debug!(count = alerts.len(), "告警生成完成");
        alerts
    }

    /// 周转机会: 低周转（出库 < P20）/ 估算积压（净数量 > P80）/ 高周转（出库 > P80）
    #[instrument(skip_all, fields(rows = facts.len()))]
    pub fn movement_opportunities(&self, facts: &[FactView]) -> MovementOpportunities {
        let movements = aggregate_movements(facts);
        if movements.is_empty() {
            return MovementOpportunities::default();
        }

        let outflow: Vec<f64> = movements.iter().map(|m| m.outflow).collect();
        let net: Vec<f64> = movements.iter().map(|m| m.net_quantity).collect();
        let p20_out = percentile(&outflow, 0.20);
        let p80_out = percentile(&outflow, 0.80);
        let p80_net = percentile(&net, 0.80);

        MovementOpportunities {
            low_turnover: select(&movements, |m| m.outflow < p20_out),
            excess_stock: select(&movements, |m| m.net_quantity > p80_net),
            high_movement: select(&movements, |m| m.outflow > p80_out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::AlertLevel;

    fn fact(code: i64, qty: f64, cost: f64) -> FactView {
        FactView {
            material_code: code,
            material_desc: format!("M{}", code),
            quantity: Some(qty),
            average_cost: Some(cost),
            total_value: Some(qty * cost),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_facts_no_alerts() {
        assert!(AlertEngine::new().generate(&[]).is_empty());
        assert_eq!(
            AlertEngine::new().movement_opportunities(&[]),
            MovementOpportunities::default()
        );
    }

    #[test]
    fn test_alert_groups() {
        let mut facts = Vec::new();
        // 物料 1..=10 出库合计 0, 10, ..., 90
        for code in 1..=10i64 {
            let out = ((code - 1) * 10) as f64;
            facts.push(fact(code, 100.0, 1.0));
            facts.push(fact(code, -out, 1.0));
        }
        // 物料 11: 入出相抵，成本大幅波动
        facts.push(fact(11, 5.0, 1.0));
        facts.push(fact(11, -5.0, 50.0));

        let alerts = AlertEngine::new().generate(&facts);
        let find = |kind: AlertKind| alerts.iter().find(|a| a.kind == kind);

        let low = find(AlertKind::LowMovement).expect("low movement alert");
        assert_eq!(low.level, AlertLevel::Warning);
        assert!(low.material_codes.contains(&1));

        let high = find(AlertKind::HighMovement).expect("high movement alert");
        assert_eq!(high.level, AlertLevel::Info);
        assert_eq!(high.material_codes, vec![10]);

        let pricing = find(AlertKind::UnstablePricing).expect("unstable pricing alert");
        assert_eq!(pricing.level, AlertLevel::Error);
        assert_eq!(pricing.material_codes, vec![11]);

        let inactive = find(AlertKind::Inactive).expect("inactive alert");
        assert_eq!(inactive.material_codes, vec![11]);
    }

    #[test]
    fn test_uniform_outflow_suppresses_movement_alerts() {
        let facts = vec![fact(1, -5.0, 1.0), fact(2, -5.0, 1.0)];
        let alerts = AlertEngine::new().generate(&facts);
        assert!(alerts
            .iter()
            .all(|a| a.kind != AlertKind::LowMovement && a.kind != AlertKind::HighMovement));
    }
}
