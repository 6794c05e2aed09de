// ==========================================
// 库存台账分析系统 - 分析引擎层
// ==========================================
// 职责: 基于事实视图的无状态计算，不访问数据库
// 红线: Engine 不拼 SQL，输入均为 &[FactView]
// ==========================================

pub mod alerts;
pub mod classification;
pub mod kpi;
pub mod movement;
pub mod replenishment;
pub mod stats;
pub mod trend;

// 重导出核心引擎
pub use alerts::AlertEngine;
pub use classification::ClassificationEngine;
pub use kpi::KpiEngine;
pub use movement::{aggregate_movements, summarize_material};
pub use replenishment::ReplenishmentEngine;
pub use stats::LinearFit;
pub use trend::{period_series, TrendEngine, MIN_TREND_PERIODS};
