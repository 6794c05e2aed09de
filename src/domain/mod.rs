// ==========================================
// 库存台账分析系统 - 领域层
// ==========================================
// 职责: 领域实体与类型定义，不依赖仓储/引擎
// ==========================================

pub mod analytics;
pub mod dimension;
pub mod import;
pub mod ledger;
pub mod report;
pub mod types;

// 重导出核心类型
pub use analytics::{
    AbcEntry, Alert, FactView, KpiSummary, MaterialMovement, MovementOpportunities,
    MovementScore, NotApplicableReason, PeriodPoint, PurchaseSuggestion, ReorderAssessment,
    ReorderPoint, TrendOutcome, TrendReport, TrendSignal, ValuePercentiles,
};
pub use dimension::{DimensionCode, MaterialRecord, PeriodLabel, StockFact};
pub use import::{FactLoadStats, ImportBatch, ImportSummary, LookupStats};
pub use ledger::{LedgerColumn, LedgerRow, RawLedgerRecord, LEDGER_COLUMN_COUNT};
pub use report::{
    FamilyMaterialCount, LowStockMaterial, MaterialValueRank, PeriodStock, StoreOverview,
    WarehouseStock,
};
pub use types::{
    AbcClass, AlertKind, AlertLevel, Dimension, LoadMode, SuggestionPriority, TrendDirection,
    TrendMetric, Variability,
};
