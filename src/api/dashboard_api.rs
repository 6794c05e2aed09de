// ==========================================
// 库存台账分析系统 - 看板 API
// ==========================================
// 职责: 读取事实视图 → 调用分析引擎 → 返回展示层所需结构
// 约定: 仓储错误记录 error 日志后降级为空结果，不向交互调用方抛错
// 架构: API 层 → Repository（取数） + Engine（计算）
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{ConfigManager, PipelineConfig};
use crate::db::open_initialized_connection;
use crate::domain::analytics::{
    AbcEntry, Alert, FactView, KpiSummary, MovementOpportunities, MovementScore,
    NotApplicableReason, PurchaseSuggestion, ReorderAssessment, TrendOutcome,
};
use crate::domain::import::ImportBatch;
use crate::domain::report::{
    FamilyMaterialCount, LowStockMaterial, MaterialValueRank, PeriodStock, StoreOverview,
    WarehouseStock,
};
use crate::domain::types::TrendMetric;
use crate::engine::{
    AlertEngine, ClassificationEngine, KpiEngine, ReplenishmentEngine, TrendEngine,
    MIN_TREND_PERIODS,
};
use crate::repository::{AnalyticsRepository, FactRepository, RepositoryResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{error, instrument};

/// 仓储结果降级: 错误 → 记录日志并返回默认值
fn degrade<T: Default>(operation: &str, result: RepositoryResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(operation = operation, error = %e, "查询失败，返回空结果");
            T::default()
        }
    }
}

// ==========================================
// DashboardApi - 看板 API
// ==========================================
pub struct DashboardApi {
    analytics_repo: AnalyticsRepository,
    fact_repo: FactRepository,
    config: PipelineConfig,
    kpi_engine: KpiEngine,
    classification_engine: ClassificationEngine,
    trend_engine: TrendEngine,
    replenishment_engine: ReplenishmentEngine,
    alert_engine: AlertEngine,
}

impl DashboardApi {
    /// 基于共享连接创建
    pub fn new(conn: Arc<Mutex<Connection>>, config: PipelineConfig) -> Self {
        Self {
            analytics_repo: AnalyticsRepository::new(conn.clone()),
            fact_repo: FactRepository::new(conn),
            replenishment_engine: ReplenishmentEngine::from_config(&config),
            config,
            kpi_engine: KpiEngine::new(),
            classification_engine: ClassificationEngine::new(),
            trend_engine: TrendEngine::new(),
            alert_engine: AlertEngine::new(),
        }
    }

    /// 打开已建库的数据库并从 config_kv 读取运行参数
    ///
    /// 未建库时报错，不创建库文件
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_initialized_connection(db_path)?;
        let conn = Arc::new(Mutex::new(conn));
        let config = ConfigManager::from_connection(conn.clone()).load_pipeline_config()?;
        Ok(Self::new(conn, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn facts(&self) -> Vec<FactView> {
        degrade("load_fact_view", self.analytics_repo.load_fact_view())
    }

    // ==========================================
    // 分析指标
    // ==========================================

    #[instrument(skip(self))]
    pub fn kpis(&self) -> KpiSummary {
        self.kpi_engine.compute(&self.facts())
    }

    /// 累计金额 ABC
    #[instrument(skip(self))]
    pub fn abc_classification(&self) -> Vec<AbcEntry> {
        self.classification_engine.classify_abc(&self.facts())
    }

    /// 出库量 + 金额综合评分分类
    #[instrument(skip(self))]
    pub fn movement_classification(&self) -> Vec<MovementScore> {
        self.classification_engine.classify_by_movement(&self.facts())
    }

    /// 单物料趋势（查询失败时按 0 个期间处理）
    #[instrument(skip(self))]
    pub fn trend(&self, material_code: i64, metric: TrendMetric) -> TrendOutcome {
        match self.analytics_repo.material_history(material_code) {
            Ok(history) => self.trend_engine.analyze(material_code, &history, metric),
            Err(e) => {
                error!(material_code, error = %e, "物料历史查询失败");
                TrendOutcome::InsufficientData {
                    periods: 0,
                    required: MIN_TREND_PERIODS,
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub fn reorder_point(&self, material_code: i64) -> ReorderAssessment {
        match self.analytics_repo.material_history(material_code) {
            Ok(history) => self.replenishment_engine.reorder_point(material_code, &history),
            Err(e) => {
                error!(material_code, error = %e, "物料历史查询失败");
                ReorderAssessment::NotApplicable {
                    reason: NotApplicableReason::TooFewRows,
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub fn purchase_suggestions(&self) -> Vec<PurchaseSuggestion> {
        self.replenishment_engine.purchase_suggestions(&self.facts())
    }

    #[instrument(skip(self))]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alert_engine.generate(&self.facts())
    }

    #[instrument(skip(self))]
    pub fn movement_opportunities(&self) -> MovementOpportunities {
        self.alert_engine.movement_opportunities(&self.facts())
    }

    // ==========================================
    // 报表查询
    // ==========================================

    pub fn overview(&self) -> StoreOverview {
        degrade("overview", self.analytics_repo.overview())
    }

    pub fn materials_per_family(&self) -> Vec<FamilyMaterialCount> {
        degrade("materials_per_family", self.analytics_repo.materials_per_family())
    }

    pub fn stock_per_period(&self) -> Vec<PeriodStock> {
        degrade("stock_per_period", self.analytics_repo.stock_per_period())
    }

    /// 金额排名前 N（未指定时取 top_materials_limit）
    pub fn top_materials(&self, limit: Option<usize>) -> Vec<MaterialValueRank> {
        let limit = limit.unwrap_or(self.config.top_materials_limit);
        degrade(
            "top_materials_by_value",
            self.analytics_repo.top_materials_by_value(limit),
        )
    }

    pub fn low_stock_materials(&self) -> Vec<LowStockMaterial> {
        degrade(
            "low_stock_materials",
            self.analytics_repo
                .low_stock_materials(self.config.low_stock_margin),
        )
    }

    pub fn stock_per_warehouse(&self) -> Vec<WarehouseStock> {
        degrade("stock_per_warehouse", self.analytics_repo.stock_per_warehouse())
    }

    pub fn material_history(&self, material_code: i64) -> Vec<FactView> {
        degrade(
            "material_history",
            self.analytics_repo.material_history(material_code),
        )
    }

    pub fn import_batches(&self, limit: usize) -> Vec<ImportBatch> {
        degrade("list_import_batches", self.fact_repo.list_import_batches(limit))
    }
}
