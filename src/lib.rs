// ==========================================
// 库存台账分析系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 数据流: 台账文件 → 导入 → 维度/事实表 → 分析引擎 → API
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分析计算（纯函数）
pub mod engine;

// 导入层 - 台账文件
pub mod importer;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接 PRAGMA / 建库 / 清库）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::types::{AbcClass, AlertKind, AlertLevel, Dimension, LoadMode, TrendMetric};

pub use domain::{
    FactView, ImportSummary, KpiSummary, LedgerRow, PeriodLabel, PurchaseSuggestion,
    ReorderAssessment, TrendOutcome,
};

pub use config::{ConfigManager, PipelineConfig};

pub use importer::{LedgerImporter, LookupResolver};

pub use api::{ApiError, ApiResult, DashboardApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "库存台账分析系统";
