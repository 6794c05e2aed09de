// ==========================================
// 库存台账分析系统 - 数据仓储层
// ==========================================
// 职责: 数据访问，不含业务逻辑
// 写入: 维度幂等写入 + 事实追加（事务由导入器控制）
// 读取: 事实视图与汇总报表
// ==========================================

pub mod analytics_repo;
pub mod dimension_repo;
pub mod error;
pub mod fact_repo;

// 重导出核心仓储
pub use analytics_repo::AnalyticsRepository;
pub use dimension_repo::DimensionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use fact_repo::FactRepository;
