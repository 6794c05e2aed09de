// ==========================================
// 库存台账分析系统 - API 层
// ==========================================
// 职责: 提供展示层与 CLI 调用的业务接口
// ==========================================

pub mod dashboard_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult};
pub use import_api::ImportApi;
