// ==========================================
// 库存台账分析系统 - 配置层
// ==========================================
// 职责: 运行参数管理（补货 / 导入 / 报表）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, PipelineConfig};
