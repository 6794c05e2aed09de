// ==========================================
// 库存台账分析系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value)
// 规则: 值缺失或格式错误 → 默认值 + warn
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

// ==========================================
// PipelineConfig - 运行参数快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    // ===== 补货 =====
    pub lead_time_days: f64,
    pub safety_stock_fraction: f64,

    // ===== 导入 =====
    pub chunk_size: usize,
    pub lookup_sample_rows: usize,
    pub upload_timeout_secs: u64,

    // ===== 报表 =====
    pub low_stock_margin: f64,
    pub top_materials_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lead_time_days: 30.0,
            safety_stock_fraction: 0.2,
            chunk_size: 10_000,
            lookup_sample_rows: 1_000,
            upload_timeout_secs: 300,
            low_stock_margin: 0.1,
            top_materials_limit: 20,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值；缺失返回默认值，格式错误告警后返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 正数校验：非正值视为非法
    fn positive_f64(&self, key: &str, default: f64) -> RepositoryResult<f64> {
        let v = self.get_parsed_or_default(key, default)?;
        if v.is_finite() && v > 0.0 {
            Ok(v)
        } else {
            warn!(config_key = key, value = v, "配置值必须为正数，使用默认值");
            Ok(default)
        }
    }

    fn positive_usize(&self, key: &str, default: usize) -> RepositoryResult<usize> {
        let v = self.get_parsed_or_default(key, default)?;
        if v > 0 {
            Ok(v)
        } else {
            warn!(config_key = key, "配置值必须为正整数，使用默认值");
            Ok(default)
        }
    }

    // ===== 补货配置 =====

    /// 采购提前期（天，默认 30）
    pub fn get_lead_time_days(&self) -> RepositoryResult<f64> {
        self.positive_f64(config_keys::LEAD_TIME_DAYS, 30.0)
    }

    /// 安全库存系数（默认 0.2）
    pub fn get_safety_stock_fraction(&self) -> RepositoryResult<f64> {
        let v: f64 = self.get_parsed_or_default(config_keys::SAFETY_STOCK_FRACTION, 0.2)?;
        if v.is_finite() && v >= 0.0 {
            Ok(v)
        } else {
            warn!(config_key = config_keys::SAFETY_STOCK_FRACTION, value = v, "安全库存系数不能为负，使用默认值");
            Ok(0.2)
        }
    }

    // ===== 导入配置 =====

    pub fn get_chunk_size(&self) -> RepositoryResult<usize> {
        self.positive_usize(config_keys::CHUNK_SIZE, 10_000)
    }

    pub fn get_lookup_sample_rows(&self) -> RepositoryResult<usize> {
        self.positive_usize(config_keys::LOOKUP_SAMPLE_ROWS, 1_000)
    }

    pub fn get_upload_timeout_secs(&self) -> RepositoryResult<u64> {
        let v = self.get_parsed_or_default(config_keys::UPLOAD_TIMEOUT_SECS, 300u64)?;
        Ok(if v == 0 { 300 } else { v })
    }

    // ===== 报表配置 =====

    pub fn get_low_stock_margin(&self) -> RepositoryResult<f64> {
        let v: f64 = self.get_parsed_or_default(config_keys::LOW_STOCK_MARGIN, 0.1)?;
        Ok(if v.is_finite() && v >= 0.0 { v } else { 0.1 })
    }

    pub fn get_top_materials_limit(&self) -> RepositoryResult<usize> {
        self.positive_usize(config_keys::TOP_MATERIALS_LIMIT, 20)
    }

    /// 读取完整运行参数
    pub fn load_pipeline_config(&self) -> RepositoryResult<PipelineConfig> {
        Ok(PipelineConfig {
            lead_time_days: self.get_lead_time_days()?,
            safety_stock_fraction: self.get_safety_stock_fraction()?,
            chunk_size: self.get_chunk_size()?,
            lookup_sample_rows: self.get_lookup_sample_rows()?,
            upload_timeout_secs: self.get_upload_timeout_secs()?,
            low_stock_margin: self.get_low_stock_margin()?,
            top_materials_limit: self.get_top_materials_limit()?,
        })
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }

        serde_json::to_string(&map).map_err(|e| RepositoryError::InternalError(e.to_string()))
    }
}

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 补货
    pub const LEAD_TIME_DAYS: &str = "lead_time_days";
    pub const SAFETY_STOCK_FRACTION: &str = "safety_stock_fraction";

    // 导入
    pub const CHUNK_SIZE: &str = "chunk_size";
    pub const LOOKUP_SAMPLE_ROWS: &str = "lookup_sample_rows";
    pub const UPLOAD_TIMEOUT_SECS: &str = "upload_timeout_secs";

    // 报表
    pub const LOW_STOCK_MARGIN: &str = "low_stock_margin";
    pub const TOP_MATERIALS_LIMIT: &str = "top_materials_limit";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema, DEFAULT_SCHEMA_PATH};

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        let schema = format!("{}/{}", env!("CARGO_MANIFEST_DIR"), DEFAULT_SCHEMA_PATH);
        ensure_schema(&conn, &schema).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_empty() {
        let cfg = manager().load_pipeline_config().unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn test_override_and_invalid_fallback() {
        let mgr = manager();
        mgr.set_config_value(config_keys::LEAD_TIME_DAYS, "45").unwrap();
        mgr.set_config_value(config_keys::CHUNK_SIZE, "abc").unwrap();
        mgr.set_config_value(config_keys::TOP_MATERIALS_LIMIT, "0").unwrap();

        let cfg = mgr.load_pipeline_config().unwrap();
        assert_eq!(cfg.lead_time_days, 45.0);
        assert_eq!(cfg.chunk_size, 10_000);
        assert_eq!(cfg.top_materials_limit, 20);
    }

    #[test]
    fn test_upsert_overwrites() {
        let mgr = manager();
        mgr.set_config_value(config_keys::SAFETY_STOCK_FRACTION, "0.3").unwrap();
        mgr.set_config_value(config_keys::SAFETY_STOCK_FRACTION, "0.5").unwrap();
        assert_eq!(mgr.get_safety_stock_fraction().unwrap(), 0.5);

        let snapshot = mgr.get_config_snapshot().unwrap();
        assert!(snapshot.contains("\"safety_stock_fraction\":\"0.5\""));
    }

    #[test]
    fn test_fraction_getters_reject_negative_and_nan() {
        let mgr = manager();
        mgr.set_config_value(config_keys::SAFETY_STOCK_FRACTION, "-0.5").unwrap();
        mgr.set_config_value(config_keys::LOW_STOCK_MARGIN, "NaN").unwrap();
        assert_eq!(mgr.get_safety_stock_fraction().unwrap(), 0.2);
        assert_eq!(mgr.get_low_stock_margin().unwrap(), 0.1);

        mgr.set_config_value(config_keys::SAFETY_STOCK_FRACTION, "0").unwrap();
        mgr.set_config_value(config_keys::LOW_STOCK_MARGIN, "0,25").unwrap();
        assert_eq!(mgr.get_safety_stock_fraction().unwrap(), 0.0);
        assert_eq!(mgr.get_low_stock_margin().unwrap(), 0.1);
    }
}
