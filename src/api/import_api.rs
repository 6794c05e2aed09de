// ==========================================
// 库存台账分析系统 - 导入 API
// ==========================================
// 职责: 建库 / 台账导入 / 上传文件重处理 / 清库
// 上传链路: 字节 → 临时文件 → spawn_blocking 分块导入 → 超时控制
// 超时后调用方立即得到错误，后台导入继续执行至结束（无中途取消点）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, PipelineConfig};
use crate::db::{self, open_initialized_connection};
use crate::domain::import::ImportSummary;
use crate::domain::types::LoadMode;
use crate::importer::LedgerImporter;
use rusqlite::Connection;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// 导入 API
pub struct ImportApi {
    db_path: String,
    schema_path: String,
}

impl ImportApi {
    /// 使用默认建库脚本路径创建（见 db::default_schema_path）
    pub fn new(db_path: impl Into<String>) -> Self {
        Self::with_schema_path(db_path, db::default_schema_path())
    }

    pub fn with_schema_path(db_path: impl Into<String>, schema_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            schema_path: schema_path.into(),
        }
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 打开已建库的数据库；未建库时报错且不创建库文件
    fn open_shared(db_path: &str) -> ApiResult<Arc<Mutex<Connection>>> {
        let conn = open_initialized_connection(db_path)?;
        Ok(Arc::new(Mutex::new(conn)))
    }

    pub fn schema_path(&self) -> &str {
        &self.schema_path
    }

    /// 读取运行参数（读取失败时使用默认值）
    fn load_config(conn: &Arc<Mutex<Connection>>) -> PipelineConfig {
        match ConfigManager::from_connection(conn.clone()).load_pipeline_config() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "运行参数读取失败，使用默认值");
                PipelineConfig::default()
            }
        }
    }

    /// 建库
    ///
    /// # 返回
    /// - Ok(true): 执行了建库脚本（库文件不存在或缺少业务表）
    /// - Ok(false): 业务表已存在，未做任何事
    /// - Err(SchemaAssetMissing): 建库脚本缺失
    pub fn initialize_store(&self) -> ApiResult<bool> {
        Ok(db::initialize_database(&self.db_path, &self.schema_path)?)
    }

    /// 导入台账文件
    #[instrument(skip(self), fields(db_path = %self.db_path))]
    pub fn import_file(&self, file_path: &Path, mode: LoadMode) -> ApiResult<ImportSummary> {
        if !file_path.exists() {
            return Err(ApiError::NotFound(format!("文件 {}", file_path.display())));
        }
        let conn = Self::open_shared(&self.db_path)?;
        let config = Self::load_config(&conn);
        let importer = LedgerImporter::new(conn, config);
        Ok(importer.import_file(file_path, mode)?)
    }

    /// 按配置的块大小分块导入
    pub fn import_file_chunked(&self, file_path: &Path) -> ApiResult<ImportSummary> {
        let conn = Self::open_shared(&self.db_path)?;
        let chunk_size = Self::load_config(&conn).chunk_size;
        drop(conn);
        self.import_file(file_path, LoadMode::Chunked { chunk_size })
    }

    /// 上传内容重处理（分块模式，超时取 upload_timeout_secs）
    pub async fn reprocess_upload(&self, content: Vec<u8>) -> ApiResult<ImportSummary> {
        let conn = Self::open_shared(&self.db_path)?;
        let timeout_secs = Self::load_config(&conn).upload_timeout_secs;
        drop(conn);
        self.reprocess_upload_with_timeout(content, Duration::from_secs(timeout_secs))
            .await
    }

    /// 上传内容重处理（显式超时）
    ///
    /// 临时文件随后台任务结束一同删除
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn reprocess_upload_with_timeout(
        &self,
        content: Vec<u8>,
        timeout: Duration,
    ) -> ApiResult<ImportSummary> {
        let mut upload = tempfile::Builder::new()
            .prefix("ledger-upload-")
            .suffix(".csv")
            .tempfile()
            .map_err(|e| ApiError::ImportError(format!("临时文件创建失败: {}", e)))?;
        upload
            .write_all(&content)
            .and_then(|_| upload.flush())
            .map_err(|e| ApiError::ImportError(format!("临时文件写入失败: {}", e)))?;
        drop(content);

        let db_path = self.db_path.clone();
        let task = tokio::task::spawn_blocking(move || -> ApiResult<ImportSummary> {
            let conn = Self::open_shared(&db_path)?;
            let config = Self::load_config(&conn);
            let mode = LoadMode::Chunked {
                chunk_size: config.chunk_size,
            };
            let importer = LedgerImporter::new(conn, config);
            let result = importer.import_file(upload.path(), mode);
            drop(upload);
            Ok(result?)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => {
                if let Ok(summary) = &result {
                    info!(batch_id = %summary.batch_id, "上传文件处理完成");
                }
                result
            }
            Ok(Err(join_err)) => {
                error!(error = %join_err, "上传处理任务异常终止");
                Err(ApiError::InternalError(join_err.to_string()))
            }
            Err(_) => {
                error!(timeout_secs = timeout.as_secs(), "上传处理超时");
                Err(ApiError::UploadTimeout(timeout.as_secs()))
            }
        }
    }

    /// 清空全部业务表（不含 config_kv）
    #[instrument(skip(self), fields(db_path = %self.db_path))]
    pub fn wipe_all_tables(&self) -> ApiResult<()> {
        let mut conn = open_initialized_connection(&self.db_path)?;
        db::wipe_all_tables(&mut conn)
            .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_store_missing_schema() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("store.db");
        let api = ImportApi::with_schema_path(
            db_path.to_string_lossy().to_string(),
            dir.path().join("absent.sql").to_string_lossy().to_string(),
        );

        let result = api.initialize_store();
        assert!(matches!(result, Err(ApiError::SchemaAssetMissing(_))));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_import_missing_file() {
        let dir = TempDir::new().unwrap();
        let api = ImportApi::new(dir.path().join("store.db").to_string_lossy().to_string());
        let result = api.import_file(&dir.path().join("nope.csv"), LoadMode::WholeFile);
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
