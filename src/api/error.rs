// ==========================================
// 库存台账分析系统 - API 层错误类型
// ==========================================
// 职责: 将仓储 / 导入 / 建库错误转换为调用方可读的错误消息
// ==========================================

use crate::db::DbError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("建库脚本不存在: {0}")]
    SchemaAssetMissing(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("列布局不符: 期望 {expected} 列，实际 {found} 列")]
    ColumnLayoutMismatch { expected: usize, found: usize },

    #[error("上传处理超时: {0} 秒")]
    UploadTimeout(u64),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            ImportError::ColumnLayoutMismatch { expected, found } => {
                ApiError::ColumnLayoutMismatch { expected, found }
            }
            ImportError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            ImportError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            ImportError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

// ==========================================
// 从 DbError 转换
// ==========================================
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SchemaAssetMissing(path) => ApiError::SchemaAssetMissing(path),
            DbError::SchemaReadError(msg) => ApiError::InternalError(msg),
            DbError::StoreNotInitialized(path) => {
                ApiError::NotFound(format!("数据库 {}（请先建库）", path))
            }
            DbError::Sqlite(e) => ApiError::DatabaseError(e.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
