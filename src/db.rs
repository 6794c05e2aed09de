// ==========================================
// 库存台账分析系统 - SQLite 连接与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 按 schema 资源建库；是否已建库以业务表是否存在为准，而非库文件是否存在
// - 读写入口只打开已建库的数据库，不隐式创建空库文件
// - 清空全部表（按外键安全顺序）
// ==========================================

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// schema 资源相对路径
pub const DEFAULT_SCHEMA_PATH: &str = "schema/inventory_schema.sql";

/// 建库脚本路径环境变量
pub const SCHEMA_PATH_ENV: &str = "STOCK_LEDGER_SCHEMA_PATH";

/// 全部业务表，按外键安全顺序（先子后父）
pub const ALL_TABLES: [&str; 13] = [
    "stock_facts",
    "materials",
    "material_groups",
    "families",
    "material_types",
    "periods",
    "locations",
    "warehouses",
    "sped_classifications",
    "accounting_accounts",
    "fiscal_classifications",
    "identifications",
    "import_batch",
];

#[derive(Error, Debug)]
pub enum DbError {
    #[error("建库脚本不存在: {0}")]
    SchemaAssetMissing(String),

    #[error("建库脚本读取失败: {0}")]
    SchemaReadError(String),

    #[error("数据库未初始化: {0}")]
    StoreNotInitialized(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "STOCK_LEDGER_DB_PATH";

/// 默认数据库路径
///
/// 优先使用 STOCK_LEDGER_DB_PATH；否则放在用户数据目录下，取不到时回退到当前目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(dir) => dir
            .join("stock-ledger")
            .join("stock_ledger.db")
            .to_string_lossy()
            .to_string(),
        None => "./stock_ledger.db".to_string(),
    }
}

/// 默认建库脚本路径
///
/// 依次尝试: STOCK_LEDGER_SCHEMA_PATH → 工作目录 → 可执行文件所在目录 → 构建时的 crate 目录
/// 均不存在时返回相对路径，由建库时报告缺失
pub fn default_schema_path() -> String {
    if let Ok(path) = std::env::var(SCHEMA_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut candidates = vec![PathBuf::from(DEFAULT_SCHEMA_PATH)];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(DEFAULT_SCHEMA_PATH));
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SCHEMA_PATH));

    candidates
        .into_iter()
        .find(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH))
        .to_string_lossy()
        .to_string()
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// foreign_keys / busy_timeout 都需要“每个连接”单独设置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开已建库的数据库（不创建文件）
///
/// 库文件不存在或缺少业务表 → StoreNotInitialized
pub fn open_initialized_connection(db_path: &str) -> Result<Connection, DbError> {
    if !Path::new(db_path).is_file() {
        return Err(DbError::StoreNotInitialized(db_path.to_string()));
    }
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    configure_sqlite_connection(&conn)?;
    if !schema_initialized(&conn)? {
        return Err(DbError::StoreNotInitialized(db_path.to_string()));
    }
    Ok(conn)
}

/// 业务表是否已建（以 stock_facts 为准）
pub fn schema_initialized(conn: &Connection) -> rusqlite::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='stock_facts' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?;
    Ok(found.unwrap_or(false))
}

/// 初始化数据库
///
/// - 业务表不存在（含库文件不存在、空库文件）: 执行 schema，返回 true
/// - 业务表已存在: 不做任何事，返回 false
/// - schema 资源缺失: 致命错误（不会创建库文件）
#[instrument(skip_all, fields(db_path = %db_path))]
pub fn initialize_database(db_path: &str, schema_path: &str) -> Result<bool, DbError> {
    let db_exists = Path::new(db_path).exists();
    if db_exists {
        let conn = open_sqlite_connection(db_path)?;
        if schema_initialized(&conn)? {
            info!("数据库已建库，跳过");
            return Ok(false);
        }
        warn!("库文件存在但缺少业务表，执行建库脚本");
    }

    if !Path::new(schema_path).is_file() {
        return Err(DbError::SchemaAssetMissing(schema_path.to_string()));
    }

    if !db_exists {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::SchemaReadError(format!("{}: {}", parent.display(), e)))?;
            }
        }
    }

    let conn = open_sqlite_connection(db_path)?;
    let created = ensure_schema(&conn, schema_path)?;
    info!(schema_path = %schema_path, "数据库建库完成");
    Ok(created)
}

/// 对已打开的连接执行建库脚本（仅当核心表不存在时）
///
/// 用于内存库或调用方自行管理文件的场景
pub fn ensure_schema(conn: &Connection, schema_path: &str) -> Result<bool, DbError> {
    if schema_initialized(conn)? {
        return Ok(false);
    }

    let script = std::fs::read_to_string(schema_path)
        .map_err(|_| DbError::SchemaAssetMissing(schema_path.to_string()))?;
    conn.execute_batch(&script)?;
    Ok(true)
}

/// 清空全部表（单事务，失败整体回滚）
#[instrument(skip(conn))]
pub fn wipe_all_tables(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    for table in ALL_TABLES {
        tx.execute(&format!("DELETE FROM {}", table), [])?;
    }
    tx.commit()?;
    info!(tables = ALL_TABLES.len(), "已清空全部数据表");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn schema_path() -> String {
        format!("{}/{}", env!("CARGO_MANIFEST_DIR"), DEFAULT_SCHEMA_PATH)
    }

    #[test]
    fn test_default_db_path() {
        let path = default_db_path();
        assert!(!path.is_empty());
        if std::env::var(DB_PATH_ENV).is_err() {
            assert!(path.ends_with(".db"));
        }
    }

    #[test]
    fn test_initialize_creates_schema_once() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("ledger.db");
        let db_path = db_path.to_str().unwrap();

        assert!(initialize_database(db_path, &schema_path()).unwrap());
        assert!(!initialize_database(db_path, &schema_path()).unwrap());

        let conn = open_sqlite_connection(db_path).unwrap();
        for table in ALL_TABLES {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
                .unwrap();
            assert_eq!(n, 0, "table {}", table);
        }
    }

    #[test]
    fn test_initialize_repairs_empty_db_file() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("ledger.db");
        let db_path = db_path.to_str().unwrap();

        // 读写入口在建库前打开过同一路径，只留下空库文件
        drop(Connection::open(db_path).unwrap());
        assert!(matches!(
            open_initialized_connection(db_path),
            Err(DbError::StoreNotInitialized(_))
        ));

        assert!(initialize_database(db_path, &schema_path()).unwrap());
        let conn = open_initialized_connection(db_path).unwrap();
        assert!(schema_initialized(&conn).unwrap());
    }

    #[test]
    fn test_open_initialized_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("absent.db");

        let err = open_initialized_connection(db_path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DbError::StoreNotInitialized(_)));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_default_schema_path_resolves_asset() {
        if std::env::var(SCHEMA_PATH_ENV).is_err() {
            assert!(Path::new(&default_schema_path()).is_file());
        }
    }

    #[test]
    fn test_missing_schema_is_fatal() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("ledger.db");
        let err = initialize_database(db_path.to_str().unwrap(), "/nonexistent/schema.sql")
            .unwrap_err();
        assert!(matches!(err, DbError::SchemaAssetMissing(_)));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_wipe_all_tables_respects_foreign_keys() {
        let mut conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn, &schema_path()).unwrap();

        conn.execute("INSERT INTO families (code, description) VALUES (1, 'F')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO material_groups (code, description, family_id) VALUES (10, 'G', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO materials (code, description, group_id) VALUES (100, 'M', 1)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO stock_facts (material_id, quantity) VALUES (1, 5.0)", [])
            .unwrap();

        wipe_all_tables(&mut conn).unwrap();

        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM materials", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }
}
