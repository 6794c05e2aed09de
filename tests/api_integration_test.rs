// ==========================================
// ImportApi / DashboardApi 集成测试
// ==========================================
// 测试目标: 建库 → 导入 → 上传重处理 → 清库
// ==========================================


use std::time::Duration;
use stock_ledger_analytics::config::config_keys;
use stock_ledger_analytics::repository::FactRepository;
use stock_ledger_analytics::{
    logging, ApiError, ConfigManager, DashboardApi, ImportApi, LoadMode,
};
use tempfile::TempDir;
use test_helpers::{
    count_rows, ledger_bytes, schema_path, shared_conn, standard_ledger, write_ledger, LedgerLine,
};

fn fresh_store() -> (TempDir, String, ImportApi) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ledger.db").to_string_lossy().to_string();
    let api = ImportApi::with_schema_path(db_path.clone(), schema_path());
    assert!(api.initialize_store().unwrap());
    (dir, db_path, api)
}

#[test]
fn test_initialize_store_runs_once() {
    let (_dir, db_path, api) = fresh_store();
    assert!(!api.initialize_store().unwrap());
    assert_eq!(count_rows(&db_path, "stock_facts"), 0);
}

#[test]
fn test_reads_before_init_do_not_block_initialization() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("fresh.db").to_string_lossy().to_string();
    let api = ImportApi::with_schema_path(db_path.clone(), schema_path());
    let file = write_ledger(&standard_ledger());

    // 建库前的读取与导入都报错，且不留下空库文件
    assert!(matches!(DashboardApi::open(&db_path), Err(ApiError::NotFound(_))));
    assert!(matches!(api.wipe_all_tables(), Err(ApiError::NotFound(_))));
    assert!(!std::path::Path::new(&db_path).exists());

    assert!(api.initialize_store().unwrap());
    let summary = api.import_file(file.path(), LoadMode::WholeFile).unwrap();
    assert_eq!(summary.inserted_facts, 9);
    assert_eq!(DashboardApi::open(&db_path).unwrap().overview().stock_facts, 9);
}

#[test]
fn test_initialize_store_builds_schema_into_empty_file() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("empty.db");
    std::fs::File::create(&db_path).unwrap();
    let db_path = db_path.to_string_lossy().to_string();
    let api = ImportApi::with_schema_path(db_path.clone(), schema_path());

    assert!(matches!(DashboardApi::open(&db_path), Err(ApiError::NotFound(_))));
    assert!(api.initialize_store().unwrap());
    assert!(!api.initialize_store().unwrap());

    let file = write_ledger(&standard_ledger());
    api.import_file(file.path(), LoadMode::WholeFile).unwrap();
    assert_eq!(count_rows(&db_path, "stock_facts"), 9);
}

#[test]
fn test_import_then_dashboard() {
    logging::init_test();
    let (_dir, db_path, api) = fresh_store();
    let file = write_ledger(&standard_ledger());

    let summary = api.import_file(file.path(), LoadMode::WholeFile).unwrap();
    assert_eq!(summary.inserted_facts, 9);

    let dashboard = DashboardApi::open(&db_path).unwrap();
    assert_eq!(dashboard.overview().stock_facts, 9);
    assert_eq!(dashboard.kpis().material_count, 3);
    assert!(!dashboard.alerts().is_empty());
}

#[test]
fn test_import_layout_mismatch_maps_to_api_error() {
    let (_dir, _db_path, api) = fresh_store();
    let file = test_helpers::write_raw("a;b;c\n1;2;3");

    let err = api.import_file(file.path(), LoadMode::WholeFile).unwrap_err();
    assert!(matches!(
        err,
        ApiError::ColumnLayoutMismatch {
            expected: 32,
            found: 3
        }
    ));
}

#[test]
fn test_config_overrides_reach_dashboard() {
    let (_dir, db_path, _api) = fresh_store();
    let config = ConfigManager::from_connection(shared_conn(&db_path));
    config.set_config_value(config_keys::LEAD_TIME_DAYS, "60").unwrap();
    config
        .set_config_value(config_keys::TOP_MATERIALS_LIMIT, "not-a-number")
        .unwrap();

    let dashboard = DashboardApi::open(&db_path).unwrap();
    assert_eq!(dashboard.config().lead_time_days, 60.0);
    assert_eq!(dashboard.config().top_materials_limit, 20);
}

#[test]
fn test_wipe_all_tables() {
    let (_dir, db_path, api) = fresh_store();
    let file = write_ledger(&standard_ledger());
    api.import_file(file.path(), LoadMode::WholeFile).unwrap();
    ConfigManager::from_connection(shared_conn(&db_path))
        .set_config_value(config_keys::CHUNK_SIZE, "500")
        .unwrap();

    api.wipe_all_tables().unwrap();

    for table in stock_ledger_analytics::db::ALL_TABLES {
        assert_eq!(count_rows(&db_path, table), 0, "table {}", table);
    }
    // 运行配置保留
    assert_eq!(count_rows(&db_path, "config_kv"), 1);
}

#[tokio::test]
async fn test_reprocess_upload_uses_chunked_mode() {
    let (_dir, db_path, api) = fresh_store();
    ConfigManager::from_connection(shared_conn(&db_path))
        .set_config_value(config_keys::CHUNK_SIZE, "4")
        .unwrap();

    let summary = api
        .reprocess_upload(ledger_bytes(&standard_ledger()))
        .await
        .unwrap();

    assert_eq!(summary.mode, LoadMode::Chunked { chunk_size: 4 });
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.inserted_facts, 9);
    assert_eq!(summary.dropped_rows, 1);

    let batch = FactRepository::new(shared_conn(&db_path))
        .find_import_batch(&summary.batch_id)
        .unwrap()
        .expect("import batch row");
    assert_eq!(batch.load_mode, "CHUNKED(4)");
    assert!(batch.file_name.unwrap_or_default().starts_with("ledger-upload-"));
}

#[tokio::test]
async fn test_reprocess_upload_rejects_bad_layout() {
    let (_dir, _db_path, api) = fresh_store();
    let err = api
        .reprocess_upload(b"period;material_code\njan/23;1".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ColumnLayoutMismatch { found: 2, .. }));
}

#[tokio::test]
async fn test_reprocess_upload_timeout() {
    let (_dir, _db_path, api) = fresh_store();
    let lines: Vec<LedgerLine> = (0..5_000)
        .map(|i| LedgerLine::new("jan/23", &(10_000 + i).to_string(), "item", "1"))
        .collect();

    let err = api
        .reprocess_upload_with_timeout(ledger_bytes(&lines), Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::UploadTimeout(0)));
}
