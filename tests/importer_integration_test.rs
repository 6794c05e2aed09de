// ==========================================
// LedgerImporter 集成测试
// ==========================================
// 测试目标: 整文件 / 分块导入，维度幂等与事实追加
// ==========================================


use std::path::Path;
use stock_ledger_analytics::domain::{DimensionCode, RawLedgerRecord};
use stock_ledger_analytics::importer::{
    CsvLedgerParser, DataCleanerImpl, FieldMapperImpl, ImportError, ImportResult, LedgerImporter,
    LedgerParser, RecordChunks,
};
use stock_ledger_analytics::logging;
use stock_ledger_analytics::repository::{AnalyticsRepository, DimensionRepository, FactRepository};
use stock_ledger_analytics::{Dimension, LoadMode, PipelineConfig};
use test_helpers::{
    count_rows, create_test_db, shared_conn, standard_ledger, write_ledger, write_raw, LedgerLine,
    LEDGER_HEADER,
};

fn importer(db_path: &str, config: PipelineConfig) -> LedgerImporter {
    LedgerImporter::new(shared_conn(db_path), config)
}

/// 第 fail_chunk 块读取失败的解析器，其余行为与 CSV 解析器一致
struct FailingChunkParser {
    fail_chunk: usize,
}

impl LedgerParser for FailingChunkParser {
    fn parse_all(&self, file_path: &Path) -> ImportResult<Vec<RawLedgerRecord>> {
        CsvLedgerParser.parse_all(file_path)
    }

    fn parse_sample(&self, file_path: &Path, max_rows: usize) -> ImportResult<Vec<RawLedgerRecord>> {
        CsvLedgerParser.parse_sample(file_path, max_rows)
    }

    fn open_chunks(&self, file_path: &Path, chunk_size: usize) -> ImportResult<RecordChunks> {
        let fail_chunk = self.fail_chunk;
        let chunks = CsvLedgerParser.open_chunks(file_path, chunk_size)?;
        Ok(Box::new(chunks.enumerate().map(move |(index, chunk)| {
            if index == fail_chunk {
                Err(ImportError::CsvParseError(format!("块 {} 读取中断", index)))
            } else {
                chunk
            }
        })))
    }
}

#[test]
fn test_whole_file_import_counts() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_ledger(&standard_ledger());

    let summary = importer(&db_path, PipelineConfig::default())
        .import_file(file.path(), LoadMode::WholeFile)
        .unwrap();

    assert_eq!(summary.total_rows, 10);
    assert_eq!(summary.dropped_rows, 1);
    assert_eq!(summary.rejected_rows, 0);
    assert_eq!(summary.inserted_facts, 9);
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.lookup.periods, 4);
    assert_eq!(summary.lookup.groups, 2);
    assert_eq!(summary.lookup.materials, 3);

    assert_eq!(count_rows(&db_path, "stock_facts"), 9);
    assert_eq!(count_rows(&db_path, "materials"), 3);
    assert_eq!(count_rows(&db_path, "families"), 1);
    assert_eq!(count_rows(&db_path, "locations"), 1);
    assert_eq!(count_rows(&db_path, "fiscal_classifications"), 1);

    // 批次记录
    let batch = FactRepository::new(shared_conn(&db_path))
        .find_import_batch(&summary.batch_id)
        .unwrap()
        .expect("import batch row");
    assert_eq!(batch.load_mode, "WHOLE_FILE");
    assert_eq!(batch.inserted_facts, 9);
    assert_eq!(batch.dropped_rows, 1);
}

#[test]
fn test_reimport_is_idempotent_for_dimensions_but_appends_facts() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_ledger(&standard_ledger());
    let imp = importer(&db_path, PipelineConfig::default());

    imp.import_file(file.path(), LoadMode::WholeFile).unwrap();
    let dims = DimensionRepository::new(shared_conn(&db_path));
    let periods_before = dims.count(Dimension::Period).unwrap();
    let materials_before = dims.count(Dimension::Material).unwrap();

    let second = imp.import_file(file.path(), LoadMode::WholeFile).unwrap();

    assert_eq!(second.lookup.total(), 0);
    assert_eq!(dims.count(Dimension::Period).unwrap(), periods_before);
    assert_eq!(dims.count(Dimension::Material).unwrap(), materials_before);
    assert_eq!(count_rows(&db_path, "stock_facts"), 18);
    assert_eq!(count_rows(&db_path, "import_batch"), 2);
}

#[test]
fn test_first_description_wins() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let imp = importer(&db_path, PipelineConfig::default());

    let first = write_ledger(&[LedgerLine::new("jan/23", "2001", "valvula", "1")]);
    let second = write_ledger(&[LedgerLine::new("fev/23", "2001", "valvula esfera", "1")]);
    imp.import_file(first.path(), LoadMode::WholeFile).unwrap();
    imp.import_file(second.path(), LoadMode::WholeFile).unwrap();

    let desc = DimensionRepository::new(shared_conn(&db_path))
        .find_description(Dimension::Material, &DimensionCode::Int(2001))
        .unwrap();
    assert_eq!(desc.as_deref(), Some("VALVULA"));
    assert_eq!(count_rows(&db_path, "stock_facts"), 2);
}

#[test]
fn test_chunked_matches_whole_file() {
    let (_tmp_a, whole_db) = create_test_db().unwrap();
    let (_tmp_b, chunked_db) = create_test_db().unwrap();
    let file = write_ledger(&standard_ledger());

    let whole = importer(&whole_db, PipelineConfig::default())
        .import_file(file.path(), LoadMode::WholeFile)
        .unwrap();
    let chunked = importer(&chunked_db, PipelineConfig::default())
        .import_file(file.path(), LoadMode::Chunked { chunk_size: 3 })
        .unwrap();

    assert_eq!(chunked.chunks, 4);
    assert_eq!(chunked.failed_chunks, 0);
    assert_eq!(chunked.total_rows, whole.total_rows);
    assert_eq!(chunked.dropped_rows, whole.dropped_rows);
    assert_eq!(chunked.inserted_facts, whole.inserted_facts);
    assert_eq!(count_rows(&chunked_db, "materials"), 3);
}

#[test]
fn test_chunked_inserts_materials_outside_sample() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_ledger(&standard_ledger());
    let config = PipelineConfig {
        lookup_sample_rows: 1,
        ..PipelineConfig::default()
    };

    let summary = importer(&db_path, config)
        .import_file(file.path(), LoadMode::Chunked { chunk_size: 2 })
        .unwrap();

    // 采样仅含 jan/23 与物料 1001；后续物料逐块补写
    assert_eq!(summary.lookup.periods, 1);
    assert_eq!(summary.lookup.materials, 3);
    assert_eq!(summary.inserted_facts, 9);
    assert_eq!(count_rows(&db_path, "periods"), 1);

    // 采样外的期间外键为 NULL
    let null_periods: i64 = shared_conn(&db_path)
        .lock()
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM stock_facts WHERE period_id IS NULL",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(null_periods, 7);
}

#[test]
fn test_column_layout_mismatch_is_fatal() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_raw("period;material_code;material_desc;quantity;total_value\njan/23;1;X;1;1");

    let err = importer(&db_path, PipelineConfig::default())
        .import_file(file.path(), LoadMode::WholeFile)
        .unwrap_err();

    assert!(matches!(
        err,
        ImportError::ColumnLayoutMismatch {
            expected: 32,
            found: 5
        }
    ));
    assert_eq!(count_rows(&db_path, "stock_facts"), 0);
    assert_eq!(count_rows(&db_path, "import_batch"), 0);
}

#[test]
fn test_missing_file_is_fatal() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let err = importer(&db_path, PipelineConfig::default())
        .import_file(std::path::Path::new("/nonexistent/ledger.csv"), LoadMode::WholeFile)
        .unwrap_err();
    assert!(matches!(err, ImportError::FileNotFound(_)));
}

#[test]
fn test_malformed_numbers_become_null() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_ledger(&[
        LedgerLine::new("jan/23", "3001", "luva", "1.234,56").cost("abc").value("7,25"),
    ]);

    importer(&db_path, PipelineConfig::default())
        .import_file(file.path(), LoadMode::WholeFile)
        .unwrap();

    let history = AnalyticsRepository::new(shared_conn(&db_path))
        .material_history(3001)
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].quantity, None);
    assert_eq!(history[0].average_cost, None);
    assert_eq!(history[0].total_value, Some(7.25));
    assert_eq!(history[0].year, Some(2023));
    assert_eq!(history[0].month, Some(1));
    assert_eq!(history[0].material_desc, "LUVA");
}

#[test]
fn test_header_only_file() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_raw(LEDGER_HEADER);

    let summary = importer(&db_path, PipelineConfig::default())
        .import_file(file.path(), LoadMode::WholeFile)
        .unwrap();
    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.inserted_facts, 0);
    assert_eq!(count_rows(&db_path, "import_batch"), 1);
}

#[test]
fn test_failed_chunk_is_abandoned_and_later_chunks_continue() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let file = write_ledger(&standard_ledger());

    let importer = LedgerImporter::with_components(
        shared_conn(&db_path),
        Box::new(FailingChunkParser { fail_chunk: 1 }),
        Box::new(FieldMapperImpl),
        Box::new(DataCleanerImpl),
        PipelineConfig::default(),
    );
    let summary = importer
        .import_file(file.path(), LoadMode::Chunked { chunk_size: 3 })
        .unwrap();

    // 第 2 块（行 4..=6）整块放弃；第 3、4 块照常写入
    assert_eq!(summary.chunks, 4);
    assert_eq!(summary.failed_chunks, 1);
    assert_eq!(summary.total_rows, 7);
    assert_eq!(summary.dropped_rows, 1);
    assert_eq!(summary.inserted_facts, 6);
    assert_eq!(summary.failed_rows, 0);
    assert_eq!(count_rows(&db_path, "stock_facts"), 6);

    let history = AnalyticsRepository::new(shared_conn(&db_path))
        .material_history(1003)
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[test]
fn test_rejected_fact_insert_skips_only_that_row() {
    let (_tmp, db_path) = create_test_db().unwrap();
    shared_conn(&db_path)
        .lock()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_quantity_13 BEFORE INSERT ON stock_facts
             WHEN NEW.quantity = 13
             BEGIN SELECT RAISE(ABORT, 'quantidade bloqueada'); END;",
        )
        .unwrap();

    let mut lines = standard_ledger();
    lines.push(LedgerLine::new("abr/23", "1002", "porca m8", "13"));
    let file = write_ledger(&lines);

    for mode in [LoadMode::WholeFile, LoadMode::Chunked { chunk_size: 4 }] {
        let summary = importer(&db_path, PipelineConfig::default())
            .import_file(file.path(), mode)
            .unwrap();
        assert_eq!(summary.failed_rows, 1, "mode {}", mode);
        assert_eq!(summary.failed_chunks, 0, "mode {}", mode);
        assert_eq!(summary.inserted_facts, 9, "mode {}", mode);
    }
    assert_eq!(count_rows(&db_path, "stock_facts"), 18);
}
