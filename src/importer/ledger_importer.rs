// ==========================================
// 库存台账分析系统 - 台账导入器
// ==========================================
// 流程:
// 0. 文件解析（表头列数校验）
// 1. 字段映射与类型转换
// 2. 清洗（描述大写 / 剔除无物料标识行）
// 3. 维度写入（INSERT OR IGNORE）
// 4. 事实写入（事务化）
// 5. 记录 import_batch
// ==========================================
// 模式:
// - WholeFile: 全量读入，维度来自全部行，事实单事务
// - Chunked: 维度来自采样行；之后逐块清洗、补写物料、单块单事务
//   块失败 → error 并放弃本块，继续下一块
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::import::{ImportSummary, LookupStats};
use crate::domain::ledger::{LedgerRow, RawLedgerRecord};
use crate::domain::types::LoadMode;
use crate::importer::data_cleaner::DataCleaner as DataCleanerImpl;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::fact_loader::FactLoader;
use crate::importer::field_mapper::FieldMapper as FieldMapperImpl;
use crate::importer::file_parser::CsvLedgerParser;
use crate::importer::ledger_importer_trait::{DataCleaner, FieldMapper, LedgerParser};
use crate::importer::lookup_resolver::LookupResolver;
use crate::repository::fact_repo::insert_import_batch_tx;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// LedgerImporter
// ==========================================
pub struct LedgerImporter {
    conn: Arc<Mutex<Connection>>,
    parser: Box<dyn LedgerParser>,
    mapper: Box<dyn FieldMapper>,
    cleaner: Box<dyn DataCleaner>,
    loader: FactLoader,
    config: PipelineConfig,
}

impl LedgerImporter {
    /// 使用默认组件创建导入器
    pub fn new(conn: Arc<Mutex<Connection>>, config: PipelineConfig) -> Self {
        Self::with_components(
            conn,
            Box::new(CsvLedgerParser),
            Box::new(FieldMapperImpl),
            Box::new(DataCleanerImpl),
            config,
        )
    }

    /// 注入自定义组件（测试用）
    pub fn with_components(
        conn: Arc<Mutex<Connection>>,
        parser: Box<dyn LedgerParser>,
        mapper: Box<dyn FieldMapper>,
        cleaner: Box<dyn DataCleaner>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            conn,
            parser,
            mapper,
            cleaner,
            loader: FactLoader,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 映射 + 清洗；返回 (保留行, 剔除行数)
    fn prepare_rows(&self, records: &[RawLedgerRecord]) -> (Vec<LedgerRow>, usize) {
        let rows: Vec<LedgerRow> = records
            .iter()
            .map(|r| self.cleaner.normalize_row(self.mapper.map_record(r)))
            .collect();
        self.cleaner.retain_identified(rows)
    }

    /// 导入台账文件
    ///
    /// # 返回
    /// - Ok(ImportSummary): 导入汇总（已写入 import_batch）
    /// - Err: 文件不存在 / 列布局不符 / 整文件模式下的数据库失败
    #[instrument(skip_all, fields(file = %file_path.display(), mode = %mode))]
    pub fn import_file(&self, file_path: &Path, mode: LoadMode) -> ImportResult<ImportSummary> {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        info!(batch_id = %batch_id, "开始导入台账");

        let mut summary = ImportSummary {
            batch_id,
            file_name: file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            mode,
            total_rows: 0,
            dropped_rows: 0,
            rejected_rows: 0,
            failed_rows: 0,
            inserted_facts: 0,
            chunks: 0,
            failed_chunks: 0,
            lookup: LookupStats::default(),
            elapsed_ms: 0,
            imported_at: Utc::now(),
        };

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;

        match mode {
            LoadMode::WholeFile => self.import_whole_file(&mut conn, file_path, &mut summary)?,
            LoadMode::Chunked { chunk_size } => {
                self.import_chunked(&mut conn, file_path, chunk_size, &mut summary)?
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        if let Err(e) = insert_import_batch_tx(&conn, &summary) {
            warn!(batch_id = %summary.batch_id, error = %e, "导入批次记录写入失败");
        }

        info!(
            batch_id = %summary.batch_id,
            total_rows = summary.total_rows,
            dropped_rows = summary.dropped_rows,
            rejected_rows = summary.rejected_rows,
            failed_rows = summary.failed_rows,
            inserted_facts = summary.inserted_facts,
            failed_chunks = summary.failed_chunks,
            elapsed_ms = summary.elapsed_ms as u64,
            "台账导入完成"
        );
        Ok(summary)
    }

    // ==========================================
    // 整文件模式
    // ==========================================
    fn import_whole_file(
        &self,
        conn: &mut Connection,
        file_path: &Path,
        summary: &mut ImportSummary,
    ) -> ImportResult<()> {
        let records = self.parser.parse_all(file_path)?;
        summary.total_rows = records.len();
        summary.chunks = 1;

        let (rows, dropped) = self.prepare_rows(&records);
        drop(records);
        summary.dropped_rows = dropped;

        let mut resolver = LookupResolver::new();
        let tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        summary.lookup = resolver.populate(&tx, &rows)?;
        let stats = self.loader.load_rows(&tx, &mut resolver, &rows)?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        summary.inserted_facts = stats.inserted;
        summary.rejected_rows = stats.rejected;
        summary.failed_rows = stats.failed;
        Ok(())
    }

    // ==========================================
    // 分块模式
    // ==========================================
    fn import_chunked(
        &self,
        conn: &mut Connection,
        file_path: &Path,
        chunk_size: usize,
        summary: &mut ImportSummary,
    ) -> ImportResult<()> {
        let mut resolver = LookupResolver::new();

        // ===== 采样行写入维度 =====
        let sample = self
            .parser
            .parse_sample(file_path, self.config.lookup_sample_rows)?;
        let (sample_rows, _) = self.prepare_rows(&sample);
        drop(sample);

        let tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        summary.lookup = resolver.populate(&tx, &sample_rows)?;
        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        info!(
            sample_rows = sample_rows.len(),
            lookup_inserted = summary.lookup.total(),
            "采样维度写入完成"
        );
        drop(sample_rows);

        // ===== 逐块写入 =====
        for (chunk_index, chunk) in self.parser.open_chunks(file_path, chunk_size)?.enumerate() {
            summary.chunks += 1;

            let records = match chunk {
                Ok(records) => records,
                Err(e) => {
                    summary.failed_chunks += 1;
                    error!(chunk = chunk_index, error = %e, "块读取失败，放弃本块");
                    continue;
                }
            };

            summary.total_rows += records.len();
            let (rows, dropped) = self.prepare_rows(&records);
            drop(records);
            summary.dropped_rows += dropped;

            match self.load_chunk(conn, &mut resolver, &rows) {
                Ok((materials, stats)) => {
                    summary.lookup.materials += materials;
                    summary.inserted_facts += stats.inserted;
                    summary.rejected_rows += stats.rejected;
                    summary.failed_rows += stats.failed;
                }
                Err(e) => {
                    summary.failed_chunks += 1;
                    // 回滚后缓存中可能有未提交的代理键
                    resolver = LookupResolver::new();
                    error!(chunk = chunk_index, rows = rows.len(), error = %e, "块写入失败，放弃本块");
                }
            }
        }

        Ok(())
    }

    /// 单块事务：补写物料 + 写入事实
    fn load_chunk(
        &self,
        conn: &mut Connection,
        resolver: &mut LookupResolver,
        rows: &[LedgerRow],
    ) -> ImportResult<(usize, crate::domain::import::FactLoadStats)> {
        let tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let materials = resolver.populate_materials(&tx, rows)?;
        let stats = self.loader.load_rows(&tx, resolver, rows)?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        Ok((materials, stats))
    }
}
