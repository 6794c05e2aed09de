// ==========================================
// 库存台账分析系统 - 台账文件解析器
// ==========================================
// 格式: 分号分隔 / 首行表头 / 固定 32 列
// 编码: 字段为合法 UTF-8 时按 UTF-8，否则按 Latin-1 解码
// ==========================================

use crate::domain::ledger::{RawLedgerRecord, LEDGER_COLUMN_COUNT};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::ledger_importer_trait::{LedgerParser, RecordChunks};
use csv::{ByteRecord, Reader, ReaderBuilder};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// 字段字节解码（UTF-8 优先，Latin-1 兜底）
pub fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1 每个字节即一个 Unicode 码位
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn to_raw_record(record: &ByteRecord, row_number: usize) -> Option<RawLedgerRecord> {
    let mut values: Vec<Option<String>> = Vec::with_capacity(LEDGER_COLUMN_COUNT);
    for idx in 0..LEDGER_COLUMN_COUNT {
        let value = record.get(idx).map(decode_field).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });
        values.push(value);
    }

    // 跳过完全空白的行
    if values.iter().all(|v| v.is_none()) {
        return None;
    }

    Some(RawLedgerRecord { row_number, values })
}

// ==========================================
// CsvLedgerParser
// ==========================================
pub struct CsvLedgerParser;

impl CsvLedgerParser {
    /// 打开文件并校验表头列数
    fn open_reader(&self, file_path: &Path) -> ImportResult<Reader<File>> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true) // 允许行长度不一致，缺失列视为空
            .from_reader(file);

        let found = reader.byte_headers()?.len();
        if found == 0 {
            return Err(ImportError::MissingHeader(file_path.display().to_string()));
        }
        if found != LEDGER_COLUMN_COUNT {
            return Err(ImportError::ColumnLayoutMismatch {
                expected: LEDGER_COLUMN_COUNT,
                found,
            });
        }

        Ok(reader)
    }

    fn read_rows(&self, file_path: &Path, limit: Option<usize>) -> ImportResult<Vec<RawLedgerRecord>> {
        let mut reader = self.open_reader(file_path)?;
        let mut records = Vec::new();
        let mut record = ByteRecord::new();
        let mut row_number = 0usize;

        while limit.map_or(true, |max| records.len() < max) {
            if !reader.read_byte_record(&mut record)? {
                break;
            }
            row_number += 1;
            if record.len() > LEDGER_COLUMN_COUNT {
                warn!(row = row_number, fields = record.len(), "行字段数超出布局，多余字段忽略");
            }
            if let Some(raw) = to_raw_record(&record, row_number) {
                records.push(raw);
            }
        }

        debug!(file = %file_path.display(), rows = records.len(), "台账文件读取完成");
        Ok(records)
    }
}

impl LedgerParser for CsvLedgerParser {
    fn parse_all(&self, file_path: &Path) -> ImportResult<Vec<RawLedgerRecord>> {
        self.read_rows(file_path, None)
    }

    fn parse_sample(&self, file_path: &Path, max_rows: usize) -> ImportResult<Vec<RawLedgerRecord>> {
        self.read_rows(file_path, Some(max_rows))
    }

    fn open_chunks(&self, file_path: &Path, chunk_size: usize) -> ImportResult<RecordChunks> {
        let reader = self.open_reader(file_path)?;
        Ok(Box::new(LedgerChunks {
            reader,
            chunk_size: chunk_size.max(1),
            row_number: 0,
            finished: false,
        }))
    }
}

// ==========================================
// LedgerChunks - 分块迭代器
// ==========================================
// 单条记录解析失败: 本块作废（Err），后续块继续
// IO 失败: 本块作废并终止迭代
struct LedgerChunks {
    reader: Reader<File>,
    chunk_size: usize,
    row_number: usize,
    finished: bool,
}

impl Iterator for LedgerChunks {
    type Item = ImportResult<Vec<RawLedgerRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut record = ByteRecord::new();
        let mut failure: Option<ImportError> = None;
        let mut consumed = 0usize;

        while consumed < self.chunk_size {
            match self.reader.read_byte_record(&mut record) {
                Ok(true) => {
                    consumed += 1;
                    self.row_number += 1;
                    if let Some(raw) = to_raw_record(&record, self.row_number) {
                        chunk.push(raw);
                    }
                }
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    consumed += 1;
                    self.row_number += 1;
                    if e.is_io_error() {
                        self.finished = true;
                    }
                    // 同一块内只保留第一个错误，读满本块以保持块边界
                    if failure.is_none() {
                        failure = Some(e.into());
                    }
                    if self.finished {
                        break;
                    }
                }
            }
        }

        if let Some(err) = failure {
            return Some(Err(err));
        }
        if chunk.is_empty() && self.finished {
            return None;
        }
        Some(Ok(chunk))
    }
}
