// ==========================================
// 库存台账分析系统 - 台账导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 阶段: 文件解析 → 字段映射 → 数据清洗 → 维度写入 → 事实写入
// ==========================================

use crate::domain::ledger::{LedgerRow, RawLedgerRecord};
use crate::importer::error::ImportResult;
use std::path::Path;

/// 分块读取迭代器：每项是一块原始记录，块级读取失败时为 Err
pub type RecordChunks = Box<dyn Iterator<Item = ImportResult<Vec<RawLedgerRecord>>> + Send>;

// ==========================================
// LedgerParser Trait
// ==========================================
// 用途: 台账文件解析接口（阶段 0）
// 实现者: CsvLedgerParser
pub trait LedgerParser: Send + Sync {
    /// 读取全部数据行
    ///
    /// # 返回
    /// - Ok(Vec<RawLedgerRecord>): 按文件顺序的原始记录
    /// - Err: 文件不存在 / 列布局不符 / CSV 解析失败
    fn parse_all(&self, file_path: &Path) -> ImportResult<Vec<RawLedgerRecord>>;

    /// 读取前 max_rows 行（用于分块模式的维度采样）
    fn parse_sample(&self, file_path: &Path, max_rows: usize) -> ImportResult<Vec<RawLedgerRecord>>;

    /// 打开分块读取迭代器
    ///
    /// 表头校验在打开时完成；之后每块最多 chunk_size 行
    fn open_chunks(&self, file_path: &Path, chunk_size: usize) -> ImportResult<RecordChunks>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 按位置映射 + 类型转换（阶段 1）
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 将原始记录映射为 LedgerRow
    ///
    /// 数值/布尔不可解析时为 None，不拒绝整行
    fn map_record(&self, record: &RawLedgerRecord) -> LedgerRow;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 数据清洗接口（阶段 2）
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// 清洗文本字段（TRIM，可选 UPPER；空 → None）
    fn clean_text(&self, value: Option<&str>, uppercase: bool) -> Option<String>;

    /// 解析小数（逗号小数点 → 点）；不可解析 → None
    fn parse_decimal(&self, value: Option<&str>) -> Option<f64>;

    /// 解析整数编码（同小数规则，截断为 i64）
    fn parse_code(&self, value: Option<&str>) -> Option<i64>;

    /// 解析控制标记（Sim/Não 等）；其他值 → None
    fn parse_flag(&self, value: Option<&str>) -> Option<bool>;

    /// 描述列统一大写
    fn normalize_row(&self, row: LedgerRow) -> LedgerRow;

    /// 剔除缺少物料编码或描述的行
    ///
    /// # 返回
    /// - (保留行, 剔除行数)
    fn retain_identified(&self, rows: Vec<LedgerRow>) -> (Vec<LedgerRow>, usize);
}
