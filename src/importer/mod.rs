// ==========================================
// 库存台账分析系统 - 导入层
// ==========================================
// 职责: 台账文件 → 维度表 + 库存事实
// 支持: 分号分隔 CSV（UTF-8 / Latin-1），整文件或分块
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod fact_loader;
pub mod field_mapper;
pub mod file_parser;
pub mod ledger_importer;
pub mod ledger_importer_trait;
pub mod lookup_resolver;

// 重导出核心类型
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use error::{ImportError, ImportResult};
pub use fact_loader::FactLoader;
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::CsvLedgerParser;
pub use ledger_importer::LedgerImporter;
pub use lookup_resolver::LookupResolver;

// 重导出 Trait 接口
pub use ledger_importer_trait::{DataCleaner, FieldMapper, LedgerParser, RecordChunks};
