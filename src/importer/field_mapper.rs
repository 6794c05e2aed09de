// ==========================================
// 库存台账分析系统 - 字段映射器实现
// ==========================================
// 职责: 位置列 → LedgerRow 字段 + 类型转换
// 规则: 数值/布尔不可解析 → None；文本仅 TRIM（大写在清洗阶段）
// ==========================================

use crate::domain::ledger::{LedgerColumn, LedgerRow, RawLedgerRecord};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::ledger_importer_trait::{
    DataCleaner as DataCleanerTrait, FieldMapper as FieldMapperTrait,
};

pub struct FieldMapper;

impl FieldMapper {
    fn text(&self, record: &RawLedgerRecord, column: LedgerColumn) -> Option<String> {
        DataCleaner.clean_text(record.get(column), false)
    }

    fn decimal(&self, record: &RawLedgerRecord, column: LedgerColumn) -> Option<f64> {
        DataCleaner.parse_decimal(record.get(column))
    }

    fn code(&self, record: &RawLedgerRecord, column: LedgerColumn) -> Option<i64> {
        DataCleaner.parse_code(record.get(column))
    }

    fn flag(&self, record: &RawLedgerRecord, column: LedgerColumn) -> Option<bool> {
        DataCleaner.parse_flag(record.get(column))
    }
}

impl FieldMapperTrait for FieldMapper {
    fn map_record(&self, record: &RawLedgerRecord) -> LedgerRow {
        use LedgerColumn as C;

        LedgerRow {
            row_number: record.row_number,

            // 期间
            period: self.text(record, C::Period),

            // 分类层级
            family_code: self.code(record, C::FamilyCode),
            family_desc: self.text(record, C::FamilyDesc),
            group_code: self.code(record, C::GroupCode),
            group_desc: self.text(record, C::GroupDesc),
            type_code: self.code(record, C::TypeCode),
            type_desc: self.text(record, C::TypeDesc),

            // 物料
            material_code: self.code(record, C::MaterialCode),
            material_desc: self.text(record, C::MaterialDesc),
            status: self.text(record, C::Status),
            unit: self.text(record, C::Unit),
            min_stock_control: self.flag(record, C::MinStockControl),
            min_stock: self.decimal(record, C::MinStock),
            max_stock_control: self.flag(record, C::MaxStockControl),
            max_stock: self.decimal(record, C::MaxStock),
            xyz_curve: self.text(record, C::XyzCurve),

            // 仓库 / 库位（库位以 location_code 列为准）
            location_code: self.text(record, C::LocationCode),
            location_desc: self.text(record, C::LocationDesc),
            warehouse_code: self.code(record, C::WarehouseCode),
            warehouse_desc: self.text(record, C::WarehouseDesc),

            // 度量
            quantity: self.decimal(record, C::Quantity),
            average_cost: self.decimal(record, C::AverageCost),
            total_value: self.decimal(record, C::TotalValue),

            // 税务 / 会计
            sped_code: self.code(record, C::SpedCode),
            sped_desc: self.text(record, C::SpedDesc),
            account_code: self.code(record, C::AccountCode),
            account_desc: self.text(record, C::AccountDesc),
            ncm: self.text(record, C::Ncm),
            fiscal_desc: self.text(record, C::FiscalDesc),
            identification_code: self.code(record, C::IdentificationCode),
            identification_desc: self.text(record, C::IdentificationDesc),
        }
    }
}
