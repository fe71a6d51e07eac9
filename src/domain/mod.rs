// ==========================================
// 零售数仓一致性引擎 - 领域层
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 数据模型
// 红线: 领域层不依赖仓储/管线，纯值类型
// ==========================================

pub mod dimension;
pub mod fact;
pub mod record;
pub mod types;

// 重导出核心类型
pub use dimension::{date_key_of, DateDimension, ProductDimension, StoreDimension};
pub use fact::{
    EcomOrderFact, InventorySnapshotFact, PosTransactionFact, QuarantinedRecord, ReturnFact,
    SalesLineFact,
};
pub use record::{CleanRecord, Provenance, RawRecord};
pub use types::{Dataset, FlagSet, QualityFlag, SourceSystem};
