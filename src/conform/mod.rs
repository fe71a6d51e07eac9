// ==========================================
// 零售数仓一致性引擎 - 一致性层
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 一致性引擎
// 组成: 字段解析 → 类目标准化 → 财务对账 → 去重裁决
// 红线: 字段级问题打标志本地恢复，绝不丢行、绝不抛错
// ==========================================

pub mod dataset;
pub mod deduplicator;
pub mod engine;
pub mod error;
pub mod field_parser;
pub mod normalizer;
pub mod reconciler;

// 重导出核心组件
pub use deduplicator::{resolve_current, DedupStats};
pub use engine::{Conformable, ConformanceEngine};
pub use error::{ConformError, ConformResult};
pub use field_parser::{parse_row, FieldRule, FieldType, TypedRow, TypedValue};
pub use normalizer::{normalize, NormRule};
pub use reconciler::{round_money, Reconciler};
