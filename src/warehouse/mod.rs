// ==========================================
// 零售数仓一致性引擎 - 数仓层
// ==========================================
// 依据: dimensional_model_v0.1.md - 星型模型装配
// 组成: 代理键解析 → 维度构建 → 事实装配 → 分析投影
// 红线: 事实装配失败一律隔离留痕，绝不静默丢行
// ==========================================

pub mod dimension_resolver;
pub mod fact_assembler;
pub mod projection;

// 重导出核心组件
pub use dimension_resolver::{
    build_date_dimensions, build_product_dimensions, build_store_dimensions, DimensionResolver,
};
pub use fact_assembler::{AssemblyOutcome, FactAssembler};
pub use projection::{AtRiskInventoryRow, DailySalesRow, Projections, QuarantineSummaryRow};
