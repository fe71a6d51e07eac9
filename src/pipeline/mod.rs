// ==========================================
// 零售数仓一致性引擎 - 管线层
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 批次运行主流程
// 组成: 批次装载 → 一致性转换 → 维度刷新 → 事实装配 → 隔离留痕
// ==========================================

pub mod batches;
pub mod error;
pub mod runner;

// 重导出核心组件
pub use batches::RawBatches;
pub use error::{PipelineError, PipelineResult};
pub use runner::{PipelineRunner, RunSummary};
