// ==========================================
// 零售数仓一致性引擎 - 核心库
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 系统宪法
// 技术栈: Rust + SQLite
// 系统定位: 批处理数据管线（单写者，逐批重建可重跑）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 一致性层 - 类型化/标准化/对账/去重
pub mod conform;

// 数仓层 - 维度解析/事实装配/分析投影
pub mod warehouse;

// 数据仓储层 - 数据访问
pub mod repository;

// 落地区 - CSV 批次装载
pub mod landing;

// 管线层 - 批次编排
pub mod pipeline;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Dataset, FlagSet, QualityFlag, SourceSystem};

// 领域实体
pub use domain::dimension::{DateDimension, ProductDimension, StoreDimension};
pub use domain::fact::{
    EcomOrderFact, InventorySnapshotFact, PosTransactionFact, QuarantinedRecord, ReturnFact,
    SalesLineFact,
};
pub use domain::record::{CleanRecord, Provenance, RawRecord};

// 引擎与管线
pub use conform::{ConformanceEngine, Conformable};
pub use pipeline::{PipelineRunner, RawBatches, RunSummary};
pub use warehouse::{DimensionResolver, FactAssembler, Projections};

// 配置
pub use config::ConformanceConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "零售数仓一致性引擎";

// ==========================================
// 预编译检查
// ==========================================
