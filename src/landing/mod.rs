// ==========================================
// 零售数仓一致性引擎 - 落地区
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 批次交付约定
// 职责: 按批次读取落地区 CSV，交付原样键值行
// ==========================================

pub mod csv_loader;
pub mod error;

pub use csv_loader::{load_csv_batch, load_optional_csv};
pub use error::{LandingError, LandingResult};
