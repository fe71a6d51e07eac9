// ==========================================
// 零售数仓一致性引擎 - 一致性层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 字段级问题一律本地恢复（打标志），不走错误通道；
//       此处仅承载不可恢复的结构性失败
// ==========================================

use crate::domain::types::Dataset;
use thiserror::Error;

/// 一致性层错误类型
#[derive(Error, Debug)]
pub enum ConformError {
    // ===== 不变式违反 =====
    #[error("清洗层行数不守恒 (数据集 {dataset}): raw={raw_count}, clean={clean_count}")]
    CountInvariantViolation {
        dataset: Dataset,
        raw_count: usize,
        clean_count: usize,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ConformResult<T> = Result<T, ConformError>;
