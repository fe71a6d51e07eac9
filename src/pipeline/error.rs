// ==========================================
// 零售数仓一致性引擎 - 管线错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 行级质量问题以标志承载，不走错误通道；
//       这里只承载结构性失败（装载 / 守恒 / 落库）
// ==========================================

use crate::conform::error::ConformError;
use crate::landing::error::LandingError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 管线错误类型
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("落地区装载失败: {0}")]
    Landing(#[from] LandingError),

    #[error("一致性转换失败: {0}")]
    Conform(#[from] ConformError),

    #[error("仓储操作失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, PipelineError>;
