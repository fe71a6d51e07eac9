// ==========================================
// 零售数仓一致性引擎 - 落地区错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 落地区装载错误类型
#[derive(Error, Debug)]
pub enum LandingError {
    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 解析失败: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type LandingResult<T> = Result<T, LandingError>;
