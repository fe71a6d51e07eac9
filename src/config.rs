// ==========================================
// 零售数仓一致性引擎 - 配置层
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 对账容差与运行参数
// 职责: 运行配置加载；全部字段带默认值，配置文件可选
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("配置文件格式错误: {0}")]
    ParseError(#[from] serde_json::Error),
}

// ==========================================
// ConformanceConfig - 引擎运行配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    /// 财务对账绝对容差（货币单位）
    pub reconciliation_tolerance: f64,
}

impl Default for ConformanceConfig {
    fn default() -> Self {
        ConformanceConfig {
            reconciliation_tolerance: 0.05,
        }
    }
}

impl ConformanceConfig {
    /// 从 JSON 文件加载配置（缺省字段取默认值）
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance() {
        let cfg = ConformanceConfig::default();
        assert!((cfg.reconciliation_tolerance - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ConformanceConfig = serde_json::from_str("{}").unwrap();
        assert!((cfg.reconciliation_tolerance - 0.05).abs() < f64::EPSILON);
    }
}
