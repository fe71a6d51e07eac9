// ==========================================
// 零售数仓一致性引擎 - 一致性引擎
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 一致性主流程
// 流程: 逐行类型化/标准化/对账 → 去重裁决 → 行数守恒校验
// 红线: 绝不丢行；raw 与 clean 1:1
// ==========================================

use crate::config::ConformanceConfig;
use crate::conform::deduplicator::{resolve_current, DedupStats};
use crate::conform::error::{ConformError, ConformResult};
use crate::domain::record::{CleanRecord, RawRecord};
use crate::domain::types::{Dataset, FlagSet};
use serde::Serialize;
use tracing::{debug, instrument};

// ==========================================
// Conformable - 数据集一致性契约
// ==========================================
// 每个源数据集实现一次：字段规则表 + 词表绑定 + 对账接线
pub trait Conformable {
    /// 类型化清洗载荷
    type Clean: Clone + Serialize;

    /// 所属数据集
    const DATASET: Dataset;

    /// 单行一致性转换（永不失败，违规以标志承载）
    ///
    /// # 返回
    /// - Clean: 类型化载荷
    /// - Option<String>: 自然键（无法解析则 None）
    /// - FlagSet: 质量标志集
    fn conform(raw: &RawRecord, config: &ConformanceConfig) -> (Self::Clean, Option<String>, FlagSet);
}

// ==========================================
// ConformanceEngine - 批次一致性引擎
// ==========================================
pub struct ConformanceEngine {
    config: ConformanceConfig,
}

impl ConformanceEngine {
    pub fn new(config: ConformanceConfig) -> Self {
        ConformanceEngine { config }
    }

    pub fn config(&self) -> &ConformanceConfig {
        &self.config
    }

    /// 将原始批次转换为清洗批次
    ///
    /// 不变式: 输出行数 == 输入行数（违反即结构性错误，中止本次运行）
    #[instrument(skip(self, raws), fields(dataset = %D::DATASET))]
    pub fn conform_batch<D: Conformable>(
        &self,
        raws: &[RawRecord],
    ) -> ConformResult<Vec<CleanRecord<D::Clean>>> {
        let mut clean: Vec<CleanRecord<D::Clean>> = Vec::with_capacity(raws.len());

        for raw in raws {
            let (values, natural_key, flags) = D::conform(raw, &self.config);
            clean.push(CleanRecord::new(
                values,
                natural_key,
                flags,
                raw.provenance.clone(),
            ));
        }

        if clean.len() != raws.len() {
            return Err(ConformError::CountInvariantViolation {
                dataset: D::DATASET,
                raw_count: raws.len(),
                clean_count: clean.len(),
            });
        }

        let stats: DedupStats = resolve_current(&mut clean);
        debug!(
            rows = clean.len(),
            distinct_keys = stats.distinct_keys,
            duplicates = stats.duplicates,
            keyless = stats.keyless,
            "批次一致性转换完成"
        );

        Ok(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Provenance;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    // 最小数据集：单字段 id 即自然键
    #[derive(Debug, Clone, Serialize)]
    struct IdOnly {
        id: Option<String>,
    }

    struct IdOnlyDataset;

    impl Conformable for IdOnlyDataset {
        type Clean = IdOnly;
        const DATASET: Dataset = Dataset::Products;

        fn conform(
            raw: &RawRecord,
            _config: &ConformanceConfig,
        ) -> (Self::Clean, Option<String>, FlagSet) {
            let id = raw.get("id").map(|s| s.to_string());
            (IdOnly { id: id.clone() }, id, FlagSet::new())
        }
    }

    fn raw(id: Option<&str>, ts_secs: i64, seq: i64) -> RawRecord {
        let mut fields = BTreeMap::new();
        if let Some(id) = id {
            fields.insert("id".to_string(), id.to_string());
        }
        RawRecord::new(
            fields,
            Provenance {
                batch_id: "B001".to_string(),
                loaded_at: Utc.timestamp_opt(ts_secs, 0).unwrap(),
                source_file: "test.csv".to_string(),
                record_seq: seq,
            },
        )
    }

    #[test]
    fn test_count_preserved_including_bad_rows() {
        let engine = ConformanceEngine::new(ConformanceConfig::default());
        let raws = vec![raw(Some("A"), 1, 0), raw(None, 1, 1), raw(Some("A"), 2, 2)];

        let clean = engine.conform_batch::<IdOnlyDataset>(&raws).unwrap();

        assert_eq!(clean.len(), raws.len());
    }

    #[test]
    fn test_dedup_applied_in_batch() {
        let engine = ConformanceEngine::new(ConformanceConfig::default());
        let raws = vec![raw(Some("A"), 1, 0), raw(Some("A"), 2, 1)];

        let clean = engine.conform_batch::<IdOnlyDataset>(&raws).unwrap();

        assert!(!clean[0].current);
        assert!(clean[1].current);
    }

    #[test]
    fn test_provenance_inherited() {
        let engine = ConformanceEngine::new(ConformanceConfig::default());
        let raws = vec![raw(Some("A"), 42, 7)];

        let clean = engine.conform_batch::<IdOnlyDataset>(&raws).unwrap();

        assert_eq!(clean[0].provenance.record_seq, 7);
        assert_eq!(clean[0].provenance.batch_id, "B001");
    }
}
