// ==========================================
// 零售数仓一致性引擎 - 去重器
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 确定性去重裁决
// 契约: 每个自然键恰好一条 current；落选记录打标志保留（审计留痕）
// 平票: loaded_at 相同时按 record_seq（稳定摄入序号）裁决，
//       绝不依赖不稳定排序
// ==========================================

use crate::domain::record::CleanRecord;
use crate::domain::types::QualityFlag;
use std::collections::HashMap;

// ==========================================
// DedupStats - 去重统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub distinct_keys: usize, // 不同自然键数
    pub duplicates: usize,    // 被判为非当前的重复记录数
    pub keyless: usize,       // 无自然键记录数（永不晋级）
}

/// 当前/被取代 分区裁决
///
/// 纯内存操作：仅改写 current 与 flags，不删除任何记录
pub fn resolve_current<T>(records: &mut [CleanRecord<T>]) -> DedupStats {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut stats = DedupStats::default();

    for (idx, record) in records.iter().enumerate() {
        match &record.natural_key {
            Some(key) => groups.entry(key.clone()).or_default().push(idx),
            None => {
                stats.keyless += 1;
            }
        }
    }

    stats.distinct_keys = groups.len();

    for (_key, indices) in groups {
        // 胜出者：最新到达时间；平票取最大摄入序号
        let winner = indices
            .iter()
            .copied()
            .max_by_key(|&i| {
                let p = &records[i].provenance;
                (p.loaded_at, p.record_seq)
            })
            .unwrap_or(indices[0]);

        for idx in indices {
            if idx == winner {
                records[idx].current = true;
            } else {
                records[idx].current = false;
                records[idx].flags.insert(QualityFlag::DuplicateRecord);
                stats.duplicates += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Provenance;
    use crate::domain::types::FlagSet;
    use chrono::{TimeZone, Utc};

    fn record(key: Option<&str>, ts_secs: i64, seq: i64) -> CleanRecord<String> {
        CleanRecord::new(
            "payload".to_string(),
            key.map(|k| k.to_string()),
            FlagSet::new(),
            Provenance {
                batch_id: "B001".to_string(),
                loaded_at: Utc.timestamp_opt(ts_secs, 0).unwrap(),
                source_file: "test.csv".to_string(),
                record_seq: seq,
            },
        )
    }

    #[test]
    fn test_single_record_becomes_current() {
        let mut records = vec![record(Some("T100"), 1000, 0)];
        let stats = resolve_current(&mut records);

        assert!(records[0].current);
        assert_eq!(stats.distinct_keys, 1);
        assert_eq!(stats.duplicates, 0);
    }

    #[test]
    fn test_latest_timestamp_wins() {
        let mut records = vec![
            record(Some("T100"), 2000, 0),
            record(Some("T100"), 1000, 1),
        ];
        let stats = resolve_current(&mut records);

        assert!(records[0].current);
        assert!(!records[1].current);
        assert!(records[1].flags.contains(QualityFlag::DuplicateRecord));
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn test_timestamp_tie_breaks_on_record_seq() {
        let mut records = vec![
            record(Some("T100"), 1000, 3),
            record(Some("T100"), 1000, 7),
            record(Some("T100"), 1000, 5),
        ];
        resolve_current(&mut records);

        assert!(!records[0].current);
        assert!(records[1].current); // seq=7 胜出
        assert!(!records[2].current);
    }

    #[test]
    fn test_exactly_one_current_per_key() {
        let mut records = vec![
            record(Some("A"), 1000, 0),
            record(Some("A"), 1000, 1),
            record(Some("B"), 1000, 2),
            record(Some("A"), 3000, 3),
        ];
        resolve_current(&mut records);

        let current_a = records
            .iter()
            .filter(|r| r.natural_key.as_deref() == Some("A") && r.current)
            .count();
        assert_eq!(current_a, 1);
        assert!(records[3].current);
    }

    #[test]
    fn test_keyless_never_current_and_retained() {
        let mut records = vec![record(None, 1000, 0), record(Some("X"), 1000, 1)];
        let stats = resolve_current(&mut records);

        assert!(!records[0].current);
        assert_eq!(stats.keyless, 1);
        assert_eq!(records.len(), 2); // 无删除
    }

    #[test]
    fn test_deterministic_across_input_order() {
        let mut a = vec![
            record(Some("K"), 1000, 1),
            record(Some("K"), 1000, 2),
        ];
        let mut b = vec![
            record(Some("K"), 1000, 2),
            record(Some("K"), 1000, 1),
        ];
        resolve_current(&mut a);
        resolve_current(&mut b);

        let winner_a = a.iter().find(|r| r.current).unwrap().provenance.record_seq;
        let winner_b = b.iter().find(|r| r.current).unwrap().provenance.record_seq;
        assert_eq!(winner_a, winner_b);
    }
}
