// ==========================================
// 零售数仓一致性引擎 - CSV 批次装载
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 落地区批次交付约定
// 职责: 把落地区 CSV 原样读成键值行，不做任何解析与清洗
// 红线: 摄入序号 = 文件内行号（0 起），同批次内稳定，是去重裁决的
//       最终平票依据
// ==========================================

use crate::domain::record::{Provenance, RawRecord};
use crate::landing::error::{LandingError, LandingResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// 读取单个 CSV 文件为原始记录（表头即字段名，单元格原样保留）
pub fn load_csv_batch(
    path: &Path,
    batch_id: &str,
    loaded_at: DateTime<Utc>,
) -> LandingResult<Vec<RawRecord>> {
    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::None)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (seq, result) in reader.records().enumerate() {
        let row = result?;
        let mut fields = BTreeMap::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            fields.insert(header.to_string(), cell.to_string());
        }
        records.push(RawRecord::new(
            fields,
            Provenance {
                batch_id: batch_id.to_string(),
                loaded_at,
                source_file: source_file.clone(),
                record_seq: seq as i64,
            },
        ));
    }

    info!(file = %source_file, rows = records.len(), "落地区文件装载完成");
    Ok(records)
}

/// 读取可选文件：不存在按空数据集处理（批次允许缺文件）
pub fn load_optional_csv(
    dir: &Path,
    file_name: &str,
    batch_id: &str,
    loaded_at: DateTime<Utc>,
) -> LandingResult<Vec<RawRecord>> {
    let path = dir.join(file_name);
    if !path.exists() {
        info!(file = file_name, "落地区文件不存在，按空数据集处理");
        return Ok(Vec::new());
    }
    load_csv_batch(&path, batch_id, loaded_at)
}
