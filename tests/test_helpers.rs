// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、原始记录构造等功能
// ==========================================

use chrono::{DateTime, TimeZone, Utc};
use retail_conformance::db::configure_sqlite_connection;
use retail_conformance::repository::init_schema;
use retail_conformance::{Provenance, RawRecord};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<Mutex<Connection>>: 已配置 PRAGMA 的连接
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let conn = Connection::open(temp_file.path())?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// 固定的批次到达时间（测试确定性）
pub fn batch_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 21, 3, 0, 0).unwrap()
}

/// 构造一条原始记录
pub fn raw(pairs: &[(&str, &str)], source_file: &str, seq: i64) -> RawRecord {
    raw_at(pairs, source_file, seq, batch_time())
}

/// 构造一条带指定到达时间的原始记录（去重裁决测试用）
pub fn raw_at(
    pairs: &[(&str, &str)],
    source_file: &str,
    seq: i64,
    loaded_at: DateTime<Utc>,
) -> RawRecord {
    let mut fields = BTreeMap::new();
    for (k, v) in pairs {
        fields.insert(k.to_string(), v.to_string());
    }
    RawRecord::new(
        fields,
        Provenance {
            batch_id: "B001".to_string(),
            loaded_at,
            source_file: source_file.to_string(),
            record_seq: seq,
        },
    )
}

/// 读取某表行数
pub fn table_count(conn: &Arc<Mutex<Connection>>, table: &str) -> i64 {
    let conn = conn.lock().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// 把一条 SQL 的全部行转成字符串向量（重跑幂等比对用；
/// 各列以 | 连接，NULL 记为 <null>）
pub fn dump_rows(conn: &Arc<Mutex<Connection>>, sql: &str) -> Vec<String> {
    let conn = conn.lock().unwrap();
    let mut stmt = conn.prepare(sql).unwrap();
    let column_count = stmt.column_count();
    let rows = stmt
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let cell: rusqlite::types::Value = row.get(i)?;
                cells.push(match cell {
                    rusqlite::types::Value::Null => "<null>".to_string(),
                    rusqlite::types::Value::Integer(v) => v.to_string(),
                    rusqlite::types::Value::Real(v) => format!("{:.6}", v),
                    rusqlite::types::Value::Text(v) => v,
                    rusqlite::types::Value::Blob(v) => format!("{:?}", v),
                });
            }
            Ok(cells.join("|"))
        })
        .unwrap();
    rows.map(|r| r.unwrap()).collect()
}
