// ==========================================
// 零售数仓一致性引擎 - 清洗层 Repository
// ==========================================
// 依据: Conformance_Spec_v0.2.md - 清洗层落库
// 职责: 清洗记录持久化（通用 payload JSON 形态）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 红线: 行数守恒由调用方保证，本层 1:1 落库、逐批整体替换
// ==========================================

use crate::domain::record::CleanRecord;
use crate::domain::types::{Dataset, FlagSet, QualityFlag};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::{Arc, Mutex};

// ==========================================
// CleanRepository
// ==========================================
pub struct CleanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CleanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 整体替换某数据集的清洗记录（幂等重建）
    ///
    /// payload 为清洗后结构体的 JSON 序列化，flags 为标志集合 JSON
    pub fn replace_dataset<T: Serialize>(
        &self,
        dataset: Dataset,
        records: &[CleanRecord<T>],
    ) -> RepositoryResult<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM clean_record WHERE dataset = ?1",
            params![dataset.to_db_str()],
        )?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO clean_record (
                    dataset, record_seq, batch_id, loaded_at, source_file,
                    natural_key, is_current, flags, payload
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;

            for record in records {
                let payload = serde_json::to_string(&record.values)?;
                stmt.execute(params![
                    dataset.to_db_str(),
                    record.provenance.record_seq,
                    record.provenance.batch_id,
                    record.provenance.loaded_at,
                    record.provenance.source_file,
                    record.natural_key,
                    record.current,
                    record.flags.to_json(),
                    payload,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 向指定清洗行追加质量标志（事实装配阶段回写用）
    ///
    /// 标志集合只增不减；重复追加同一标志不产生变化
    pub fn append_flag(
        &self,
        dataset: Dataset,
        batch_id: &str,
        record_seq: i64,
        flag: QualityFlag,
    ) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT flags FROM clean_record
                 WHERE dataset = ?1 AND batch_id = ?2 AND record_seq = ?3",
                params![dataset.to_db_str(), batch_id, record_seq],
                |row| row.get(0),
            )
            .optional()?;

        let Some(flags_json) = existing else {
            return Err(RepositoryError::NotFound {
                entity: "clean_record".to_string(),
                id: format!("{}/{}/{}", dataset.to_db_str(), batch_id, record_seq),
            });
        };

        let mut flags = FlagSet::from_json(&flags_json);
        flags.insert(flag);

        conn.execute(
            "UPDATE clean_record SET flags = ?1
             WHERE dataset = ?2 AND batch_id = ?3 AND record_seq = ?4",
            params![flags.to_json(), dataset.to_db_str(), batch_id, record_seq],
        )?;
        Ok(())
    }

    /// 某数据集清洗行总数（行数守恒核对用）
    pub fn count(&self, dataset: Dataset) -> RepositoryResult<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clean_record WHERE dataset = ?1",
            params![dataset.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// 某数据集 current 行数
    pub fn current_count(&self, dataset: Dataset) -> RepositoryResult<i64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM clean_record WHERE dataset = ?1 AND is_current = 1",
            params![dataset.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Provenance;
    use crate::repository::schema::init_schema;
    use chrono::Utc;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Payload {
        value: i64,
    }

    fn repo() -> CleanRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        CleanRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn record(seq: i64, key: Option<&str>) -> CleanRecord<Payload> {
        let mut r = CleanRecord::new(
            Payload { value: seq },
            key.map(|k| k.to_string()),
            FlagSet::new(),
            Provenance {
                batch_id: "B001".to_string(),
                loaded_at: Utc::now(),
                source_file: "test.csv".to_string(),
                record_seq: seq,
            },
        );
        r.current = key.is_some();
        r
    }

    #[test]
    fn test_replace_dataset_is_idempotent() {
        let repo = repo();
        let records = vec![record(0, Some("K1")), record(1, None)];

        repo.replace_dataset(Dataset::Products, &records).unwrap();
        repo.replace_dataset(Dataset::Products, &records).unwrap();

        assert_eq!(repo.count(Dataset::Products).unwrap(), 2);
        assert_eq!(repo.current_count(Dataset::Products).unwrap(), 1);
    }

    #[test]
    fn test_append_flag_merges_into_existing_set() {
        let repo = repo();
        repo.replace_dataset(Dataset::Returns, &[record(0, Some("R1"))])
            .unwrap();

        repo.append_flag(Dataset::Returns, "B001", 0, QualityFlag::UnresolvedReference)
            .unwrap();
        // 重复追加不报错、不重复
        repo.append_flag(Dataset::Returns, "B001", 0, QualityFlag::UnresolvedReference)
            .unwrap();

        let conn = repo.conn.lock().unwrap();
        let flags: String = conn
            .query_row(
                "SELECT flags FROM clean_record WHERE dataset = 'RETURNS' AND record_seq = 0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let set = FlagSet::from_json(&flags);
        assert!(set.contains(QualityFlag::UnresolvedReference));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_append_flag_missing_row() {
        let repo = repo();
        let err = repo
            .append_flag(Dataset::Returns, "B001", 99, QualityFlag::MissingRequired)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
