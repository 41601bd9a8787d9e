// ==========================================
// 周计划排产分配引擎 - 完工汇总数据仓储
// ==========================================
// 表: completion_record (order_ref, iso_week, year)
// ==========================================

use crate::domain::completion::CompletionRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::CompletionSource;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// CompletionRepository - 完工仓储
// ==========================================
pub struct CompletionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompletionRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入完工汇总 (同键覆盖)
    pub fn upsert(&self, record: &CompletionRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO completion_record (order_ref, iso_week, year, completed_qty)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(order_ref, iso_week, year) DO UPDATE SET
                completed_qty = excluded.completed_qty
            "#,
            params![
                record.order_ref,
                record.iso_week,
                record.year,
                record.completed_qty
            ],
        )?;
        Ok(())
    }

    /// 查询全部完工汇总
    pub fn list_all(&self) -> RepositoryResult<Vec<CompletionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_ref, iso_week, year, completed_qty
            FROM completion_record
            ORDER BY year, iso_week, order_ref
            "#,
        )?;
        let records = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn map_row(row: &Row) -> rusqlite::Result<CompletionRecord> {
        Ok(CompletionRecord {
            order_ref: row.get(0)?,
            iso_week: row.get(1)?,
            year: row.get(2)?,
            completed_qty: row.get(3)?,
        })
    }
}

impl CompletionSource for CompletionRepository {
    fn load_completions(&self) -> RepositoryResult<Vec<CompletionRecord>> {
        self.list_all()
    }
}
