// ==========================================
// 周计划排产分配引擎 - 操作日志数据仓储
// ==========================================
// 表: action_log
// 红线: 所有覆写写入必须记录
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::types::PlanId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, log)
    }

    /// 在调用方给定的连接/事务上插入操作日志
    pub(crate) fn insert_with(conn: &Connection, log: &ActionLog) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, plan_id, action_type, action_ts, actor, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                log.action_id,
                log.plan_id,
                log.action_type,
                log.action_ts.format(TS_FMT).to_string(),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    /// 按计划明细查询操作日志 (按写入顺序)
    pub fn find_by_plan_id(&self, plan_id: PlanId) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, plan_id, action_type, action_ts, actor, payload_json, detail
            FROM action_log
            WHERE plan_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let logs = stmt
            .query_map(params![plan_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn map_row(row: &Row) -> rusqlite::Result<ActionLog> {
        let ts_raw: String = row.get(3)?;
        let action_ts = NaiveDateTime::parse_from_str(&ts_raw, TS_FMT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        let payload_raw: Option<String> = row.get(5)?;

        Ok(ActionLog {
            action_id: row.get(0)?,
            plan_id: row.get(1)?,
            action_type: row.get(2)?,
            action_ts,
            actor: row.get(4)?,
            // 损坏的负载不影响日志读取
            payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(6)?,
        })
    }
}
