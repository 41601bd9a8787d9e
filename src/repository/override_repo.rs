// ==========================================
// 周计划排产分配引擎 - 覆写存储仓储
// ==========================================
// 存储: plan_override 表 (每个计划明细一条 JSON 记录)
// 格式: {"<部件名>": {"<部门ID>": <数量>}}
// 并发: revision 乐观锁,同一 plan_id 的整体替换串行化
// 审计: save_audited 与 action_log 同一事务提交
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::plan::OverrideMap;
use crate::domain::types::{PlanId, SectorId};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::traits::{OverrideStore, StoredOverrides};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// JSON 编解码
// ==========================================

/// 编码覆写结构为 JSON 文本
pub fn encode_override_blob(overrides: &OverrideMap) -> RepositoryResult<String> {
    Ok(serde_json::to_string(overrides)?)
}

/// 容错解码覆写 JSON
///
/// # 规则
/// - 非法 JSON / 顶层不是对象: 视为无覆写
/// - 单元格为空串或 null: 视为空白,跳过
/// - 部门ID或数量无法解析的单元格: 跳过
pub fn decode_override_blob(raw: &str) -> OverrideMap {
    let mut result = OverrideMap::new();

    let value: JsonValue = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "覆写 JSON 无法解析,按无覆写处理");
            return result;
        }
    };

    let parts = match value {
        JsonValue::Object(map) => map,
        JsonValue::Null => return result,
        other => {
            warn!(kind = %json_kind(&other), "覆写 JSON 顶层不是对象,按无覆写处理");
            return result;
        }
    };

    for (part_name, sectors) in parts {
        let sectors = match sectors {
            JsonValue::Object(map) => map,
            _ => {
                warn!(part = %part_name, "部件覆写不是对象,已忽略");
                continue;
            }
        };

        let mut cells: BTreeMap<SectorId, i64> = BTreeMap::new();
        for (sector_key, qty) in sectors {
            let sector_id = match sector_key.trim().parse::<SectorId>() {
                Ok(id) => id,
                Err(_) => {
                    warn!(part = %part_name, sector = %sector_key, "部门ID非法,已忽略");
                    continue;
                }
            };
            if let Some(qty) = json_quantity(&qty) {
                cells.insert(sector_id, qty);
            }
        }

        if !cells.is_empty() {
            result.insert(part_name, cells);
        }
    }

    result
}

fn json_quantity(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<i64>().ok()
            }
        }
        _ => None,
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

// ==========================================
// OverrideRepository - 覆写仓储
// ==========================================
pub struct OverrideRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OverrideRepository {
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

    fn current_revision(conn: &Connection, plan_id: PlanId) -> RepositoryResult<Option<i32>> {
        let rev = conn
            .query_row(
                "SELECT revision FROM plan_override WHERE plan_id = ?1",
                params![plan_id],
                |row| row.get::<_, i32>(0),
            )
            .optional()?;
        Ok(rev)
    }
}

impl OverrideStore for OverrideRepository {
    fn load(&self, plan_id: PlanId) -> RepositoryResult<StoredOverrides> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                "SELECT overrides_json, revision FROM plan_override WHERE plan_id = ?1",
                params![plan_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i32>(1)?)),
            )
            .optional()?;

        Ok(match row {
            Some((raw, revision)) => StoredOverrides {
                overrides: decode_override_blob(&raw),
                revision,
            },
            None => StoredOverrides::default(),
        })
    }

    fn save(
        &self,
        plan_id: PlanId,
        overrides: &OverrideMap,
        expected_revision: Option<i32>,
    ) -> RepositoryResult<i32> {
        let blob = encode_override_blob(overrides)?;
        let conn = self.get_conn()?;
        Self::write_blob(&conn, plan_id, &blob, expected_revision)
    }

    fn save_audited(
        &self,
        plan_id: PlanId,
        overrides: &OverrideMap,
        expected_revision: Option<i32>,
        audit: &ActionLog,
    ) -> RepositoryResult<(i32, String)> {
        let blob = encode_override_blob(overrides)?;
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let revision = Self::write_blob(&tx, plan_id, &blob, expected_revision)?;
        let log = audit
            .clone()
            .with_detail(format!("revision={}", revision));
        let action_id = ActionLogRepository::insert_with(&tx, &log)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok((revision, action_id))
    }
}

impl OverrideRepository {
    /// 写入覆写 JSON (调用方负责事务边界)
    fn write_blob(
        conn: &Connection,
        plan_id: PlanId,
        blob: &str,
        expected_revision: Option<i32>,
    ) -> RepositoryResult<i32> {
        let affected = match expected_revision {
            // 无条件整体覆盖
            None => conn.execute(
                r#"INSERT INTO plan_override (plan_id, overrides_json, revision, updated_at)
                   VALUES (?1, ?2, 1, datetime('now'))
                   ON CONFLICT(plan_id) DO UPDATE SET
                       overrides_json = excluded.overrides_json,
                       revision = plan_override.revision + 1,
                       updated_at = datetime('now')"#,
                params![plan_id, blob],
            )?,
            // 首次保存: 记录必须不存在
            Some(0) => conn.execute(
                r#"INSERT INTO plan_override (plan_id, overrides_json, revision, updated_at)
                   VALUES (?1, ?2, 1, datetime('now'))
                   ON CONFLICT(plan_id) DO NOTHING"#,
                params![plan_id, blob],
            )?,
            Some(expected) => conn.execute(
                r#"UPDATE plan_override
                   SET overrides_json = ?1, revision = revision + 1, updated_at = datetime('now')
                   WHERE plan_id = ?2 AND revision = ?3"#,
                params![blob, plan_id, expected],
            )?,
        };

        let actual = Self::current_revision(conn, plan_id)?;

        if affected == 0 {
            let expected = expected_revision.unwrap_or(0);
            return Err(RepositoryError::OptimisticLockFailure {
                plan_id,
                expected,
                actual: actual.unwrap_or(0),
            });
        }

        actual.ok_or_else(|| RepositoryError::NotFound {
            entity: "plan_override".to_string(),
            id: plan_id.to_string(),
        })
    }
}
