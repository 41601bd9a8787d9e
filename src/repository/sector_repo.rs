// ==========================================
// 周计划排产分配引擎 - 部门配置数据仓储
// ==========================================
// 表: sector
// 编码: plan_type 1 = MULTIPLIER_DIVISION, 2 = WHOLE_UNIT
// ==========================================

use crate::domain::sector::Sector;
use crate::domain::types::SectorPlanType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// SectorRepository - 部门仓储
// ==========================================
pub struct SectorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SectorRepository {
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

    /// 插入或替换部门配置
    pub fn upsert(&self, sector: &Sector) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO sector (sector_id, name, plan_type, is_default_target)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(sector_id) DO UPDATE SET
                name = excluded.name,
                plan_type = excluded.plan_type,
                is_default_target = excluded.is_default_target
            "#,
            params![
                sector.sector_id,
                sector.name,
                sector.plan_type.code(),
                sector.is_default_target,
            ],
        )?;
        Ok(())
    }

    /// 查询全部部门 (按 sector_id 排序)
    ///
    /// 未知 plan_type 编码的部门在边界处被拒绝 (记录告警并跳过)
    pub fn list_all(&self) -> RepositoryResult<Vec<Sector>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sector_id, name, plan_type, is_default_target
            FROM sector
            ORDER BY sector_id
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sectors = Vec::with_capacity(rows.len());
        for (sector_id, name, code, is_default_target) in rows {
            match SectorPlanType::from_code(code) {
                Some(plan_type) => sectors.push(Sector {
                    sector_id,
                    name,
                    plan_type,
                    is_default_target,
                }),
                None => {
                    warn!(sector_id, plan_type = code, "未知部门计划类型编码,已跳过");
                }
            }
        }
        Ok(sectors)
    }
}
