// ==========================================
// 周计划排产分配引擎 - 计划明细数据仓储
// ==========================================
// 表: plan_item / part_config / plan_override (只读关联)
// 红线: Repository 不含业务逻辑, 只做数据映射与边界类型转换
// ==========================================

use crate::domain::plan::{OverrideMap, PartDefinition, PlanItem};
use crate::domain::types::PlanId;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::override_repo::decode_override_blob;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const DATE_FMT: &str = "%Y-%m-%d";

const SELECT_ITEM_SQL: &str = r#"
    SELECT
        p.plan_id, p.order_ref, p.order_total_qty, p.category, p.client_name,
        p.product_name, p.planned_qty, p.scheduled_date, p.observation,
        o.overrides_json
    FROM plan_item p
    LEFT JOIN plan_override o ON o.plan_id = p.plan_id
"#;

// ==========================================
// PlanItemRepository - 计划明细仓储
// ==========================================
pub struct PlanItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanItemRepository {
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

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入或更新计划明细 (不触碰 plan_override,避免级联删除覆写)
    pub fn upsert(&self, item: &PlanItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO plan_item (
                plan_id, order_ref, order_total_qty, category, client_name,
                product_name, planned_qty, scheduled_date, observation
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(plan_id) DO UPDATE SET
                order_ref = excluded.order_ref,
                order_total_qty = excluded.order_total_qty,
                category = excluded.category,
                client_name = excluded.client_name,
                product_name = excluded.product_name,
                planned_qty = excluded.planned_qty,
                scheduled_date = excluded.scheduled_date,
                observation = excluded.observation
            "#,
            params![
                item.plan_id,
                item.order_ref,
                item.order_total_qty,
                item.category,
                item.client_name,
                item.product_name,
                item.planned_qty,
                item.scheduled_date.format(DATE_FMT).to_string(),
                item.observation,
            ],
        )?;
        Ok(())
    }

    /// 整体替换某产品的部件定义 (事务内先删后插,保留顺序)
    pub fn replace_part_config(
        &self,
        product_name: &str,
        parts: &[PartDefinition],
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "DELETE FROM part_config WHERE product_name = ?1",
            params![product_name],
        )?;
        for (seq_no, part) in parts.iter().enumerate() {
            tx.execute(
                r#"INSERT INTO part_config (product_name, part_name, multiplier, seq_no)
                   VALUES (?1, ?2, ?3, ?4)"#,
                params![product_name, part.part_name, part.multiplier, seq_no as i64],
            )?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询全部计划明细 (按计划日期、plan_id 排序,附带部件定义与覆写)
    pub fn list_all(&self) -> RepositoryResult<Vec<PlanItem>> {
        let conn = self.get_conn()?;
        let parts = Self::query_part_config(&conn)?;

        let sql = format!("{} ORDER BY p.scheduled_date, p.plan_id", SELECT_ITEM_SQL);
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items
            .into_iter()
            .map(|item| Self::attach_parts(item, &parts))
            .collect())
    }

    /// 按ID查询计划明细
    pub fn find_by_id(&self, plan_id: PlanId) -> RepositoryResult<Option<PlanItem>> {
        let conn = self.get_conn()?;
        let parts = Self::query_part_config(&conn)?;

        let sql = format!("{} WHERE p.plan_id = ?1", SELECT_ITEM_SQL);
        let item = conn
            .query_row(&sql, params![plan_id], |row| Self::map_row(row))
            .optional()?;

        Ok(item.map(|item| Self::attach_parts(item, &parts)))
    }

    // ==========================================
    // 映射辅助
    // ==========================================

    fn query_part_config(
        conn: &Connection,
    ) -> RepositoryResult<HashMap<String, Vec<PartDefinition>>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT product_name, part_name, multiplier
            FROM part_config
            ORDER BY product_name, seq_no, part_name
            "#,
        )?;

        let mut map: HashMap<String, Vec<PartDefinition>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        for row in rows {
            let (product_name, part_name, multiplier) = row?;
            map.entry(product_name)
                .or_default()
                .push(PartDefinition::new(part_name, multiplier));
        }
        Ok(map)
    }

    fn map_row(row: &Row) -> rusqlite::Result<PlanItem> {
        let date_raw: String = row.get(7)?;
        let scheduled_date = NaiveDate::parse_from_str(date_raw.trim(), DATE_FMT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        let overrides_json: Option<String> = row.get(9)?;

        Ok(PlanItem {
            plan_id: row.get(0)?,
            order_ref: row.get(1)?,
            order_total_qty: row.get(2)?,
            category: row.get(3)?,
            client_name: row.get(4)?,
            product_name: row.get(5)?,
            planned_qty: row.get(6)?,
            scheduled_date,
            observation: row.get(8)?,
            part_definitions: Vec::new(),
            sector_overrides: overrides_json
                .as_deref()
                .map(decode_override_blob)
                .unwrap_or_else(OverrideMap::new),
        })
    }

    fn attach_parts(
        mut item: PlanItem,
        parts: &HashMap<String, Vec<PartDefinition>>,
    ) -> PlanItem {
        if let Some(defs) = parts.get(&item.product_name) {
            item.part_definitions = defs.clone();
        }
        item
    }
}
