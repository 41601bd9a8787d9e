// ==========================================
// 周计划排产分配引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键、busy_timeout)
// - 提供幂等的建表脚本 (宿主应用拥有连接生命周期)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表 (幂等)
///
/// 表:
/// - sector: 部门配置 (plan_type: 1=MULTIPLIER_DIVISION, 2=WHOLE_UNIT)
/// - plan_item: 周计划明细
/// - part_config: 产品部件定义 (按 seq_no 有序)
/// - plan_override: 覆写 JSON + 乐观锁修订号
/// - completion_record: 完工汇总
/// - config_kv: 看板配置
/// - action_log: 操作日志
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sector (
            sector_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            plan_type INTEGER NOT NULL,
            is_default_target INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS plan_item (
            plan_id INTEGER PRIMARY KEY,
            order_ref TEXT NOT NULL,
            order_total_qty INTEGER NOT NULL DEFAULT 0,
            category TEXT NOT NULL,
            client_name TEXT NOT NULL,
            product_name TEXT NOT NULL,
            planned_qty INTEGER NOT NULL,
            scheduled_date TEXT NOT NULL,
            observation TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_plan_item_date ON plan_item(scheduled_date);

        CREATE TABLE IF NOT EXISTS part_config (
            product_name TEXT NOT NULL,
            part_name TEXT NOT NULL,
            multiplier INTEGER NOT NULL,
            seq_no INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (product_name, part_name)
        );

        CREATE TABLE IF NOT EXISTS plan_override (
            plan_id INTEGER PRIMARY KEY REFERENCES plan_item(plan_id) ON DELETE CASCADE,
            overrides_json TEXT NOT NULL,
            revision INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS completion_record (
            order_ref TEXT NOT NULL,
            iso_week INTEGER NOT NULL,
            year INTEGER NOT NULL,
            completed_qty INTEGER NOT NULL,
            PRIMARY KEY (order_ref, iso_week, year)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            plan_id INTEGER,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_plan ON action_log(plan_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
