// ==========================================
// 周计划排产分配引擎 - 配置管理器
// ==========================================
// 职责: 看板配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::types::{Comparator, ExpansionMode};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 全局作用域
const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    // ===== 看板配置 =====

    /// 获取默认周比较符
    ///
    /// # 默认值
    /// - "=="  (配置非法时同样回退)
    pub fn get_default_comparator(&self) -> Result<Comparator, Box<dyn Error>> {
        let raw = self.get_config_or_default(config_keys::DEFAULT_COMPARATOR, "==")?;
        Ok(Comparator::parse(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "默认比较符配置非法,回退为 ==");
            Comparator::Eq
        }))
    }

    /// 获取默认拆件模式
    ///
    /// # 默认值
    /// - "yes"
    pub fn get_show_parts_default(&self) -> Result<ExpansionMode, Box<dyn Error>> {
        let raw = self.get_config_or_default(config_keys::SHOW_PARTS_DEFAULT, "yes")?;
        Ok(ExpansionMode::parse_flag(&raw).unwrap_or_else(|| {
            warn!(value = %raw, "拆件默认值配置非法,回退为 yes");
            ExpansionMode::WithParts
        }))
    }

    /// 获取默认操作人 (审批未指定操作人时使用)
    ///
    /// # 默认值
    /// - "system"
    pub fn get_default_actor(&self) -> Result<String, Box<dyn Error>> {
        let raw = self.get_config_or_default(config_keys::DEFAULT_ACTOR, "system")?;
        let trimmed = raw.trim();
        Ok(if trimmed.is_empty() {
            "system".to_string()
        } else {
            trimmed.to_string()
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const DEFAULT_COMPARATOR: &str = "board.default_comparator";
    pub const SHOW_PARTS_DEFAULT: &str = "board.show_parts_default";
    pub const DEFAULT_ACTOR: &str = "board.default_actor";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_table_empty() {
        let cfg = manager();
        assert_eq!(cfg.get_default_comparator().unwrap(), Comparator::Eq);
        assert_eq!(cfg.get_show_parts_default().unwrap(), ExpansionMode::WithParts);
        assert_eq!(cfg.get_default_actor().unwrap(), "system");
    }

    #[test]
    fn test_set_and_read_back() {
        let cfg = manager();
        cfg.set_global_config_value(config_keys::DEFAULT_COMPARATOR, ">=").unwrap();
        cfg.set_global_config_value(config_keys::SHOW_PARTS_DEFAULT, "no").unwrap();
        assert_eq!(cfg.get_default_comparator().unwrap(), Comparator::Ge);
        assert_eq!(cfg.get_show_parts_default().unwrap(), ExpansionMode::WholeItems);
        assert_eq!(cfg.get_config_snapshot().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_comparator_falls_back() {
        let cfg = manager();
        cfg.set_global_config_value(config_keys::DEFAULT_COMPARATOR, "!=").unwrap();
        assert_eq!(cfg.get_default_comparator().unwrap(), Comparator::Eq);
    }
}
