// ==========================================
// 周计划排产分配引擎 - 配置层
// ==========================================
// 职责: 看板配置管理 (默认比较符 / 拆件模式 / 操作人)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
