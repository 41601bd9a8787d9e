// ==========================================
// 周计划排产分配引擎 - 应用层
// ==========================================
// 职责: 装配数据库连接、仓储与 API 实例
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
