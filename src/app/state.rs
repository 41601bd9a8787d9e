// ==========================================
// 周计划排产分配引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::PlanningBoardApi;
use crate::db::{init_schema, open_sqlite_connection};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PCP_BOARD_DB";

/// 应用状态
///
/// 持有共享连接与看板API
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享数据库连接
    pub conn: Arc<Mutex<Connection>>,

    /// 周看板API
    pub board_api: Arc<PlanningBoardApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并应用统一 PRAGMA
    /// 2. 建表 (幂等)
    /// 3. 创建看板API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let board_api = Arc::new(
            PlanningBoardApi::from_connection(conn.clone())
                .map_err(|e| format!("无法创建PlanningBoardApi: {}", e))?,
        );

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            conn,
            board_api,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先读取 `PCP_BOARD_DB`; 否则使用用户数据目录下的 pcp-board/pcp_board.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        if !path.trim().is_empty() {
            return path;
        }
    }

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("pcp-board");
        if let Err(e) = std::fs::create_dir_all(&app_dir) {
            tracing::warn!("无法创建数据目录 {}: {}", app_dir.display(), e);
        }
        return app_dir.join("pcp_board.db").to_string_lossy().to_string();
    }

    "pcp_board.db".to_string()
}
