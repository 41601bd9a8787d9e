// ==========================================
// 周计划排产分配引擎 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合看板所需的所有 Repository
// 目标: 显式构造、显式注入,不使用全局数据库句柄
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::domain::plan::PlanItem;
use crate::domain::sector::Sector;
use crate::repository::error::RepositoryResult;
use crate::repository::traits::PlanningSource;
use crate::repository::{
    ActionLogRepository, CompletionRepository, OverrideRepository, PlanItemRepository,
    SectorRepository,
};

/// 看板仓储集合
///
/// # 包含的仓储
/// - `item_repo`: 计划明细 (含部件定义、覆写)
/// - `sector_repo`: 部门配置
/// - `override_repo`: 覆写存储
/// - `completion_repo`: 完工汇总
/// - `action_log_repo`: 操作日志
#[derive(Clone)]
pub struct BoardRepositories {
    pub item_repo: Arc<PlanItemRepository>,
    pub sector_repo: Arc<SectorRepository>,
    pub override_repo: Arc<OverrideRepository>,
    pub completion_repo: Arc<CompletionRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl BoardRepositories {
    /// 基于同一个共享连接创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            item_repo: Arc::new(PlanItemRepository::from_connection(conn.clone())),
            sector_repo: Arc::new(SectorRepository::from_connection(conn.clone())),
            override_repo: Arc::new(OverrideRepository::from_connection(conn.clone())),
            completion_repo: Arc::new(CompletionRepository::from_connection(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}

impl PlanningSource for BoardRepositories {
    fn load_plan_items(&self) -> RepositoryResult<Vec<PlanItem>> {
        self.item_repo.list_all()
    }

    fn load_sectors(&self) -> RepositoryResult<Vec<Sector>> {
        self.sector_repo.list_all()
    }
}
