// ==========================================
// 周计划排产分配引擎 - 外部协作方接口
// ==========================================
// 职责: 定义引擎边界上的数据来源与覆写存储接口（不包含实现）
// 实现者: SQLite 仓储 (PlanItemRepository / SectorRepository / ...)
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::completion::CompletionRecord;
use crate::domain::plan::{OverrideMap, PlanItem};
use crate::domain::sector::Sector;
use crate::domain::types::PlanId;
use crate::repository::error::RepositoryResult;
use serde::{Deserialize, Serialize};

// ==========================================
// PlanningSource - 计划来源
// ==========================================
// 提供有序计划明细 (含部件定义与覆写) 及部门配置表
pub trait PlanningSource: Send + Sync {
    /// 加载全部计划明细 (按计划日期、plan_id 排序)
    fn load_plan_items(&self) -> RepositoryResult<Vec<PlanItem>>;

    /// 加载部门配置
    fn load_sectors(&self) -> RepositoryResult<Vec<Sector>>;
}

// ==========================================
// CompletionSource - 完工来源
// ==========================================
pub trait CompletionSource: Send + Sync {
    /// 加载完工汇总 (按 order_ref, iso_week, year)
    fn load_completions(&self) -> RepositoryResult<Vec<CompletionRecord>>;
}

// ==========================================
// OverrideStore - 覆写存储
// ==========================================

/// 已存储的覆写结构 + 乐观锁修订号 (未保存过时 revision = 0)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredOverrides {
    pub overrides: OverrideMap,
    pub revision: i32,
}

pub trait OverrideStore: Send + Sync {
    /// 读取某计划明细的覆写 (不存在或格式损坏时返回空结构)
    fn load(&self, plan_id: PlanId) -> RepositoryResult<StoredOverrides>;

    /// 整体替换某计划明细的覆写
    ///
    /// # 参数
    /// - `expected_revision`: Some(r) 时做乐观锁校验; None 时无条件覆盖
    ///
    /// # 返回
    /// - Ok(new_revision)
    /// - Err(OptimisticLockFailure): 修订号不匹配
    fn save(
        &self,
        plan_id: PlanId,
        overrides: &OverrideMap,
        expected_revision: Option<i32>,
    ) -> RepositoryResult<i32>;

    /// 整体替换覆写,并在同一事务内写入审计日志
    ///
    /// 日志 detail 由存储补充为 "revision=<新修订号>"; 任一写入失败时两者都不落库
    ///
    /// # 返回
    /// - Ok((new_revision, action_id))
    fn save_audited(
        &self,
        plan_id: PlanId,
        overrides: &OverrideMap,
        expected_revision: Option<i32>,
        audit: &ActionLog,
    ) -> RepositoryResult<(i32, String)>;
}
