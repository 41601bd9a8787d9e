// ==========================================
// 周计划排产分配引擎 - 部门分配解析器
// ==========================================
// 规则: 覆写优先 → 非默认部门为空 → 按计划类型计算默认值
// 红线: 无法计算时结果为"空",绝不返回 0 (0 是有意义的分配值)
// 红线: 审批为整体替换,不做增量合并
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::plan::{ExpandedRow, OverrideMap};
use crate::domain::sector::Sector;
use crate::domain::types::{CellSource, PlanId, SectorId, SectorPlanType};
use crate::repository::error::RepositoryResult;
use crate::repository::traits::OverrideStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

// ==========================================
// SectorCell - 部件行 × 部门 的分配单元格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorCell {
    pub sector_id: SectorId,
    pub value: Option<i64>, // None 渲染为空白输入框
    pub source: CellSource, // 取值来源 (可解释性)
}

impl SectorCell {
    fn empty(sector_id: SectorId) -> Self {
        Self {
            sector_id,
            value: None,
            source: CellSource::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

// ==========================================
// ResolvedRow - 带部门分配的展开行
// ==========================================
// 父行 cells 恒为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRow {
    #[serde(flatten)]
    pub row: ExpandedRow,
    pub cells: Vec<SectorCell>,
}

impl ResolvedRow {
    pub fn cell(&self, sector_id: SectorId) -> Option<&SectorCell> {
        self.cells.iter().find(|c| c.sector_id == sector_id)
    }

    /// 某部门的解析值 (无单元格或为空均返回 None)
    pub fn value_for(&self, sector_id: SectorId) -> Option<i64> {
        self.cell(sector_id).and_then(|c| c.value)
    }
}

// ==========================================
// SectorInput - 审批时界面上的当前输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorInput {
    pub part_name: String,
    pub sector_id: SectorId,
    pub value: Option<i64>, // None = 空白
}

impl SectorInput {
    pub fn new(part_name: impl Into<String>, sector_id: SectorId, value: Option<i64>) -> Self {
        Self {
            part_name: part_name.into(),
            sector_id,
            value,
        }
    }
}

/// 审批结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub plan_id: PlanId,
    pub overrides: OverrideMap,
    pub revision: i32,
}

// ==========================================
// AllocationResolver - 分配解析器
// ==========================================
pub struct AllocationResolver;

impl AllocationResolver {
    pub fn new() -> Self {
        Self
    }

    /// 为全部展开行计算部门单元格
    ///
    /// 父行不计算单元格; 部件行对每个配置部门各生成一个单元格 (按部门配置顺序)
    pub fn resolve(&self, rows: Vec<ExpandedRow>, sectors: &[Sector]) -> Vec<ResolvedRow> {
        let resolved: Vec<ResolvedRow> = rows
            .into_iter()
            .map(|row| {
                let cells = if row.is_part {
                    sectors.iter().map(|s| self.resolve_cell(&row, s)).collect()
                } else {
                    Vec::new()
                };
                ResolvedRow { row, cells }
            })
            .collect();

        debug!(
            rows = resolved.len(),
            sectors = sectors.len(),
            cells = resolved.iter().map(|r| r.cells.len()).sum::<usize>(),
            "部门分配解析完成"
        );
        resolved
    }

    /// 解析单个单元格
    ///
    /// # 规则
    /// 1. 父行: 空
    /// 2. 存在覆写: 原样使用 (无视计划类型与 is_default_target)
    /// 3. 非默认部门: 空
    /// 4. 默认值: WHOLE_UNIT = planned_qty; MULTIPLIER_DIVISION = planned_qty / 倍数 (向下取整)
    pub fn resolve_cell(&self, row: &ExpandedRow, sector: &Sector) -> SectorCell {
        if !row.is_part {
            return SectorCell::empty(sector.sector_id);
        }

        if let Some(value) = row.saved_overrides.get(&sector.sector_id) {
            return SectorCell {
                sector_id: sector.sector_id,
                value: Some(*value),
                source: CellSource::Override,
            };
        }

        if !sector.is_default_target {
            return SectorCell::empty(sector.sector_id);
        }

        match Self::default_quantity(sector.plan_type, row.planned_qty, row.part_multiplier) {
            Some(value) => SectorCell {
                sector_id: sector.sector_id,
                value: Some(value),
                source: CellSource::Default,
            },
            None => SectorCell::empty(sector.sector_id),
        }
    }

    /// 默认分配数量
    ///
    /// # 返回
    /// - None: 倍数缺失或 <= 0 (不做除法)
    pub fn default_quantity(
        plan_type: SectorPlanType,
        planned_qty: i64,
        multiplier: Option<i64>,
    ) -> Option<i64> {
        match plan_type {
            SectorPlanType::WholeUnit => Some(planned_qty),
            SectorPlanType::MultiplierDivision => match multiplier {
                Some(m) if m > 0 => Some(planned_qty.div_euclid(m)),
                _ => None,
            },
        }
    }

    /// 由当前全部输入构建新的覆写结构
    ///
    /// 从空结构开始,只放入非空输入; 空白输入不出现在结果中
    pub fn build_override_map(&self, inputs: &[SectorInput]) -> OverrideMap {
        let mut map = OverrideMap::new();
        for input in inputs {
            if let Some(value) = input.value {
                map.entry(input.part_name.clone())
                    .or_insert_with(BTreeMap::new)
                    .insert(input.sector_id, value);
            }
        }
        map
    }

    /// 审批: 构建新覆写结构并整体替换存储中的旧结构
    ///
    /// # 注意
    /// - 之前保存、但本次输入为空白的单元格将被永久删除
    /// - 同一 plan_id 的并发审批由 `expected_revision` (乐观锁) 在存储边界串行化
    pub fn save(
        &self,
        store: &dyn OverrideStore,
        plan_id: PlanId,
        inputs: &[SectorInput],
        expected_revision: Option<i32>,
    ) -> RepositoryResult<ApprovalOutcome> {
        let overrides = self.build_override_map(inputs);
        let revision = store.save(plan_id, &overrides, expected_revision)?;

        info!(
            plan_id,
            revision,
            parts = overrides.len(),
            cells = overrides.values().map(|m| m.len()).sum::<usize>(),
            "覆写已整体替换"
        );

        Ok(ApprovalOutcome {
            plan_id,
            overrides,
            revision,
        })
    }

    /// 审批并记录审计日志: 覆写替换与 ActionLog 在存储侧同一事务提交
    ///
    /// # 返回
    /// - (审批结果, action_id)
    pub fn save_audited(
        &self,
        store: &dyn OverrideStore,
        plan_id: PlanId,
        inputs: &[SectorInput],
        expected_revision: Option<i32>,
        actor: &str,
    ) -> RepositoryResult<(ApprovalOutcome, String)> {
        let overrides = self.build_override_map(inputs);
        let audit = ActionLog::new(ActionType::ApproveAllocation, Some(plan_id), actor)
            .with_payload(serde_json::to_value(&overrides)?);
        let (revision, action_id) =
            store.save_audited(plan_id, &overrides, expected_revision, &audit)?;

        info!(plan_id, revision, action_id = %action_id, "覆写已整体替换并记录审计");

        Ok((
            ApprovalOutcome {
                plan_id,
                overrides,
                revision,
            },
            action_id,
        ))
    }
}

impl Default for AllocationResolver {
    fn default() -> Self {
        Self::new()
    }
}
