// ==========================================
// 周计划排产分配引擎 - 部门领域模型
// ==========================================
// 依据: PCP 看板 - sector 配置表
// ==========================================

use crate::domain::types::{SectorId, SectorPlanType};
use serde::{Deserialize, Serialize};

// ==========================================
// Sector - 下游工作部门
// ==========================================
// 红线: is_default_target = false 的部门只接受人工覆写
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub sector_id: SectorId,        // 部门ID
    pub name: String,               // 部门名称
    pub plan_type: SectorPlanType,  // 计划类型
    pub is_default_target: bool,    // 是否计算默认值
}

impl Sector {
    pub fn new(
        sector_id: SectorId,
        name: impl Into<String>,
        plan_type: SectorPlanType,
        is_default_target: bool,
    ) -> Self {
        Self {
            sector_id,
            name: name.into(),
            plan_type,
            is_default_target,
        }
    }
}
