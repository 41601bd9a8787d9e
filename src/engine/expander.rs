// ==========================================
// 周计划排产分配引擎 - 计划展开器
// ==========================================
// 规则: 每个计划明细 → 1 个父行 + 按部件定义顺序的 k 个部件行
// 红线: 纯映射,不查询部门配置,不查询覆写存储
// ==========================================

use crate::domain::plan::{ExpandedRow, PlanItem};
use crate::domain::types::ExpansionMode;
use tracing::debug;

/// PlanExpander - 计划展开器
pub struct PlanExpander {
    mode: ExpansionMode,
}

impl PlanExpander {
    pub fn new(mode: ExpansionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ExpansionMode {
        self.mode
    }

    /// 展开计划明细
    ///
    /// # 规则
    /// - WithParts: 父行紧跟其全部部件行; 无部件定义时只输出父行
    /// - WholeItems: 每个计划明细恰好一行,丢弃部件数据
    pub fn expand(&self, items: &[PlanItem]) -> Vec<ExpandedRow> {
        let mut rows = Vec::with_capacity(self.estimate_len(items));

        for item in items {
            rows.push(ExpandedRow::parent_of(item));

            if self.mode == ExpansionMode::WholeItems {
                continue;
            }

            for part in &item.part_definitions {
                rows.push(ExpandedRow::part_of(item, part));
            }
        }

        debug!(
            items = items.len(),
            rows = rows.len(),
            mode = %self.mode,
            "计划展开完成"
        );
        rows
    }

    fn estimate_len(&self, items: &[PlanItem]) -> usize {
        match self.mode {
            ExpansionMode::WholeItems => items.len(),
            ExpansionMode::WithParts => items
                .iter()
                .map(|i| 1 + i.part_definitions.len())
                .sum(),
        }
    }
}

impl Default for PlanExpander {
    fn default() -> Self {
        Self::new(ExpansionMode::WithParts)
    }
}
