// ==========================================
// 周计划排产分配引擎 - 完工记录领域模型
// ==========================================
// 依据: PCP 看板 - 完工追踪 (外部协作方)
// 关联键: (order_ref, iso_week, year)
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CompletionRecord - 周完工汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub order_ref: String,   // 生产订单引用
    pub iso_week: u32,       // ISO 周
    pub year: i32,           // ISO 年
    pub completed_qty: i64,  // 已完工数量
}

impl CompletionRecord {
    /// 关联键
    pub fn key(&self) -> (String, u32, i32) {
        (self.order_ref.clone(), self.iso_week, self.year)
    }
}
