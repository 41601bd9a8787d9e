// ==========================================
// 周计划排产分配引擎 - 操作日志领域模型
// ==========================================
// 依据: PCP 看板 - 审批留痕
// 红线: 所有覆写写入必须记录
// ==========================================

use crate::domain::types::PlanId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,              // 日志ID (uuid v4)
    pub plan_id: Option<PlanId>,        // 关联计划明细 (配置类操作可为None)
    pub action_type: String,            // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,       // 操作时间戳
    pub actor: String,                  // 操作人
    pub payload_json: Option<JsonValue>,// 操作负载 (新覆写结构等)
    pub detail: Option<String>,         // 详细描述
}

impl ActionLog {
    /// 创建一条新日志 (自动生成 action_id 与时间戳)
    pub fn new(action_type: ActionType, plan_id: Option<PlanId>, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            plan_id,
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    ApproveAllocation, // 审批部门分配 (整体替换覆写)
    ImportPlan,        // 导入周计划
    UpdateConfig,      // 修改看板配置
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::ApproveAllocation => write!(f, "APPROVE_ALLOCATION"),
            ActionType::ImportPlan => write!(f, "IMPORT_PLAN"),
            ActionType::UpdateConfig => write!(f, "UPDATE_CONFIG"),
        }
    }
}
