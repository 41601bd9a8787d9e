// ==========================================
// 周计划排产分配引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、记录访问接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod completion;
pub mod plan;
pub mod record;
pub mod sector;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use completion::CompletionRecord;
pub use plan::{ExpandedRow, OverrideMap, PartDefinition, PlanItem};
pub use record::{CellValue, ColumnKind, Filterable};
pub use sector::Sector;
pub use types::{CellSource, Comparator, ExpansionMode, PlanId, SectorId, SectorPlanType};
