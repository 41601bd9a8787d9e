// ==========================================
// 周计划排产分配引擎 - API 层
// ==========================================
// 职责: 提供看板业务接口,供命令行/上层界面调用
// ==========================================

pub mod board_api;
pub mod error;

// 重导出核心类型
pub use board_api::{ApprovalResult, PlanningBoardApi, RawSectorInput};
pub use error::{ApiError, ApiResult};
