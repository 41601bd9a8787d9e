// ==========================================
// 周计划排产分配引擎 - 数据仓储层
// ==========================================
// 职责: SQLite 边界 - 加载计划/部门/完工,读写覆写,记录日志
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod action_log_repo;
pub mod completion_repo;
pub mod error;
pub mod override_repo;
pub mod plan_item_repo;
pub mod sector_repo;
pub mod traits;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use completion_repo::CompletionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use override_repo::{decode_override_blob, encode_override_blob, OverrideRepository};
pub use plan_item_repo::PlanItemRepository;
pub use sector_repo::SectorRepository;
pub use traits::{CompletionSource, OverrideStore, PlanningSource, StoredOverrides};
