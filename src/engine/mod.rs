// ==========================================
// 周计划排产分配引擎 - 引擎层
// ==========================================
// 职责: 实现过滤/展开/分配/汇总规则,不拼 SQL
// 红线: Engine 不拼 SQL, 无法计算的值输出"空"而不是 0
// ==========================================

pub mod aggregator;
pub mod allocation;
pub mod expander;
pub mod filter;
pub mod orchestrator;
pub mod repositories;

// 重导出核心引擎
pub use aggregator::{Aggregator, CategoryTotal, CompletionIndex, SectorTotal};
pub use allocation::{AllocationResolver, ApprovalOutcome, ResolvedRow, SectorCell, SectorInput};
pub use expander::PlanExpander;
pub use filter::{FilterDiagnostic, FilterEngine, FilterReport, FilterSpec, Predicate};
pub use orchestrator::{BoardRequest, PlanningBoardEngine, WeeklyBoard};
pub use repositories::BoardRepositories;
