// ==========================================
// 周计划排产分配引擎 - 导入层
// ==========================================
// 职责: 计划来源边界 - 将外部 CSV 计划表转换为 PlanItem + 部件定义
// 红线: 类型校验与转换只在边界处完成,引擎内不再校验
// ==========================================

pub mod error;
pub mod plan_csv;

pub use error::{ImportError, ImportResult};
pub use plan_csv::{ParsedPlanRow, PlanCsvImporter, PlanImportReport, RowReject};
