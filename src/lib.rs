// ==========================================
// 周计划排产分配引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 周计划看板 (过滤 → 拆件 → 部门分配 → 汇总),人工审批覆写
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CellSource, Comparator, ExpansionMode, SectorPlanType};

// 领域实体
pub use domain::{
    ActionLog, ActionType, CompletionRecord, ExpandedRow, PartDefinition, PlanItem, Sector,
};

// 引擎
pub use engine::{
    AllocationResolver, Aggregator, BoardRequest, FilterEngine, FilterSpec, PlanExpander,
    PlanningBoardEngine, Predicate, WeeklyBoard,
};

// API
pub use api::{ApiError, ApiResult, PlanningBoardApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "周计划排产分配引擎";
