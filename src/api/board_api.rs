// ==========================================
// 周计划排产分配引擎 - 周看板 API
// ==========================================
// 职责: 看板查询、部门分配审批、计划导入、看板配置更新
// 红线: 每次覆写写入必须记录 ActionLog
// ==========================================

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigManager};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::plan::OverrideMap;
use crate::domain::types::{Comparator, ExpansionMode, PlanId, SectorId};
use crate::engine::allocation::SectorInput;
use crate::engine::orchestrator::{BoardRequest, PlanningBoardEngine, WeeklyBoard};
use crate::engine::repositories::BoardRepositories;
use crate::importer::{PlanCsvImporter, PlanImportReport};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::traits::{CompletionSource, OverrideStore, PlanningSource};

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 审批时界面上的一个原始输入框
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSectorInput {
    pub part_name: String,
    pub sector_id: SectorId,
    pub value: String, // 原始文本,空白表示"无分配"
}

impl RawSectorInput {
    pub fn new(part_name: impl Into<String>, sector_id: SectorId, value: impl Into<String>) -> Self {
        Self {
            part_name: part_name.into(),
            sector_id,
            value: value.into(),
        }
    }
}

/// 审批结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResult {
    pub plan_id: PlanId,
    pub overrides: OverrideMap,
    pub revision: i32,
    pub action_id: String,
}

// ==========================================
// PlanningBoardApi - 周看板 API
// ==========================================
pub struct PlanningBoardApi {
    planning: Arc<dyn PlanningSource>,
    completions: Arc<dyn CompletionSource>,
    overrides: Arc<dyn OverrideStore>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    importer: Option<PlanCsvImporter>,
    engine: PlanningBoardEngine,
}

impl PlanningBoardApi {
    /// 以显式注入的协作方创建 API (不含导入能力)
    pub fn new(
        planning: Arc<dyn PlanningSource>,
        completions: Arc<dyn CompletionSource>,
        overrides: Arc<dyn OverrideStore>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            planning,
            completions,
            overrides,
            action_log_repo,
            config_manager,
            importer: None,
            engine: PlanningBoardEngine::new(),
        }
    }

    /// 基于共享连接装配全部 SQLite 仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let repos = BoardRepositories::from_connection(conn);

        let mut api = Self::new(
            Arc::new(repos.clone()),
            repos.completion_repo.clone(),
            repos.override_repo.clone(),
            repos.action_log_repo.clone(),
            Arc::new(config_manager),
        );
        api.importer = Some(PlanCsvImporter::new(repos.item_repo.clone()));
        Ok(api)
    }

    // ==========================================
    // 看板查询
    // ==========================================

    /// 生成周看板 (原始请求参数)
    ///
    /// # 参数
    /// - week: ISO 周号文本 (空白/非数字 = 不过滤)
    /// - op: 比较符 ("==", ">=", "<=", ">", "<"),缺省取配置
    /// - show_parts: "yes"/"no",缺省取配置
    pub fn get_weekly_board(
        &self,
        week: Option<&str>,
        op: Option<&str>,
        show_parts: Option<&str>,
    ) -> ApiResult<WeeklyBoard> {
        let default_comparator = self
            .config_manager
            .get_default_comparator()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let default_expansion = self
            .config_manager
            .get_show_parts_default()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let request =
            BoardRequest::from_params(week, op, show_parts, default_comparator, default_expansion);
        self.get_weekly_board_with(&request)
    }

    /// 生成周看板 (结构化请求)
    pub fn get_weekly_board_with(&self, request: &BoardRequest) -> ApiResult<WeeklyBoard> {
        let items = self.planning.load_plan_items()?;
        let sectors = self.planning.load_sectors()?;
        let completions = self.completions.load_completions()?;

        Ok(self.engine.build(request, &items, &sectors, &completions))
    }

    // ==========================================
    // 分配审批
    // ==========================================

    /// 审批某计划明细的部门分配
    ///
    /// # 参数
    /// - inputs: 该计划明细所有部件行 × 部门的当前输入 (含空白)
    /// - actor: 操作人,缺省取配置
    /// - expected_revision: 乐观锁修订号 (None = 无条件覆盖)
    ///
    /// # 说明
    /// 新结构整体替换旧结构: 本次为空白的单元格即使之前保存过也会被删除
    /// 覆写与审批日志同一事务提交,日志写入失败时覆写不变
    pub fn approve_allocation(
        &self,
        plan_id: PlanId,
        inputs: &[RawSectorInput],
        actor: Option<&str>,
        expected_revision: Option<i32>,
    ) -> ApiResult<ApprovalResult> {
        let parsed = inputs
            .iter()
            .map(parse_input)
            .collect::<ApiResult<Vec<SectorInput>>>()?;

        let actor = match actor.map(str::trim).filter(|s| !s.is_empty()) {
            Some(a) => a.to_string(),
            None => self
                .config_manager
                .get_default_actor()
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };

        let (outcome, action_id) = self.engine.resolver().save_audited(
            self.overrides.as_ref(),
            plan_id,
            &parsed,
            expected_revision,
            &actor,
        )?;

        info!(plan_id, revision = outcome.revision, actor = %actor, "分配审批完成");

        Ok(ApprovalResult {
            plan_id,
            overrides: outcome.overrides,
            revision: outcome.revision,
            action_id,
        })
    }

    /// 查询已保存的覆写 (含修订号)
    pub fn get_saved_overrides(&self, plan_id: PlanId) -> ApiResult<(OverrideMap, i32)> {
        let stored = self.overrides.load(plan_id)?;
        Ok((stored.overrides, stored.revision))
    }

    /// 查询某计划明细的审批记录
    pub fn list_actions(&self, plan_id: PlanId) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_plan_id(plan_id)?)
    }

    // ==========================================
    // 计划导入
    // ==========================================

    /// 从 CSV 文件导入周计划
    pub fn import_plan_csv(&self, path: &Path, actor: Option<&str>) -> ApiResult<PlanImportReport> {
        let importer = self.importer.as_ref().ok_or_else(|| {
            ApiError::BusinessRuleViolation("当前实例未配置计划导入".to_string())
        })?;

        let report = importer.import_file(path)?;
        if !report.rejected.is_empty() {
            warn!(rejected = report.rejected.len(), "部分计划行被拒绝");
        }

        let log = ActionLog::new(ActionType::ImportPlan, None, actor.unwrap_or("system"))
            .with_payload(json!({
                "file": path.display().to_string(),
                "imported": report.imported,
                "part_configs_replaced": report.part_configs_replaced,
                "rejected": report.rejected.len(),
            }));
        self.action_log_repo.insert(&log)?;

        Ok(report)
    }

    // ==========================================
    // 看板配置
    // ==========================================

    /// 更新默认比较符
    pub fn set_default_comparator(&self, symbol: &str, actor: &str) -> ApiResult<Comparator> {
        let comparator = Comparator::parse(symbol.trim())
            .ok_or_else(|| ApiError::InvalidInput(format!("比较符非法: {}", symbol)))?;
        self.write_config(config_keys::DEFAULT_COMPARATOR, comparator.symbol(), actor)?;
        Ok(comparator)
    }

    /// 更新默认拆件模式
    pub fn set_show_parts_default(&self, flag: &str, actor: &str) -> ApiResult<ExpansionMode> {
        let mode = ExpansionMode::parse_flag(flag)
            .ok_or_else(|| ApiError::InvalidInput(format!("拆件标志非法: {}", flag)))?;
        self.write_config(config_keys::SHOW_PARTS_DEFAULT, mode.as_flag(), actor)?;
        Ok(mode)
    }

    fn write_config(&self, key: &str, value: &str, actor: &str) -> ApiResult<()> {
        self.config_manager
            .set_global_config_value(key, value)
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let log = ActionLog::new(ActionType::UpdateConfig, None, actor)
            .with_payload(json!({ "key": key, "value": value }));
        self.action_log_repo.insert(&log)?;
        Ok(())
    }
}

/// 解析单个输入框
///
/// # 规则
/// - 去除首尾空白后为空: 无分配
/// - 非整数或负数: InvalidInput (拒绝整次审批)
fn parse_input(raw: &RawSectorInput) -> ApiResult<SectorInput> {
    let text = raw.value.trim();
    if text.is_empty() {
        return Ok(SectorInput::new(raw.part_name.clone(), raw.sector_id, None));
    }

    let value = text.parse::<i64>().map_err(|_| {
        ApiError::InvalidInput(format!(
            "部件{}在部门{}的数量不是整数: {}",
            raw.part_name, raw.sector_id, text
        ))
    })?;
    if value < 0 {
        return Err(ApiError::InvalidInput(format!(
            "部件{}在部门{}的数量不能为负: {}",
            raw.part_name, raw.sector_id, value
        )));
    }

    Ok(SectorInput::new(raw.part_name.clone(), raw.sector_id, Some(value)))
}
