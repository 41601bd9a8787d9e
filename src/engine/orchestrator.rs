// ==========================================
// 周计划排产分配引擎 - 看板编排器
// ==========================================
// 流程: 请求 → 过滤(周) → 展开 → 部门分配解析 → 汇总
// 红线: 无状态,不访问数据库; 数据由调用方加载后传入
// ==========================================

use crate::domain::completion::CompletionRecord;
use crate::domain::plan::PlanItem;
use crate::domain::sector::Sector;
use crate::domain::types::{Comparator, ExpansionMode};
use crate::engine::aggregator::{Aggregator, CategoryTotal, CompletionIndex, SectorTotal};
use crate::engine::allocation::{AllocationResolver, ResolvedRow};
use crate::engine::expander::PlanExpander;
use crate::engine::filter::{FilterDiagnostic, FilterEngine, FilterSpec, Predicate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 周过滤使用的列
pub const WEEK_COLUMN: &str = "iso_week";
/// 年过滤使用的列
pub const YEAR_COLUMN: &str = "iso_year";

// ==========================================
// BoardRequest - 看板请求参数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardRequest {
    pub week: Option<u32>,            // ISO 周 (None 表示不按周过滤)
    pub year: Option<i32>,            // ISO 年 (可选)
    pub comparator: Comparator,       // 周比较符 (默认 ==)
    pub expansion: ExpansionMode,     // 是否显示部件拆分 (默认 yes)
    #[serde(default)]
    pub extra_filters: FilterSpec,    // 额外过滤 (类别/客户/产品/日期)
}

impl BoardRequest {
    pub fn for_week(week: u32) -> Self {
        Self {
            week: Some(week),
            ..Self::default()
        }
    }

    /// 从原始请求字符串解析
    ///
    /// # 规则
    /// - week 空白或非数字: 不按周过滤
    /// - op 非法: 回退到 `default_comparator`
    /// - show_parts 非法: 回退到 `default_expansion`
    pub fn from_params(
        week: Option<&str>,
        op: Option<&str>,
        show_parts: Option<&str>,
        default_comparator: Comparator,
        default_expansion: ExpansionMode,
    ) -> Self {
        let week = week
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| match s.parse::<u32>() {
                Ok(w) => Some(w),
                Err(_) => {
                    warn!(week = s, "周参数不是整数,忽略周过滤");
                    None
                }
            });

        let comparator = match op.map(str::trim).filter(|s| !s.is_empty()) {
            Some(symbol) => Comparator::parse(symbol).unwrap_or_else(|| {
                warn!(op = symbol, fallback = %default_comparator, "比较符非法,使用默认值");
                default_comparator
            }),
            None => default_comparator,
        };

        let expansion = match show_parts.map(str::trim).filter(|s| !s.is_empty()) {
            Some(flag) => ExpansionMode::parse_flag(flag).unwrap_or_else(|| {
                warn!(show_parts = flag, fallback = %default_expansion, "拆件标志非法,使用默认值");
                default_expansion
            }),
            None => default_expansion,
        };

        Self {
            week,
            year: None,
            comparator,
            expansion,
            extra_filters: FilterSpec::new(),
        }
    }

    /// 合成最终过滤规格 (周/年谓词覆盖 extra_filters 中的同名列)
    pub fn filter_spec(&self) -> FilterSpec {
        let mut spec = self.extra_filters.clone();
        if let Some(week) = self.week {
            spec.insert(WEEK_COLUMN, Predicate::numeric(self.comparator, week));
        }
        if let Some(year) = self.year {
            spec.insert(YEAR_COLUMN, Predicate::exact(year));
        }
        spec
    }
}

// ==========================================
// WeeklyBoard - 看板输出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBoard {
    pub request: BoardRequest,
    pub rows: Vec<ResolvedRow>,
    pub by_category: Vec<CategoryTotal>,
    pub by_sector: Vec<SectorTotal>,
    pub diagnostics: Vec<FilterDiagnostic>,
}

// ==========================================
// PlanningBoardEngine - 看板编排器
// ==========================================
pub struct PlanningBoardEngine {
    filter: FilterEngine,
    resolver: AllocationResolver,
    aggregator: Aggregator,
}

impl PlanningBoardEngine {
    pub fn new() -> Self {
        Self {
            filter: FilterEngine::new(),
            resolver: AllocationResolver::new(),
            aggregator: Aggregator::new(),
        }
    }

    pub fn resolver(&self) -> &AllocationResolver {
        &self.resolver
    }

    /// 生成周看板
    pub fn build(
        &self,
        request: &BoardRequest,
        items: &[PlanItem],
        sectors: &[Sector],
        completions: &[CompletionRecord],
    ) -> WeeklyBoard {
        // 1. 过滤
        let report = self.filter.apply_with_report(items, &request.filter_spec());

        // 2. 展开
        let expanded = PlanExpander::new(request.expansion).expand(&report.rows);

        // 3. 分配解析
        let rows = self.resolver.resolve(expanded, sectors);

        // 4. 汇总
        let index = CompletionIndex::from_records(completions);
        let by_category = self
            .aggregator
            .aggregate_by_category(rows.iter().map(|r| &r.row), &index);
        let by_sector = self.aggregator.aggregate_by_sector(&rows, sectors);

        info!(
            week = ?request.week,
            op = %request.comparator,
            show_parts = %request.expansion,
            items = items.len(),
            selected = report.rows.len(),
            rows = rows.len(),
            "周看板生成完成"
        );

        WeeklyBoard {
            request: request.clone(),
            rows,
            by_category,
            by_sector,
            diagnostics: report.diagnostics,
        }
    }
}

impl Default for PlanningBoardEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_params_defaults_and_fallbacks() {
        let req = BoardRequest::from_params(
            Some(" 23 "),
            Some("=>"),
            Some("no"),
            Comparator::Eq,
            ExpansionMode::WithParts,
        );
        assert_eq!(req.week, Some(23));
        assert_eq!(req.comparator, Comparator::Eq);
        assert_eq!(req.expansion, ExpansionMode::WholeItems);

        let blank = BoardRequest::from_params(Some(""), None, None, Comparator::Ge, ExpansionMode::WithParts);
        assert_eq!(blank.week, None);
        assert_eq!(blank.comparator, Comparator::Ge);
        assert!(blank.filter_spec().is_empty());
    }

    #[test]
    fn test_week_predicate_overrides_extra_filter() {
        let mut req = BoardRequest::for_week(10);
        req.comparator = Comparator::Ge;
        req.extra_filters = FilterSpec::new()
            .with(WEEK_COLUMN, Predicate::exact(1))
            .with("category", Predicate::exact("Potes"));

        let spec = req.filter_spec();
        assert_eq!(spec.len(), 2);
        assert_eq!(spec.get(WEEK_COLUMN), Some(&Predicate::numeric(Comparator::Ge, 10u32)));
    }
}
