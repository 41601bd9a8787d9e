// ==========================================
// 周计划排产分配引擎 - 汇总器
// ==========================================
// 视图1: 按产品类别汇总 计划数 / 完工数 (仅父行,避免部件重复计数)
// 视图2: 按部门汇总 分配次数 / 分配数量 (仅 > 0 的单元格)
// 累加一律饱和,超大数量不会导致 panic
// 红线: 只读视图,不修改行,不触发保存
// ==========================================

use crate::domain::completion::CompletionRecord;
use crate::domain::plan::ExpandedRow;
use crate::domain::sector::Sector;
use crate::domain::types::SectorId;
use crate::engine::allocation::ResolvedRow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// 完工关联键: (order_ref, iso_week, year)
pub type CompletionKey = (String, u32, i32);

// ==========================================
// CompletionIndex - 完工索引
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CompletionIndex {
    totals: HashMap<CompletionKey, i64>,
}

impl CompletionIndex {
    /// 构建索引 (同键多条记录累加)
    pub fn from_records(records: &[CompletionRecord]) -> Self {
        let mut totals: HashMap<CompletionKey, i64> = HashMap::new();
        for r in records {
            let total = totals.entry(r.key()).or_insert(0);
            *total = total.saturating_add(r.completed_qty);
        }
        Self { totals }
    }

    pub fn completed(&self, key: &CompletionKey) -> i64 {
        self.totals.get(key).copied().unwrap_or(0)
    }
}

// ==========================================
// 汇总视图
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub planned_total: i64,
    pub completed_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorTotal {
    pub sector_id: SectorId,
    pub sector_name: String,
    pub event_count: i64,
    pub unit_total: i64,
}

// ==========================================
// Aggregator - 汇总器
// ==========================================
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// 按类别汇总 (按类别名排序输出)
    ///
    /// # 规则
    /// - planned_total: 仅累加父行 planned_qty
    /// - completed_total: 每个类别内每个不同的 (order_ref, iso_week, year) 只计一次
    pub fn aggregate_by_category<'a, I>(
        &self,
        rows: I,
        completions: &CompletionIndex,
    ) -> Vec<CategoryTotal>
    where
        I: IntoIterator<Item = &'a ExpandedRow>,
    {
        let mut planned: BTreeMap<String, i64> = BTreeMap::new();
        let mut keys: HashMap<String, HashSet<CompletionKey>> = HashMap::new();

        for row in rows.into_iter().filter(|r| !r.is_part) {
            let total = planned.entry(row.category.clone()).or_insert(0);
            *total = total.saturating_add(row.planned_qty);
            keys.entry(row.category.clone()).or_default().insert((
                row.order_ref.clone(),
                row.iso_week,
                row.iso_year,
            ));
        }

        planned
            .into_iter()
            .map(|(category, planned_total)| {
                let completed_total = keys
                    .get(&category)
                    .map(|set| {
                        set.iter()
                            .map(|k| completions.completed(k))
                            .fold(0i64, i64::saturating_add)
                    })
                    .unwrap_or(0);
                CategoryTotal {
                    category,
                    planned_total,
                    completed_total,
                }
            })
            .collect()
    }

    /// 按部门汇总 (按部门配置顺序输出,无分配的部门不输出)
    pub fn aggregate_by_sector(&self, rows: &[ResolvedRow], sectors: &[Sector]) -> Vec<SectorTotal> {
        let mut counters: HashMap<SectorId, (i64, i64)> = HashMap::new();

        for cell in rows.iter().filter(|r| r.row.is_part).flat_map(|r| r.cells.iter()) {
            if let Some(value) = cell.value.filter(|v| *v > 0) {
                let entry = counters.entry(cell.sector_id).or_insert((0, 0));
                entry.0 = entry.0.saturating_add(1);
                entry.1 = entry.1.saturating_add(value);
            }
        }

        sectors
            .iter()
            .filter_map(|sector| {
                let (event_count, unit_total) = counters.get(&sector.sector_id).copied()?;
                if event_count == 0 {
                    return None;
                }
                Some(SectorTotal {
                    sector_id: sector.sector_id,
                    sector_name: sector.name.clone(),
                    event_count,
                    unit_total,
                })
            })
            .collect()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
