// ==========================================
// 周计划排产分配引擎 - 计划明细领域模型
// ==========================================
// 依据: PCP 看板 - plan_item / part_config / plan_override
// ==========================================

use crate::domain::record::{CellValue, ColumnKind, Filterable};
use crate::domain::types::{PlanId, SectorId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 覆写结构: 部件名 → 部门ID → 人工保存数量
///
/// 对应 plan_override.overrides_json,整体即为该计划明细的完整覆写状态
pub type OverrideMap = BTreeMap<String, BTreeMap<SectorId, i64>>;

// ==========================================
// PartDefinition - 部件定义
// ==========================================
// 倍数: 多少个父件对应一个部件; <= 0 视为无法计算默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDefinition {
    pub part_name: String, // 部件名称 (如 Tampa / Fundo)
    pub multiplier: i64,   // 倍数
}

impl PartDefinition {
    pub fn new(part_name: impl Into<String>, multiplier: i64) -> Self {
        Self {
            part_name: part_name.into(),
            multiplier,
        }
    }
}

// ==========================================
// PlanItem - 周计划明细
// ==========================================
// 红线: 每次请求重新加载,唯一写入路径为"审批"整体替换 sector_overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    // ===== 主键 =====
    pub plan_id: PlanId,            // 计划明细ID

    // ===== 来源订单 =====
    pub order_ref: String,          // 生产订单引用 (不做解释)
    pub order_total_qty: i64,       // 订单总数量 (仅展示)

    // ===== 描述字段 (分组/过滤) =====
    pub category: String,           // 产品类别
    pub client_name: String,        // 客户名称
    pub product_name: String,       // 产品名称

    // ===== 计划信息 =====
    pub planned_qty: i64,           // 本计划承诺数量
    pub scheduled_date: NaiveDate,  // 计划日期 (派生 ISO 周)
    pub observation: Option<String>,// 备注 (透传)

    // ===== 部件与覆写 =====
    #[serde(default)]
    pub part_definitions: Vec<PartDefinition>, // 有序部件定义
    #[serde(default)]
    pub sector_overrides: OverrideMap,         // 完整覆写状态
}

impl PlanItem {
    /// ISO 周序号 (1-53)
    pub fn iso_week(&self) -> u32 {
        self.scheduled_date.iso_week().week()
    }

    /// ISO 周所属年份 (跨年周可能与自然年不同)
    pub fn iso_year(&self) -> i32 {
        self.scheduled_date.iso_week().year()
    }

    /// 星期桶 (周一=1 … 周日=7)
    pub fn weekday(&self) -> u32 {
        self.scheduled_date.weekday().number_from_monday()
    }

    pub fn has_parts(&self) -> bool {
        !self.part_definitions.is_empty()
    }

    /// 某部件的已保存覆写 (部门ID → 数量)
    pub fn overrides_for_part(&self, part_name: &str) -> Option<&BTreeMap<SectorId, i64>> {
        self.sector_overrides.get(part_name)
    }
}

impl Filterable for PlanItem {
    fn column_kind(column: &str) -> Option<ColumnKind> {
        match column {
            "plan_id" | "order_total_qty" | "planned_qty" | "iso_week" | "iso_year"
            | "weekday" => Some(ColumnKind::Integer),
            "order_ref" | "category" | "client_name" | "product_name" | "observation" => {
                Some(ColumnKind::Text)
            }
            "scheduled_date" => Some(ColumnKind::Date),
            _ => None,
        }
    }

    fn cell(&self, column: &str) -> CellValue {
        match column {
            "plan_id" => CellValue::Int(self.plan_id),
            "order_ref" => CellValue::text(&self.order_ref),
            "category" => CellValue::text(&self.category),
            "client_name" => CellValue::text(&self.client_name),
            "product_name" => CellValue::text(&self.product_name),
            "order_total_qty" => CellValue::Int(self.order_total_qty),
            "planned_qty" => CellValue::Int(self.planned_qty),
            "scheduled_date" => CellValue::Date(self.scheduled_date),
            "iso_week" => CellValue::Int(self.iso_week() as i64),
            "iso_year" => CellValue::Int(self.iso_year() as i64),
            "weekday" => CellValue::Int(self.weekday() as i64),
            "observation" => self.observation.clone().into(),
            _ => CellValue::Null,
        }
    }
}

// ==========================================
// ExpandedRow - 展开行 (父行 / 部件行)
// ==========================================
// 派生数据,从不持久化,每次请求重新计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedRow {
    // ===== 来源计划明细 (原样复制) =====
    pub plan_id: PlanId,
    pub order_ref: String,
    pub order_total_qty: i64,
    pub category: String,
    pub client_name: String,
    pub product_name: String,
    pub planned_qty: i64,
    pub scheduled_date: NaiveDate,
    pub iso_week: u32,
    pub iso_year: i32,
    pub weekday: u32,
    pub observation: Option<String>,

    // ===== 部件信息 (仅部件行) =====
    pub is_part: bool,
    pub part_name: Option<String>,
    pub part_multiplier: Option<i64>,

    // ===== 该部件的已保存覆写 (仅部件行,父行为空) =====
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub saved_overrides: BTreeMap<SectorId, i64>,
}

impl ExpandedRow {
    /// 由计划明细生成父行
    pub fn parent_of(item: &PlanItem) -> Self {
        Self {
            plan_id: item.plan_id,
            order_ref: item.order_ref.clone(),
            order_total_qty: item.order_total_qty,
            category: item.category.clone(),
            client_name: item.client_name.clone(),
            product_name: item.product_name.clone(),
            planned_qty: item.planned_qty,
            scheduled_date: item.scheduled_date,
            iso_week: item.iso_week(),
            iso_year: item.iso_year(),
            weekday: item.weekday(),
            observation: item.observation.clone(),
            is_part: false,
            part_name: None,
            part_multiplier: None,
            saved_overrides: BTreeMap::new(),
        }
    }

    /// 由计划明细 + 部件定义生成部件行
    pub fn part_of(item: &PlanItem, part: &PartDefinition) -> Self {
        let mut row = Self::parent_of(item);
        row.is_part = true;
        row.part_name = Some(part.part_name.clone());
        row.part_multiplier = Some(part.multiplier);
        row.saved_overrides = item
            .overrides_for_part(&part.part_name)
            .cloned()
            .unwrap_or_default();
        row
    }
}

impl Filterable for ExpandedRow {
    fn column_kind(column: &str) -> Option<ColumnKind> {
        match column {
            "is_part" => Some(ColumnKind::Boolean),
            "part_name" => Some(ColumnKind::Text),
            "part_multiplier" => Some(ColumnKind::Integer),
            other => PlanItem::column_kind(other),
        }
    }

    fn cell(&self, column: &str) -> CellValue {
        match column {
            "plan_id" => CellValue::Int(self.plan_id),
            "order_ref" => CellValue::text(&self.order_ref),
            "category" => CellValue::text(&self.category),
            "client_name" => CellValue::text(&self.client_name),
            "product_name" => CellValue::text(&self.product_name),
            "order_total_qty" => CellValue::Int(self.order_total_qty),
            "planned_qty" => CellValue::Int(self.planned_qty),
            "scheduled_date" => CellValue::Date(self.scheduled_date),
            "iso_week" => CellValue::Int(self.iso_week as i64),
            "iso_year" => CellValue::Int(self.iso_year as i64),
            "weekday" => CellValue::Int(self.weekday as i64),
            "observation" => self.observation.clone().into(),
            "is_part" => CellValue::Bool(self.is_part),
            "part_name" => self.part_name.clone().into(),
            "part_multiplier" => self.part_multiplier.map(CellValue::Int).unwrap_or(CellValue::Null),
            _ => CellValue::Null,
        }
    }
}
