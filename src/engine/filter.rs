// ==========================================
// 周计划排产分配引擎 - 通用过滤引擎
// ==========================================
// 职责: 按列谓词集合筛选记录 (全部谓词 AND 组合)
// 红线: 纯函数,不修改输入,保持原始行序
// 红线: 单个谓词出错只跳过该谓词,绝不中断整个过滤
// ==========================================

use crate::domain::record::{CellValue, ColumnKind, Filterable};
use crate::domain::types::Comparator;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ==========================================
// Predicate - 单列谓词
// ==========================================
// 序列化格式: {"op": "exact", "value": ...}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    /// 精确匹配 (按列类型强转操作数)
    Exact(JsonValue),
    /// 大小写不敏感子串匹配
    Contains(JsonValue),
    /// 集合成员
    Multi(JsonValue),
    /// 数值比较 (comparator ∈ ==, >=, <=, >, <)
    NumericCompare {
        comparator: String,
        value: JsonValue,
    },
    /// 日期严格晚于
    Above(JsonValue),
    /// 日期严格早于
    Below(JsonValue),
    /// 日期区间 (两端包含)
    Between(JsonValue, JsonValue),
}

impl Predicate {
    pub fn exact(value: impl Into<JsonValue>) -> Self {
        Predicate::Exact(value.into())
    }

    pub fn contains(value: impl Into<JsonValue>) -> Self {
        Predicate::Contains(value.into())
    }

    pub fn multi<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        Predicate::Multi(JsonValue::Array(values.into_iter().map(Into::into).collect()))
    }

    pub fn numeric(comparator: Comparator, value: impl Into<JsonValue>) -> Self {
        Predicate::NumericCompare {
            comparator: comparator.symbol().to_string(),
            value: value.into(),
        }
    }

    pub fn operator_name(&self) -> &'static str {
        match self {
            Predicate::Exact(_) => "exact",
            Predicate::Contains(_) => "contains",
            Predicate::Multi(_) => "multi",
            Predicate::NumericCompare { .. } => "numeric_compare",
            Predicate::Above(_) => "above",
            Predicate::Below(_) => "below",
            Predicate::Between(_, _) => "between",
        }
    }
}

// ==========================================
// FilterSpec - 列名 → 谓词
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    predicates: BTreeMap<String, Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加谓词 (同列后者覆盖前者)
    pub fn with(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.insert(column, predicate);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, predicate: Predicate) {
        self.predicates.insert(column.into(), predicate);
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.predicates.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Predicate)> {
        self.predicates.iter()
    }
}

// ==========================================
// FilterDiagnostic - 被跳过的谓词
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDiagnostic {
    pub column: String,
    pub operator: String,
    pub reason: String,
}

/// 过滤结果 (保留行 + 诊断)
#[derive(Debug, Clone)]
pub struct FilterReport<R> {
    pub rows: Vec<R>,
    pub diagnostics: Vec<FilterDiagnostic>,
}

// ==========================================
// 编译后的谓词
// ==========================================
enum Compiled {
    Exact {
        column: String,
        kind: ColumnKind,
        operand: JsonValue,
    },
    Contains {
        column: String,
        needle: Option<String>,
    },
    Multi {
        column: String,
        kind: ColumnKind,
        members: Vec<JsonValue>,
    },
    Numeric {
        column: String,
        comparator: Comparator,
        value: f64,
    },
    DateRange {
        column: String,
        lower: Option<(NaiveDate, bool)>,
        upper: Option<(NaiveDate, bool)>,
    },
}

impl Compiled {
    fn matches<R: Filterable>(&self, record: &R) -> bool {
        match self {
            Compiled::Exact {
                column,
                kind,
                operand,
            } => loose_eq(&record.cell(column), *kind, operand),
            Compiled::Contains { column, needle } => {
                let needle = match needle {
                    Some(n) => n,
                    None => return false,
                };
                match record.cell(column).as_text() {
                    Some(text) => text.to_lowercase().contains(needle.as_str()),
                    None => false,
                }
            }
            Compiled::Multi {
                column,
                kind,
                members,
            } => {
                let cell = record.cell(column);
                members.iter().any(|m| loose_eq(&cell, *kind, m))
            }
            Compiled::Numeric {
                column,
                comparator,
                value,
            } => match record.cell(column).as_f64() {
                Some(lhs) => comparator.compare(lhs, *value),
                // 无法转为数值的行直接剔除
                None => false,
            },
            Compiled::DateRange {
                column,
                lower,
                upper,
            } => {
                let date = match record.cell(column) {
                    CellValue::Date(d) => d,
                    _ => return false,
                };
                let lower_ok = match lower {
                    Some((bound, inclusive)) => {
                        if *inclusive {
                            date >= *bound
                        } else {
                            date > *bound
                        }
                    }
                    None => true,
                };
                let upper_ok = match upper {
                    Some((bound, inclusive)) => {
                        if *inclusive {
                            date <= *bound
                        } else {
                            date < *bound
                        }
                    }
                    None => true,
                };
                lower_ok && upper_ok
            }
        }
    }
}

// ==========================================
// FilterEngine - 过滤引擎
// ==========================================
pub struct FilterEngine;

impl FilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// 应用过滤规格,返回保留行 (保持原始顺序)
    pub fn apply<R>(&self, records: &[R], spec: &FilterSpec) -> Vec<R>
    where
        R: Filterable + Clone,
    {
        self.apply_with_report(records, spec).rows
    }

    /// 应用过滤规格,同时返回被跳过谓词的诊断
    pub fn apply_with_report<R>(&self, records: &[R], spec: &FilterSpec) -> FilterReport<R>
    where
        R: Filterable + Clone,
    {
        let mut diagnostics = Vec::new();
        let compiled: Vec<Compiled> = spec
            .iter()
            .filter_map(|(column, predicate)| {
                compile::<R>(column, predicate, &mut diagnostics)
            })
            .collect();

        let rows: Vec<R> = records
            .iter()
            .filter(|record| compiled.iter().all(|c| c.matches(*record)))
            .cloned()
            .collect();

        debug!(
            input = records.len(),
            kept = rows.len(),
            predicates = compiled.len(),
            skipped = diagnostics.len(),
            "过滤完成"
        );

        FilterReport { rows, diagnostics }
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 谓词编译
// ==========================================

/// 编译单个谓词; 返回 None 表示跳过 (必要时写入诊断)
fn compile<R: Filterable>(
    column: &str,
    predicate: &Predicate,
    diagnostics: &mut Vec<FilterDiagnostic>,
) -> Option<Compiled> {
    let mut skip = |reason: String| {
        warn!(column, operator = predicate.operator_name(), %reason, "谓词已跳过");
        diagnostics.push(FilterDiagnostic {
            column: column.to_string(),
            operator: predicate.operator_name().to_string(),
            reason,
        });
        None
    };

    let kind = match R::column_kind(column) {
        Some(k) => k,
        None => return skip(format!("未知列: {}", column)),
    };

    match predicate {
        Predicate::Exact(operand) => {
            if is_empty_operand(operand) {
                return None;
            }
            Some(Compiled::Exact {
                column: column.to_string(),
                kind,
                operand: operand.clone(),
            })
        }
        Predicate::Contains(operand) => {
            let needle = operand_as_text(operand).map(|s| s.to_lowercase());
            if needle.is_none() {
                skip(format!("contains 操作数不可转为文本: {}", operand));
                // 非文本操作数: 谓词仍生效,但不匹配任何行
                return Some(Compiled::Contains {
                    column: column.to_string(),
                    needle: None,
                });
            }
            Some(Compiled::Contains {
                column: column.to_string(),
                needle,
            })
        }
        Predicate::Multi(operand) => {
            if is_empty_operand(operand) {
                return None;
            }
            let members = match operand {
                JsonValue::Array(items) => items.clone(),
                single => vec![single.clone()],
            };
            Some(Compiled::Multi {
                column: column.to_string(),
                kind,
                members,
            })
        }
        Predicate::NumericCompare { comparator, value } => {
            if is_empty_operand(value) {
                return None;
            }
            let comparator = match Comparator::parse(comparator) {
                Some(c) => c,
                None => return skip(format!("非法比较符: {}", comparator)),
            };
            let value = match operand_as_f64(value) {
                Some(v) => v,
                None => return skip(format!("比较值不是数值: {}", value)),
            };
            Some(Compiled::Numeric {
                column: column.to_string(),
                comparator,
                value,
            })
        }
        Predicate::Above(operand) | Predicate::Below(operand) => {
            if is_empty_operand(operand) {
                return None;
            }
            if !kind.is_temporal() {
                debug!(column, "非日期列,日期谓词忽略");
                return None;
            }
            let bound = match operand_as_date(operand) {
                Some(d) => d,
                None => return skip(format!("日期操作数无法解析: {}", operand)),
            };
            let (lower, upper) = if matches!(predicate, Predicate::Above(_)) {
                (Some((bound, false)), None)
            } else {
                (None, Some((bound, false)))
            };
            Some(Compiled::DateRange {
                column: column.to_string(),
                lower,
                upper,
            })
        }
        Predicate::Between(start, end) => {
            if is_empty_operand(start) || is_empty_operand(end) {
                return None;
            }
            if !kind.is_temporal() {
                debug!(column, "非日期列,日期谓词忽略");
                return None;
            }
            let (start, end) = match (operand_as_date(start), operand_as_date(end)) {
                (Some(s), Some(e)) => (s, e),
                _ => return skip(format!("日期区间无法解析: {} ~ {}", start, end)),
            };
            Some(Compiled::DateRange {
                column: column.to_string(),
                lower: Some((start, true)),
                upper: Some((end, true)),
            })
        }
    }
}

// ==========================================
// 操作数强转辅助
// ==========================================

fn is_empty_operand(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn operand_as_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn operand_as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn operand_as_date(value: &JsonValue) -> Option<NaiveDate> {
    let raw = value.as_str()?.trim();
    // 允许 "YYYY-MM-DD" 或带时间部分 "YYYY-MM-DDTHH:MM:SS"
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// 按列类型强转操作数; 失败返回 None
fn coerce_operand(kind: ColumnKind, operand: &JsonValue) -> Option<CellValue> {
    match kind {
        ColumnKind::Integer | ColumnKind::Float => operand_as_f64(operand).map(CellValue::Float),
        ColumnKind::Text => operand_as_text(operand).map(CellValue::Text),
        ColumnKind::Date => operand_as_date(operand).map(CellValue::Date),
        ColumnKind::Boolean => match operand {
            JsonValue::Bool(b) => Some(CellValue::Bool(*b)),
            JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(CellValue::Bool(true)),
                "false" => Some(CellValue::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

/// 两个单元格值是否相等 (数值跨 Int/Float 比较, Null 永不相等)
fn cells_equal(lhs: &CellValue, rhs: &CellValue) -> bool {
    match (lhs, rhs) {
        (CellValue::Null, _) | (_, CellValue::Null) => false,
        (CellValue::Int(a), CellValue::Int(b)) => a == b,
        (CellValue::Int(_) | CellValue::Float(_), CellValue::Int(_) | CellValue::Float(_)) => {
            match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        (CellValue::Text(a), CellValue::Text(b)) => a == b,
        (CellValue::Date(a), CellValue::Date(b)) => a == b,
        (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
        _ => false,
    }
}

/// 未强转的直接比较 (强转失败时的回退路径)
fn direct_eq(cell: &CellValue, operand: &JsonValue) -> bool {
    match (cell, operand) {
        (CellValue::Int(a), JsonValue::Number(n)) => n.as_i64() == Some(*a),
        (CellValue::Float(a), JsonValue::Number(n)) => n.as_f64() == Some(*a),
        (CellValue::Text(a), JsonValue::String(b)) => a == b,
        (CellValue::Bool(a), JsonValue::Bool(b)) => a == b,
        _ => false,
    }
}

fn loose_eq(cell: &CellValue, kind: ColumnKind, operand: &JsonValue) -> bool {
    match coerce_operand(kind, operand) {
        Some(coerced) => cells_equal(cell, &coerced),
        None => direct_eq(cell, operand),
    }
}
