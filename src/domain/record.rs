// ==========================================
// 周计划排产分配引擎 - 可过滤记录抽象
// ==========================================
// 职责: 为过滤引擎提供按列名取值的统一接口
// 红线: 只做字段映射,不含过滤规则
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ColumnKind - 列声明类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Date,
    Boolean,
}

impl ColumnKind {
    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnKind::Date)
    }
}

// ==========================================
// CellValue - 单元格取值
// ==========================================
// 只输出不回读: 日期与文本序列化后无法区分
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Bool(bool),
}

impl CellValue {
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// 数值强转 (文本按数字解析,失败返回 None)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// 文本表示 (Null 无文本表示)
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<Option<String>> for CellValue {
    fn from(v: Option<String>) -> Self {
        v.map(CellValue::Text).unwrap_or(CellValue::Null)
    }
}

// ==========================================
// Trait: Filterable
// ==========================================
// 用途: 过滤引擎按列名访问记录
// 实现者: PlanItem / ExpandedRow
pub trait Filterable {
    /// 列声明类型 (None 表示未知列)
    fn column_kind(column: &str) -> Option<ColumnKind>;

    /// 按列名取值 (未知列返回 Null)
    fn cell(&self, column: &str) -> CellValue;
}
