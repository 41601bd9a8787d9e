// ==========================================
// 周计划排产分配引擎 - 领域类型定义
// ==========================================
// 依据: PCP 看板 - 部门类型 / 比较符 / 拆件模式
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 部门ID (sector 表主键)
pub type SectorId = i64;

/// 计划明细ID (plan_item 表主键)
pub type PlanId = i64;

// ==========================================
// 部门计划类型 (Sector Plan Type)
// ==========================================
// 存储编码: 1 = MULTIPLIER_DIVISION, 2 = WHOLE_UNIT
// 注意: 编码与命名顺序相反,全系统统一使用此映射
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectorPlanType {
    MultiplierDivision, // 计划数 / 部件倍数 (向下取整)
    WholeUnit,          // 整件数量 (不按部件拆分)
}

impl SectorPlanType {
    /// 从存储编码解析
    ///
    /// # 返回
    /// - None: 未知编码 (边界层拒绝)
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SectorPlanType::MultiplierDivision),
            2 => Some(SectorPlanType::WholeUnit),
            _ => None,
        }
    }

    /// 存储编码
    pub fn code(&self) -> i64 {
        match self {
            SectorPlanType::MultiplierDivision => 1,
            SectorPlanType::WholeUnit => 2,
        }
    }
}

impl fmt::Display for SectorPlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorPlanType::MultiplierDivision => write!(f, "MULTIPLIER_DIVISION"),
            SectorPlanType::WholeUnit => write!(f, "WHOLE_UNIT"),
        }
    }
}

// ==========================================
// 数值比较符 (Comparator)
// ==========================================
// 允许集合: ==, >=, <=, >, <
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl Comparator {
    /// 从符号解析 (前后空白忽略)
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "==" => Some(Comparator::Eq),
            ">=" => Some(Comparator::Ge),
            "<=" => Some(Comparator::Le),
            ">" => Some(Comparator::Gt),
            "<" => Some(Comparator::Lt),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
        }
    }

    /// 以 `lhs <op> rhs` 形式比较
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Eq => lhs == rhs,
            Comparator::Ge => lhs >= rhs,
            Comparator::Le => lhs <= rhs,
            Comparator::Gt => lhs > rhs,
            Comparator::Lt => lhs < rhs,
        }
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Comparator::Eq
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ==========================================
// 拆件模式 (Expansion Mode)
// ==========================================
// 请求参数 show_parts: yes / no
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpansionMode {
    WithParts,   // 父行 + 部件行
    WholeItems,  // 每个计划明细仅一行
}

impl ExpansionMode {
    /// 解析 yes/no 标志
    pub fn parse_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_ascii_lowercase().as_str() {
            "yes" | "sim" | "true" | "1" => Some(ExpansionMode::WithParts),
            "no" | "nao" | "não" | "false" | "0" => Some(ExpansionMode::WholeItems),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            ExpansionMode::WithParts => "yes",
            ExpansionMode::WholeItems => "no",
        }
    }
}

impl Default for ExpansionMode {
    fn default() -> Self {
        ExpansionMode::WithParts
    }
}

impl fmt::Display for ExpansionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_flag())
    }
}

// ==========================================
// 单元格取值来源 (Cell Source)
// ==========================================
// 用途: 可解释性 - 标明分配值来自人工覆写还是默认计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellSource {
    Override, // 人工保存的覆写值
    Default,  // 按部门配置计算的默认值
    Empty,    // 无法计算 (空白输入框)
}

impl fmt::Display for CellSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellSource::Override => write!(f, "OVERRIDE"),
            CellSource::Default => write!(f, "DEFAULT"),
            CellSource::Empty => write!(f, "EMPTY"),
        }
    }
}
