// ==========================================
// 周计划排产分配引擎 - 周计划 CSV 导入
// ==========================================
// 必需列: plan_id, order_ref, category, client_name, product_name,
//         planned_qty, scheduled_date
// 可选列: order_total_qty, observation, parts ("Tampa:2;Fundo:1",空白 = 不改部件配置)
// 日期: YYYY-MM-DD 或 DD/MM/YYYY
// ==========================================

use crate::domain::plan::{OverrideMap, PartDefinition, PlanItem};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::PlanItemRepository;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const REQUIRED_COLUMNS: [&str; 7] = [
    "plan_id",
    "order_ref",
    "category",
    "client_name",
    "product_name",
    "planned_qty",
    "scheduled_date",
];

// ==========================================
// 解析结果
// ==========================================

/// 单行解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlanRow {
    pub item: PlanItem,
    /// None = 未提供 parts 列或单元格为空白 (保留已有部件配置)
    pub parts: Option<Vec<PartDefinition>>,
}

/// 被拒绝的行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReject {
    pub row_no: usize, // 数据行号 (表头之后从 1 开始)
    pub reason: String,
}

/// 导入报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanImportReport {
    pub imported: usize,
    pub part_configs_replaced: usize,
    pub rejected: Vec<RowReject>,
}

// ==========================================
// PlanCsvImporter - 周计划导入器
// ==========================================
pub struct PlanCsvImporter {
    item_repo: Arc<PlanItemRepository>,
}

impl PlanCsvImporter {
    pub fn new(item_repo: Arc<PlanItemRepository>) -> Self {
        Self { item_repo }
    }

    /// 从文件导入
    pub fn import_file(&self, path: &Path) -> ImportResult<PlanImportReport> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        self.import_reader(file)
    }

    /// 从任意读取器导入 (解析全部行后再写库)
    pub fn import_reader<R: Read>(&self, reader: R) -> ImportResult<PlanImportReport> {
        let (rows, rejected) = Self::parse(reader)?;
        let mut report = PlanImportReport {
            rejected,
            ..PlanImportReport::default()
        };

        // 同一产品多行提供 parts 时,以最后一行为准
        let mut part_configs: HashMap<String, Vec<PartDefinition>> = HashMap::new();
        for row in rows {
            self.item_repo.upsert(&row.item)?;
            report.imported += 1;
            if let Some(parts) = row.parts {
                part_configs.insert(row.item.product_name.clone(), parts);
            }
        }

        for (product_name, parts) in &part_configs {
            self.item_repo.replace_part_config(product_name, parts)?;
            report.part_configs_replaced += 1;
        }

        info!(
            imported = report.imported,
            part_configs = report.part_configs_replaced,
            rejected = report.rejected.len(),
            "周计划 CSV 导入完成"
        );
        Ok(report)
    }

    /// 解析 CSV,返回有效行与被拒绝行
    pub fn parse<R: Read>(reader: R) -> ImportResult<(Vec<ParsedPlanRow>, Vec<RowReject>)> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        // 读取表头 (大小写与空白不敏感)
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        for col in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == col) {
                return Err(ImportError::MissingColumn(col.to_string()));
            }
        }

        let mut rows = Vec::new();
        let mut rejected = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row_no = idx + 1;
            let record = result?;

            let mut row_map: HashMap<&str, &str> = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.as_str(), value.trim());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            match Self::map_record(&row_map) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    warn!(row_no, %reason, "计划行被拒绝");
                    rejected.push(RowReject { row_no, reason });
                }
            }
        }

        Ok((rows, rejected))
    }

    fn map_record(row: &HashMap<&str, &str>) -> Result<ParsedPlanRow, String> {
        let text = |col: &str| -> Result<String, String> {
            match row.get(col).copied().unwrap_or("") {
                "" => Err(format!("{} 为空", col)),
                v => Ok(v.to_string()),
            }
        };
        let int = |col: &str| -> Result<i64, String> {
            let raw = text(col)?;
            raw.parse::<i64>()
                .map_err(|_| format!("{} 不是整数: {}", col, raw))
        };

        let plan_id = int("plan_id")?;
        let planned_qty = int("planned_qty")?;
        let order_total_qty = match row.get("order_total_qty").copied().unwrap_or("") {
            "" => 0,
            _ => int("order_total_qty")?,
        };
        let scheduled_date = parse_date(&text("scheduled_date")?)?;

        let observation = row
            .get("observation")
            .copied()
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        // 空白单元格与缺列同义: 保留已有部件配置
        let parts = match row.get("parts").copied().filter(|v| !v.is_empty()) {
            None => None,
            Some(raw) => Some(parse_parts(raw)?),
        };

        Ok(ParsedPlanRow {
            item: PlanItem {
                plan_id,
                order_ref: text("order_ref")?,
                order_total_qty,
                category: text("category")?,
                client_name: text("client_name")?,
                product_name: text("product_name")?,
                planned_qty,
                scheduled_date,
                observation,
                part_definitions: parts.clone().unwrap_or_default(),
                sector_overrides: OverrideMap::new(),
            },
            parts,
        })
    }
}

/// 解析日期 (YYYY-MM-DD / DD/MM/YYYY)
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| format!("scheduled_date 格式错误: {}", raw))
}

/// 解析部件列 "Tampa:2;Fundo:1" (空串 = 无部件)
fn parse_parts(raw: &str) -> Result<Vec<PartDefinition>, String> {
    let mut parts: Vec<PartDefinition> = Vec::new();
    for token in raw.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        let (name, multiplier) = token
            .rsplit_once(':')
            .ok_or_else(|| format!("部件定义缺少倍数: {}", token))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("部件名称为空: {}", token));
        }
        let multiplier = multiplier
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("部件倍数不是整数: {}", token))?;
        if parts.iter().any(|p| p.part_name == name) {
            return Err(format!("部件重复: {}", name));
        }
        parts.push(PartDefinition::new(name, multiplier));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parts_keeps_order() {
        let parts = parse_parts(" Tampa:2 ; Fundo:1;").unwrap();
        assert_eq!(
            parts,
            vec![PartDefinition::new("Tampa", 2), PartDefinition::new("Fundo", 1)]
        );
        assert!(parse_parts("").unwrap().is_empty());
        assert!(parse_parts("Tampa").is_err());
        assert!(parse_parts("Tampa:x").is_err());
        assert!(parse_parts("Tampa:1;Tampa:2").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(parse_date("2024-06-03").unwrap(), d);
        assert_eq!(parse_date("03/06/2024").unwrap(), d);
        assert!(parse_date("June 3").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_rows_and_keeps_good_ones() {
        let csv = "\
plan_id,order_ref,category,client_name,product_name,planned_qty,scheduled_date,parts
1,OP-1,Potes,ACME,Pote 500,100,2024-06-03,Tampa:2;Fundo:1
2,OP-2,Potes,ACME,Pote 250,abc,2024-06-03,
,,,,,,,
3,OP-3,Tampas,Beta,Tampa 90,40,03/06/2024,
";
        let (rows, rejected) = PlanCsvImporter::parse(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item.part_definitions.len(), 2);
        assert_eq!(rows[1].item.plan_id, 3);
        assert_eq!(rows[1].parts, None);
        assert!(rows[1].item.part_definitions.is_empty());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].row_no, 2);
    }

    #[test]
    fn test_parse_requires_columns() {
        let csv = "plan_id,order_ref\n1,OP-1\n";
        let err = PlanCsvImporter::parse(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(ref c) if c == "category"));
    }
}
