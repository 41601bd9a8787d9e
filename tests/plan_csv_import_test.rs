// ==========================================
// 周计划 CSV 导入测试
// ==========================================
// 职责: 验证 CSV → plan_item / part_config 写入及看板可见性
// ==========================================


#[cfg(test)]
mod plan_csv_import_test {
    use pcp_board::api::ApiError;
    use pcp_board::app::AppState;
    use pcp_board::domain::plan::PartDefinition;
    use pcp_board::importer::{ImportError, PlanCsvImporter};
    use pcp_board::repository::{PlanItemRepository, SectorRepository};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::Builder;

    use crate::test_helpers::{create_test_db, shared_conn, standard_sectors};

    const PLAN_CSV: &str = "\
Plan_ID,Order_Ref,Order_Total_Qty,Category,Client_Name,Product_Name,Planned_Qty,Scheduled_Date,Observation,Parts
10,OP-10,500,Potes,ACME,Pote 500,120,2024-06-03,,Tampa:7;Fundo:1
11,OP-11,,Potes,ACME,Pote 500,60,04/06/2024,segunda linha,Tampa:2;Fundo:1
12,OP-12,80,Caixas,Beta,Caixa,x,2024-06-05,,
13,OP-13,80,Caixas,Beta,Caixa,80,2024-06-05,,
";

    fn write_csv(content: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // ==========================================
    // 测试1: 导入写库,同产品 parts 以最后一行为准
    // ==========================================
    #[test]
    fn test_import_writes_items_and_part_config() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        let items = Arc::new(PlanItemRepository::from_connection(conn));
        let importer = PlanCsvImporter::new(items.clone());

        let report = importer.import_reader(PLAN_CSV.as_bytes()).unwrap();
        assert_eq!(report.imported, 3);
        assert_eq!(report.part_configs_replaced, 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].row_no, 3);

        let all = items.list_all().unwrap();
        let ids: Vec<i64> = all.iter().map(|i| i.plan_id).collect();
        assert_eq!(ids, vec![10, 11, 13]);
        assert_eq!(all[1].order_total_qty, 0);
        assert_eq!(all[1].observation.as_deref(), Some("segunda linha"));
        assert_eq!(
            all[0].part_definitions,
            vec![PartDefinition::new("Tampa", 2), PartDefinition::new("Fundo", 1)]
        );
        assert!(all[2].part_definitions.is_empty());
    }

    // ==========================================
    // 测试2: 后续导入 parts 为空白时保留已有部件配置
    // ==========================================
    #[test]
    fn test_blank_parts_cell_keeps_existing_part_config() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let items = Arc::new(PlanItemRepository::from_connection(shared_conn(&db_path)));
        let importer = PlanCsvImporter::new(items.clone());
        importer.import_reader(PLAN_CSV.as_bytes()).unwrap();

        let next_week = "\
plan_id,order_ref,category,client_name,product_name,planned_qty,scheduled_date,parts
20,OP-20,Potes,ACME,Pote 500,90,2024-06-10,
";
        let report = importer.import_reader(next_week.as_bytes()).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.part_configs_replaced, 0);

        let expected = vec![PartDefinition::new("Tampa", 2), PartDefinition::new("Fundo", 1)];
        let all = items.list_all().unwrap();
        for plan_id in [10, 20] {
            let item = all.iter().find(|i| i.plan_id == plan_id).unwrap();
            assert_eq!(item.part_definitions, expected, "plan {}", plan_id);
        }
    }

    // ==========================================
    // 测试3: 通过 API 导入后看板可见,并写入审计日志
    // ==========================================
    #[test]
    fn test_import_via_api_feeds_board() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = AppState::new(db_path).unwrap();
        let sectors = SectorRepository::from_connection(state.conn.clone());
        for sector in standard_sectors() {
            sectors.upsert(&sector).unwrap();
        }

        let csv = write_csv(PLAN_CSV, ".csv");
        let report = state
            .board_api
            .import_plan_csv(csv.path(), Some("planner"))
            .unwrap();
        assert_eq!(report.imported, 3);

        let board = state
            .board_api
            .get_weekly_board(Some("23"), Some("=="), Some("yes"))
            .unwrap();
        // plan 10/11 各 1 父行 + 2 部件行, plan 13 一个父行
        assert_eq!(board.rows.len(), 7);
        let tampa_10 = board
            .rows
            .iter()
            .find(|r| r.row.plan_id == 10 && r.row.part_name.as_deref() == Some("Tampa"))
            .unwrap();
        assert_eq!(tampa_10.value_for(10), Some(60));

        let logged: i64 = state
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM action_log WHERE action_type = 'IMPORT_PLAN'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(logged, 1);
    }

    // ==========================================
    // 测试4: 文件级错误
    // ==========================================
    #[test]
    fn test_file_level_errors() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let items = Arc::new(PlanItemRepository::from_connection(shared_conn(&db_path)));
        let importer = PlanCsvImporter::new(items);

        let missing = importer.import_file(std::path::Path::new("/no/such/plan.csv"));
        assert!(matches!(missing, Err(ImportError::FileNotFound(_))));

        let xlsx = write_csv(PLAN_CSV, ".xlsx");
        assert!(matches!(
            importer.import_file(xlsx.path()),
            Err(ImportError::UnsupportedFormat(_))
        ));

        let no_header = write_csv("plan_id,order_ref\n1,OP\n", ".csv");
        let err = importer.import_file(no_header.path()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(_)));
        assert!(matches!(ApiError::from(err), ApiError::ImportError(_)));
    }
}
