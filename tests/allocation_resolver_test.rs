// ==========================================
// AllocationResolver 集成测试
// ==========================================
// 职责: 验证展开 + 部门分配解析 + 审批整体替换 (SQLite 覆写存储)
// ==========================================


#[cfg(test)]
mod allocation_resolver_test {
    use pcp_board::domain::plan::{ExpandedRow, OverrideMap, PartDefinition};
    use pcp_board::domain::types::{CellSource, ExpansionMode};
    use pcp_board::engine::allocation::{AllocationResolver, ResolvedRow, SectorInput};
    use pcp_board::engine::expander::PlanExpander;
    use pcp_board::repository::{
        OverrideRepository, OverrideStore, PlanItemRepository, SectorRepository,
    };
    use std::collections::BTreeMap;

    use crate::test_helpers::{
        create_test_db, date, plan_item, pote_parts, seed_scenario, shared_conn, standard_sectors,
    };

    fn part_row<'a>(rows: &'a [ResolvedRow], part: &str) -> &'a ResolvedRow {
        rows.iter()
            .find(|r| r.row.part_name.as_deref() == Some(part))
            .unwrap()
    }

    // ==========================================
    // 测试1: 端到端默认分配
    // ==========================================
    #[test]
    fn test_end_to_end_default_allocation() {
        let mut item = plan_item(1, "OP-1", "Potes", "Pote 500", 100, date(2024, 6, 3));
        item.part_definitions = pote_parts();

        let rows = PlanExpander::new(ExpansionMode::WithParts).expand(&[item]);
        let resolved = AllocationResolver::new().resolve(rows, &standard_sectors());

        assert_eq!(resolved.len(), 3);
        assert!(!resolved[0].row.is_part);
        assert!(resolved[0].cells.is_empty());

        let tampa = part_row(&resolved, "Tampa");
        assert_eq!(tampa.value_for(10), Some(50));
        assert_eq!(tampa.value_for(11), Some(100));
        assert_eq!(tampa.value_for(12), None);

        let fundo = part_row(&resolved, "Fundo");
        assert_eq!(fundo.value_for(10), Some(100));
        assert_eq!(fundo.value_for(11), Some(100));
        assert_eq!(fundo.value_for(12), None);
        assert_eq!(fundo.cell(12).unwrap().source, CellSource::Empty);
    }

    // ==========================================
    // 测试2: 覆写优先 (含非默认部门与 0 值)
    // ==========================================
    #[test]
    fn test_override_wins_over_defaults() {
        let mut item = plan_item(1, "OP-1", "Potes", "Pote 500", 100, date(2024, 6, 3));
        item.part_definitions = pote_parts();
        item.sector_overrides =
            OverrideMap::from([("Tampa".to_string(), BTreeMap::from([(10, 0), (12, 7)]))]);

        let rows = PlanExpander::new(ExpansionMode::WithParts).expand(&[item]);
        let resolved = AllocationResolver::new().resolve(rows, &standard_sectors());

        let tampa = part_row(&resolved, "Tampa");
        assert_eq!(tampa.value_for(10), Some(0));
        assert_eq!(tampa.cell(10).unwrap().source, CellSource::Override);
        assert_eq!(tampa.value_for(12), Some(7));
        assert_eq!(tampa.value_for(11), Some(100));
        assert_eq!(tampa.cell(11).unwrap().source, CellSource::Default);
    }

    // ==========================================
    // 测试3: 倍数为 0 时不报错,结果为空
    // ==========================================
    #[test]
    fn test_zero_multiplier_resolves_empty() {
        let item = plan_item(9, "OP-9", "X", "Y", 120, date(2024, 6, 3));
        let row = ExpandedRow::part_of(&item, &PartDefinition::new("Z", 0));

        let resolver = AllocationResolver::new();
        let sectors = standard_sectors();
        assert_eq!(resolver.resolve_cell(&row, &sectors[0]).value, None);
        assert_eq!(resolver.resolve_cell(&row, &sectors[1]).value, Some(120));
    }

    // ==========================================
    // 测试4: 审批整体替换 (之前保存、本次空白的单元格被删除)
    // ==========================================
    #[test]
    fn test_save_replaces_whole_override_map() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());

        let store = OverrideRepository::from_connection(conn.clone());
        let resolver = AllocationResolver::new();

        let first = resolver
            .save(
                &store,
                1,
                &[
                    SectorInput::new("Tampa", 10, Some(5)),
                    SectorInput::new("Tampa", 11, Some(3)),
                    SectorInput::new("Fundo", 10, Some(2)),
                    SectorInput::new("Fundo", 11, None),
                ],
                None,
            )
            .unwrap();
        assert_eq!(first.revision, 1);

        let second = resolver
            .save(
                &store,
                1,
                &[
                    SectorInput::new("Tampa", 10, Some(5)),
                    SectorInput::new("Tampa", 11, None),
                    SectorInput::new("Fundo", 10, None),
                    SectorInput::new("Fundo", 11, None),
                ],
                Some(first.revision),
            )
            .unwrap();

        let expected =
            OverrideMap::from([("Tampa".to_string(), BTreeMap::from([(10, 5)]))]);
        assert_eq!(second.overrides, expected);
        assert_eq!(second.revision, 2);
        assert_eq!(store.load(1).unwrap().overrides, expected);

        // 重新加载后解析: Fundo 回到默认值
        let item = PlanItemRepository::from_connection(conn.clone())
            .find_by_id(1)
            .unwrap()
            .unwrap();
        let sectors = SectorRepository::from_connection(conn).list_all().unwrap();
        let resolved = resolver.resolve(
            PlanExpander::new(ExpansionMode::WithParts).expand(&[item]),
            &sectors,
        );
        assert_eq!(part_row(&resolved, "Tampa").value_for(10), Some(5));
        assert_eq!(part_row(&resolved, "Fundo").value_for(10), Some(100));
    }

    // ==========================================
    // 测试5: 全部空白时保存空结构
    // ==========================================
    #[test]
    fn test_save_all_blank_clears_overrides() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());

        let store = OverrideRepository::from_connection(conn);
        let resolver = AllocationResolver::new();
        resolver
            .save(&store, 1, &[SectorInput::new("Tampa", 10, Some(9))], None)
            .unwrap();
        let outcome = resolver
            .save(&store, 1, &[SectorInput::new("Tampa", 10, None)], None)
            .unwrap();

        assert!(outcome.overrides.is_empty());
        assert!(store.load(1).unwrap().overrides.is_empty());
        assert_eq!(store.load(1).unwrap().revision, 2);
    }
}
