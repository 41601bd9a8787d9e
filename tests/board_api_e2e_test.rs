// ==========================================
// PlanningBoardApi 端到端测试
// ==========================================
// 职责: 验证 AppState → 看板查询 → 审批 → 审计日志 完整链路
// ==========================================


#[cfg(test)]
mod board_api_e2e_test {
    use pcp_board::api::{ApiError, RawSectorInput};
    use pcp_board::app::AppState;
    use pcp_board::domain::completion::CompletionRecord;
    use pcp_board::domain::types::{Comparator, ExpansionMode};
    use pcp_board::engine::allocation::ResolvedRow;
    use pcp_board::engine::orchestrator::WeeklyBoard;
    use pcp_board::repository::CompletionRepository;

    use crate::test_helpers::{create_test_db, seed_scenario};

    fn setup() -> (tempfile::NamedTempFile, AppState) {
        let (tmp, db_path) = create_test_db().unwrap();
        let state = AppState::new(db_path).unwrap();
        seed_scenario(state.conn.clone());
        (tmp, state)
    }

    fn part<'a>(board: &'a WeeklyBoard, part_name: &str) -> &'a ResolvedRow {
        board
            .rows
            .iter()
            .find(|r| r.row.part_name.as_deref() == Some(part_name))
            .unwrap()
    }

    // ==========================================
    // 测试1: 周看板 (过滤 + 展开 + 默认分配 + 汇总)
    // ==========================================
    #[test]
    fn test_weekly_board_for_week_23() {
        let (_tmp, state) = setup();
        let completions = CompletionRepository::from_connection(state.conn.clone());
        completions
            .upsert(&CompletionRecord {
                order_ref: "OP-1".to_string(),
                iso_week: 23,
                year: 2024,
                completed_qty: 30,
            })
            .unwrap();
        completions
            .upsert(&CompletionRecord {
                order_ref: "OP-1".to_string(),
                iso_week: 24,
                year: 2024,
                completed_qty: 99,
            })
            .unwrap();

        let board = state
            .board_api
            .get_weekly_board(Some("23"), None, None)
            .unwrap();

        assert_eq!(board.request.comparator, Comparator::Eq);
        assert_eq!(board.request.expansion, ExpansionMode::WithParts);
        assert_eq!(board.rows.len(), 3);
        assert_eq!(part(&board, "Tampa").value_for(10), Some(50));
        assert_eq!(part(&board, "Fundo").value_for(11), Some(100));

        // 类别汇总只计父行,完工按 (订单, 周, 年) 匹配
        assert_eq!(board.by_category.len(), 1);
        assert_eq!(board.by_category[0].category, "Potes");
        assert_eq!(board.by_category[0].planned_total, 100);
        assert_eq!(board.by_category[0].completed_total, 30);

        // 部门汇总: 非默认部门 12 无分配,不输出
        let sector_ids: Vec<i64> = board.by_sector.iter().map(|s| s.sector_id).collect();
        assert_eq!(sector_ids, vec![10, 11]);
        assert_eq!(board.by_sector[0].event_count, 2);
        assert_eq!(board.by_sector[0].unit_total, 150);
        assert_eq!(board.by_sector[1].unit_total, 200);
    }

    // ==========================================
    // 测试2: 比较符、拆件开关与配置默认值
    // ==========================================
    #[test]
    fn test_board_params_and_config_defaults() {
        let (_tmp, state) = setup();
        let api = &state.board_api;

        let board = api.get_weekly_board(Some("23"), Some(">="), Some("no")).unwrap();
        let ids: Vec<i64> = board.rows.iter().map(|r| r.row.plan_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(board.rows.iter().all(|r| !r.row.is_part && r.cells.is_empty()));
        assert!(board.by_sector.is_empty());

        // 空白周 = 不过滤
        let board = api.get_weekly_board(Some(" "), None, Some("no")).unwrap();
        assert_eq!(board.rows.len(), 2);

        api.set_default_comparator(">", "planner").unwrap();
        api.set_show_parts_default("no", "planner").unwrap();
        let board = api.get_weekly_board(Some("23"), None, None).unwrap();
        assert_eq!(board.request.comparator, Comparator::Gt);
        let ids: Vec<i64> = board.rows.iter().map(|r| r.row.plan_id).collect();
        assert_eq!(ids, vec![2]);

        assert!(matches!(
            api.set_default_comparator("!=", "planner"),
            Err(ApiError::InvalidInput(_))
        ));
    }

    // ==========================================
    // 测试3: 审批往返 + 审计日志
    // ==========================================
    #[test]
    fn test_approve_round_trip_and_audit_log() {
        let (_tmp, state) = setup();
        let api = &state.board_api;

        let inputs = vec![
            RawSectorInput::new("Tampa", 10, "45"),
            RawSectorInput::new("Tampa", 11, ""),
            RawSectorInput::new("Tampa", 12, " 5 "),
            RawSectorInput::new("Fundo", 10, ""),
            RawSectorInput::new("Fundo", 11, "0"),
            RawSectorInput::new("Fundo", 12, ""),
        ];
        let result = api
            .approve_allocation(1, &inputs, Some("maria"), Some(0))
            .unwrap();
        assert_eq!(result.revision, 1);

        let board = api.get_weekly_board(Some("23"), None, None).unwrap();
        let tampa = part(&board, "Tampa");
        assert_eq!(tampa.value_for(10), Some(45));
        assert_eq!(tampa.value_for(11), Some(100)); // 空白 → 回到默认
        assert_eq!(tampa.value_for(12), Some(5));
        let fundo = part(&board, "Fundo");
        assert_eq!(fundo.value_for(10), Some(100));
        assert_eq!(fundo.value_for(11), Some(0));

        let logs = api.list_actions(1).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action_type, "APPROVE_ALLOCATION");
        assert_eq!(logs[0].actor, "maria");
        assert_eq!(logs[0].action_id, result.action_id);
        let payload = logs[0].payload_json.as_ref().unwrap();
        assert_eq!(payload["Tampa"]["12"], 5);
        assert_eq!(payload["Fundo"]["11"], 0);

        let (saved, revision) = api.get_saved_overrides(1).unwrap();
        assert_eq!(saved, result.overrides);
        assert_eq!(revision, 1);
    }

    // ==========================================
    // 测试4: 非法输入拒绝整次审批,不写入任何数据
    // ==========================================
    #[test]
    fn test_invalid_input_rejects_whole_approval() {
        let (_tmp, state) = setup();
        let api = &state.board_api;

        for bad in ["abc", "-1", "2.5"] {
            let inputs = vec![
                RawSectorInput::new("Tampa", 10, "7"),
                RawSectorInput::new("Fundo", 10, bad),
            ];
            let err = api.approve_allocation(1, &inputs, None, None).unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)), "input {:?}", bad);
        }

        let (saved, revision) = api.get_saved_overrides(1).unwrap();
        assert!(saved.is_empty());
        assert_eq!(revision, 0);
        assert!(api.list_actions(1).unwrap().is_empty());
    }

    // ==========================================
    // 测试5: 过期修订号 → 乐观锁冲突
    // ==========================================
    #[test]
    fn test_stale_revision_is_rejected() {
        let (_tmp, state) = setup();
        let api = &state.board_api;
        let inputs = vec![RawSectorInput::new("Tampa", 10, "1")];

        api.approve_allocation(1, &inputs, None, None).unwrap();
        api.approve_allocation(1, &inputs, None, Some(1)).unwrap();
        let err = api
            .approve_allocation(1, &inputs, None, Some(1))
            .unwrap_err();
        assert!(matches!(err, ApiError::OptimisticLockFailure(_)));

        // 未指定操作人时使用配置默认值
        let logs = api.list_actions(1).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.actor == "system"));
    }

    // ==========================================
    // 测试6: 极大审批数量不会使看板汇总崩溃
    // ==========================================
    #[test]
    fn test_huge_approved_quantities_keep_board_available() {
        let (_tmp, state) = setup();
        let api = &state.board_api;
        let max = i64::MAX.to_string();

        let inputs = vec![
            RawSectorInput::new("Tampa", 10, max.as_str()),
            RawSectorInput::new("Fundo", 10, max.as_str()),
        ];
        api.approve_allocation(1, &inputs, None, None).unwrap();

        let board = api.get_weekly_board(None, None, None).unwrap();
        let injection = board.by_sector.iter().find(|s| s.sector_id == 10).unwrap();
        assert_eq!(injection.event_count, 2);
        assert_eq!(injection.unit_total, i64::MAX);
    }

    // ==========================================
    // 测试7: 审计日志写入失败 → 覆写回滚
    // ==========================================
    #[test]
    fn test_failed_audit_write_rolls_back_override() {
        let (_tmp, state) = setup();
        let api = &state.board_api;

        state
            .conn
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_audit BEFORE INSERT ON action_log
                 BEGIN SELECT RAISE(ABORT, 'audit unavailable'); END;",
            )
            .unwrap();

        let inputs = vec![RawSectorInput::new("Tampa", 10, "45")];
        assert!(api.approve_allocation(1, &inputs, Some("maria"), Some(0)).is_err());

        let (saved, revision) = api.get_saved_overrides(1).unwrap();
        assert!(saved.is_empty());
        assert_eq!(revision, 0);

        // 审计恢复后,原修订号重试成功
        state
            .conn
            .lock()
            .unwrap()
            .execute_batch("DROP TRIGGER reject_audit;")
            .unwrap();
        let result = api
            .approve_allocation(1, &inputs, Some("maria"), Some(0))
            .unwrap();
        assert_eq!(result.revision, 1);
        let logs = api.list_actions(1).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].detail.as_deref(), Some("revision=1"));
    }
}
