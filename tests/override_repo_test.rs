// ==========================================
// OverrideRepository 集成测试
// ==========================================
// 职责: 验证覆写存储的乐观锁、外键约束与损坏数据容错
// ==========================================


#[cfg(test)]
mod override_repo_test {
    use pcp_board::domain::plan::OverrideMap;
    use pcp_board::repository::{
        OverrideRepository, OverrideStore, PlanItemRepository, RepositoryError,
    };
    use rusqlite::params;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::thread;

    use crate::test_helpers::{create_test_db, seed_scenario, shared_conn};

    fn tampa(qty: i64) -> OverrideMap {
        OverrideMap::from([("Tampa".to_string(), BTreeMap::from([(10, qty)]))])
    }

    // ==========================================
    // 测试1: 修订号递增与冲突检测
    // ==========================================
    #[test]
    fn test_revision_compare_and_swap() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());
        let repo = OverrideRepository::from_connection(conn);

        assert_eq!(repo.load(1).unwrap().revision, 0);
        assert_eq!(repo.save(1, &tampa(1), Some(0)).unwrap(), 1);
        assert_eq!(repo.save(1, &tampa(2), Some(1)).unwrap(), 2);

        // 过期修订号
        let err = repo.save(1, &tampa(3), Some(1)).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure { plan_id: 1, expected: 1, actual: 2 }
        ));

        // 首次保存语义: 记录已存在时失败
        let err = repo.save(1, &tampa(4), Some(0)).unwrap_err();
        assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));

        let stored = repo.load(1).unwrap();
        assert_eq!(stored.overrides, tampa(2));
        assert_eq!(stored.revision, 2);
    }

    // ==========================================
    // 测试2: 并发审批同一 plan_id,只有一个成功
    // ==========================================
    #[test]
    fn test_concurrent_saves_single_winner() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());
        let repo = Arc::new(OverrideRepository::from_connection(conn));
        repo.save(1, &tampa(0), None).unwrap();

        let handles: Vec<_> = (1..=4)
            .map(|qty| {
                let repo = repo.clone();
                thread::spawn(move || repo.save(1, &tampa(qty), Some(1)))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(repo.load(1).unwrap().revision, 2);
    }

    // ==========================================
    // 测试3: 未知计划明细违反外键
    // ==========================================
    #[test]
    fn test_save_for_unknown_plan_violates_foreign_key() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());
        let repo = OverrideRepository::from_connection(conn);

        let err = repo.save(999, &tampa(1), None).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }

    // ==========================================
    // 测试4: 损坏的覆写 JSON 按无覆写处理
    // ==========================================
    #[test]
    fn test_malformed_blob_reads_as_no_overrides() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());

        {
            let c = conn.lock().unwrap();
            c.execute(
                "INSERT INTO plan_override (plan_id, overrides_json, revision) VALUES (?1, ?2, 3)",
                params![1, "[\"not\", \"a\", \"map\"]"],
            )
            .unwrap();
        }

        let repo = OverrideRepository::from_connection(conn.clone());
        let stored = repo.load(1).unwrap();
        assert!(stored.overrides.is_empty());
        assert_eq!(stored.revision, 3);

        let item = PlanItemRepository::from_connection(conn)
            .find_by_id(1)
            .unwrap()
            .unwrap();
        assert!(item.sector_overrides.is_empty());
        assert_eq!(item.part_definitions.len(), 2);
    }

    // ==========================================
    // 测试5: 重新导入计划明细不会删除覆写
    // ==========================================
    #[test]
    fn test_item_upsert_keeps_overrides() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = shared_conn(&db_path);
        seed_scenario(conn.clone());
        let repo = OverrideRepository::from_connection(conn.clone());
        repo.save(1, &tampa(8), None).unwrap();

        let items = PlanItemRepository::from_connection(conn);
        let mut item = items.find_by_id(1).unwrap().unwrap();
        item.planned_qty = 140;
        items.upsert(&item).unwrap();

        let reloaded = items.find_by_id(1).unwrap().unwrap();
        assert_eq!(reloaded.planned_qty, 140);
        assert_eq!(reloaded.sector_overrides, tampa(8));
    }
}
