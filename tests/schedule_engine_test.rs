// ==========================================
// 排班引擎集成测试
// ==========================================
// 测试目标: 通过编排器跑完整个月，验证排班不变量
// - 人数不足必有告警
// - 除 conan 延续外无人连续两天上班
// - 封闭周六延续周五 conan
// - no_together 互斥
// - 固定种子 dry_run 结果可复现
// - 锁定记录原样保留
// ==========================================


use std::sync::Arc;

use guide_roster_aps::domain::rule::RuleKind;
use guide_roster_aps::domain::schedule::{Assignment, Day};
use guide_roster_aps::domain::types::{DayType, ShiftRole, VacationStatus, WarningKind};
use guide_roster_aps::engine::{
    EngineError, ScheduleOrchestrator, ScheduleRepositories, ScheduleRunReport, ScheduleRunRequest,
};
use test_helpers::{
    assert_no_back_to_back, aug, by_date, create_test_db, create_test_repos, insert_guides,
    MockSchedulingConfig,
};

fn orchestrator(
    repos: &ScheduleRepositories,
    config: MockSchedulingConfig,
) -> ScheduleOrchestrator<MockSchedulingConfig> {
    ScheduleOrchestrator::new(Arc::new(config), repos.clone())
}

async fn run_august(repos: &ScheduleRepositories, dry_run: bool) -> ScheduleRunReport {
    let mut request = ScheduleRunRequest::new(2025, 8);
    request.dry_run = dry_run;
    orchestrator(repos, MockSchedulingConfig::with_seed(7))
        .run_month(request)
        .await
        .expect("月度排班失败")
}

/// 通用不变量
fn assert_month_invariants(report: &ScheduleRunReport) {
    let result = &report.result;
    assert_eq!(result.assignments.len(), 31, "8月应有31天记录");

    for a in &result.assignments {
        let required = a.day_type.required_guides();
        assert!(a.guide_count() <= required, "{} 人数超过要求", a.date);
        if a.guide_count() < required {
            assert!(
                result
                    .warnings
                    .iter()
                    .any(|w| w.date == a.date && w.kind.is_shortfall()),
                "{} 人数不足但没有告警",
                a.date
            );
        }
    }

    assert_no_back_to_back(&result.assignments);
}

#[tokio::test]
async fn test_full_month_basic_invariants() {
    println!("\n=== 测试：6人整月排班基本不变量 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    insert_guides(&repos, 6).unwrap();

    let report = run_august(&repos, false).await;
    assert_month_invariants(&report);
    assert_eq!(report.persisted_rows, 31, "应写入31行");
    assert!(report.result.warnings.is_empty(), "6人足够，不应有告警");

    let summary = &report.result.summary;
    assert_eq!(summary.assigned_count, 31);
    assert_eq!(summary.shortfall_days, 0);
    assert!(
        summary.workload_max - summary.workload_min <= 3,
        "工作量应大致均衡: min={} max={}",
        summary.workload_min,
        summary.workload_max
    );

    let stored = repos.schedule_repo().find_month(2025, 8).unwrap();
    assert_eq!(stored, report.result.assignments, "持久化结果应与报告一致");
    println!("✅ 工作量区间: {}~{}", summary.workload_min, summary.workload_max);
}

#[tokio::test]
async fn test_vacation_excludes_guide() {
    println!("\n=== 测试：已批准休假期间不排班 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();
    let a = ids[0];

    repos
        .constraint_repo()
        .insert_vacation(a, aug(10), aug(12), VacationStatus::Approved, Some("年假"))
        .unwrap();

    let report = run_august(&repos, true).await;
    assert_month_invariants(&report);
    let index = by_date(&report.result.assignments);
    for day in 10..=12 {
        assert!(!index[&aug(day)].contains(a), "休假人员出现在 {}", aug(day));
    }
}

#[tokio::test]
async fn test_closed_weekend_links_conan() {
    println!("\n=== 测试：封闭周末 conan 链接 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    insert_guides(&repos, 6).unwrap();
    repos.weekend_status_repo().set_status(aug(8), true).unwrap();

    let report = run_august(&repos, true).await;
    assert_month_invariants(&report);
    let index = by_date(&report.result.assignments);

    let friday = index[&aug(8)];
    assert_eq!(friday.day_type, DayType::ClosedFriday);
    assert_eq!(friday.guide_count(), 1, "封闭周五只排一人");
    assert_eq!(friday.guide1_role, Some(ShiftRole::Conan));

    let saturday = index[&aug(9)];
    assert_eq!(saturday.day_type, DayType::ClosedSaturday);
    assert_eq!(saturday.guide1_id, friday.guide1_id, "周六 conan 应延续周五");
    assert_eq!(saturday.guide1_role, Some(ShiftRole::Conan));
    assert!(saturday.guide2_id.is_some());
    assert_ne!(saturday.guide2_id, saturday.guide1_id);
    assert_eq!(saturday.guide2_role, Some(ShiftRole::Motzash));

    // conan 不排在紧随其后的周日
    let conan = friday.guide1_id.unwrap();
    assert!(!index[&aug(10)].contains(conan), "conan 不应排在周日");
    assert_eq!(report.result.links.get(aug(8)), Some(conan));
}

#[tokio::test]
async fn test_fixed_weekday_constraint() {
    println!("\n=== 测试：每周固定约束（周三） ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();
    let b = ids[1];
    repos.constraint_repo().insert_fixed(b, 3, Some("上课")).unwrap();

    let report = run_august(&repos, true).await;
    assert_month_invariants(&report);
    for a in &report.result.assignments {
        if a.weekday == 3 {
            assert!(!a.contains(b), "固定约束人员出现在周三 {}", a.date);
        }
    }
}

#[tokio::test]
async fn test_no_together_rule() {
    println!("\n=== 测试：no_together 互斥 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();
    let (c, d) = (ids[2], ids[3]);
    repos
        .rule_repo()
        .insert(RuleKind::NoTogether { guide_a: c, guide_b: d }, true, None)
        .unwrap();
    repos.weekend_status_repo().set_status(aug(15), true).unwrap();

    let report = run_august(&repos, true).await;
    assert_month_invariants(&report);
    for a in &report.result.assignments {
        assert!(
            !(a.contains(c) && a.contains(d)),
            "{} 同时排了互斥人员",
            a.date
        );
    }
}

#[tokio::test]
async fn test_fully_blocked_day_continues() {
    println!("\n=== 测试：全员不可用的日期 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();
    for id in &ids {
        repos.constraint_repo().insert_one_off(*id, aug(13), None).unwrap();
    }

    let report = run_august(&repos, true).await;
    assert_month_invariants(&report);
    let index = by_date(&report.result.assignments);
    assert_eq!(index[&aug(13)].guide_count(), 0, "8/13 应无人");

    let day_warnings: Vec<_> = report
        .result
        .warnings
        .iter()
        .filter(|w| w.date == aug(13))
        .collect();
    assert_eq!(day_warnings.len(), 1);
    assert_eq!(day_warnings[0].kind, WarningKind::NoAssignment);
    assert!(!day_warnings[0].message.is_empty());

    // 后续日期继续排班
    assert_eq!(index[&aug(14)].guide_count(), 2);
    assert_eq!(report.result.summary.shortfall_days, 1);
}

#[tokio::test]
async fn test_dry_run_is_deterministic_with_seed() {
    println!("\n=== 测试：固定种子 dry_run 可复现 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    insert_guides(&repos, 7).unwrap();
    repos.weekend_status_repo().set_status(aug(22), true).unwrap();

    let first = run_august(&repos, true).await;
    let second = run_august(&repos, true).await;
    assert_eq!(first.result.assignments, second.result.assignments);
    assert_eq!(first.result.tie_break_seed, Some(7));
    assert_eq!(first.persisted_rows, 0);
    assert!(
        repos.schedule_repo().find_month(2025, 8).unwrap().is_empty(),
        "dry_run 不应写库"
    );
}

#[tokio::test]
async fn test_locked_rows_preserved() {
    println!("\n=== 测试：锁定记录原样保留 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();

    let day = Day { date: aug(5), day_type: DayType::Regular };
    let mut locked = Assignment::from_slots(&day, &[(ids[0], ShiftRole::Regular), (ids[1], ShiftRole::Overlap)]);
    locked.is_manual = true;
    locked.is_locked = true;
    repos.schedule_repo().upsert(&locked).unwrap();

    // 未锁定的旧记录会被重排
    let loose_day = Day { date: aug(20), day_type: DayType::Regular };
    let mut loose = Assignment::from_slots(&loose_day, &[(ids[0], ShiftRole::Regular)]);
    loose.is_manual = true;
    repos.schedule_repo().upsert(&loose).unwrap();

    let report = run_august(&repos, false).await;
    assert_month_invariants(&report);

    let stored = repos.schedule_repo().find_by_date(aug(5)).unwrap().unwrap();
    assert_eq!(stored, locked, "锁定记录应保持不变");

    let index = by_date(&report.result.assignments);
    for neighbour in [aug(4), aug(6)] {
        assert!(!index[&neighbour].contains(ids[0]));
        assert!(!index[&neighbour].contains(ids[1]));
    }
    assert_eq!(index[&aug(20)].guide_count(), 2, "未锁定记录应被重排");
    assert!(!index[&aug(20)].is_manual);
}

#[tokio::test]
async fn test_locked_rows_regenerated_without_preserve() {
    println!("\n=== 测试：preserve_manual=false 时锁定记录重排 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();

    let day = Day { date: aug(5), day_type: DayType::Regular };
    let mut locked = Assignment::from_slots(&day, &[(ids[0], ShiftRole::Regular)]);
    locked.is_manual = true;
    locked.is_locked = true;
    repos.schedule_repo().upsert(&locked).unwrap();

    let mut request = ScheduleRunRequest::new(2025, 8);
    request.preserve_manual = Some(false);
    let report = orchestrator(&repos, MockSchedulingConfig::with_seed(7))
        .run_month(request)
        .await
        .unwrap();

    assert!(!report.config.preserve_manual);
    let stored = repos.schedule_repo().find_by_date(aug(5)).unwrap().unwrap();
    assert!(!stored.is_locked);
    assert_eq!(stored.guide_count(), 2);
}

#[tokio::test]
async fn test_empty_roster_fails_before_any_day() {
    println!("\n=== 测试：无可排人员 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();

    let err = orchestrator(&repos, MockSchedulingConfig::with_seed(1))
        .run_month(ScheduleRunRequest::new(2025, 8))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::EmptyRoster { year: 2025, month: 8 }));
    assert!(repos.schedule_repo().find_month(2025, 8).unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_month() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    insert_guides(&repos, 4).unwrap();

    let err = orchestrator(&repos, MockSchedulingConfig::with_seed(1))
        .run_month(ScheduleRunRequest::new(2025, 13))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidMonth { .. }));
}

#[tokio::test]
async fn test_history_blocks_first_day() {
    println!("\n=== 测试：上月末排班影响月初 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 6).unwrap();

    // 2025-07-31 周四
    let july_31 = chrono::NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();
    let day = Day { date: july_31, day_type: DayType::Regular };
    let prev = Assignment::from_slots(&day, &[(ids[0], ShiftRole::Regular), (ids[1], ShiftRole::Overlap)]);
    repos.schedule_repo().upsert(&prev).unwrap();

    let report = run_august(&repos, false).await;
    let first = &report.result.assignments[0];
    assert_eq!(first.date, aug(1));
    assert!(!first.contains(ids[0]) && !first.contains(ids[1]), "前一天上班者不应排在月初");

    // 上月记录不受整月替换影响
    assert_eq!(repos.schedule_repo().find_by_date(july_31).unwrap(), Some(prev));
}

#[tokio::test]
async fn test_no_conan_and_no_weekends_rules() {
    println!("\n=== 测试：no_conan / no_weekends 规则 ===");
    let (_temp_file, db_path) = create_test_db().unwrap();
    let (_conn, repos) = create_test_repos(&db_path).unwrap();
    let ids = insert_guides(&repos, 7).unwrap();
    repos
        .rule_repo()
        .insert(RuleKind::NoConan { guide_id: ids[0] }, true, Some("不值守"))
        .unwrap();
    repos
        .rule_repo()
        .insert(RuleKind::NoWeekends { guide_id: ids[1] }, true, None)
        .unwrap();
    for friday in [1, 8, 15, 22, 29] {
        repos.weekend_status_repo().set_status(aug(friday), true).unwrap();
    }

    let report = run_august(&repos, true).await;
    assert_month_invariants(&report);
    for a in &report.result.assignments {
        if a.day_type.is_weekend() {
            assert!(!a.contains(ids[1]), "no_weekends 人员出现在周末 {}", a.date);
        }
        for (id, role) in a.slots() {
            if role == Some(ShiftRole::Conan) {
                assert_ne!(id, ids[0], "no_conan 人员担任了 conan {}", a.date);
            }
        }
    }
}
