// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证排班配置读取、默认值回退与快照恢复
// ==========================================


use guide_roster_aps::config::{config_keys, ConfigManager, SchedulingConfigReader, ScheduleRunConfig};
use test_helpers::create_test_db;

#[tokio::test]
async fn test_defaults_when_unset() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let config = config_manager.load_run_config().await.unwrap();
    assert_eq!(config, ScheduleRunConfig::default(), "未配置时应使用默认值");
    assert!(config.preserve_manual);
    assert_eq!(config.max_conan_per_guide, 2);
    assert_eq!(config.tie_break_seed, None);
}

#[tokio::test]
async fn test_stored_values_are_read() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager.set_global_config_value(config_keys::PRESERVE_MANUAL, "false").unwrap();
    config_manager.set_global_config_value(config_keys::MAX_CONAN_PER_GUIDE, "3").unwrap();
    config_manager.set_global_config_value(config_keys::HISTORY_LOOKBACK_DAYS, "14").unwrap();
    config_manager.set_global_config_value(config_keys::SCORE_WEIGHT_WEEKEND, "5.5").unwrap();
    config_manager.set_global_config_value(config_keys::TIE_BREAK_SEED, "12345").unwrap();

    let config = config_manager.load_run_config().await.unwrap();
    assert!(!config.preserve_manual);
    assert_eq!(config.max_conan_per_guide, 3);
    assert_eq!(config.history_lookback_days, 14);
    assert!((config.weights.weekend - 5.5).abs() < 1e-9);
    assert_eq!(config.tie_break_seed, Some(12345));

    // 覆盖写入
    config_manager.set_global_config_value(config_keys::MAX_CONAN_PER_GUIDE, "1").unwrap();
    assert_eq!(config_manager.get_max_conan_per_guide().await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_values_fall_back() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager.set_global_config_value(config_keys::PRESERVE_MANUAL, "maybe").unwrap();
    config_manager.set_global_config_value(config_keys::MAX_CONAN_PER_GUIDE, "many").unwrap();
    config_manager.set_global_config_value(config_keys::MAX_CONSECUTIVE_DAYS, "0").unwrap();
    config_manager.set_global_config_value(config_keys::SCORE_WEIGHT_TOTAL, "-1").unwrap();
    config_manager.set_global_config_value(config_keys::TIE_BREAK_SEED, "abc").unwrap();

    let config = config_manager.load_run_config().await.unwrap();
    assert!(config.preserve_manual, "格式错误回退默认 true");
    assert_eq!(config.max_conan_per_guide, 2, "格式错误回退默认 2");
    assert_eq!(config.max_consecutive_days, 1, "0 按 1 处理");
    assert!((config.weights.total - 10.0).abs() < 1e-9, "负权重回退默认");
    assert_eq!(config.tie_break_seed, None, "种子格式错误时随机生成");
}

#[tokio::test]
async fn test_snapshot_and_restore() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config_manager.set_global_config_value(config_keys::MAX_CONSECUTIVE_DAYS, "3").unwrap();
    config_manager.set_global_config_value(config_keys::TIE_BREAK_JITTER, "0").unwrap();
    let snapshot = config_manager.get_config_snapshot().unwrap();
    assert!(snapshot.contains(config_keys::MAX_CONSECUTIVE_DAYS));

    config_manager.set_global_config_value(config_keys::MAX_CONSECUTIVE_DAYS, "5").unwrap();
    let restored = config_manager.restore_config_from_snapshot(&snapshot).unwrap();
    assert_eq!(restored, 2);

    assert_eq!(config_manager.get_max_consecutive_days().await.unwrap(), 3);
    let weights = config_manager.get_score_weights().await.unwrap();
    assert_eq!(weights.jitter, 0.0);
    assert_eq!(
        config_manager
            .get_global_config_value(config_keys::MAX_CONSECUTIVE_DAYS)
            .unwrap()
            .as_deref(),
        Some("3")
    );
}
