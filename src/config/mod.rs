// ==========================================
// 宿舍轮值排班系统 - 配置层
// ==========================================
// 职责: 排班配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod run_config;
pub mod scheduling_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use run_config::{ScheduleRunConfig, ScoreWeights};
pub use scheduling_config_trait::SchedulingConfigReader;
