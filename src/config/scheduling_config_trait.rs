// ==========================================
// 宿舍轮值排班系统 - 排班配置读取 Trait
// ==========================================
// 职责: 定义排班引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::run_config::{ScheduleRunConfig, ScoreWeights};
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// SchedulingConfigReader Trait
// ==========================================
// 用途: 排班编排器所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait SchedulingConfigReader: Send + Sync {
    /// 是否保留锁定的人工排班
    ///
    /// # 默认值
    /// - true
    async fn get_preserve_manual(&self) -> Result<bool, Box<dyn Error>>;

    /// 每人每月 conan 班次软上限（超过后加大惩罚，不硬排除）
    ///
    /// # 默认值
    /// - 2
    async fn get_max_conan_per_guide(&self) -> Result<u32, Box<dyn Error>>;

    /// 连续上班天数上限
    ///
    /// # 默认值
    /// - 2（0 视为 1）
    async fn get_max_consecutive_days(&self) -> Result<u32, Box<dyn Error>>;

    /// 历史回看天数（用于初始化工作量与连续天数）
    ///
    /// # 默认值
    /// - 7
    async fn get_history_lookback_days(&self) -> Result<u32, Box<dyn Error>>;

    /// 评分权重
    async fn get_score_weights(&self) -> Result<ScoreWeights, Box<dyn Error>>;

    /// 并列打散种子
    ///
    /// # 返回
    /// - None: 每次运行重新生成
    async fn get_tie_break_seed(&self) -> Result<Option<u64>, Box<dyn Error>>;

    /// 组装完整运行配置
    async fn load_run_config(&self) -> Result<ScheduleRunConfig, Box<dyn Error>> {
        let preserve_manual = self.get_preserve_manual().await?;
        let max_conan_per_guide = self.get_max_conan_per_guide().await?;
        let max_consecutive_days = self.get_max_consecutive_days().await?;
        let history_lookback_days = self.get_history_lookback_days().await?;
        let weights = self.get_score_weights().await?;
        let tie_break_seed = self.get_tie_break_seed().await?;

        Ok(ScheduleRunConfig {
            preserve_manual,
            max_conan_per_guide,
            max_consecutive_days,
            history_lookback_days,
            weights,
            tie_break_seed,
            dry_run: false,
        })
    }
}
