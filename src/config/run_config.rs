// ==========================================
// 宿舍轮值排班系统 - 单次运行配置
// ==========================================
// 由 SchedulingConfigReader 从 config_kv 组装，
// 再叠加单次请求的覆写（dry_run / preserve_manual / seed）
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ScoreWeights - 评分权重
// ==========================================
// 分数越低越优先
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub total: f64,             // 总班次（按工作比例归一）
    pub weekend: f64,           // 周末班次
    pub conan: f64,             // conan 班次
    pub recency: f64,           // 3 日内刚上过班的衰减惩罚
    pub conan_cap_penalty: f64, // 超过 conan 上限时的惩罚
    pub jitter: f64,            // 并列打散幅度（0 = 关闭）
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            total: 10.0,
            weekend: 4.0,
            conan: 6.0,
            recency: 3.0,
            conan_cap_penalty: 1000.0,
            jitter: 0.01,
        }
    }
}

// ==========================================
// ScheduleRunConfig - 单次运行配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRunConfig {
    pub preserve_manual: bool,
    pub max_conan_per_guide: u32,
    pub max_consecutive_days: u32,
    pub history_lookback_days: u32,
    pub weights: ScoreWeights,
    pub tie_break_seed: Option<u64>,
    pub dry_run: bool,
}

impl Default for ScheduleRunConfig {
    fn default() -> Self {
        Self {
            preserve_manual: true,
            max_conan_per_guide: 2,
            max_consecutive_days: 2,
            history_lookback_days: 7,
            weights: ScoreWeights::default(),
            tie_break_seed: None,
            dry_run: false,
        }
    }
}

impl ScheduleRunConfig {
    /// 连续上班天数上限（0 视为 1）
    pub fn effective_max_consecutive_days(&self) -> u32 {
        self.max_consecutive_days.max(1)
    }
}
