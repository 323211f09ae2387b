// ==========================================
// 宿舍轮值排班系统 - 指导员领域模型
// ==========================================
// 红线: 引擎只读，人员由管理员维护
// ==========================================

use crate::domain::types::StaffRole;
use serde::{Deserialize, Serialize};

/// 最小工作比例，避免比例为 0 时评分除零
pub const MIN_WORK_FRACTION: f64 = 0.1;

// ==========================================
// Guide - 指导员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub id: i64,           // 人员ID
    pub name: String,      // 显示名
    pub role: StaffRole,   // 人员角色
    pub is_active: bool,   // 是否在岗
    pub work_percent: f64, // 工作比例（百分比，100 = 全职）
}

impl Guide {
    /// 是否参与自动排班（在岗且角色为 guide）
    pub fn is_schedulable(&self) -> bool {
        self.is_active && self.role == StaffRole::Guide
    }

    /// 工作比例（0.1 ~ 1.0+）
    ///
    /// # 规则
    /// - work_percent 非有限值或 <= 0 → 按全职处理
    /// - 其余 → work_percent / 100，下限 0.1
    pub fn work_fraction(&self) -> f64 {
        if !self.work_percent.is_finite() || self.work_percent <= 0.0 {
            return 1.0;
        }
        (self.work_percent / 100.0).max(MIN_WORK_FRACTION)
    }
}
