// ==========================================
// 宿舍轮值排班系统 - 领域类型定义
// ==========================================
// 日类型、班次角色、规则类型、告警类型均为封闭枚举，
// 由编译器保证 match 穷尽，数据库中以 snake_case 字符串存储
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 日类型 (Day Type)
// ==========================================
// 周五/周六成对构成一个周末单元，开放/封闭由周五的标记决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Regular,        // 平日（周日~周四）
    OpenFriday,     // 开放周五
    OpenSaturday,   // 开放周六
    ClosedFriday,   // 封闭周五（值守 conan 开始）
    ClosedSaturday, // 封闭周六（conan 延续 + motzash）
}

impl DayType {
    /// 该日类型要求的人数
    pub fn required_guides(&self) -> usize {
        match self {
            DayType::ClosedFriday => 1,
            DayType::Regular
            | DayType::OpenFriday
            | DayType::OpenSaturday
            | DayType::ClosedSaturday => 2,
        }
    }

    /// 该日类型的标准角色组合（按 guide1, guide2 顺序）
    pub fn required_roles(&self) -> &'static [ShiftRole] {
        match self {
            DayType::ClosedFriday => &[ShiftRole::Conan],
            DayType::ClosedSaturday => &[ShiftRole::Conan, ShiftRole::Motzash],
            DayType::Regular | DayType::OpenFriday | DayType::OpenSaturday => {
                &[ShiftRole::Regular, ShiftRole::Overlap]
            }
        }
    }

    /// 是否属于周末（周五/周六）
    pub fn is_weekend(&self) -> bool {
        !matches!(self, DayType::Regular)
    }

    /// 是否属于封闭周末
    pub fn is_closed(&self) -> bool {
        matches!(self, DayType::ClosedFriday | DayType::ClosedSaturday)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Regular => "regular",
            DayType::OpenFriday => "open_friday",
            DayType::OpenSaturday => "open_saturday",
            DayType::ClosedFriday => "closed_friday",
            DayType::ClosedSaturday => "closed_saturday",
        }
    }

    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "regular" => Some(DayType::Regular),
            "open_friday" => Some(DayType::OpenFriday),
            "open_saturday" => Some(DayType::OpenSaturday),
            "closed_friday" => Some(DayType::ClosedFriday),
            "closed_saturday" => Some(DayType::ClosedSaturday),
            _ => None,
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 班次角色 (Shift Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftRole {
    Regular, // 常规
    Overlap, // 交接/重叠
    Conan,   // 封闭周末值守
    Motzash, // 安息日结束后接班
}

impl ShiftRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftRole::Regular => "regular",
            ShiftRole::Overlap => "overlap",
            ShiftRole::Conan => "conan",
            ShiftRole::Motzash => "motzash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "regular" => Some(ShiftRole::Regular),
            "overlap" => Some(ShiftRole::Overlap),
            "conan" => Some(ShiftRole::Conan),
            "motzash" => Some(ShiftRole::Motzash),
            _ => None,
        }
    }
}

impl fmt::Display for ShiftRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 人员角色 (Staff Role)
// ==========================================
// 只有 Guide 参与排班
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Guide,       // 指导员
    Coordinator, // 协调员
    Other,       // 其他
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Guide => "guide",
            StaffRole::Coordinator => "coordinator",
            StaffRole::Other => "other",
        }
    }

    /// 从字符串解析，未知值归为 Other
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "guide" => StaffRole::Guide,
            "coordinator" => StaffRole::Coordinator,
            _ => StaffRole::Other,
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 休假状态 (Vacation Status)
// ==========================================
// 只有 Approved 构成硬排除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VacationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VacationStatus::Pending => "pending",
            VacationStatus::Approved => "approved",
            VacationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approved" => VacationStatus::Approved,
            "rejected" => VacationStatus::Rejected,
            _ => VacationStatus::Pending,
        }
    }
}

impl fmt::Display for VacationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 排班告警类型 (Warning Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    NoAssignment,       // 当日无人可排
    InsufficientGuides, // 人数不足
    WeekendLinkMissing, // 封闭周六找不到周五 conan
    ConanFallback,      // 周五 conan 由主流程兜底选出
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::NoAssignment => "no_assignment",
            WarningKind::InsufficientGuides => "insufficient_guides",
            WarningKind::WeekendLinkMissing => "weekend_link_missing",
            WarningKind::ConanFallback => "conan_fallback",
        }
    }

    /// 是否表示人数缺口
    pub fn is_shortfall(&self) -> bool {
        matches!(self, WarningKind::NoAssignment | WarningKind::InsufficientGuides)
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
