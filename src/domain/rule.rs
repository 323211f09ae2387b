// ==========================================
// 宿舍轮值排班系统 - 协调员规则领域模型
// ==========================================
// 规则类型为封闭的带标签变体，未知类型在仓储层被丢弃
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// RuleKind - 规则类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// 不参与自动排班（只能人工排）
    NoAutoScheduling { guide_id: i64 },
    /// 两人不得同日
    NoTogether { guide_a: i64, guide_b: i64 },
    /// 不得担任 conan
    NoConan { guide_id: i64 },
    /// 不排周五/周六
    NoWeekends { guide_id: i64 },
}

impl RuleKind {
    /// 数据库 rule_type 字段值
    pub fn type_tag(&self) -> &'static str {
        match self {
            RuleKind::NoAutoScheduling { .. } => "no_auto_scheduling",
            RuleKind::NoTogether { .. } => "no_together",
            RuleKind::NoConan { .. } => "no_conan",
            RuleKind::NoWeekends { .. } => "no_weekends",
        }
    }

    /// 从数据库字段构造
    ///
    /// # 返回
    /// - None: 未知类型，或 no_together 缺少第二人
    pub fn from_row(rule_type: &str, guide_id: i64, guide2_id: Option<i64>) -> Option<Self> {
        match rule_type.trim() {
            "no_auto_scheduling" => Some(RuleKind::NoAutoScheduling { guide_id }),
            "no_together" => guide2_id.map(|guide_b| RuleKind::NoTogether {
                guide_a: guide_id,
                guide_b,
            }),
            "no_conan" => Some(RuleKind::NoConan { guide_id }),
            "no_weekends" => Some(RuleKind::NoWeekends { guide_id }),
            _ => None,
        }
    }

    /// 规则的主要对象
    pub fn primary_guide(&self) -> i64 {
        match *self {
            RuleKind::NoAutoScheduling { guide_id }
            | RuleKind::NoConan { guide_id }
            | RuleKind::NoWeekends { guide_id } => guide_id,
            RuleKind::NoTogether { guide_a, .. } => guide_a,
        }
    }

    /// 第二对象（仅 no_together）
    pub fn secondary_guide(&self) -> Option<i64> {
        match *self {
            RuleKind::NoTogether { guide_b, .. } => Some(guide_b),
            _ => None,
        }
    }
}

// ==========================================
// CoordinatorRule - 协调员规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorRule {
    pub id: i64,
    pub kind: RuleKind,
    pub is_active: bool,
    pub description: Option<String>,
}

// ==========================================
// RuleBook - 已生效规则的索引
// ==========================================
// 只收录 is_active 的规则；no_together 以无序对存储
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    no_auto: HashSet<i64>,
    no_conan: HashSet<i64>,
    no_weekends: HashSet<i64>,
    pairs: HashSet<(i64, i64)>,
}

fn ordered_pair(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl RuleBook {
    pub fn from_rules(rules: &[CoordinatorRule]) -> Self {
        let mut book = RuleBook::default();
        for rule in rules.iter().filter(|r| r.is_active) {
            match rule.kind {
                RuleKind::NoAutoScheduling { guide_id } => {
                    book.no_auto.insert(guide_id);
                }
                RuleKind::NoConan { guide_id } => {
                    book.no_conan.insert(guide_id);
                }
                RuleKind::NoWeekends { guide_id } => {
                    book.no_weekends.insert(guide_id);
                }
                RuleKind::NoTogether { guide_a, guide_b } => {
                    if guide_a != guide_b {
                        book.pairs.insert(ordered_pair(guide_a, guide_b));
                    }
                }
            }
        }
        book
    }

    pub fn blocks_auto_scheduling(&self, guide_id: i64) -> bool {
        self.no_auto.contains(&guide_id)
    }

    pub fn forbids_conan(&self, guide_id: i64) -> bool {
        self.no_conan.contains(&guide_id)
    }

    pub fn forbids_weekends(&self, guide_id: i64) -> bool {
        self.no_weekends.contains(&guide_id)
    }

    /// 两人是否被 no_together 禁止同日
    pub fn forbids_pair(&self, a: i64, b: i64) -> bool {
        self.pairs.contains(&ordered_pair(a, b))
    }
}
