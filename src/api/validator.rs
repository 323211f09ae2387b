// ==========================================
// 宿舍轮值排班系统 - 人工排班校验器
// ==========================================
// 职责: 人工录入/草稿发布前的结构校验
// 校验项: 日类型、人数、角色、重复人员、人员状态、no_conan 规则
// ==========================================

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::api::error::{ApiError, ApiResult, ValidationViolation};
use crate::domain::guide::Guide;
use crate::domain::rule::RuleBook;
use crate::domain::schedule::Assignment;
use crate::domain::types::{DayType, ShiftRole};
use crate::engine::calendar::CalendarClassifier;
use crate::i18n::t_with_args;

// ==========================================
// ValidationContext - 校验上下文
// ==========================================

/// 校验上下文（由调用方一次性读取）
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// 全部人员（含停用），按 id 索引
    pub guides: HashMap<i64, Guide>,
    /// 已生效规则
    pub rules: RuleBook,
    /// 周五日期 → 是否封闭
    pub weekend_flags: HashMap<NaiveDate, bool>,
}

impl ValidationContext {
    pub fn new(guides: Vec<Guide>, rules: RuleBook, weekend_flags: HashMap<NaiveDate, bool>) -> Self {
        Self {
            guides: guides.into_iter().map(|g| (g.id, g)).collect(),
            rules,
            weekend_flags,
        }
    }

    /// 按日历推导的日类型
    pub fn expected_day_type(&self, date: NaiveDate) -> DayType {
        CalendarClassifier::classify(date, &self.weekend_flags)
    }
}

// ==========================================
// ManualAssignmentValidator - 人工排班校验器
// ==========================================

/// 人工排班校验器
///
/// 职责：
/// 1. 日类型必须与日历一致（周末开放/封闭以周五标记为准）
/// 2. 人数与角色必须符合日类型的标准组合
/// 3. 同一天不能重复排同一人
/// 4. 人员必须存在、在岗且角色为 guide
/// 5. no_conan 人员不能担任 conan
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualAssignmentValidator;

impl ManualAssignmentValidator {
    pub fn new() -> Self {
        Self
    }

    /// 校验单日排班
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(ApiError::ManualAssignmentValidationError): 含全部违规明细
    pub fn validate(&self, assignment: &Assignment, ctx: &ValidationContext) -> ApiResult<()> {
        let violations = self.collect_violations(assignment, ctx);
        if violations.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            date = %assignment.date,
            violations_count = violations.len(),
            "人工排班校验未通过"
        );
        Err(ApiError::ManualAssignmentValidationError {
            reason: t_with_args(
                "validation.failed",
                &[
                    ("date", &assignment.date.to_string()),
                    ("count", &violations.len().to_string()),
                ],
            ),
            violations,
        })
    }

    /// 收集全部违规（不短路）
    pub fn collect_violations(
        &self,
        assignment: &Assignment,
        ctx: &ValidationContext,
    ) -> Vec<ValidationViolation> {
        let date = assignment.date.to_string();
        let mut violations = Vec::new();
        let mut push = |violation_type: &str, reason: String, details: serde_json::Value| {
            violations.push(ValidationViolation {
                violation_type: violation_type.to_string(),
                date: date.clone(),
                reason,
                details: Some(details),
            });
        };

        // 1. 日类型
        let expected = ctx.expected_day_type(assignment.date);
        if assignment.day_type != expected {
            push(
                "DAY_TYPE",
                t_with_args(
                    "validation.day_type_mismatch",
                    &[
                        ("date", &date),
                        ("expected", expected.as_str()),
                        ("actual", assignment.day_type.as_str()),
                    ],
                ),
                serde_json::json!({
                    "expected": expected,
                    "actual": assignment.day_type,
                }),
            );
        }

        // 2. 人数
        let required_roles = expected.required_roles();
        let assigned = assignment.guide_count();
        if assigned != required_roles.len() {
            push(
                "GUIDE_COUNT",
                t_with_args(
                    "validation.guide_count",
                    &[
                        ("date", &date),
                        ("required", &required_roles.len().to_string()),
                        ("assigned", &assigned.to_string()),
                    ],
                ),
                serde_json::json!({
                    "required": required_roles.len(),
                    "assigned": assigned,
                }),
            );
        }

        // 3. 角色（按槽位）
        let positional = [
            (assignment.guide1_id, assignment.guide1_role),
            (assignment.guide2_id, assignment.guide2_role),
        ];
        for (slot, (guide_id, role)) in positional.iter().enumerate() {
            let expected_role = required_roles.get(slot).copied();
            let actual_role = if guide_id.is_some() { *role } else { None };
            if guide_id.is_some() && actual_role != expected_role {
                push(
                    "ROLE",
                    t_with_args(
                        "validation.role_mismatch",
                        &[
                            ("date", &date),
                            ("slot", &(slot + 1).to_string()),
                            ("expected", expected_role.map(|r| r.as_str()).unwrap_or("-")),
                            ("actual", actual_role.map(|r| r.as_str()).unwrap_or("-")),
                        ],
                    ),
                    serde_json::json!({
                        "slot": slot + 1,
                        "guide_id": guide_id,
                        "expected": expected_role,
                        "actual": actual_role,
                    }),
                );
            }
        }

        // 4. 重复人员
        if let (Some(a), Some(b)) = (assignment.guide1_id, assignment.guide2_id) {
            if a == b {
                push(
                    "DUPLICATE_GUIDE",
                    t_with_args(
                        "validation.duplicate_guide",
                        &[("date", &date), ("guide", &a.to_string())],
                    ),
                    serde_json::json!({ "guide_id": a }),
                );
            }
        }

        // 5. 人员状态 + no_conan
        for (guide_id, role) in assignment.slots() {
            match ctx.guides.get(&guide_id) {
                None => push(
                    "GUIDE",
                    t_with_args("validation.unknown_guide", &[("guide", &guide_id.to_string())]),
                    serde_json::json!({ "guide_id": guide_id }),
                ),
                Some(guide) if !guide.is_schedulable() => push(
                    "GUIDE",
                    t_with_args(
                        "validation.guide_not_schedulable",
                        &[("guide", &guide.name)],
                    ),
                    serde_json::json!({
                        "guide_id": guide_id,
                        "is_active": guide.is_active,
                        "role": guide.role,
                    }),
                ),
                Some(_) => {}
            }

            if role == Some(ShiftRole::Conan) && ctx.rules.forbids_conan(guide_id) {
                let name = ctx
                    .guides
                    .get(&guide_id)
                    .map(|g| g.name.clone())
                    .unwrap_or_else(|| guide_id.to_string());
                push(
                    "NO_CONAN",
                    t_with_args("validation.no_conan", &[("date", &date), ("guide", &name)]),
                    serde_json::json!({ "guide_id": guide_id }),
                );
            }
        }

        violations
    }
}
