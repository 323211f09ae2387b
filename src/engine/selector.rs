// ==========================================
// 宿舍轮值排班系统 - 人员选择器
// ==========================================
// 规则:
// 1) 按 (score, 轮转次序, id) 升序逐个取人
// 2) 与已选/已固定人员存在生效 no_together 的候选被结构性排除
// 3) 取满 count 或候选耗尽即停止（不足由上层记告警）
// ==========================================

use crate::domain::rule::RuleBook;
use std::cmp::Ordering;
use tracing::{debug, instrument};

// ==========================================
// Candidate - 可用候选
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub guide_id: i64,
    pub score: f64,
    /// 轮转次序（并列时越小越优先）
    pub rank: usize,
}

impl Candidate {
    fn order(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.rank.cmp(&other.rank))
            .then(self.guide_id.cmp(&other.guide_id))
    }
}

// ==========================================
// GuideSelector - 选择器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct GuideSelector;

impl GuideSelector {
    pub fn new() -> Self {
        Self
    }

    /// 选人
    ///
    /// # 参数
    /// - candidates: 已过滤、已评分的候选
    /// - count: 需要人数
    /// - fixed: 当日已确定的人员（如封闭周六的 conan），不会被再次选中
    /// - rules: 生效规则
    ///
    /// # 返回
    /// 选中的候选（按选中顺序）
    #[instrument(skip(self, candidates, rules), fields(candidates_count = candidates.len()))]
    pub fn select(
        &self,
        mut candidates: Vec<Candidate>,
        count: usize,
        fixed: &[i64],
        rules: &RuleBook,
    ) -> Vec<Candidate> {
        candidates.sort_by(|a, b| a.order(b));
        candidates.retain(|c| {
            !fixed.contains(&c.guide_id)
                && !fixed.iter().any(|&f| rules.forbids_pair(f, c.guide_id))
        });

        let mut picked: Vec<Candidate> = Vec::with_capacity(count);
        for candidate in candidates {
            if picked.len() >= count {
                break;
            }
            if picked
                .iter()
                .any(|p| rules.forbids_pair(p.guide_id, candidate.guide_id))
            {
                debug!(guide_id = candidate.guide_id, "no_together 排除");
                continue;
            }
            picked.push(candidate);
        }

        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{CoordinatorRule, RuleKind};

    fn c(guide_id: i64, score: f64, rank: usize) -> Candidate {
        Candidate {
            guide_id,
            score,
            rank,
        }
    }

    fn pair_rule(a: i64, b: i64) -> RuleBook {
        RuleBook::from_rules(&[CoordinatorRule {
            id: 1,
            kind: RuleKind::NoTogether {
                guide_a: a,
                guide_b: b,
            },
            is_active: true,
            description: None,
        }])
    }

    #[test]
    fn test_lowest_score_first() {
        let picked = GuideSelector::new().select(
            vec![c(1, 5.0, 0), c(2, 1.0, 1), c(3, 3.0, 2)],
            2,
            &[],
            &RuleBook::default(),
        );
        let ids: Vec<i64> = picked.iter().map(|p| p.guide_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_equal_scores_follow_rotation() {
        let picked = GuideSelector::new().select(
            vec![c(1, 2.0, 2), c(2, 2.0, 0), c(3, 2.0, 1)],
            1,
            &[],
            &RuleBook::default(),
        );
        assert_eq!(picked[0].guide_id, 2);
    }

    #[test]
    fn test_no_together_skips_partner() {
        let picked = GuideSelector::new().select(
            vec![c(1, 1.0, 0), c(2, 2.0, 1), c(3, 3.0, 2)],
            2,
            &[],
            &pair_rule(1, 2),
        );
        let ids: Vec<i64> = picked.iter().map(|p| p.guide_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_fixed_guide_excludes_partner() {
        let picked = GuideSelector::new().select(
            vec![c(1, 1.0, 0), c(2, 2.0, 1), c(3, 3.0, 2)],
            1,
            &[2],
            &pair_rule(1, 2),
        );
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].guide_id, 3);
    }

    #[test]
    fn test_partial_fill_on_exhaustion() {
        let picked = GuideSelector::new().select(vec![c(1, 1.0, 0), c(2, 2.0, 1)], 2, &[], &pair_rule(1, 2));
        assert_eq!(picked.len(), 1);
        assert!(GuideSelector::new()
            .select(Vec::new(), 2, &[], &RuleBook::default())
            .is_empty());
    }
}
