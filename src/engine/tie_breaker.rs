// ==========================================
// 宿舍轮值排班系统 - 并列打散源
// ==========================================
// 评分上的微小随机扰动，由外部注入；固定种子 → 结果可复现
// ==========================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 并列打散源
pub trait TieBreaker {
    /// 下一个扰动值（非负，幅度由实现决定）
    fn jitter(&mut self) -> f64;

    /// 使用的种子（无随机性时为 None）
    fn seed(&self) -> Option<u64>;
}

// ==========================================
// SeededTieBreaker - 可复现的随机扰动
// ==========================================
pub struct SeededTieBreaker {
    rng: StdRng,
    seed: u64,
    amplitude: f64,
}

impl SeededTieBreaker {
    pub fn new(seed: u64, amplitude: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            amplitude: if amplitude.is_finite() { amplitude.max(0.0) } else { 0.0 },
        }
    }

    /// 未配置种子时：生成新种子（由调用方记录到运行报告）
    pub fn from_optional_seed(seed: Option<u64>, amplitude: f64) -> Self {
        Self::new(seed.unwrap_or_else(rand::random::<u64>), amplitude)
    }
}

impl TieBreaker for SeededTieBreaker {
    fn jitter(&mut self) -> f64 {
        if self.amplitude <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(0.0..self.amplitude)
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

// ==========================================
// NoJitter - 关闭扰动（纯确定性）
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl TieBreaker for NoJitter {
    fn jitter(&mut self) -> f64 {
        0.0
    }

    fn seed(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededTieBreaker::new(42, 0.01);
        let mut b = SeededTieBreaker::new(42, 0.01);
        let seq_a: Vec<f64> = (0..16).map(|_| a.jitter()).collect();
        let seq_b: Vec<f64> = (0..16).map(|_| b.jitter()).collect();
        assert_eq!(seq_a, seq_b);
        assert!(seq_a.iter().all(|v| (0.0..0.01).contains(v)));
    }

    #[test]
    fn test_zero_amplitude_disables_jitter() {
        let mut t = SeededTieBreaker::new(7, 0.0);
        assert_eq!(t.jitter(), 0.0);
        assert_eq!(t.seed(), Some(7));
        assert_eq!(NoJitter.jitter(), 0.0);
    }

    #[test]
    fn test_generated_seed_is_reported() {
        let t = SeededTieBreaker::from_optional_seed(None, 0.01);
        assert!(t.seed().is_some());
    }
}
