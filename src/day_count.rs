use rand::Rng;
use rand_distr::{Distribution, Poisson};
use tracing::debug;

use crate::config::DayCountModel;
use crate::error::{Result, SimError};

/// Maximum allowed |Σp − 1| for a drink PMF.
pub const PMF_TOLERANCE: f64 = 1e-9;

/// Drink-count model bound to its cap and two-point high value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayCounts {
    pub model: DayCountModel,
    pub cap: u32,
    pub two_point_high: u32,
}

impl DayCounts {
    pub fn new(model: DayCountModel, cap: u32, two_point_high: u32) -> Self {
        DayCounts { model, cap, two_point_high }
    }

    fn high(&self) -> u32 {
        self.two_point_high.min(self.cap)
    }

    /// Probability of the high branch of the two-point model.
    pub fn two_point_p_high(&self, mean: f64) -> f64 {
        let hi = self.high();
        if hi == 0 {
            return 0.0;
        }
        (mean / hi as f64).clamp(0.0, 1.0)
    }

    /// Draw today's drink count for a day whose mean is `mean`.
    pub fn sample(&self, mean: f64, rng: &mut impl Rng) -> Result<u32> {
        if !mean.is_finite() {
            return Err(SimError::NonFinite("drink count mean"));
        }
        if mean <= 0.0 {
            return Ok(0);
        }
        let drinks = match self.model {
            DayCountModel::Constant => round_clamped(mean, self.cap),
            DayCountModel::TwoPoint => {
                let hi = self.high();
                if hi == 0 {
                    0
                } else if rng.random_bool(self.two_point_p_high(mean)) {
                    hi
                } else {
                    0
                }
            }
            DayCountModel::Poisson => {
                let dist = Poisson::new(mean)
                    .map_err(|e| SimError::InvalidConfig(format!("Poisson({mean}): {e}")))?;
                let k: f64 = dist.sample(rng);
                (k as u64).min(self.cap as u64) as u32
            }
        };
        Ok(drinks)
    }

    /// Exact PMF over 0..=cap for a day whose mean is `mean`, validated.
    pub fn pmf(&self, mean: f64) -> Result<DrinkPmf> {
        if !mean.is_finite() {
            return Err(SimError::NonFinite("drink PMF mean"));
        }
        let cap = self.cap as usize;
        let mut probs = vec![0.0; cap + 1];

        if mean <= 0.0 {
            probs[0] = 1.0;
            return DrinkPmf::new(probs);
        }

        match self.model {
            DayCountModel::Constant => {
                probs[round_clamped(mean, self.cap) as usize] = 1.0;
            }
            DayCountModel::TwoPoint => {
                let hi = self.high() as usize;
                if hi == 0 {
                    probs[0] = 1.0;
                } else {
                    let p_hi = self.two_point_p_high(mean);
                    probs[0] = 1.0 - p_hi;
                    probs[hi] = p_hi;
                }
            }
            DayCountModel::Poisson => {
                let mut p = (-mean).exp();
                probs[0] = p;
                for d in 1..cap {
                    p = p * mean / d as f64;
                    probs[d] = p;
                }
                let partial: f64 = probs[..cap].iter().sum();
                probs[cap] = (1.0 - partial).max(0.0);
            }
        }

        debug!(model = %self.model, mean, cap, "built drink PMF");
        DrinkPmf::new(probs)
    }
}

fn round_clamped(mean: f64, cap: u32) -> u32 {
    // f64::round is half-away-from-zero; mean > 0 here.
    (mean.round() as u64).min(cap as u64) as u32
}

/// A validated probability mass function over drink counts 0..=cap.
#[derive(Debug, Clone, PartialEq)]
pub struct DrinkPmf {
    probs: Vec<f64>,
}

impl DrinkPmf {
    /// Validate and wrap. Entries must be finite, non-negative and sum to 1
    /// within `PMF_TOLERANCE`.
    pub fn new(probs: Vec<f64>) -> Result<Self> {
        if probs.is_empty() {
            return Err(SimError::InvalidPmf("empty".into()));
        }
        if let Some(d) = probs.iter().position(|p| !p.is_finite()) {
            return Err(SimError::InvalidPmf(format!("non-finite mass at {d} drinks")));
        }
        if let Some(d) = probs.iter().position(|p| *p < 0.0) {
            return Err(SimError::InvalidPmf(format!("negative mass at {d} drinks")));
        }
        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > PMF_TOLERANCE {
            return Err(SimError::InvalidPmf(format!("sum is {total}, expected 1")));
        }
        Ok(DrinkPmf { probs })
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub fn cap(&self) -> u32 {
        (self.probs.len() - 1) as u32
    }

    /// P(drinks == d); zero beyond the cap.
    pub fn p(&self, drinks: u32) -> f64 {
        self.probs.get(drinks as usize).copied().unwrap_or(0.0)
    }

    /// P(drinks ≥ threshold).
    pub fn p_at_least(&self, threshold: u32) -> f64 {
        self.probs.iter().skip(threshold as usize).sum()
    }

    pub fn p_drinking_day(&self) -> f64 {
        1.0 - self.probs[0]
    }

    pub fn mean(&self) -> f64 {
        self.probs.iter().enumerate().map(|(d, p)| d as f64 * p).sum()
    }

    /// E[f(D)]. Zero-mass counts are skipped so `f` is never evaluated where
    /// it cannot contribute; a non-finite `f` value anywhere else is an error.
    pub fn expect(&self, what: &'static str, f: impl Fn(u32) -> f64) -> Result<f64> {
        let mut total = 0.0;
        for (d, &p) in self.probs.iter().enumerate() {
            if p == 0.0 {
                continue;
            }
            let v = f(d as u32);
            if !v.is_finite() {
                return Err(SimError::NonFinite(what));
            }
            total += p * v;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn counts(model: DayCountModel) -> DayCounts {
        DayCounts::new(model, 12, 6)
    }

    const MODELS: [DayCountModel; 3] =
        [DayCountModel::Constant, DayCountModel::TwoPoint, DayCountModel::Poisson];

    #[test]
    fn non_positive_mean_puts_all_mass_on_zero() {
        for model in MODELS {
            for mean in [0.0, -2.5] {
                let pmf = counts(model).pmf(mean).unwrap();
                assert_eq!(pmf.p(0), 1.0, "{model} mean={mean}");
                assert_eq!(counts(model).sample(mean, &mut rng()).unwrap(), 0);
            }
        }
    }

    #[test]
    fn constant_rounds_half_away_from_zero_and_clamps() {
        let c = counts(DayCountModel::Constant);
        assert_eq!(c.sample(1.5, &mut rng()).unwrap(), 2);
        assert_eq!(c.sample(1.49, &mut rng()).unwrap(), 1);
        assert_eq!(c.sample(40.0, &mut rng()).unwrap(), 12);
        assert_eq!(c.pmf(2.5).unwrap().p(3), 1.0);
    }

    #[test]
    fn two_point_half_mass_at_high_for_half_mean() {
        let pmf = counts(DayCountModel::TwoPoint).pmf(3.0).unwrap();
        assert_eq!(pmf.p(6), 0.5);
        assert_eq!(pmf.p(0), 0.5);
    }

    #[test]
    fn two_point_clamps_when_mean_exceeds_high() {
        for mean in [6.0, 9.0] {
            let pmf = counts(DayCountModel::TwoPoint).pmf(mean).unwrap();
            assert_eq!(pmf.p(6), 1.0);
        }
    }

    #[test]
    fn two_point_zero_high_is_always_zero() {
        let c = DayCounts::new(DayCountModel::TwoPoint, 12, 0);
        assert_eq!(c.pmf(3.0).unwrap().p(0), 1.0);
        assert_eq!(c.sample(3.0, &mut rng()).unwrap(), 0);
    }

    #[test]
    fn two_point_high_clamped_to_cap() {
        let c = DayCounts::new(DayCountModel::TwoPoint, 4, 6);
        let pmf = c.pmf(2.0).unwrap();
        assert_eq!(pmf.p(4), 0.5);
    }

    #[test]
    fn two_point_sampling_frequency_matches_pmf() {
        let c = counts(DayCountModel::TwoPoint);
        let mut rng = rng();
        let n = 20_000;
        let highs = (0..n).filter(|_| c.sample(3.0, &mut rng).unwrap() == 6).count();
        let share = highs as f64 / n as f64;
        assert!((0.48..=0.52).contains(&share), "high share {share:.3}");
    }

    #[test]
    fn poisson_tail_absorbed_into_cap() {
        let pmf = counts(DayCountModel::Poisson).pmf(10.0).unwrap();
        let below: f64 = pmf.probs()[..12].iter().sum();
        assert!((pmf.p(12) - (1.0 - below)).abs() < 1e-15);
        assert!(pmf.p(12) > 0.3, "tail mass {}", pmf.p(12));
    }

    #[test]
    fn poisson_sample_mean_matches_lambda() {
        let c = counts(DayCountModel::Poisson);
        let mut rng = rng();
        let n = 20_000;
        let mean = (0..n).map(|_| c.sample(1.5, &mut rng).unwrap() as f64).sum::<f64>() / n as f64;
        assert!((1.4..=1.6).contains(&mean), "sample mean {mean:.3}");
    }

    #[test]
    fn poisson_samples_never_exceed_cap() {
        let c = DayCounts::new(DayCountModel::Poisson, 3, 6);
        let mut rng = rng();
        assert!((0..2_000).all(|_| c.sample(5.0, &mut rng).unwrap() <= 3));
    }

    #[test]
    fn pmf_validation_rejects_bad_mass() {
        assert!(matches!(DrinkPmf::new(vec![0.5, 0.4]), Err(SimError::InvalidPmf(_))));
        assert!(matches!(DrinkPmf::new(vec![1.1, -0.1]), Err(SimError::InvalidPmf(_))));
        assert!(matches!(DrinkPmf::new(vec![f64::NAN, 1.0]), Err(SimError::InvalidPmf(_))));
        assert!(matches!(DrinkPmf::new(vec![]), Err(SimError::InvalidPmf(_))));
    }

    #[test]
    fn expect_reports_non_finite() {
        let pmf = counts(DayCountModel::Poisson).pmf(2.0).unwrap();
        let err = pmf.expect("test channel", |d| if d == 3 { f64::INFINITY } else { 1.0 });
        assert!(matches!(err, Err(SimError::NonFinite("test channel"))));
    }

    #[test]
    fn expect_skips_zero_mass() {
        let pmf = counts(DayCountModel::Constant).pmf(2.0).unwrap();
        let v = pmf.expect("test", |d| if d == 2 { 7.0 } else { f64::NAN }).unwrap();
        assert_eq!(v, 7.0);
    }

    #[test]
    fn threshold_probabilities() {
        let pmf = DrinkPmf::new(vec![0.5, 0.2, 0.2, 0.1]).unwrap();
        assert!((pmf.p_at_least(2) - 0.3).abs() < 1e-12);
        assert!((pmf.p_drinking_day() - 0.5).abs() < 1e-12);
        assert_eq!(pmf.p_at_least(9), 0.0);
        assert!((pmf.mean() - 0.9).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn pmf_always_normalized(mean in 0.0f64..40.0, cap in 1u32..30, hi in 0u32..20, m in 0usize..3) {
            let pmf = DayCounts::new(MODELS[m], cap, hi).pmf(mean).unwrap();
            let total: f64 = pmf.probs().iter().sum();
            prop_assert!((total - 1.0).abs() <= PMF_TOLERANCE);
            prop_assert!(pmf.probs().iter().all(|p| p.is_finite() && *p >= 0.0));
            prop_assert_eq!(pmf.cap(), cap);
        }
    }
}
