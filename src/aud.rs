use rand::Rng;
use serde::Serialize;

use crate::day_count::DrinkPmf;
use crate::params::NegativeParams;
use crate::types::{Day, Year, discount_factor};

/// Days between AUD evaluations in daily mode.
pub const AUD_WINDOW_DAYS: u32 = Day::DAYS_PER_MONTH;

/// `Never → Active ⇄ Remission`, stepped yearly in expected mode and every
/// `AUD_WINDOW_DAYS` in daily mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudState {
    #[default]
    Never,
    Active,
    Remission,
}

impl AudState {
    /// Scale on the day's mean drinks. PLACEHOLDER calibration.
    pub fn drink_multiplier(self) -> f64 {
        match self {
            AudState::Never => 1.0,
            AudState::Active => 1.35,
            AudState::Remission => 0.90,
        }
    }

    /// Scale on acute event probabilities. PLACEHOLDER calibration.
    pub fn risk_multiplier(self) -> f64 {
        match self {
            AudState::Never => 1.0,
            AudState::Active => 1.25,
            AudState::Remission => 1.08,
        }
    }

    pub fn is_active(self) -> bool {
        self == AudState::Active
    }

    /// One transition driven by a single uniform draw `u` in [0, 1).
    pub fn step(self, u: f64, p: &TransitionProbs) -> AudState {
        match self {
            AudState::Never if u < p.onset => AudState::Active,
            AudState::Active if u < p.remission => AudState::Remission,
            AudState::Remission if u < p.relapse => AudState::Active,
            unchanged => unchanged,
        }
    }
}

/// Onset odds ratio by risk-drinking days per year.
pub fn odds_ratio(risk_days_per_year: f64) -> f64 {
    if risk_days_per_year <= 0.0 {
        return 1.0;
    }
    let per_month = risk_days_per_year / 12.0;
    let per_week = risk_days_per_year / 52.0;
    if per_month < 1.0 {
        1.35
    } else if per_month <= 3.0 {
        2.10
    } else if per_week <= 2.0 {
        2.69
    } else if per_week <= 4.0 {
        5.27
    } else {
        7.23
    }
}

/// Transition probabilities for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionProbs {
    pub onset: f64,
    pub remission: f64,
    pub relapse: f64,
}

impl TransitionProbs {
    /// Annual probabilities. Onset is impossible without any drinking; the
    /// relapse multiplier applies when the person is still drinking at risk.
    pub fn annual(neg: &NegativeParams, risk_days_per_year: f64, drinking: bool, at_risk: bool) -> Self {
        let onset = if drinking { neg.aud_onset_base * odds_ratio(risk_days_per_year) } else { 0.0 };
        let relapse_mult = if at_risk { neg.aud_relapse_mult_if_risk } else { 1.0 };
        TransitionProbs {
            onset,
            remission: neg.aud_remission,
            relapse: neg.aud_relapse_base * relapse_mult,
        }
    }

    /// Annual probabilities spread over twelve monthly steps, clamped to [0, 1].
    pub fn monthly(&self) -> Self {
        let per_month = |p: f64| (p / 12.0).clamp(0.0, 1.0);
        TransitionProbs {
            onset: per_month(self.onset),
            remission: per_month(self.remission),
            relapse: per_month(self.relapse),
        }
    }
}

/// Utilon-years lost per year spent in active AUD.
pub fn annual_loss(neg: &NegativeParams) -> f64 {
    (neg.aud_disability_weight * neg.qaly_to_wellby
        + neg.aud_depression_ls_addon * neg.mental_health_causal_weight)
        * neg.causal_weight
}

/// Trailing window summary fed to the monthly evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSummary {
    pub binge_days: u32,
    pub total_drinks: u32,
}

impl WindowSummary {
    pub fn from_days<'a>(drinks: impl IntoIterator<Item = &'a u32>, neg: &NegativeParams) -> Self {
        drinks.into_iter().fold(WindowSummary::default(), |mut acc, &d| {
            acc.total_drinks += d;
            if neg.is_binge(d) {
                acc.binge_days += 1;
            }
            acc
        })
    }

    /// Binge days scaled from the window length up to a year.
    pub fn annualized_risk_days(&self, days_per_year: u32) -> f64 {
        self.binge_days as f64 * days_per_year as f64 / AUD_WINDOW_DAYS as f64
    }

    pub fn any_drinking(&self) -> bool {
        self.total_drinks > 0
    }
}

/// Monthly step from a trailing window. Consumes one uniform draw.
pub fn monthly_step(
    state: AudState,
    window: &WindowSummary,
    neg: &NegativeParams,
    days_per_year: u32,
    rng: &mut impl Rng,
) -> AudState {
    let drinking = window.any_drinking();
    let probs = TransitionProbs::annual(
        neg,
        window.annualized_risk_days(days_per_year),
        drinking,
        drinking,
    )
    .monthly();
    let u: f64 = rng.random();
    state.step(u, &probs)
}

/// Discounted lifetime AUD loss in expected mode: one annual step per year,
/// loss accrued when Active at the start of the year.
pub fn lifetime_expected(
    pmf: &DrinkPmf,
    neg: &NegativeParams,
    years: u32,
    days_per_year: u32,
    discount_rate_annual: f64,
    rng: &mut impl Rng,
) -> f64 {
    let risk_days = days_per_year as f64 * pmf.p_at_least(neg.binge_threshold);
    let probs = TransitionProbs::annual(neg, risk_days, pmf.p_drinking_day() > 0.0, risk_days > 0.0);
    let loss = annual_loss(neg);

    let mut state = AudState::Never;
    let mut total = 0.0;
    for y in 0..years {
        if state.is_active() {
            total += discount_factor(discount_rate_annual, Year(y).midpoint()) * loss;
        }
        let u: f64 = rng.random();
        state = state.step(u, &probs);
    }
    total
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::DayCountModel;
    use crate::day_count::DayCounts;
    use crate::params::NegativeMenus;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    fn neg() -> NegativeParams {
        let mut n = NegativeMenus::canonical().sample(&mut rng()).unwrap();
        n.binge_threshold = 5;
        n
    }

    #[test]
    fn odds_ratio_ladder_boundaries() {
        assert_eq!(odds_ratio(0.0), 1.0);
        assert_eq!(odds_ratio(-3.0), 1.0);
        assert_eq!(odds_ratio(6.0), 1.35);
        assert_eq!(odds_ratio(12.0), 2.10);
        assert_eq!(odds_ratio(36.0), 2.10);
        assert_eq!(odds_ratio(37.0), 2.69);
        assert_eq!(odds_ratio(104.0), 2.69);
        assert_eq!(odds_ratio(105.0), 5.27);
        assert_eq!(odds_ratio(208.0), 5.27);
        assert_eq!(odds_ratio(209.0), 7.23);
    }

    #[test]
    fn step_follows_thresholds() {
        let p = TransitionProbs { onset: 0.1, remission: 0.2, relapse: 0.3 };
        assert_eq!(AudState::Never.step(0.05, &p), AudState::Active);
        assert_eq!(AudState::Never.step(0.1, &p), AudState::Never);
        assert_eq!(AudState::Active.step(0.15, &p), AudState::Remission);
        assert_eq!(AudState::Active.step(0.5, &p), AudState::Active);
        assert_eq!(AudState::Remission.step(0.25, &p), AudState::Active);
        assert_eq!(AudState::Remission.step(0.35, &p), AudState::Remission);
    }

    #[test]
    fn zero_onset_never_leaves_never() {
        let mut n = neg();
        n.aud_onset_base = 0.0;
        let pmf = DayCounts::new(DayCountModel::Poisson, 12, 6).pmf(6.0).unwrap();
        let mut rng = rng();
        for _ in 0..50 {
            assert_eq!(lifetime_expected(&pmf, &n, 60, 365, 0.03, &mut rng), 0.0);
        }
    }

    #[test]
    fn abstainer_has_no_onset() {
        let mut n = neg();
        n.aud_onset_base = 1.0;
        let pmf = DayCounts::new(DayCountModel::Poisson, 12, 6).pmf(0.0).unwrap();
        assert_eq!(lifetime_expected(&pmf, &n, 60, 365, 0.03, &mut rng()), 0.0);
    }

    /// Certain onset, no remission: active from year 1 onward.
    #[test]
    fn certain_onset_accrues_every_later_year() {
        let mut n = neg();
        n.aud_onset_base = 1.0;
        n.aud_remission = 0.0;
        let pmf = DayCounts::new(DayCountModel::Constant, 12, 6).pmf(2.0).unwrap();
        let total = lifetime_expected(&pmf, &n, 3, 365, 0.0, &mut rng());
        assert!((total - 2.0 * annual_loss(&n)).abs() < 1e-12);
    }

    #[test]
    fn monthly_probs_clamped() {
        let p = TransitionProbs { onset: 24.0, remission: 0.12, relapse: -1.0 }.monthly();
        assert_eq!(p.onset, 1.0);
        assert!((p.remission - 0.01).abs() < 1e-15);
        assert_eq!(p.relapse, 0.0);
    }

    #[test]
    fn window_summary_counts_binges() {
        let n = neg();
        let days = [0u32, 5, 2, 7, 0, 4];
        let w = WindowSummary::from_days(days.iter(), &n);
        assert_eq!(w.binge_days, 2);
        assert_eq!(w.total_drinks, 18);
        assert!((w.annualized_risk_days(365) - 2.0 * 365.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn dry_window_blocks_monthly_onset() {
        let mut n = neg();
        n.aud_onset_base = 100.0;
        let w = WindowSummary::default();
        let mut rng = rng();
        for _ in 0..200 {
            assert_eq!(monthly_step(AudState::Never, &w, &n, 365, &mut rng), AudState::Never);
        }
    }

    #[test]
    fn multipliers_by_state() {
        assert_eq!(AudState::Never.drink_multiplier(), 1.0);
        assert_eq!(AudState::Active.drink_multiplier(), 1.35);
        assert_eq!(AudState::Remission.risk_multiplier(), 1.08);
    }
}
