use std::f64::consts::LN_2;

use rand::Rng;

use crate::day_count::DrinkPmf;
use crate::error::{Result, SimError};
use crate::params::NegativeParams;

/// Log-linear relative risk: `rr10^(grams/10)`. Exactly 1 at zero grams.
pub fn rr_from_rr10(rr10: f64, grams_per_day: f64) -> f64 {
    rr10.powf(grams_per_day / 10.0)
}

/// Piecewise log-linear RR through (0, 1), (25, rr25), (50, rr50), (100, rr100),
/// extrapolating the 50→100 log-slope beyond 100 g/day.
pub fn piecewise_log_rr(grams_per_day: f64, rr25: f64, rr50: f64, rr100: f64) -> f64 {
    if grams_per_day <= 0.0 {
        return 1.0;
    }
    let lerp_log = |x: f64, x0: f64, x1: f64, y0: f64, y1: f64| {
        let t = (x - x0) / (x1 - x0);
        (y0.ln() * (1.0 - t) + y1.ln() * t).exp()
    };
    if grams_per_day < 25.0 {
        return lerp_log(grams_per_day, 0.0, 25.0, 1.0, rr25);
    }
    if grams_per_day < 50.0 {
        return lerp_log(grams_per_day, 25.0, 50.0, rr25, rr50);
    }
    if grams_per_day < 100.0 {
        return lerp_log(grams_per_day, 50.0, 100.0, rr50, rr100);
    }
    let slope = (rr100.ln() - rr50.ln()) / 50.0;
    (rr100.ln() + slope * (grams_per_day - 100.0)).exp()
}

/// EMA retention per year for a half-life in years. Zero half-life means no memory.
pub fn ema_alpha_per_year(half_life_years: f64) -> f64 {
    if half_life_years <= 0.0 {
        return 0.0;
    }
    (-LN_2 / half_life_years).exp()
}

/// EMA retention per day for a half-life in years.
pub fn ema_alpha_per_day(half_life_years: f64, days_per_year: u32) -> f64 {
    ema_alpha_per_year(half_life_years * days_per_year as f64)
}

/// Retention factors for the three exposure trackers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaDecay {
    pub general: f64,
    pub cancer: f64,
    pub cirrhosis: f64,
}

impl EmaDecay {
    pub fn per_day(neg: &NegativeParams, days_per_year: u32) -> Self {
        EmaDecay {
            general: ema_alpha_per_day(neg.half_life_chronic, days_per_year),
            cancer: ema_alpha_per_day(neg.half_life_cancer, days_per_year),
            cirrhosis: ema_alpha_per_day(neg.half_life_cirrhosis, days_per_year),
        }
    }
}

/// Smoothed grams/day exposure, one tracker per latency profile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExposureEma {
    pub general: f64,
    pub cancer: f64,
    pub cirrhosis: f64,
}

impl ExposureEma {
    /// `ema ← α·ema + (1−α)·grams` for each tracker.
    pub fn update(&mut self, decay: &EmaDecay, grams: f64) {
        self.general = decay.general * self.general + (1.0 - decay.general) * grams;
        self.cancer = decay.cancer * self.cancer + (1.0 - decay.cancer) * grams;
        self.cirrhosis = decay.cirrhosis * self.cirrhosis + (1.0 - decay.cirrhosis) * grams;
    }

    pub fn is_exposed(&self) -> bool {
        self.general > 0.0
    }
}

/// Running sum of daily EMA values, averaged at year end.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExposureSum {
    sum: ExposureEma,
    days: u32,
}

impl ExposureSum {
    pub fn add(&mut self, ema: &ExposureEma) {
        self.sum.general += ema.general;
        self.sum.cancer += ema.cancer;
        self.sum.cirrhosis += ema.cirrhosis;
        self.days += 1;
    }

    pub fn mean(&self) -> ExposureEma {
        if self.days == 0 {
            return ExposureEma::default();
        }
        let n = self.days as f64;
        ExposureEma {
            general: self.sum.general / n,
            cancer: self.sum.cancer / n,
            cirrhosis: self.sum.cirrhosis / n,
        }
    }
}

/// Expected DALYs of one injury event, mixing fatal and nonfatal outcomes.
pub fn injury_daly_per_event(neg: &NegativeParams) -> f64 {
    (1.0 - neg.injury_case_fatality) * neg.daly_nonfatal_injury
        + neg.injury_case_fatality * neg.daly_fatal_injury
}

/// Expected DALYs of one poisoning event. Fatal poisonings reuse the injury fatal DALY.
pub fn poisoning_daly_per_event(neg: &NegativeParams) -> f64 {
    (1.0 - neg.poison_case_fatality) * neg.poison_daly_nonfatal
        + neg.poison_case_fatality * neg.daly_fatal_injury
}

fn dalys_to_utilons(neg: &NegativeParams, dalys: f64) -> f64 {
    dalys * neg.qaly_to_wellby * neg.causal_weight
}

/// Annual chronic-disease utilon rates at a given smoothed exposure.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChronicRates {
    pub cancer: f64,
    pub cirrhosis: f64,
    pub af: f64,
}

impl ChronicRates {
    pub fn at(neg: &NegativeParams, ema: &ExposureEma) -> Self {
        let rr_cancer = rr_from_rr10(neg.rr10_all_cancer, ema.cancer);
        let cancer = neg.baseline_daly_cancer
            * (rr_cancer - 1.0).max(0.0)
            * neg.qaly_to_wellby
            * neg.cancer_causal_weight;

        let rr_cirrhosis = piecewise_log_rr(
            ema.cirrhosis,
            neg.rr_cirrhosis_25,
            neg.rr_cirrhosis_50,
            neg.rr_cirrhosis_100,
        );
        let cirrhosis =
            dalys_to_utilons(neg, neg.baseline_daly_cirrhosis * (rr_cirrhosis - 1.0).max(0.0));

        let drinks_equiv = ema.general / (neg.grams_per_drink as f64).max(1e-9);
        let rr_af = neg.rr_af_per_drink.powf(drinks_equiv);
        let af = dalys_to_utilons(neg, neg.baseline_daly_af * (rr_af - 1.0).max(0.0));

        ChronicRates { cancer, cirrhosis, af }
    }

    pub fn total(&self) -> f64 {
        self.cancer + self.cirrhosis + self.af
    }

    pub fn scaled(&self, k: f64) -> Self {
        ChronicRates { cancer: self.cancer * k, cirrhosis: self.cirrhosis * k, af: self.af * k }
    }
}

/// Annual IHD term. Negative when protective; zero unless the individual
/// opted into the protection channel and has any exposure.
pub fn ihd_annual(neg: &NegativeParams, binged: bool, exposed: bool) -> f64 {
    if !neg.include_ihd_protection || !exposed {
        return 0.0;
    }
    let rr = if neg.binge_negates_ihd && binged { 1.0 } else { neg.ihd_rr_nadir };
    dalys_to_utilons(neg, neg.baseline_daly_ihd * (rr - 1.0))
}

/// One year's utilon losses by channel, in utilon-years (undiscounted).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnnualBreakdown {
    pub acute_traffic: f64,
    pub acute_nontraffic: f64,
    pub acute_violence: f64,
    pub acute_poisoning: f64,
    pub hangover: f64,
    pub chronic: ChronicRates,
    /// Reported separately; not part of `total`.
    pub ihd: f64,
}

impl AnnualBreakdown {
    pub fn acute(&self) -> f64 {
        self.acute_traffic + self.acute_nontraffic + self.acute_violence + self.acute_poisoning
    }

    pub fn total(&self) -> f64 {
        self.acute() + self.hangover + self.chronic.total()
    }
}

/// What actually happened during a simulated year, used to ground the
/// expected-value breakdown in the year's resampled days.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearExposure {
    /// Fraction of days at or above the binge threshold.
    pub p_binge: f64,
    /// Fraction of days at or above the high-intensity threshold.
    pub p_high_intensity: f64,
    /// Year-average smoothed exposure.
    pub ema: ExposureEma,
}

/// Expected annual negative utilons from the drink PMF and the year's
/// realized binge / high-intensity fractions and exposure.
pub fn annual_expected(
    pmf: &DrinkPmf,
    neg: &NegativeParams,
    year: &YearExposure,
    days_per_year: u32,
) -> Result<AnnualBreakdown> {
    let dpy = days_per_year as f64;

    // Injury RR applies on drinking days only.
    let exp_rr_traffic = pmf.expect("traffic RR", |d| {
        if d == 0 { 0.0 } else { rr_from_rr10(neg.rr10_traffic, neg.grams(d)) }
    })?;
    let exp_rr_nontraffic = pmf.expect("non-traffic RR", |d| {
        if d == 0 { 0.0 } else { rr_from_rr10(neg.rr10_nontraffic, neg.grams(d)) }
    })?;
    let exp_rr_violence = pmf.expect("violence RR", |d| {
        if neg.is_binge(d) { neg.rr_per_drink_violence.powi(d as i32) } else { 0.0 }
    })?;

    let daly_injury = injury_daly_per_event(neg);
    let traffic_events = dpy * neg.p0_injury_per_drinking_day * exp_rr_traffic;
    let nontraffic_events = dpy * neg.p0_injury_per_drinking_day * exp_rr_nontraffic;
    let violence_events = dpy * neg.p0_violence_per_binge_day * exp_rr_violence;
    let poisoning_events = dpy * year.p_high_intensity * neg.p_poison_per_hi_day;

    let hangover_days =
        dpy * year.p_binge * neg.p_hangover_given_binge * neg.hangover_duration_days as f64;

    let breakdown = AnnualBreakdown {
        acute_traffic: dalys_to_utilons(
            neg,
            traffic_events * daly_injury * (1.0 + neg.traffic_externality_multiplier),
        ),
        acute_nontraffic: dalys_to_utilons(neg, nontraffic_events * daly_injury),
        acute_violence: dalys_to_utilons(neg, violence_events * daly_injury),
        acute_poisoning: dalys_to_utilons(neg, poisoning_events * poisoning_daly_per_event(neg)),
        hangover: (hangover_days / dpy) * neg.hangover_ls_loss_per_day,
        chronic: ChronicRates::at(neg, &year.ema),
        ihd: ihd_annual(neg, year.p_binge > 0.0, year.ema.is_exposed()),
    };
    if !breakdown.total().is_finite() || !breakdown.ihd.is_finite() {
        return Err(SimError::NonFinite("annual negative breakdown"));
    }
    Ok(breakdown)
}

/// Outcome of one simulated day's acute draws.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyEventResult {
    pub traffic_event: bool,
    pub nontraffic_event: bool,
    pub violence_event: bool,
    pub poisoning_event: bool,
    pub acute_traffic: f64,
    pub acute_nontraffic: f64,
    pub acute_violence: f64,
    pub acute_poisoning: f64,
    /// Hangover loss for the day, in utilon-years.
    pub hangover: f64,
    pub fatal: bool,
}

impl DailyEventResult {
    pub fn event_count(&self) -> u32 {
        [self.traffic_event, self.nontraffic_event, self.violence_event, self.poisoning_event]
            .iter()
            .filter(|e| **e)
            .count() as u32
    }

    pub fn acute(&self) -> f64 {
        self.acute_traffic + self.acute_nontraffic + self.acute_violence + self.acute_poisoning
    }
}

/// Draw the day's acute events, hangover and mortality.
///
/// `risk_multiplier` scales every acute probability (AUD state modulation).
/// `hangover_days` carries the remaining hangover across days. Draw order is
/// fixed: traffic, non-traffic, violence, poisoning, hangover (binge days
/// only), death.
pub fn daily_events(
    drinks: u32,
    neg: &NegativeParams,
    risk_multiplier: f64,
    hangover_days: &mut u32,
    days_per_year: u32,
    rng: &mut impl Rng,
) -> DailyEventResult {
    let grams = neg.grams(drinks);
    let binge = neg.is_binge(drinks);

    let (p_traffic, p_nontraffic) = if drinks > 0 {
        (
            neg.p0_injury_per_drinking_day * rr_from_rr10(neg.rr10_traffic, grams) * risk_multiplier,
            neg.p0_injury_per_drinking_day
                * rr_from_rr10(neg.rr10_nontraffic, grams)
                * risk_multiplier,
        )
    } else {
        (0.0, 0.0)
    };
    let p_violence = if binge {
        neg.p0_violence_per_binge_day * neg.rr_per_drink_violence.powi(drinks as i32) * risk_multiplier
    } else {
        0.0
    };
    let p_poisoning = if neg.is_high_intensity(drinks) {
        neg.p_poison_per_hi_day * risk_multiplier
    } else {
        0.0
    };

    let mut out = DailyEventResult {
        traffic_event: bernoulli(p_traffic, rng),
        nontraffic_event: bernoulli(p_nontraffic, rng),
        violence_event: bernoulli(p_violence, rng),
        poisoning_event: bernoulli(p_poisoning, rng),
        ..DailyEventResult::default()
    };

    let daly_injury = injury_daly_per_event(neg);
    if out.traffic_event {
        out.acute_traffic =
            dalys_to_utilons(neg, daly_injury * (1.0 + neg.traffic_externality_multiplier));
    }
    if out.nontraffic_event {
        out.acute_nontraffic = dalys_to_utilons(neg, daly_injury);
    }
    if out.violence_event {
        out.acute_violence = dalys_to_utilons(neg, daly_injury);
    }
    if out.poisoning_event {
        out.acute_poisoning = dalys_to_utilons(neg, poisoning_daly_per_event(neg));
    }

    if binge && bernoulli(neg.p_hangover_given_binge, rng) {
        *hangover_days = (*hangover_days).max(neg.hangover_duration_days);
    }
    if *hangover_days > 0 {
        out.hangover = neg.hangover_ls_loss_per_day / days_per_year as f64;
        *hangover_days -= 1;
    }

    let mut p_die: f64 = 0.0;
    if out.traffic_event || out.nontraffic_event || out.violence_event {
        p_die = p_die.max(neg.injury_case_fatality);
    }
    if out.poisoning_event {
        p_die = p_die.max(neg.poison_case_fatality);
    }
    out.fatal = bernoulli(p_die, rng);

    out
}

/// Bernoulli draw with the probability clamped into [0, 1]. NaN counts as 0.
pub fn bernoulli(p: f64, rng: &mut impl Rng) -> bool {
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
    rng.random_bool(p)
}
