use std::collections::VecDeque;

use rand::Rng;
use serde::Serialize;
use tracing::trace;

use crate::aud::{self, AUD_WINDOW_DAYS, AudState, WindowSummary};
use crate::config::SimulationConfig;
use crate::day_count::{DayCounts, DrinkPmf};
use crate::error::{Result, SimError};
use crate::params::{NegativeParams, PositiveParams};
use crate::positive::{daily_uplift, expected_daily_uplift};
use crate::risk::{
    AnnualBreakdown, ChronicRates, DailyEventResult, EmaDecay, ExposureEma, ExposureSum,
    YearExposure, annual_expected, bernoulli, daily_events, ihd_annual,
};
use crate::types::{Day, Year, discount_factor};

/// Discounted lifetime outcome of one individual. All values in utilon-years.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimOut {
    pub positive: f64,
    /// `acute + hangover + chronic + aud`.
    pub negative: f64,
    pub net: f64,
    pub acute: f64,
    pub hangover: f64,
    pub chronic: f64,
    pub aud: f64,
    /// Reported alongside, never netted.
    pub ihd: f64,
    pub acute_traffic: f64,
    pub acute_nontraffic: f64,
    pub acute_violence: f64,
    pub acute_poisoning: f64,
    pub chronic_cancer: f64,
    pub chronic_cirrhosis: f64,
    pub chronic_af: f64,
    pub days_lived: u32,
    pub died_early: bool,
}

/// Running discounted sums, turned into a `SimOut` at the end of a life.
#[derive(Debug, Default)]
struct Tally {
    positive: f64,
    hangover: f64,
    aud: f64,
    ihd: f64,
    acute_traffic: f64,
    acute_nontraffic: f64,
    acute_violence: f64,
    acute_poisoning: f64,
    chronic_cancer: f64,
    chronic_cirrhosis: f64,
    chronic_af: f64,
}

impl Tally {
    fn add_year(&mut self, disc: f64, b: &AnnualBreakdown) {
        self.acute_traffic += disc * b.acute_traffic;
        self.acute_nontraffic += disc * b.acute_nontraffic;
        self.acute_violence += disc * b.acute_violence;
        self.acute_poisoning += disc * b.acute_poisoning;
        self.hangover += disc * b.hangover;
        self.add_chronic(disc, &b.chronic);
        self.ihd += disc * b.ihd;
    }

    fn add_day(&mut self, o: &DayOutcome) {
        let disc = o.discount;
        self.positive += disc * o.positive;
        self.acute_traffic += disc * o.events.acute_traffic;
        self.acute_nontraffic += disc * o.events.acute_nontraffic;
        self.acute_violence += disc * o.events.acute_violence;
        self.acute_poisoning += disc * o.events.acute_poisoning;
        self.hangover += disc * o.events.hangover;
        self.add_chronic(disc, &o.chronic);
        self.ihd += disc * o.ihd;
        self.aud += disc * o.aud;
    }

    fn add_chronic(&mut self, disc: f64, c: &ChronicRates) {
        self.chronic_cancer += disc * c.cancer;
        self.chronic_cirrhosis += disc * c.cirrhosis;
        self.chronic_af += disc * c.af;
    }

    fn finish(self, days_lived: u32, died_early: bool) -> Result<SimOut> {
        let acute =
            self.acute_traffic + self.acute_nontraffic + self.acute_violence + self.acute_poisoning;
        let chronic = self.chronic_cancer + self.chronic_cirrhosis + self.chronic_af;
        let negative = acute + self.hangover + chronic + self.aud;
        let out = SimOut {
            positive: self.positive,
            negative,
            net: self.positive - negative,
            acute,
            hangover: self.hangover,
            chronic,
            aud: self.aud,
            ihd: self.ihd,
            acute_traffic: self.acute_traffic,
            acute_nontraffic: self.acute_nontraffic,
            acute_violence: self.acute_violence,
            acute_poisoning: self.acute_poisoning,
            chronic_cancer: self.chronic_cancer,
            chronic_cirrhosis: self.chronic_cirrhosis,
            chronic_af: self.chronic_af,
            days_lived,
            died_early,
        };
        if !(out.net.is_finite() && out.ihd.is_finite()) {
            return Err(SimError::NonFinite("lifetime totals"));
        }
        Ok(out)
    }
}

/// A lifetime evaluation strategy. Implementations return discounted
/// utilon-years.
pub trait LifeRollout {
    fn evaluate<R: Rng>(
        &self,
        pos: &PositiveParams,
        neg: &NegativeParams,
        rng: &mut R,
    ) -> Result<SimOut>;
}

// ── Expected-value rollout ───────────────────────────────────────────────────

pub struct ExpectedRollout<'a> {
    config: &'a SimulationConfig,
    counts: DayCounts,
    pmf: DrinkPmf,
}

impl<'a> ExpectedRollout<'a> {
    /// Builds and validates the drink PMF once for the whole batch.
    pub fn new(config: &'a SimulationConfig) -> Result<Self> {
        let counts = day_counts(config);
        let pmf = counts.pmf(config.drinks_per_day)?;
        Ok(ExpectedRollout { config, counts, pmf })
    }

    pub fn pmf(&self) -> &DrinkPmf {
        &self.pmf
    }

    /// Resample one year of days to advance the EMAs and tally binge shares.
    fn resample_year(
        &self,
        neg: &NegativeParams,
        decay: &EmaDecay,
        ema: &mut ExposureEma,
        rng: &mut impl Rng,
    ) -> Result<YearExposure> {
        let dpy = self.config.days_per_year;
        let mut sum = ExposureSum::default();
        let mut binge_days = 0u32;
        let mut hi_days = 0u32;
        for _ in 0..dpy {
            let drinks = self.counts.sample(self.config.drinks_per_day, rng)?;
            ema.update(decay, neg.grams(drinks));
            sum.add(ema);
            binge_days += neg.is_binge(drinks) as u32;
            hi_days += neg.is_high_intensity(drinks) as u32;
        }
        Ok(YearExposure {
            p_binge: binge_days as f64 / dpy as f64,
            p_high_intensity: hi_days as f64 / dpy as f64,
            ema: sum.mean(),
        })
    }
}

impl LifeRollout for ExpectedRollout<'_> {
    fn evaluate<R: Rng>(
        &self,
        pos: &PositiveParams,
        neg: &NegativeParams,
        rng: &mut R,
    ) -> Result<SimOut> {
        let c = self.config;
        let daily_positive = expected_daily_uplift(pos, &self.pmf)?;

        let mut tally = Tally {
            aud: aud::lifetime_expected(
                &self.pmf,
                neg,
                c.years,
                c.days_per_year,
                c.discount_rate_annual,
                rng,
            ),
            ..Tally::default()
        };

        let decay = EmaDecay::per_day(neg, c.days_per_year);
        let mut ema = ExposureEma::default();
        for y in 0..c.years {
            let disc = discount_factor(c.discount_rate_annual, Year(y).midpoint());
            tally.positive += disc * daily_positive;

            let year = self.resample_year(neg, &decay, &mut ema, rng)?;
            let breakdown = annual_expected(&self.pmf, neg, &year, c.days_per_year)?;
            tally.add_year(disc, &breakdown);
        }

        tally.finish(c.years.saturating_mul(c.days_per_year), false)
    }
}

// ── Day-by-day rollout ───────────────────────────────────────────────────────

/// Mutable state of one life during a daily rollout.
#[derive(Debug, Clone)]
pub struct LifeState {
    pub alive: bool,
    pub aud: AudState,
    pub hangover_days: u32,
    pub ema: ExposureEma,
    /// Drink counts of the most recent days, at most `AUD_WINDOW_DAYS`.
    pub recent: VecDeque<u32>,
}

impl Default for LifeState {
    fn default() -> Self {
        LifeState {
            alive: true,
            aud: AudState::Never,
            hangover_days: 0,
            ema: ExposureEma::default(),
            recent: VecDeque::with_capacity(AUD_WINDOW_DAYS as usize),
        }
    }
}

impl LifeState {
    fn remember(&mut self, drinks: u32) {
        if self.recent.len() == AUD_WINDOW_DAYS as usize {
            self.recent.pop_front();
        }
        self.recent.push_back(drinks);
    }
}

/// Everything that happened on one simulated day. Flows are undiscounted
/// utilon-years; `discount` is the factor to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayOutcome {
    pub day: Day,
    pub drinks: u32,
    pub social: bool,
    pub discount: f64,
    pub positive: f64,
    pub events: DailyEventResult,
    pub chronic: ChronicRates,
    pub ihd: f64,
    pub aud: f64,
    pub aud_state: AudState,
    pub alive: bool,
}

/// Lazy day-by-day walk through one life. Ends after the last day or after
/// a fatal day, whichever comes first.
pub struct DailyTrajectory<'a, R: Rng> {
    config: &'a SimulationConfig,
    counts: DayCounts,
    pos: &'a PositiveParams,
    neg: &'a NegativeParams,
    decay: EmaDecay,
    state: LifeState,
    next_day: u32,
    total_days: u32,
    rng: &'a mut R,
}

impl<'a, R: Rng> DailyTrajectory<'a, R> {
    pub fn new(
        config: &'a SimulationConfig,
        pos: &'a PositiveParams,
        neg: &'a NegativeParams,
        rng: &'a mut R,
    ) -> Self {
        DailyTrajectory {
            config,
            counts: day_counts(config),
            pos,
            neg,
            decay: EmaDecay::per_day(neg, config.days_per_year),
            state: LifeState::default(),
            next_day: 0,
            total_days: config.years.saturating_mul(config.days_per_year),
            rng,
        }
    }

    pub fn state(&self) -> &LifeState {
        &self.state
    }

    fn step(&mut self, day: Day) -> Result<DayOutcome> {
        let dpy = self.config.days_per_year;
        let per_day = 1.0 / dpy as f64;
        let neg = self.neg;

        let mean = self.config.drinks_per_day * self.state.aud.drink_multiplier();
        let drinks = self.counts.sample(mean, self.rng)?;
        let discount = discount_factor(self.config.discount_rate_annual, day.midpoint_years(dpy));

        let social = bernoulli(self.pos.p_social_day, self.rng);
        let positive = daily_uplift(self.pos, drinks, social) * per_day;

        self.state.ema.update(&self.decay, neg.grams(drinks));

        let events = daily_events(
            drinks,
            neg,
            self.state.aud.risk_multiplier(),
            &mut self.state.hangover_days,
            dpy,
            self.rng,
        );

        let chronic = ChronicRates::at(neg, &self.state.ema).scaled(per_day);
        let ihd = ihd_annual(neg, neg.is_binge(drinks), self.state.ema.is_exposed()) * per_day;

        if day.is_month_boundary() {
            let window = WindowSummary::from_days(self.state.recent.iter(), neg);
            self.state.aud = aud::monthly_step(self.state.aud, &window, neg, dpy, self.rng);
        }
        let aud = if self.state.aud.is_active() { aud::annual_loss(neg) * per_day } else { 0.0 };

        self.state.remember(drinks);
        if events.fatal {
            self.state.alive = false;
            trace!(day = day.0, drinks, "fatal acute event");
        }

        Ok(DayOutcome {
            day,
            drinks,
            social,
            discount,
            positive,
            events,
            chronic,
            ihd,
            aud,
            aud_state: self.state.aud,
            alive: self.state.alive,
        })
    }
}

impl<R: Rng> Iterator for DailyTrajectory<'_, R> {
    type Item = Result<DayOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.state.alive || self.next_day >= self.total_days {
            return None;
        }
        let day = Day(self.next_day);
        self.next_day += 1;
        Some(self.step(day))
    }
}

pub struct DailyRollout<'a> {
    config: &'a SimulationConfig,
}

impl<'a> DailyRollout<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        DailyRollout { config }
    }

    pub fn trajectory<'t, R: Rng>(
        &self,
        pos: &'t PositiveParams,
        neg: &'t NegativeParams,
        rng: &'t mut R,
    ) -> DailyTrajectory<'t, R>
    where
        'a: 't,
    {
        DailyTrajectory::new(self.config, pos, neg, rng)
    }
}

impl LifeRollout for DailyRollout<'_> {
    fn evaluate<R: Rng>(
        &self,
        pos: &PositiveParams,
        neg: &NegativeParams,
        rng: &mut R,
    ) -> Result<SimOut> {
        let mut tally = Tally::default();
        let mut days_lived = 0;
        let mut alive = true;
        for outcome in self.trajectory(pos, neg, rng) {
            let outcome = outcome?;
            tally.add_day(&outcome);
            days_lived += 1;
            alive = outcome.alive;
        }
        tally.finish(days_lived, !alive)
    }
}

fn day_counts(config: &SimulationConfig) -> DayCounts {
    DayCounts::new(config.day_count_model, config.max_drinks_cap, config.two_point_high_drinks)
}
