use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::params::{NegativeMenus, PositiveMenus};

/// Distributional family for the number of drinks on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCountModel {
    /// Every day is `round(mean)` drinks.
    Constant,
    /// Either 0 or `two_point_high_drinks`, mixed to match the mean.
    TwoPoint,
    /// Poisson(mean), truncated at the cap.
    Poisson,
}

impl FromStr for DayCountModel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "constant" => Ok(DayCountModel::Constant),
            "two_point" => Ok(DayCountModel::TwoPoint),
            "poisson" => Ok(DayCountModel::Poisson),
            other => Err(SimError::UnknownDayCountModel(other.to_string())),
        }
    }
}

impl fmt::Display for DayCountModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DayCountModel::Constant => "constant",
            DayCountModel::TwoPoint => "two_point",
            DayCountModel::Poisson => "poisson",
        };
        f.write_str(s)
    }
}

/// Life evaluation strategy, chosen once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Expected value per year, aggregated from the drink PMF.
    Expected,
    /// Day-by-day stochastic rollout with mortality absorption.
    Daily,
}

impl FromStr for Mode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "expected" => Ok(Mode::Expected),
            "daily" => Ok(Mode::Daily),
            other => Err(SimError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Expected => "expected",
            Mode::Daily => "daily",
        })
    }
}

/// Exposure grid bounds for a drinks/day sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Individuals per grid point. `None` falls back to `num_runs`.
    pub runs_per_point: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig { min: 0.0, max: 8.0, step: 0.25, runs_per_point: None }
    }
}

/// The complete, immutable description of a batch. Every component reads
/// from a shared reference to this value; nothing mutates it mid-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// One run = one simulated person's lifetime.
    pub num_runs: u64,
    pub seed: u64,
    pub years: u32,
    pub days_per_year: u32,
    /// Mean standard drinks per day: the exposure knob shared by every module.
    pub drinks_per_day: f64,
    pub day_count_model: DayCountModel,
    pub mode: Mode,
    pub two_point_high_drinks: u32,
    pub max_drinks_cap: u32,
    /// Continuous discounting `exp(−r·t)`.
    pub discount_rate_annual: f64,
    pub sweep: SweepConfig,
    pub positive_menus: PositiveMenus,
    pub negative_menus: NegativeMenus,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl SimulationConfig {
    pub fn canonical() -> Self {
        SimulationConfig {
            num_runs: 100,
            seed: 12345,
            years: 60,
            days_per_year: 365,
            drinks_per_day: 1.5,
            day_count_model: DayCountModel::Poisson,
            mode: Mode::Expected,
            two_point_high_drinks: 6,
            max_drinks_cap: 12,
            discount_rate_annual: 0.03,
            sweep: SweepConfig::default(),
            positive_menus: PositiveMenus::canonical(),
            negative_menus: NegativeMenus::canonical(),
        }
    }

    /// Parse a TOML document. Omitted keys keep their canonical values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Individuals simulated at each sweep grid point.
    pub fn runs_per_point(&self) -> u64 {
        self.sweep.runs_per_point.unwrap_or(self.num_runs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_runs == 0 {
            return Err(invalid("num_runs must be >= 1"));
        }
        if self.years == 0 {
            return Err(invalid("years must be >= 1"));
        }
        if self.days_per_year == 0 {
            return Err(invalid("days_per_year must be >= 1"));
        }
        if self.years.checked_mul(self.days_per_year).is_none() {
            return Err(invalid("years * days_per_year overflows the day counter"));
        }
        if !self.drinks_per_day.is_finite() || self.drinks_per_day < 0.0 {
            return Err(invalid("drinks_per_day must be finite and >= 0"));
        }
        if self.max_drinks_cap == 0 {
            return Err(invalid("max_drinks_cap must be >= 1"));
        }
        if !self.discount_rate_annual.is_finite() {
            return Err(invalid("discount_rate_annual must be finite"));
        }
        let s = &self.sweep;
        if !(s.min.is_finite() && s.max.is_finite() && s.step.is_finite()) {
            return Err(invalid("sweep bounds must be finite"));
        }
        if s.step <= 0.0 {
            return Err(invalid("sweep.step must be > 0"));
        }
        if s.min < 0.0 || s.max < s.min {
            return Err(invalid("sweep bounds must satisfy 0 <= min <= max"));
        }
        if s.runs_per_point == Some(0) {
            return Err(invalid("sweep.runs_per_point must be >= 1"));
        }
        self.positive_menus.validate()?;
        self.negative_menus.validate()?;
        Ok(())
    }
}

fn invalid(msg: &str) -> SimError {
    SimError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_is_valid() {
        SimulationConfig::canonical().validate().unwrap();
    }

    #[test]
    fn day_count_model_parses_known_tags() {
        assert_eq!("constant".parse::<DayCountModel>().unwrap(), DayCountModel::Constant);
        assert_eq!("two_point".parse::<DayCountModel>().unwrap(), DayCountModel::TwoPoint);
        assert_eq!("poisson".parse::<DayCountModel>().unwrap(), DayCountModel::Poisson);
    }

    #[test]
    fn unknown_day_count_model_is_config_error() {
        let err = "lognormal".parse::<DayCountModel>().unwrap_err();
        assert!(matches!(err, SimError::UnknownDayCountModel(ref s) if s == "lognormal"));
    }

    #[test]
    fn unknown_mode_is_config_error() {
        assert!(matches!("hourly".parse::<Mode>(), Err(SimError::UnknownMode(_))));
    }

    #[test]
    fn toml_overrides_only_named_keys() {
        let config = SimulationConfig::from_toml_str(
            r#"
            drinks_per_day = 3.0
            mode = "daily"
            day_count_model = "two_point"

            [sweep]
            step = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.drinks_per_day, 3.0);
        assert_eq!(config.mode, Mode::Daily);
        assert_eq!(config.day_count_model, DayCountModel::TwoPoint);
        assert_eq!(config.sweep.step, 0.5);
        assert_eq!(config.sweep.max, 8.0);
        assert_eq!(config.years, 60);
        assert_eq!(config.negative_menus, NegativeMenus::canonical());
    }

    #[test]
    fn toml_can_replace_a_menu() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [negative_menus]
            aud_onset_base = [0.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.negative_menus.aud_onset_base.values(), &[0.0]);
        assert_eq!(
            config.negative_menus.aud_remission,
            NegativeMenus::canonical().aud_remission
        );
    }

    #[test]
    fn toml_unknown_tag_fails_to_parse() {
        let err = SimulationConfig::from_toml_str(r#"day_count_model = "gamma""#).unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = SimulationConfig::canonical();
        c.drinks_per_day = -1.0;
        assert!(c.validate().is_err());

        let mut c = SimulationConfig::canonical();
        c.drinks_per_day = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = SimulationConfig::canonical();
        c.sweep.step = 0.0;
        assert!(c.validate().is_err());

        let mut c = SimulationConfig::canonical();
        c.years = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_horizon_past_day_counter() {
        let mut c = SimulationConfig::canonical();
        c.years = 12_000_000;
        assert!(c.validate().is_err());

        c.years = u32::MAX / c.days_per_year;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn runs_per_point_falls_back_to_num_runs() {
        let mut c = SimulationConfig::canonical();
        assert_eq!(c.runs_per_point(), 100);
        c.sweep.runs_per_point = Some(7);
        assert_eq!(c.runs_per_point(), 7);
    }
}
