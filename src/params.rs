use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// An enumerated choice set for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Choices<T>(pub Vec<T>);

impl<T: Copy> Choices<T> {
    pub fn new(values: &[T]) -> Self {
        Choices(values.to_vec())
    }

    pub fn values(&self) -> &[T] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Uniform pick. `name` only labels the error for an empty set.
    pub fn pick(&self, name: &'static str, rng: &mut impl Rng) -> Result<T> {
        if self.0.is_empty() {
            return Err(SimError::EmptyChoiceSet(name));
        }
        Ok(self.0[rng.random_range(0..self.0.len())])
    }
}

impl Choices<f64> {
    fn check(&self, name: &'static str) -> Result<()> {
        if self.0.is_empty() {
            return Err(SimError::EmptyChoiceSet(name));
        }
        if self.0.iter().any(|v| !v.is_finite()) {
            return Err(SimError::NonFinite(name));
        }
        Ok(())
    }
}

fn check_len<T: Copy>(choices: &Choices<T>, name: &'static str) -> Result<()> {
    if choices.is_empty() {
        Err(SimError::EmptyChoiceSet(name))
    } else {
        Ok(())
    }
}

// ── Positive (behavioral) ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositiveMenus {
    /// Fraction of days that are social; social days carry a stronger uplift.
    pub p_social_day: Choices<f64>,
    pub baseline_stress: Choices<f64>,
    pub baseline_sociability: Choices<f64>,
    pub social_setting_quality: Choices<f64>,
    pub responsiveness: Choices<f64>,
    pub saturation_rate: Choices<f64>,
    /// Session score → life-satisfaction points for that day.
    pub ls_per_session_score: Choices<f64>,
    pub w_enjoyment: Choices<f64>,
    pub w_relaxation: Choices<f64>,
    pub w_social: Choices<f64>,
    pub w_mood: Choices<f64>,
    pub max_daily_ls_uplift: Choices<f64>,
}

impl Default for PositiveMenus {
    fn default() -> Self {
        Self::canonical()
    }
}

impl PositiveMenus {
    /// All numeric values are PLACEHOLDER calibration, not fitted estimates.
    pub fn canonical() -> Self {
        PositiveMenus {
            p_social_day: Choices::new(&[0.1, 0.2, 0.35, 0.5]),
            baseline_stress: Choices::new(&[0.2, 0.4, 0.6, 0.8]),
            baseline_sociability: Choices::new(&[0.2, 0.4, 0.6, 0.8]),
            social_setting_quality: Choices::new(&[0.3, 0.5, 0.7, 0.9]),
            responsiveness: Choices::new(&[0.6, 0.8, 1.0, 1.2, 1.4]),
            saturation_rate: Choices::new(&[0.4, 0.7, 1.0, 1.3]),
            ls_per_session_score: Choices::new(&[0.15, 0.25, 0.35, 0.50]),
            w_enjoyment: Choices::new(&[0.8, 1.0, 1.2, 1.4]),
            w_relaxation: Choices::new(&[0.6, 0.8, 1.0, 1.2]),
            w_social: Choices::new(&[0.5, 0.8, 1.1, 1.4]),
            w_mood: Choices::new(&[0.3, 0.5, 0.7, 0.9]),
            max_daily_ls_uplift: Choices::new(&[1.0, 1.5, 2.0]),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.p_social_day.check("p_social_day")?;
        self.baseline_stress.check("baseline_stress")?;
        self.baseline_sociability.check("baseline_sociability")?;
        self.social_setting_quality.check("social_setting_quality")?;
        self.responsiveness.check("responsiveness")?;
        self.saturation_rate.check("saturation_rate")?;
        self.ls_per_session_score.check("ls_per_session_score")?;
        self.w_enjoyment.check("w_enjoyment")?;
        self.w_relaxation.check("w_relaxation")?;
        self.w_social.check("w_social")?;
        self.w_mood.check("w_mood")?;
        self.max_daily_ls_uplift.check("max_daily_ls_uplift")?;
        if self.p_social_day.values().iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(SimError::InvalidConfig("p_social_day choices must lie in [0, 1]".into()));
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Result<PositiveParams> {
        Ok(PositiveParams {
            p_social_day: self.p_social_day.pick("p_social_day", rng)?,
            baseline_stress: self.baseline_stress.pick("baseline_stress", rng)?,
            baseline_sociability: self.baseline_sociability.pick("baseline_sociability", rng)?,
            social_setting_quality: self.social_setting_quality.pick("social_setting_quality", rng)?,
            responsiveness: self.responsiveness.pick("responsiveness", rng)?,
            saturation_rate: self.saturation_rate.pick("saturation_rate", rng)?,
            ls_per_session_score: self.ls_per_session_score.pick("ls_per_session_score", rng)?,
            w_enjoyment: self.w_enjoyment.pick("w_enjoyment", rng)?,
            w_relaxation: self.w_relaxation.pick("w_relaxation", rng)?,
            w_social: self.w_social.pick("w_social", rng)?,
            w_mood: self.w_mood.pick("w_mood", rng)?,
            max_daily_ls_uplift: self.max_daily_ls_uplift.pick("max_daily_ls_uplift", rng)?,
        })
    }
}

/// Behavioral parameters of one individual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositiveParams {
    pub p_social_day: f64,
    pub baseline_stress: f64,
    pub baseline_sociability: f64,
    pub social_setting_quality: f64,
    pub responsiveness: f64,
    pub saturation_rate: f64,
    pub ls_per_session_score: f64,
    pub w_enjoyment: f64,
    pub w_relaxation: f64,
    pub w_social: f64,
    pub w_mood: f64,
    pub max_daily_ls_uplift: f64,
}

// ── Negative (epidemiological) ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeMenus {
    pub grams_per_drink: Choices<u32>,
    pub qaly_to_wellby: Choices<f64>,
    pub causal_weight: Choices<f64>,

    pub binge_threshold: Choices<u32>,
    pub high_intensity_multiplier: Choices<u32>,

    /// EMA half-lives, in years.
    pub half_life_chronic: Choices<f64>,
    pub half_life_cancer: Choices<f64>,
    pub half_life_cirrhosis: Choices<f64>,

    pub rr10_traffic: Choices<f64>,
    pub rr10_nontraffic: Choices<f64>,
    pub rr_per_drink_violence: Choices<f64>,
    pub p0_injury_per_drinking_day: Choices<f64>,
    pub p0_violence_per_binge_day: Choices<f64>,
    pub daly_nonfatal_injury: Choices<f64>,
    pub injury_case_fatality: Choices<f64>,
    pub daly_fatal_injury: Choices<f64>,
    pub traffic_externality_multiplier: Choices<f64>,

    pub p_poison_per_hi_day: Choices<f64>,
    pub poison_case_fatality: Choices<f64>,
    pub poison_daly_nonfatal: Choices<f64>,

    pub p_hangover_given_binge: Choices<f64>,
    pub hangover_ls_loss_per_day: Choices<f64>,
    pub hangover_duration_days: Choices<u32>,

    pub rr10_all_cancer: Choices<f64>,
    pub cancer_causal_weight: Choices<f64>,
    pub baseline_daly_cancer: Choices<f64>,

    /// Cirrhosis mortality RR anchors at 25 / 50 / 100 g/day.
    pub rr_cirrhosis_25: Choices<f64>,
    pub rr_cirrhosis_50: Choices<f64>,
    pub rr_cirrhosis_100: Choices<f64>,
    pub baseline_daly_cirrhosis: Choices<f64>,

    pub rr_af_per_drink: Choices<f64>,
    pub baseline_daly_af: Choices<f64>,

    pub include_ihd_protection: Choices<bool>,
    pub ihd_rr_nadir: Choices<f64>,
    pub binge_negates_ihd: Choices<bool>,
    pub baseline_daly_ihd: Choices<f64>,

    /// Annual AUD transition base rates.
    pub aud_onset_base: Choices<f64>,
    pub aud_remission: Choices<f64>,
    pub aud_relapse_base: Choices<f64>,
    pub aud_relapse_mult_if_risk: Choices<f64>,
    pub aud_disability_weight: Choices<f64>,
    /// Life-satisfaction points per year while in AUD.
    pub aud_depression_ls_addon: Choices<f64>,
    pub mental_health_causal_weight: Choices<f64>,
}

impl Default for NegativeMenus {
    fn default() -> Self {
        Self::canonical()
    }
}

impl NegativeMenus {
    /// All numeric values are PLACEHOLDER calibration, not fitted estimates.
    pub fn canonical() -> Self {
        NegativeMenus {
            grams_per_drink: Choices::new(&[10, 14]),
            qaly_to_wellby: Choices::new(&[5.0, 6.0, 7.0, 8.0]),
            causal_weight: Choices::new(&[0.25, 0.5, 0.75, 1.0]),

            // NIAAA-style thresholds.
            binge_threshold: Choices::new(&[4, 5]),
            high_intensity_multiplier: Choices::new(&[2, 3]),

            half_life_chronic: Choices::new(&[2.0, 5.0, 10.0]),
            half_life_cancer: Choices::new(&[5.0, 10.0, 15.0]),
            half_life_cirrhosis: Choices::new(&[3.0, 5.0, 10.0]),

            rr10_traffic: Choices::new(&[1.18, 1.24, 1.30]),
            rr10_nontraffic: Choices::new(&[1.26, 1.30, 1.34]),
            rr_per_drink_violence: Choices::new(&[1.25, 1.38, 1.50]),
            p0_injury_per_drinking_day: Choices::new(&[1e-4, 2.5e-4, 5e-4, 1e-3]),
            p0_violence_per_binge_day: Choices::new(&[5e-6, 1e-5, 2e-5, 5e-5]),
            daly_nonfatal_injury: Choices::new(&[0.005, 0.02, 0.05]),
            injury_case_fatality: Choices::new(&[0.002, 0.005, 0.01]),
            daly_fatal_injury: Choices::new(&[20.0, 30.0, 40.0]),
            traffic_externality_multiplier: Choices::new(&[0.5, 1.0, 1.5]),

            p_poison_per_hi_day: Choices::new(&[1e-6, 3e-6, 1e-5, 3e-5]),
            poison_case_fatality: Choices::new(&[0.005, 0.01, 0.02]),
            poison_daly_nonfatal: Choices::new(&[0.01, 0.05, 0.2]),

            p_hangover_given_binge: Choices::new(&[0.3, 0.5, 0.7, 0.9]),
            hangover_ls_loss_per_day: Choices::new(&[0.05, 0.1, 0.2, 0.4]),
            hangover_duration_days: Choices::new(&[1, 2]),

            rr10_all_cancer: Choices::new(&[1.02, 1.04, 1.06]),
            cancer_causal_weight: Choices::new(&[0.75, 1.0]),
            baseline_daly_cancer: Choices::new(&[0.001, 0.003, 0.006]),

            rr_cirrhosis_25: Choices::new(&[2.0, 2.65, 3.2]),
            rr_cirrhosis_50: Choices::new(&[5.5, 6.83, 8.0]),
            rr_cirrhosis_100: Choices::new(&[12.0, 16.38, 20.0]),
            baseline_daly_cirrhosis: Choices::new(&[0.0003, 0.001, 0.0025]),

            rr_af_per_drink: Choices::new(&[1.03, 1.06, 1.08]),
            baseline_daly_af: Choices::new(&[0.0005, 0.0015, 0.003]),

            include_ihd_protection: Choices::new(&[false, true]),
            ihd_rr_nadir: Choices::new(&[0.85, 0.95, 1.0]),
            binge_negates_ihd: Choices::new(&[true, false]),
            baseline_daly_ihd: Choices::new(&[0.001, 0.003, 0.006]),

            aud_onset_base: Choices::new(&[0.002, 0.005, 0.01]),
            aud_remission: Choices::new(&[0.08, 0.15, 0.25]),
            aud_relapse_base: Choices::new(&[0.02, 0.05, 0.10]),
            aud_relapse_mult_if_risk: Choices::new(&[3.0, 6.0, 10.0]),
            aud_disability_weight: Choices::new(&[0.123, 0.235, 0.366]),
            aud_depression_ls_addon: Choices::new(&[0.0, 0.2, 0.5, 1.0]),
            mental_health_causal_weight: Choices::new(&[0.25, 0.5, 0.75]),
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_len(&self.grams_per_drink, "grams_per_drink")?;
        self.qaly_to_wellby.check("qaly_to_wellby")?;
        self.causal_weight.check("causal_weight")?;
        check_len(&self.binge_threshold, "binge_threshold")?;
        check_len(&self.high_intensity_multiplier, "high_intensity_multiplier")?;
        self.half_life_chronic.check("half_life_chronic")?;
        self.half_life_cancer.check("half_life_cancer")?;
        self.half_life_cirrhosis.check("half_life_cirrhosis")?;
        self.rr10_traffic.check("rr10_traffic")?;
        self.rr10_nontraffic.check("rr10_nontraffic")?;
        self.rr_per_drink_violence.check("rr_per_drink_violence")?;
        self.p0_injury_per_drinking_day.check("p0_injury_per_drinking_day")?;
        self.p0_violence_per_binge_day.check("p0_violence_per_binge_day")?;
        self.daly_nonfatal_injury.check("daly_nonfatal_injury")?;
        self.injury_case_fatality.check("injury_case_fatality")?;
        self.daly_fatal_injury.check("daly_fatal_injury")?;
        self.traffic_externality_multiplier.check("traffic_externality_multiplier")?;
        self.p_poison_per_hi_day.check("p_poison_per_hi_day")?;
        self.poison_case_fatality.check("poison_case_fatality")?;
        self.poison_daly_nonfatal.check("poison_daly_nonfatal")?;
        self.p_hangover_given_binge.check("p_hangover_given_binge")?;
        self.hangover_ls_loss_per_day.check("hangover_ls_loss_per_day")?;
        check_len(&self.hangover_duration_days, "hangover_duration_days")?;
        self.rr10_all_cancer.check("rr10_all_cancer")?;
        self.cancer_causal_weight.check("cancer_causal_weight")?;
        self.baseline_daly_cancer.check("baseline_daly_cancer")?;
        self.rr_cirrhosis_25.check("rr_cirrhosis_25")?;
        self.rr_cirrhosis_50.check("rr_cirrhosis_50")?;
        self.rr_cirrhosis_100.check("rr_cirrhosis_100")?;
        self.baseline_daly_cirrhosis.check("baseline_daly_cirrhosis")?;
        self.rr_af_per_drink.check("rr_af_per_drink")?;
        self.baseline_daly_af.check("baseline_daly_af")?;
        check_len(&self.include_ihd_protection, "include_ihd_protection")?;
        self.ihd_rr_nadir.check("ihd_rr_nadir")?;
        check_len(&self.binge_negates_ihd, "binge_negates_ihd")?;
        self.baseline_daly_ihd.check("baseline_daly_ihd")?;
        self.aud_onset_base.check("aud_onset_base")?;
        self.aud_remission.check("aud_remission")?;
        self.aud_relapse_base.check("aud_relapse_base")?;
        self.aud_relapse_mult_if_risk.check("aud_relapse_mult_if_risk")?;
        self.aud_disability_weight.check("aud_disability_weight")?;
        self.aud_depression_ls_addon.check("aud_depression_ls_addon")?;
        self.mental_health_causal_weight.check("mental_health_causal_weight")?;

        // Log-space interpolation needs strictly positive anchors.
        let anchors = [&self.rr_cirrhosis_25, &self.rr_cirrhosis_50, &self.rr_cirrhosis_100];
        if anchors.iter().flat_map(|c| c.values()).any(|rr| *rr <= 0.0) {
            return Err(SimError::InvalidConfig("cirrhosis RR anchors must be > 0".into()));
        }
        if self.binge_threshold.values().contains(&0) {
            return Err(SimError::InvalidConfig("binge_threshold choices must be >= 1".into()));
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Result<NegativeParams> {
        Ok(NegativeParams {
            grams_per_drink: self.grams_per_drink.pick("grams_per_drink", rng)?,
            qaly_to_wellby: self.qaly_to_wellby.pick("qaly_to_wellby", rng)?,
            causal_weight: self.causal_weight.pick("causal_weight", rng)?,
            binge_threshold: self.binge_threshold.pick("binge_threshold", rng)?,
            high_intensity_multiplier: self
                .high_intensity_multiplier
                .pick("high_intensity_multiplier", rng)?,
            half_life_chronic: self.half_life_chronic.pick("half_life_chronic", rng)?,
            half_life_cancer: self.half_life_cancer.pick("half_life_cancer", rng)?,
            half_life_cirrhosis: self.half_life_cirrhosis.pick("half_life_cirrhosis", rng)?,
            rr10_traffic: self.rr10_traffic.pick("rr10_traffic", rng)?,
            rr10_nontraffic: self.rr10_nontraffic.pick("rr10_nontraffic", rng)?,
            rr_per_drink_violence: self.rr_per_drink_violence.pick("rr_per_drink_violence", rng)?,
            p0_injury_per_drinking_day: self
                .p0_injury_per_drinking_day
                .pick("p0_injury_per_drinking_day", rng)?,
            p0_violence_per_binge_day: self
                .p0_violence_per_binge_day
                .pick("p0_violence_per_binge_day", rng)?,
            daly_nonfatal_injury: self.daly_nonfatal_injury.pick("daly_nonfatal_injury", rng)?,
            injury_case_fatality: self.injury_case_fatality.pick("injury_case_fatality", rng)?,
            daly_fatal_injury: self.daly_fatal_injury.pick("daly_fatal_injury", rng)?,
            traffic_externality_multiplier: self
                .traffic_externality_multiplier
                .pick("traffic_externality_multiplier", rng)?,
            p_poison_per_hi_day: self.p_poison_per_hi_day.pick("p_poison_per_hi_day", rng)?,
            poison_case_fatality: self.poison_case_fatality.pick("poison_case_fatality", rng)?,
            poison_daly_nonfatal: self.poison_daly_nonfatal.pick("poison_daly_nonfatal", rng)?,
            p_hangover_given_binge: self
                .p_hangover_given_binge
                .pick("p_hangover_given_binge", rng)?,
            hangover_ls_loss_per_day: self
                .hangover_ls_loss_per_day
                .pick("hangover_ls_loss_per_day", rng)?,
            hangover_duration_days: self
                .hangover_duration_days
                .pick("hangover_duration_days", rng)?,
            rr10_all_cancer: self.rr10_all_cancer.pick("rr10_all_cancer", rng)?,
            cancer_causal_weight: self.cancer_causal_weight.pick("cancer_causal_weight", rng)?,
            baseline_daly_cancer: self.baseline_daly_cancer.pick("baseline_daly_cancer", rng)?,
            rr_cirrhosis_25: self.rr_cirrhosis_25.pick("rr_cirrhosis_25", rng)?,
            rr_cirrhosis_50: self.rr_cirrhosis_50.pick("rr_cirrhosis_50", rng)?,
            rr_cirrhosis_100: self.rr_cirrhosis_100.pick("rr_cirrhosis_100", rng)?,
            baseline_daly_cirrhosis: self
                .baseline_daly_cirrhosis
                .pick("baseline_daly_cirrhosis", rng)?,
            rr_af_per_drink: self.rr_af_per_drink.pick("rr_af_per_drink", rng)?,
            baseline_daly_af: self.baseline_daly_af.pick("baseline_daly_af", rng)?,
            include_ihd_protection: self
                .include_ihd_protection
                .pick("include_ihd_protection", rng)?,
            ihd_rr_nadir: self.ihd_rr_nadir.pick("ihd_rr_nadir", rng)?,
            binge_negates_ihd: self.binge_negates_ihd.pick("binge_negates_ihd", rng)?,
            baseline_daly_ihd: self.baseline_daly_ihd.pick("baseline_daly_ihd", rng)?,
            aud_onset_base: self.aud_onset_base.pick("aud_onset_base", rng)?,
            aud_remission: self.aud_remission.pick("aud_remission", rng)?,
            aud_relapse_base: self.aud_relapse_base.pick("aud_relapse_base", rng)?,
            aud_relapse_mult_if_risk: self
                .aud_relapse_mult_if_risk
                .pick("aud_relapse_mult_if_risk", rng)?,
            aud_disability_weight: self.aud_disability_weight.pick("aud_disability_weight", rng)?,
            aud_depression_ls_addon: self
                .aud_depression_ls_addon
                .pick("aud_depression_ls_addon", rng)?,
            mental_health_causal_weight: self
                .mental_health_causal_weight
                .pick("mental_health_causal_weight", rng)?,
        })
    }
}

/// Epidemiological parameters of one individual.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NegativeParams {
    pub grams_per_drink: u32,
    pub qaly_to_wellby: f64,
    /// Attenuation applied to observational associations.
    pub causal_weight: f64,

    pub binge_threshold: u32,
    pub high_intensity_multiplier: u32,

    pub half_life_chronic: f64,
    pub half_life_cancer: f64,
    pub half_life_cirrhosis: f64,

    pub rr10_traffic: f64,
    pub rr10_nontraffic: f64,
    pub rr_per_drink_violence: f64,
    pub p0_injury_per_drinking_day: f64,
    pub p0_violence_per_binge_day: f64,
    pub daly_nonfatal_injury: f64,
    pub injury_case_fatality: f64,
    pub daly_fatal_injury: f64,
    pub traffic_externality_multiplier: f64,

    pub p_poison_per_hi_day: f64,
    pub poison_case_fatality: f64,
    pub poison_daly_nonfatal: f64,

    pub p_hangover_given_binge: f64,
    pub hangover_ls_loss_per_day: f64,
    pub hangover_duration_days: u32,

    pub rr10_all_cancer: f64,
    pub cancer_causal_weight: f64,
    pub baseline_daly_cancer: f64,

    pub rr_cirrhosis_25: f64,
    pub rr_cirrhosis_50: f64,
    pub rr_cirrhosis_100: f64,
    pub baseline_daly_cirrhosis: f64,

    pub rr_af_per_drink: f64,
    pub baseline_daly_af: f64,

    pub include_ihd_protection: bool,
    pub ihd_rr_nadir: f64,
    pub binge_negates_ihd: bool,
    pub baseline_daly_ihd: f64,

    pub aud_onset_base: f64,
    pub aud_remission: f64,
    pub aud_relapse_base: f64,
    pub aud_relapse_mult_if_risk: f64,
    pub aud_disability_weight: f64,
    pub aud_depression_ls_addon: f64,
    pub mental_health_causal_weight: f64,
}

impl NegativeParams {
    pub fn high_intensity_threshold(&self) -> u32 {
        self.high_intensity_multiplier.saturating_mul(self.binge_threshold)
    }

    pub fn is_binge(&self, drinks: u32) -> bool {
        drinks >= self.binge_threshold
    }

    pub fn is_high_intensity(&self, drinks: u32) -> bool {
        drinks >= self.high_intensity_threshold()
    }

    pub fn grams(&self, drinks: u32) -> f64 {
        drinks as f64 * self.grams_per_drink as f64
    }
}
