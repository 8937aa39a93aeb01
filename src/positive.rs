use crate::day_count::DrinkPmf;
use crate::error::Result;
use crate::params::PositiveParams;

/// Saturating dose term shared by all four uplift components.
/// Zero for zero drinks, approaching 1 as drinks grow.
pub fn saturating_gain(drinks: u32, saturation_rate: f64) -> f64 {
    if drinks == 0 {
        return 0.0;
    }
    1.0 - (-saturation_rate * drinks as f64).exp()
}

/// Daily life-satisfaction uplift, clamped to `[0, max_daily_ls_uplift]`.
pub fn daily_uplift(person: &PositiveParams, drinks: u32, social_day: bool) -> f64 {
    let gain = saturating_gain(drinks, person.saturation_rate);

    let enjoyment = person.w_enjoyment * gain;
    let relaxation = person.w_relaxation * gain * (0.5 + 0.5 * person.baseline_stress);
    let social = if social_day {
        let setting = person.social_setting_quality * (1.2 - 0.6 * person.baseline_sociability);
        person.w_social * gain * setting
    } else {
        0.0
    };
    let mood = person.w_mood * gain;

    let session_score = person.responsiveness * (enjoyment + relaxation + social + mood);
    (person.ls_per_session_score * session_score).clamp(0.0, person.max_daily_ls_uplift)
}

/// Expected daily uplift over the drink PMF and the social/non-social mix.
pub fn expected_daily_uplift(person: &PositiveParams, pmf: &DrinkPmf) -> Result<f64> {
    let p_social = person.p_social_day;
    pmf.expect("positive uplift", |d| {
        (1.0 - p_social) * daily_uplift(person, d, false) + p_social * daily_uplift(person, d, true)
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::DayCountModel;
    use crate::day_count::DayCounts;

    fn person() -> PositiveParams {
        PositiveParams {
            p_social_day: 0.35,
            baseline_stress: 0.6,
            baseline_sociability: 0.4,
            social_setting_quality: 0.7,
            responsiveness: 1.0,
            saturation_rate: 0.7,
            ls_per_session_score: 0.25,
            w_enjoyment: 1.0,
            w_relaxation: 0.8,
            w_social: 1.1,
            w_mood: 0.5,
            max_daily_ls_uplift: 1.5,
        }
    }

    #[test]
    fn zero_drinks_zero_uplift() {
        assert_eq!(daily_uplift(&person(), 0, false), 0.0);
        assert_eq!(daily_uplift(&person(), 0, true), 0.0);
    }

    /// One drink, non-social: gain = 1 − e^−0.7, terms 1.0 + 0.8·0.8 + 0.5.
    #[test]
    fn single_drink_hand_computed() {
        let gain = 1.0 - (-0.7f64).exp();
        let expected = 0.25 * (1.0 * gain + 0.8 * gain * 0.8 + 0.5 * gain);
        assert!((daily_uplift(&person(), 1, false) - expected).abs() < 1e-12);
    }

    #[test]
    fn social_day_adds_uplift() {
        let p = person();
        assert!(daily_uplift(&p, 2, true) > daily_uplift(&p, 2, false));
    }

    #[test]
    fn uplift_capped() {
        let mut p = person();
        p.responsiveness = 1.4;
        p.ls_per_session_score = 0.5;
        p.max_daily_ls_uplift = 1.0;
        assert_eq!(daily_uplift(&p, 12, true), 1.0);
    }

    #[test]
    fn expectation_mixes_social_weight() {
        let p = person();
        let pmf = DayCounts::new(DayCountModel::Constant, 12, 6).pmf(3.0).unwrap();
        let expected = 0.65 * daily_uplift(&p, 3, false) + 0.35 * daily_uplift(&p, 3, true);
        assert!((expected_daily_uplift(&p, &pmf).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn expectation_zero_for_abstainer() {
        let pmf = DayCounts::new(DayCountModel::Poisson, 12, 6).pmf(0.0).unwrap();
        assert_eq!(expected_daily_uplift(&person(), &pmf).unwrap(), 0.0);
    }

    proptest! {
        #[test]
        fn uplift_monotone_and_bounded(
            drinks in 0u32..30,
            social in any::<bool>(),
            saturation in 0.1f64..2.0,
            responsiveness in 0.1f64..2.0,
            cap in 0.5f64..3.0,
        ) {
            let mut p = person();
            p.saturation_rate = saturation;
            p.responsiveness = responsiveness;
            p.max_daily_ls_uplift = cap;
            let here = daily_uplift(&p, drinks, social);
            let next = daily_uplift(&p, drinks + 1, social);
            prop_assert!(next >= here);
            prop_assert!(here >= 0.0 && here <= cap);
        }
    }
}
