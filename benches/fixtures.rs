use utilons::config::{DayCountModel, Mode, SimulationConfig};

pub struct Scenario {
    pub runs: u64,
    pub years: u32,
    pub drinks_per_day: f64,
}

pub const SMALL: Scenario = Scenario { runs: 10, years: 10, drinks_per_day: 1.5 };

pub const MEDIUM: Scenario = Scenario { runs: 50, years: 30, drinks_per_day: 3.0 };

pub const LARGE: Scenario = Scenario { runs: 200, years: 60, drinks_per_day: 6.0 };

pub fn build_config(scenario: &Scenario, mode: Mode, model: DayCountModel) -> SimulationConfig {
    SimulationConfig {
        num_runs: scenario.runs,
        years: scenario.years,
        drinks_per_day: scenario.drinks_per_day,
        mode,
        day_count_model: model,
        ..SimulationConfig::canonical()
    }
}

/// Simulated days across all runs of a scenario.
pub fn person_days(scenario: &Scenario) -> u64 {
    scenario.runs * scenario.years as u64 * 365
}
