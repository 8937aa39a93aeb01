pub mod analysis;
pub mod aud;
pub mod config;
pub mod day_count;
pub mod error;
pub mod logging;
pub mod params;
pub mod positive;
pub mod risk;
pub mod rollout;
pub mod simulation;
pub mod types;

pub use config::{DayCountModel, Mode, SimulationConfig};
pub use error::{Result, SimError};
pub use rollout::SimOut;
pub use simulation::{SweepGrid, SweepReport, run_many, run_sweep, simulate_one_person};
