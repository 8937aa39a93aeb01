use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis;
use crate::config::{Mode, SimulationConfig};
use crate::error::{Result, SimError};
use crate::rollout::{DailyRollout, ExpectedRollout, LifeRollout, SimOut};
use crate::types::{RunId, SweepIndex};

/// Sweep grid values are kept while `≤ max + SWEEP_EPSILON`.
pub const SWEEP_EPSILON: f64 = 1e-12;

/// The random stream of one run: ChaCha20 keyed by the batch seed, on the
/// stream selected by the run index. Independent of thread scheduling.
pub fn run_rng(seed: u64, run: RunId) -> ChaCha20Rng {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    rng.set_stream(run.0);
    rng
}

/// Sample one individual and evaluate their lifetime under `config.mode`.
///
/// Parameters are drawn first, so for a given stream both modes see the same
/// individual.
pub fn simulate_one_person(config: &SimulationConfig, rng: &mut impl Rng) -> Result<SimOut> {
    let pos = config.positive_menus.sample(rng)?;
    let neg = config.negative_menus.sample(rng)?;
    match config.mode {
        Mode::Expected => ExpectedRollout::new(config)?.evaluate(&pos, &neg, rng),
        Mode::Daily => DailyRollout::new(config).evaluate(&pos, &neg, rng),
    }
}

/// Run `n` individuals. Results are in run order and identical across
/// invocations and thread counts. Any failing run aborts the batch.
pub fn run_many(config: &SimulationConfig, n: u64) -> Result<Vec<SimOut>> {
    config.validate()?;
    info!(
        runs = n,
        seed = config.seed,
        mode = %config.mode,
        model = %config.day_count_model,
        drinks_per_day = config.drinks_per_day,
        "batch start"
    );

    let outs = match config.mode {
        Mode::Expected => {
            let rollout = ExpectedRollout::new(config)?;
            debug!(p_drinking_day = rollout.pmf().p_drinking_day(), "expected-mode PMF ready");
            par_runs(config, n, |rng| {
                let pos = config.positive_menus.sample(rng)?;
                let neg = config.negative_menus.sample(rng)?;
                rollout.evaluate(&pos, &neg, rng)
            })?
        }
        Mode::Daily => {
            let rollout = DailyRollout::new(config);
            par_runs(config, n, |rng| {
                let pos = config.positive_menus.sample(rng)?;
                let neg = config.negative_menus.sample(rng)?;
                rollout.evaluate(&pos, &neg, rng)
            })?
        }
    };

    let deaths = outs.iter().filter(|o| o.died_early).count();
    info!(runs = outs.len(), deaths, median_net = analysis::median(&nets(&outs)), "batch end");
    Ok(outs)
}

fn par_runs<F>(config: &SimulationConfig, n: u64, run: F) -> Result<Vec<SimOut>>
where
    F: Fn(&mut ChaCha20Rng) -> Result<SimOut> + Sync,
{
    (0..n)
        .into_par_iter()
        .map(|i| run(&mut run_rng(config.seed, RunId(i))))
        .collect()
}

fn nets(outs: &[SimOut]) -> Vec<f64> {
    outs.iter().map(|o| o.net).collect()
}

// ── Exposure sweep ───────────────────────────────────────────────────────────

/// Drinks/day values `min + k·step`, ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepGrid {
    values: Vec<f64>,
}

impl SweepGrid {
    pub fn from_bounds(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(SimError::NonFinite("sweep bounds"));
        }
        if step <= 0.0 {
            return Err(SimError::InvalidConfig("sweep step must be > 0".into()));
        }
        let mut values = Vec::new();
        for k in 0u64.. {
            let v = min + k as f64 * step;
            if v > max + SWEEP_EPSILON {
                break;
            }
            values.push(v);
        }
        Ok(SweepGrid { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub index: SweepIndex,
    pub drinks_per_day: f64,
    pub median_net: f64,
    #[serde(skip)]
    pub runs: Vec<SimOut>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub points: Vec<SweepPoint>,
    /// Index into `points` of the highest median net; first wins on ties.
    pub best: Option<usize>,
}

impl SweepReport {
    pub fn best_point(&self) -> Option<&SweepPoint> {
        self.best.map(|i| &self.points[i])
    }

    /// Every run of every point, in grid order.
    pub fn all_runs(&self) -> Vec<SimOut> {
        self.points.iter().flat_map(|p| p.runs.iter().copied()).collect()
    }
}

/// Evaluate `runs_per_point` individuals at each grid value. Point `k` uses
/// seed `config.seed + k`.
pub fn run_sweep(config: &SimulationConfig, grid: &SweepGrid) -> Result<SweepReport> {
    let runs_per_point = config.runs_per_point();
    let mut points = Vec::with_capacity(grid.len());
    for (k, &d) in grid.values().iter().enumerate() {
        let point_config = SimulationConfig {
            drinks_per_day: d,
            seed: config.seed.wrapping_add(k as u64),
            num_runs: runs_per_point,
            ..config.clone()
        };
        let runs = run_many(&point_config, runs_per_point)?;
        let median_net = analysis::median(&nets(&runs));
        info!(index = k, drinks_per_day = d, median_net, "sweep point");
        points.push(SweepPoint { index: SweepIndex(k as u64), drinks_per_day: d, median_net, runs });
    }

    let mut best: Option<usize> = None;
    for (i, p) in points.iter().enumerate() {
        if best.is_none_or(|b| p.median_net > points[b].median_net) {
            best = Some(i);
        }
    }
    Ok(SweepReport { points, best })
}
