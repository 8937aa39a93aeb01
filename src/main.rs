use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use utilons::analysis::{self, COMPONENTS, Metric};
use utilons::config::{DayCountModel, Mode, SimulationConfig};
use utilons::logging::init_tracing;
use utilons::rollout::SimOut;
use utilons::simulation::{SweepGrid, SweepReport, run_many, run_sweep};

/// Lifetime alcohol wellbeing simulator: discounted positive vs negative
/// utilons for sampled individuals at a given drinks/day.
#[derive(Parser, Debug)]
#[command(name = "utilons", version)]
struct Args {
    /// TOML configuration file. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    drinks_per_day: Option<f64>,

    #[arg(long)]
    runs: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    years: Option<u32>,

    /// expected | daily
    #[arg(long)]
    mode: Option<Mode>,

    /// constant | two_point | poisson
    #[arg(long)]
    day_count_model: Option<DayCountModel>,

    /// Sweep drinks/day over a grid and report the median net per point.
    #[arg(long)]
    sweep: bool,

    #[arg(long)]
    sweep_min: Option<f64>,

    #[arg(long)]
    sweep_max: Option<f64>,

    #[arg(long)]
    sweep_step: Option<f64>,

    #[arg(long)]
    runs_per_point: Option<u64>,

    /// Write every run's outcome as NDJSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write histogram bins for every metric as CSV.
    #[arg(long)]
    hist_data_out: Option<PathBuf>,

    #[arg(long)]
    print_hist_data: bool,

    #[arg(long, default_value_t = 70)]
    hist_bins: usize,

    /// Suppress the printed report.
    #[arg(long)]
    quiet: bool,
}

impl Args {
    fn build_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SimulationConfig::canonical(),
        };
        if let Some(d) = self.drinks_per_day {
            config.drinks_per_day = d;
        }
        if let Some(n) = self.runs {
            config.num_runs = n;
        }
        if let Some(s) = self.seed {
            config.seed = s;
        }
        if let Some(y) = self.years {
            config.years = y;
        }
        if let Some(m) = self.mode {
            config.mode = m;
        }
        if let Some(m) = self.day_count_model {
            config.day_count_model = m;
        }
        if let Some(v) = self.sweep_min {
            config.sweep.min = v;
        }
        if let Some(v) = self.sweep_max {
            config.sweep.max = v;
        }
        if let Some(v) = self.sweep_step {
            config.sweep.step = v;
        }
        if self.runs_per_point.is_some() {
            config.sweep.runs_per_point = self.runs_per_point;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = args.build_config()?;

    let runs = if args.sweep {
        let s = &config.sweep;
        let grid = SweepGrid::from_bounds(s.min, s.max, s.step)?;
        let report = run_sweep(&config, &grid).context("sweep failed")?;
        let all = report.all_runs();
        if !args.quiet {
            print_sweep(&report);
            print_decile_table(&all);
        }
        all
    } else {
        let runs = run_many(&config, config.num_runs).context("batch failed")?;
        if !args.quiet {
            print_header(&config);
            for metric in Metric::ALL {
                print_summary(metric, &metric.series(&runs));
            }
            print_decile_table(&runs);
        }
        runs
    };

    if let Some(path) = &args.output {
        write_ndjson(path, &runs)?;
        if !args.quiet {
            println!("\nRun outcomes written to: {}", path.display());
        }
    }

    if !args.sweep {
        if args.print_hist_data && !args.quiet {
            print_histograms(&runs, args.hist_bins);
        }
        if let Some(path) = &args.hist_data_out {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            analysis::write_histogram_csv(BufWriter::new(file), &runs, args.hist_bins)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !args.quiet {
                println!("\nHistogram data written to: {}", path.display());
            }
        }
    }
    Ok(())
}

fn write_ndjson(path: &Path, runs: &[SimOut]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for r in runs {
        serde_json::to_writer(&mut w, r).context("failed to serialize run")?;
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

fn print_header(c: &SimulationConfig) {
    println!("=== Lifetime Utilon Simulation (Positive + Negative) ===");
    println!("Runs: {}", c.num_runs);
    println!("Seed: {}", c.seed);
    println!("Horizon: {} years", c.years);
    println!(
        "Discount rate: {:.3}% (continuous exp(-r*t))",
        c.discount_rate_annual * 100.0
    );
    println!(
        "Exposure: drinks_per_day = {} using day_count_model={} and mode={}",
        c.drinks_per_day, c.day_count_model, c.mode
    );
}

fn print_summary(metric: Metric, values: &[f64]) {
    println!("\n--- {} ---", metric.title());
    let Some(ds) = analysis::summarize(values) else {
        println!("  (no runs)");
        return;
    };
    println!("Mean: {:.4}", ds.mean);
    for (q, v) in &ds.quantiles {
        println!("  p{q:02}: {v:.4}");
    }
}

fn print_decile_table(runs: &[SimOut]) {
    let rows = analysis::decile_contributions(runs);
    if rows.is_empty() {
        return;
    }
    println!("\n=== Event contribution summary by net-utilon decile ===");
    println!("(Rows sorted by run net utilons; cells show mean % contribution to total negative utility.)\n");
    print!("{:<8}{:<10}", "Decile", "n");
    for (label, _) in COMPONENTS {
        print!("{label:<19}");
    }
    println!();
    for row in rows {
        print!("{:<8}{:<10}", format!("D{}", row.decile), row.n);
        for v in row.shares {
            print!("{:<19}", format!("{v:.1}%"));
        }
        println!();
    }
}

fn print_sweep(report: &SweepReport) {
    println!("=== Sweep: median(net utilons) by drinks/day ===");
    for p in &report.points {
        println!("  drinks/day={:>5.2}  median_net={:>10.4}", p.drinks_per_day, p.median_net);
    }
    if let Some(best) = report.best_point() {
        println!(
            "\nBest (by median net utilons): drinks/day={:.2}  median_net={:.4}",
            best.drinks_per_day, best.median_net
        );
    }
}

fn print_histograms(runs: &[SimOut], bins: usize) {
    for metric in Metric::ALL {
        println!("\n--- Histogram data: {} ---", metric.name());
        println!("bin,left,right,count");
        for (i, b) in analysis::histogram(&metric.series(runs), bins).iter().enumerate() {
            println!("{i},{:.6},{:.6},{}", b.left, b.right, b.count);
        }
    }
}
