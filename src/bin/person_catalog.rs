use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use utilons::config::SimulationConfig;
use utilons::logging::init_tracing;
use utilons::params::{NegativeParams, PositiveParams};
use utilons::simulation::run_rng;
use utilons::types::RunId;

/// One sampled individual. Run `i` here is the same person as run `i` of a
/// batch with the same seed and menus.
#[derive(Serialize)]
struct Person {
    run: RunId,
    positive: PositiveParams,
    negative: NegativeParams,
}

fn main() -> Result<()> {
    init_tracing();
    let config = SimulationConfig::canonical();

    let n: u64 = match env::args().nth(1) {
        Some(s) => s.parse().with_context(|| format!("expected a run count, got {s:?}"))?,
        None => config.num_runs,
    };

    let mut people = Vec::with_capacity(n as usize);
    for i in 0..n {
        let mut rng = run_rng(config.seed, RunId(i));
        people.push(Person {
            run: RunId(i),
            positive: config.positive_menus.sample(&mut rng)?,
            negative: config.negative_menus.sample(&mut rng)?,
        });
    }

    // NDJSON to stdout.
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for p in &people {
        serde_json::to_writer(&mut out, p).context("serialisation failed")?;
        writeln!(out)?;
    }
    out.flush()?;

    // Per-parameter value counts to stderr.
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for p in &people {
        for (group, params) in [("pos", serde_json::to_value(p.positive)?), ("neg", serde_json::to_value(p.negative)?)] {
            let Value::Object(fields) = params else { continue };
            for (name, value) in fields {
                *counts
                    .entry(format!("{group}.{name}"))
                    .or_default()
                    .entry(value.to_string())
                    .or_insert(0) += 1;
            }
        }
    }

    eprintln!("person_catalog: {n} individuals, seed {}", config.seed);
    for (name, values) in &counts {
        let cells: Vec<String> = values.iter().map(|(v, c)| format!("{v}×{c}")).collect();
        eprintln!("  {name:<36} {}", cells.join("  "));
    }
    Ok(())
}
