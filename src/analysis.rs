use std::io::{self, Write};

use crate::rollout::SimOut;

/// Percentiles reported for every summarized metric.
pub const QUANTILES: [u32; 9] = [1, 5, 10, 25, 50, 75, 90, 95, 99];

/// Distribution statistics for one metric across N runs.
#[derive(Debug, Clone, PartialEq)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// `(q, value)` for each entry of `QUANTILES`.
    pub quantiles: Vec<(u32, f64)>,
}

impl DistStats {
    pub fn quantile(&self, q: u32) -> Option<f64> {
        self.quantiles.iter().find(|(k, _)| *k == q).map(|(_, v)| *v)
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Linear interpolation between closest ranks, `p` in percent.
fn interp(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if p <= 0.0 {
        return sorted[0];
    }
    if p >= 100.0 {
        return sorted[n - 1];
    }
    let h = p / 100.0 * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// The `p`-th percentile (0–100). `None` for an empty series.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(interp(&sorted(values), p))
}

/// Median of a series; NaN when empty.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0).unwrap_or(f64::NAN)
}

pub fn summarize(values: &[f64]) -> Option<DistStats> {
    if values.is_empty() {
        return None;
    }
    let v = sorted(values);
    let n = v.len();
    let mean = v.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    Some(DistStats {
        n,
        min: v[0],
        max: v[n - 1],
        mean,
        std_dev: variance.sqrt(),
        quantiles: QUANTILES.iter().map(|&q| (q, interp(&v, q as f64))).collect(),
    })
}

// ── Metrics ──────────────────────────────────────────────────────────────────

/// Headline series reported per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Positive,
    Negative,
    Net,
    Acute,
    Hangover,
    Chronic,
    Aud,
    Ihd,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Positive,
        Metric::Negative,
        Metric::Net,
        Metric::Acute,
        Metric::Hangover,
        Metric::Chronic,
        Metric::Aud,
        Metric::Ihd,
    ];

    /// Short name used in CSV output.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Positive => "positive",
            Metric::Negative => "negative",
            Metric::Net => "net",
            Metric::Acute => "acute",
            Metric::Hangover => "hangover",
            Metric::Chronic => "chronic",
            Metric::Aud => "aud",
            Metric::Ihd => "ihd",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::Positive => "Positive utilons (discounted lifetime)",
            Metric::Negative => "Negative utilons (discounted lifetime)",
            Metric::Net => "Net utilons = Positive - Negative (discounted lifetime)",
            Metric::Acute => "Negative breakdown: acute",
            Metric::Hangover => "Negative breakdown: hangover",
            Metric::Chronic => "Negative breakdown: chronic health proxies",
            Metric::Aud => "Negative breakdown: AUD Markov",
            Metric::Ihd => "IHD protection term (separate; not netted)",
        }
    }

    pub fn of(self, out: &SimOut) -> f64 {
        match self {
            Metric::Positive => out.positive,
            Metric::Negative => out.negative,
            Metric::Net => out.net,
            Metric::Acute => out.acute,
            Metric::Hangover => out.hangover,
            Metric::Chronic => out.chronic,
            Metric::Aud => out.aud,
            Metric::Ihd => out.ihd,
        }
    }

    pub fn series(self, runs: &[SimOut]) -> Vec<f64> {
        runs.iter().map(|r| self.of(r)).collect()
    }
}

// ── Decile contributions ─────────────────────────────────────────────────────

/// The nine harm components that make up `negative`.
pub const COMPONENTS: [(&str, fn(&SimOut) -> f64); 9] = [
    ("acute_traffic", |o: &SimOut| o.acute_traffic),
    ("acute_nontraffic", |o: &SimOut| o.acute_nontraffic),
    ("acute_violence", |o: &SimOut| o.acute_violence),
    ("acute_poison", |o: &SimOut| o.acute_poisoning),
    ("hangover", |o: &SimOut| o.hangover),
    ("chronic_cancer", |o: &SimOut| o.chronic_cancer),
    ("chronic_cirrhosis", |o: &SimOut| o.chronic_cirrhosis),
    ("chronic_af", |o: &SimOut| o.chronic_af),
    ("aud", |o: &SimOut| o.aud),
];

/// Mean percentage share of each component in one net-utilon decile.
#[derive(Debug, Clone, PartialEq)]
pub struct DecileRow {
    /// 1-based; D1 holds the lowest net utilons.
    pub decile: usize,
    pub n: usize,
    pub shares: [f64; 9],
}

/// Each run's component shares of its total negative, as percentages
/// (all zero when the run has no negative), averaged per decile of runs
/// sorted by net. Empty deciles are skipped.
pub fn decile_contributions(runs: &[SimOut]) -> Vec<DecileRow> {
    let mut ranked: Vec<(f64, [f64; 9])> = runs
        .iter()
        .map(|r| {
            let comps = COMPONENTS.map(|(_, f)| f(r));
            let denom: f64 = comps.iter().sum();
            let shares = if denom > 0.0 { comps.map(|c| 100.0 * c / denom) } else { [0.0; 9] };
            (r.net, shares)
        })
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let len = ranked.len();
    (0..10)
        .filter_map(|d| {
            let (start, end) = (d * len / 10, (d + 1) * len / 10);
            if end <= start {
                return None;
            }
            let mut shares = [0.0; 9];
            for (_, s) in &ranked[start..end] {
                for (acc, v) in shares.iter_mut().zip(s) {
                    *acc += v;
                }
            }
            let n = end - start;
            Some(DecileRow { decile: d + 1, n, shares: shares.map(|v| v / n as f64) })
        })
        .collect()
}

// ── Histograms ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub left: f64,
    pub right: f64,
    pub count: usize,
}

/// Equal-width bins over `[min, max]`. A constant series lands entirely in
/// bin 0. `bins` below 1 is treated as 1.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() {
        return Vec::new();
    }
    let n_bins = bins.max(1);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        let mut out = vec![HistogramBin { left: min, right: max, count: 0 }; n_bins];
        out[0].count = values.len();
        return out;
    }

    let width = (max - min) / n_bins as f64;
    let mut out: Vec<HistogramBin> = (0..n_bins)
        .map(|i| {
            let left = min + i as f64 * width;
            let right = if i == n_bins - 1 { max } else { left + width };
            HistogramBin { left, right, count: 0 }
        })
        .collect();
    for &x in values {
        let idx = (((x - min) / width) as usize).min(n_bins - 1);
        out[idx].count += 1;
    }
    out
}

/// `metric,bin,left,right,count` rows for every metric.
pub fn write_histogram_csv<W: Write>(mut w: W, runs: &[SimOut], bins: usize) -> io::Result<()> {
    writeln!(w, "metric,bin,left,right,count")?;
    for metric in Metric::ALL {
        for (i, b) in histogram(&metric.series(runs), bins).iter().enumerate() {
            writeln!(w, "{},{i},{:.10},{:.10},{}", metric.name(), b.left, b.right, b.count)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(net: f64, traffic: f64, aud: f64) -> SimOut {
        SimOut {
            net,
            acute_traffic: traffic,
            acute: traffic,
            aud,
            negative: traffic + aud,
            ..SimOut::default()
        }
    }

    #[test]
    fn summarize_known_values() {
        let ds = summarize(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(ds.n, 5);
        assert!((ds.min - 1.0).abs() < 1e-10, "min");
        assert!((ds.max - 5.0).abs() < 1e-10, "max");
        assert!((ds.quantile(50).unwrap() - 3.0).abs() < 1e-10, "p50");
        assert!((ds.quantile(25).unwrap() - 2.0).abs() < 1e-10, "p25");
        assert!((ds.mean - 3.0).abs() < 1e-10, "mean");
        assert_eq!(ds.quantiles.len(), QUANTILES.len());
    }

    #[test]
    fn summarize_empty_returns_none() {
        assert!(summarize(&[]).is_none());
        assert!(percentile(&[], 50.0).is_none());
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn percentile_interpolates() {
        // h = 0.5·(2−1) = 0.5 → halfway between 0.5 and 1.0.
        assert!((median(&[1.0, 0.5]) - 0.75).abs() < 1e-12);
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 0.0), Some(1.0));
        assert_eq!(percentile(&[1.0, 2.0, 3.0], 100.0), Some(3.0));
    }

    #[test]
    fn deciles_split_sorted_runs() {
        // 20 runs: the 10 lowest-net are all traffic, the rest all AUD.
        let mut runs: Vec<SimOut> = (0..10).map(|i| out(i as f64, 1.0, 0.0)).collect();
        runs.extend((10..20).map(|i| out(i as f64, 0.0, 2.0)));
        runs.reverse();
        let rows = decile_contributions(&runs);
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().all(|r| r.n == 2));
        assert_eq!(rows[0].shares[0], 100.0);
        assert_eq!(rows[0].shares[8], 0.0);
        assert_eq!(rows[9].shares[8], 100.0);
    }

    #[test]
    fn decile_shares_sum_to_hundred_or_zero() {
        let runs = vec![out(1.0, 1.0, 3.0), out(2.0, 0.0, 0.0), out(3.0, 2.0, 2.0)];
        for row in decile_contributions(&runs) {
            let total: f64 = row.shares.iter().sum();
            assert!(total.abs() < 1e-9 || (total - 100.0).abs() < 1e-9, "{total}");
        }
    }

    #[test]
    fn small_batches_skip_empty_deciles() {
        let runs = vec![out(1.0, 1.0, 0.0), out(2.0, 1.0, 0.0), out(3.0, 1.0, 0.0)];
        let rows = decile_contributions(&runs);
        assert_eq!(rows.iter().map(|r| r.n).sum::<usize>(), 3);
        assert!(rows.len() < 10);
    }

    #[test]
    fn histogram_counts_everything() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let h = histogram(&values, 7);
        assert_eq!(h.len(), 7);
        assert_eq!(h.iter().map(|b| b.count).sum::<usize>(), 100);
        assert_eq!(h[0].left, 0.0);
        assert_eq!(h[6].right, 99.0);
        // Max value lands in the last bin.
        assert!(h[6].count > 0);
    }

    #[test]
    fn constant_series_fills_first_bin() {
        let h = histogram(&[2.5; 12], 5);
        assert_eq!(h[0].count, 12);
        assert!(h[1..].iter().all(|b| b.count == 0 && b.left == 2.5 && b.right == 2.5));
    }

    #[test]
    fn csv_has_row_per_metric_bin() {
        let runs = vec![out(1.0, 1.0, 0.0), out(2.0, 0.5, 1.0)];
        let mut buf = Vec::new();
        write_histogram_csv(&mut buf, &runs, 4).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1 + Metric::ALL.len() * 4);
        assert!(text.starts_with("metric,bin,left,right,count\n"));
        assert!(text.contains("\nnet,0,"));
    }
}
