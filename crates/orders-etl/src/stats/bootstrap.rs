//! Bootstrap confidence interval for a difference of group means.

use super::outliers::quantile_linear;
use crate::error::{EtlError, Result};
use crate::types::BootstrapEstimate;
use crate::utils::finite_values;
use polars::prelude::*;
use rand::prelude::*;
use tracing::debug;

/// Resample both groups `n_boot` times and report the observed difference of
/// means `mean(w) - mean(u)` with a 95% percentile interval.
///
/// Values that are not numbers are dropped before resampling. The same
/// `seed` always gives the same interval.
///
/// # Errors
///
/// `EmptyGroup` if either group has no numbers, `InvalidArgument` if
/// `n_boot` is zero.
pub fn bootstrap_diff_means(
    w: &Series,
    u: &Series,
    n_boot: usize,
    seed: u64,
) -> Result<BootstrapEstimate> {
    if n_boot == 0 {
        return Err(EtlError::InvalidArgument(
            "bootstrap needs at least one resample".to_string(),
        ));
    }

    let w_clean = clean_group(w, "w")?;
    let u_clean = clean_group(u, "u")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut diffs: Vec<f64> = (0..n_boot)
        .map(|_| resample_mean(&w_clean, &mut rng) - resample_mean(&u_clean, &mut rng))
        .collect();
    diffs.sort_by(f64::total_cmp);

    let estimate = BootstrapEstimate {
        diff_mean: mean(&w_clean) - mean(&u_clean),
        ci_low: quantile_linear(&diffs, 0.025)?,
        ci_high: quantile_linear(&diffs, 0.975)?,
    };
    debug!(
        "Bootstrap ({} resamples): diff={:.4} ci=[{:.4}, {:.4}]",
        n_boot, estimate.diff_mean, estimate.ci_low, estimate.ci_high
    );
    Ok(estimate)
}

fn clean_group(series: &Series, label: &str) -> Result<Vec<f64>> {
    let values = finite_values(series)?;
    if values.is_empty() {
        return Err(EtlError::EmptyGroup(label.to_string()));
    }
    Ok(values)
}

fn resample_mean(values: &[f64], rng: &mut StdRng) -> f64 {
    let n = values.len();
    let total: f64 = (0..n).map(|_| values[rng.gen_range(0..n)]).sum();
    total / n as f64
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
