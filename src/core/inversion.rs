use tracing::{debug, trace};

use super::error::CalcError;

/// Hard ceiling on bisection steps regardless of configuration.
pub const MAX_BISECTION_ITERATIONS: u32 = 200;
pub const MAX_EXPANSIONS: u32 = 64;
pub const DEFAULT_BISECTION_ITERATIONS: u32 = 80;
pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectionConfig {
    pub iterations: u32,
    pub tolerance: f64,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_BISECTION_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

pub fn seed_upper_bound(target_net: f64) -> f64 {
    target_net.max(1.0) * 2.5 + 1_000_000.0
}

/// Smallest gross in `[0, hi]` whose net reaches `target_net`.
///
/// `net_fn` must be non-decreasing in gross. The upper bound is doubled from
/// [`seed_upper_bound`] until it brackets the target, then halved for at most
/// `config.iterations` steps. Failing to bracket, or finishing wider than
/// `config.tolerance`, is reported as [`CalcError::NonConvergence`].
pub fn solve_gross_for_target_net<F>(
    target_net: f64,
    net_fn: F,
    config: BisectionConfig,
) -> Result<f64, CalcError>
where
    F: Fn(f64) -> f64,
{
    validate_config(config)?;
    if !target_net.is_finite() || target_net < 0.0 {
        return Err(CalcError::invalid(
            "target_net",
            format!("target net {target_net} must be finite and >= 0"),
        ));
    }
    if net_fn(0.0) >= target_net {
        return Ok(0.0);
    }

    let mut lo = 0.0;
    let mut hi = seed_upper_bound(target_net);
    let mut expansions = 0;
    while !(net_fn(hi) >= target_net) {
        if expansions == MAX_EXPANSIONS {
            debug!(target_net, hi, "upper bound never reached the target");
            return Err(CalcError::NonConvergence {
                iterations: 0,
                gap: f64::INFINITY,
            });
        }
        lo = hi;
        hi *= 2.0;
        expansions += 1;
    }
    debug!(target_net, hi, expansions, "target bracketed");

    let mut it = 0;
    while it < config.iterations && hi - lo > config.tolerance {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let net_mid = net_fn(mid);
        trace!(iteration = it, lo, hi, net_mid, "bisection step");
        if net_mid >= target_net {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    let gap = hi - lo;
    if gap > config.tolerance {
        return Err(CalcError::NonConvergence {
            iterations: it,
            gap,
        });
    }
    Ok(hi)
}

fn validate_config(config: BisectionConfig) -> Result<(), CalcError> {
    if config.iterations == 0 || config.iterations > MAX_BISECTION_ITERATIONS {
        return Err(CalcError::invalid(
            "iterations",
            format!("must be between 1 and {MAX_BISECTION_ITERATIONS}"),
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(CalcError::invalid("tolerance", "must be > 0"));
    }
    Ok(())
}
