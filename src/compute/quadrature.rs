//! Midpoint-rule quadrature
//!
//! The sum is accumulated in strictly increasing increment order. Floating-point
//! addition is not associative, so changing the loop order (or splitting it
//! across threads) would change the low bits of the result.

use super::partition::Tile;

/// Midpoint-rule sum of `f` over `steps` increments of `step_size` starting at `start`
///
/// Increment `j` contributes `f(start + j * step_size + step_size / 2) * step_size`.
pub fn integrate<F>(f: F, start: f64, steps: u64, step_size: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let half = step_size / 2.0;
    let mut sum = 0.0;
    for j in 0..steps {
        let lower = start + j as f64 * step_size;
        sum += f(lower + half) * step_size;
    }
    sum
}

/// Integrate `f` over a participant's tile
pub fn integrate_tile<F>(f: F, tile: &Tile) -> f64
where
    F: Fn(f64) -> f64,
{
    integrate(f, tile.interval.lower, tile.steps, tile.step_size)
}
