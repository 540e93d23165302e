//! Static domain partitioning
//!
//! The global interval is cut into `P` equal-width tiles, one per participant,
//! and the global step count is divided among them with truncating integer
//! division. Every participant samples with the *global* increment
//! `(upper - lower) / N`, so a tile's samples cover `steps * step_size` of its
//! width.
//!
//! # Remainder handling
//!
//! With the default [`RemainderPolicy::Truncate`] every participant gets exactly
//! `N / P` increments and up to `P - 1` increments are silently left out of the
//! aggregate when `N` is not a multiple of `P`. [`RemainderPolicy::AbsorbLast`]
//! hands the leftover increments to the last participant instead.

use crate::distributed::group::{ParticipantContext, ParticipantId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed-open integration interval `[lower, upper)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lower, self.upper)
    }
}

/// What to do with the `N mod P` increments that do not divide evenly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RemainderPolicy {
    /// Every participant gets `N / P`; the remainder is dropped
    #[default]
    Truncate,
    /// The last participant also takes the remainder
    AbsorbLast,
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemainderPolicy::Truncate => f.write_str("truncate"),
            RemainderPolicy::AbsorbLast => f.write_str("absorb-last"),
        }
    }
}

/// One participant's share of the work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Participant that owns this tile
    pub owner: ParticipantId,
    /// Sub-interval assigned to the owner
    pub interval: Interval,
    /// Number of midpoint increments the owner evaluates
    pub steps: u64,
    /// Width of one increment (global, identical for every tile)
    pub step_size: f64,
}

/// Derive the tile owned by `ctx.id()`
///
/// Callers guarantee `steps > 0`; the group size is positive by construction of
/// [`ParticipantContext`].
pub fn partition(
    global: Interval,
    steps: u64,
    ctx: &ParticipantContext,
    policy: RemainderPolicy,
) -> Tile {
    let group_size = ctx.group_size();
    let id = ctx.id();

    let width = global.width() / group_size as f64;
    let start = global.lower + id as f64 * width;

    let mut local_steps = steps / group_size as u64;
    if policy == RemainderPolicy::AbsorbLast && ctx.is_last() {
        local_steps += steps % group_size as u64;
    }

    Tile {
        owner: id,
        interval: Interval::new(start, start + width),
        steps: local_steps,
        step_size: global.width() / steps as f64,
    }
}

/// Derive every participant's tile, in ascending id order
pub fn partition_all(
    global: Interval,
    steps: u64,
    group_size: usize,
    policy: RemainderPolicy,
) -> Vec<Tile> {
    ParticipantContext::all(group_size)
        .map(|ctx| partition(global, steps, &ctx, policy))
        .collect()
}

/// Increments left out of the aggregate under `policy`
pub fn dropped_steps(steps: u64, group_size: usize, policy: RemainderPolicy) -> u64 {
    match policy {
        RemainderPolicy::Truncate => steps % group_size as u64,
        RemainderPolicy::AbsorbLast => 0,
    }
}
