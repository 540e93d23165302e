//! Participant run loop
//!
//! One call to [`run`] is one participant's whole life:
//!
//! 1. derive its tile of the global interval
//! 2. integrate the tile (timed)
//! 3. take part in the aggregation: workers send, the coordinator gathers
//! 4. shutdown barrier
//! 5. coordinator only: append to the result log (and the JSON summary)
//!
//! The stopwatch starts right before the local integration and stops when the
//! participant's part of the aggregation is over, so the coordinator's elapsed
//! time includes waiting for the slowest worker.

use crate::compute::partition::{dropped_steps, partition, Tile};
use crate::compute::quadrature::integrate_tile;
use crate::config::Config;
use crate::distributed::aggregation::{aggregate, barrier, Aggregate, PartialResult};
use crate::distributed::group::ParticipantContext;
use crate::distributed::transport::Transport;
use crate::output::json::{write_summary, RunSummary};
use crate::output::record::{ResultRecorder, RunRecord};
use crate::output::text;
use crate::util::time::{measure, Stopwatch};
use anyhow::{Context, Result};
use std::time::Duration;

/// The combined result, held by the coordinator only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalResult {
    pub value: f64,
    pub elapsed: Duration,
}

/// What one participant did during a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub context: ParticipantContext,
    pub tile: Tile,
    pub partial: PartialResult,
    /// Time spent in the local integration
    pub compute_elapsed: Duration,
    /// Time from the start of the integration to the end of the aggregation
    pub elapsed: Duration,
    /// Present on the coordinator only
    pub aggregate: Option<Aggregate>,
}

impl RunOutcome {
    pub fn final_result(&self) -> Option<FinalResult> {
        self.aggregate.as_ref().map(|aggregate| FinalResult {
            value: aggregate.value,
            elapsed: self.elapsed,
        })
    }
}

/// Run one participant end to end
pub async fn run<T>(transport: &mut T, config: &Config) -> Result<RunOutcome>
where
    T: Transport,
{
    let outcome = compute_and_aggregate(transport, config).await?;

    barrier(transport).await
        .context("Shutdown barrier failed")?;

    if outcome.context.is_coordinator() {
        record_results(&outcome, config);
    }

    Ok(outcome)
}

/// Compute this participant's partial result and run the aggregation protocol
pub async fn compute_and_aggregate<T>(transport: &mut T, config: &Config) -> Result<RunOutcome>
where
    T: Transport,
{
    let ctx = transport.context();
    let debug = config.runtime.debug;
    let steps = config.integration.default_steps;

    let tile = partition(config.integration.interval(), steps, &ctx, config.aggregation.remainder);
    if debug {
        eprintln!(
            "DEBUG: Participant {} tile {} start={:.6} steps={} step_size={:e}",
            ctx, tile.interval, tile.interval.lower, tile.steps, tile.step_size
        );
    }

    if ctx.is_coordinator() {
        let dropped = dropped_steps(steps, ctx.group_size(), config.aggregation.remainder);
        if dropped > 0 {
            eprintln!(
                "Warning: {} of {} increments are not divisible among {} participants and were dropped",
                dropped, steps, ctx.group_size()
            );
        }
    }

    let stopwatch = Stopwatch::start(config.runtime.clock);
    let integrand = config.integration.integrand;
    let (value, compute_elapsed) = measure(config.runtime.clock, || integrate_tile(integrand.as_fn(), &tile));
    let partial = PartialResult { owner: ctx.id(), value };

    println!("{}", text::partial_line(&ctx, value));
    if ctx.is_coordinator() {
        println!("{}", text::seed_line(value));
    }

    let aggregate = aggregate(
        transport,
        config.aggregation.mode,
        partial,
        config.aggregation.tag,
        |received, total| {
            if debug {
                eprintln!("DEBUG: Received {:.15} from participant {}", received.value, received.owner);
            }
            println!("{}", text::running_total_line(total));
        },
    )
    .await?;

    if !ctx.is_coordinator() {
        println!("{}", text::sent_line(&ctx, value));
    }

    let elapsed = stopwatch.elapsed();
    println!("{}", text::duration_line(&ctx, elapsed));
    if debug {
        eprintln!("DEBUG: Participant {} integration took {:?}", ctx, compute_elapsed);
    }

    Ok(RunOutcome {
        context: ctx,
        tile,
        partial,
        compute_elapsed,
        elapsed,
        aggregate,
    })
}

/// Persist the coordinator's result
///
/// Failures are reported on stderr; the result itself is already computed and
/// the run still counts as successful.
pub fn record_results(outcome: &RunOutcome, config: &Config) {
    let Some(final_result) = outcome.final_result() else {
        return;
    };
    let ctx = outcome.context;
    let steps = config.integration.default_steps;

    let record = RunRecord {
        group_size: ctx.group_size(),
        steps,
        coordinator: ctx.id(),
        elapsed: final_result.elapsed,
        value: final_result.value,
    };

    let recorder = ResultRecorder::new(&config.output.log_path);
    if let Err(e) = recorder.record(&record) {
        eprintln!("Error opening file: {}", e);
    } else if config.runtime.debug {
        eprintln!("DEBUG: Appended run record to {}", recorder.path().display());
    }

    let summary = RunSummary {
        timestamp: RunSummary::now_timestamp(),
        integrand: config.integration.integrand,
        interval: config.integration.interval(),
        group_size: ctx.group_size(),
        steps,
        dropped_steps: dropped_steps(steps, ctx.group_size(), config.aggregation.remainder),
        coordinator: ctx.id(),
        mode: config.aggregation.mode,
        remainder: config.aggregation.remainder,
        clock: config.runtime.clock,
        elapsed_secs: final_result.elapsed.as_secs_f64(),
        value: final_result.value,
        partials: outcome.aggregate.as_ref().map(|a| a.combined.clone()).unwrap_or_default(),
    };

    if let Some(ref path) = config.output.summary_json {
        if let Err(e) = write_summary(path, &summary) {
            eprintln!("Warning: {:#}", e);
        }
    }

    text::print_summary(&summary);
}
