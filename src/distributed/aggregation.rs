//! Result aggregation protocol
//!
//! Moves every worker's partial result to the coordinator and combines them
//! into the final value.
//!
//! # Roles
//!
//! Participant 0 is the coordinator, everyone else is a worker. Each worker
//! sends exactly one tagged value to the coordinator and is done.
//!
//! # Combination order
//!
//! In [`AggregationMode::Gather`] (the default) the coordinator seeds its running
//! total with its own partial result, then receives from participant 1, then 2,
//! and so on up to `P - 1`, adding each value as it is received. A slow worker
//! holds up the whole gather even if higher ids have already sent. In exchange
//! the summation order, and therefore every bit of the result, is the same on
//! every run with the same group size.
//!
//! [`AggregationMode::Reduce`] sums in arrival order instead. It finishes as soon
//! as the last value arrives but the result may differ in the last bits between
//! runs.
//!
//! There is no timeout anywhere in this module: a worker that never sends keeps
//! the coordinator waiting forever.

use crate::distributed::group::{ParticipantId, COORDINATOR};
use crate::distributed::protocol::{Tag, BARRIER_TAG};
use crate::distributed::transport::Transport;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the coordinator combines partial results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationMode {
    /// Receive in ascending participant order
    #[default]
    Gather,
    /// Receive in arrival order
    Reduce,
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::Gather => f.write_str("gather"),
            AggregationMode::Reduce => f.write_str("reduce"),
        }
    }
}

/// One participant's local integral approximation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub owner: ParticipantId,
    pub value: f64,
}

/// Combined result at the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Final running total
    pub value: f64,
    /// Partial results in the order they were added, coordinator first
    pub combined: Vec<PartialResult>,
}

/// Collect worker results in ascending id order (coordinator only)
///
/// `on_receive` is called after every receive with the received partial result
/// and the running total including it.
pub async fn gather<T, F>(
    transport: &mut T,
    own: PartialResult,
    tag: Tag,
    mut on_receive: F,
) -> Result<Aggregate>
where
    T: Transport,
    F: FnMut(&PartialResult, f64),
{
    let ctx = transport.context();
    if !ctx.is_coordinator() {
        anyhow::bail!("Participant {} cannot gather, only the coordinator can", ctx.id());
    }

    let mut total = own.value;
    let mut combined = Vec::with_capacity(ctx.group_size());
    combined.push(own);

    for source in ctx.workers() {
        let value = transport.receive(source, tag).await
            .with_context(|| format!("Failed to receive partial result from participant {}", source))?;

        total += value;
        let partial = PartialResult { owner: source, value };
        on_receive(&partial, total);
        combined.push(partial);
    }

    Ok(Aggregate { value: total, combined })
}

/// Collect worker results in arrival order (coordinator only)
pub async fn reduce<T, F>(
    transport: &mut T,
    own: PartialResult,
    tag: Tag,
    mut on_receive: F,
) -> Result<Aggregate>
where
    T: Transport,
    F: FnMut(&PartialResult, f64),
{
    let ctx = transport.context();
    if !ctx.is_coordinator() {
        anyhow::bail!("Participant {} cannot reduce, only the coordinator can", ctx.id());
    }

    let mut total = own.value;
    let mut combined = Vec::with_capacity(ctx.group_size());
    combined.push(own);

    for _ in ctx.workers() {
        let (source, value) = transport.receive_any(tag).await
            .context("Failed to receive partial result")?;

        total += value;
        let partial = PartialResult { owner: source, value };
        on_receive(&partial, total);
        combined.push(partial);
    }

    Ok(Aggregate { value: total, combined })
}

/// Send this worker's partial result to the coordinator
pub async fn contribute<T>(transport: &mut T, own: PartialResult, tag: Tag) -> Result<()>
where
    T: Transport,
{
    let ctx = transport.context();
    if ctx.is_coordinator() {
        anyhow::bail!("The coordinator does not send its partial result");
    }

    transport.send(COORDINATOR, tag, own.value).await
        .with_context(|| format!("Participant {} failed to send its partial result", ctx.id()))
}

/// Run this participant's side of the aggregation
///
/// Returns the aggregate on the coordinator and `None` on workers.
pub async fn aggregate<T, F>(
    transport: &mut T,
    mode: AggregationMode,
    own: PartialResult,
    tag: Tag,
    on_receive: F,
) -> Result<Option<Aggregate>>
where
    T: Transport,
    F: FnMut(&PartialResult, f64),
{
    if !transport.context().is_coordinator() {
        contribute(transport, own, tag).await?;
        return Ok(None);
    }

    let aggregate = match mode {
        AggregationMode::Gather => gather(transport, own, tag, on_receive).await?,
        AggregationMode::Reduce => reduce(transport, own, tag, on_receive).await?,
    };
    Ok(Some(aggregate))
}

/// Group-wide barrier through the coordinator
///
/// Workers check in with the coordinator and wait to be released; the
/// coordinator releases everyone once all workers have checked in.
pub async fn barrier<T>(transport: &mut T) -> Result<()>
where
    T: Transport,
{
    let ctx = transport.context();

    if ctx.is_coordinator() {
        for worker in ctx.workers() {
            transport.receive(worker, BARRIER_TAG).await
                .with_context(|| format!("Barrier: no check-in from participant {}", worker))?;
        }
        for worker in ctx.workers() {
            transport.send(worker, BARRIER_TAG, 0.0).await
                .with_context(|| format!("Barrier: failed to release participant {}", worker))?;
        }
    } else {
        transport.send(COORDINATOR, BARRIER_TAG, 0.0).await
            .context("Barrier: failed to check in")?;
        transport.receive(COORDINATOR, BARRIER_TAG).await
            .context("Barrier: no release from coordinator")?;
    }

    Ok(())
}
