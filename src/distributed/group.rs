//! Process-group identity
//!
//! Every participant learns who it is and how many peers it has from the
//! environment set up by the launcher (`pquadrun`). The identity is then carried
//! around explicitly as a [`ParticipantContext`] instead of being read from
//! global state.
//!
//! # Environment
//!
//! - `PQUAD_RANK`: participant id in `[0, size)`
//! - `PQUAD_SIZE`: group size
//! - `PQUAD_COORDINATOR`: `host:port` the coordinator listens on
//!
//! When neither rank nor size is set the process runs as a singleton group.

use anyhow::{Context, Result};
use std::fmt;

/// Participant identifier, `0..group_size`
pub type ParticipantId = usize;

/// The participant that aggregates and records results
pub const COORDINATOR: ParticipantId = 0;

pub const ENV_RANK: &str = "PQUAD_RANK";
pub const ENV_SIZE: &str = "PQUAD_SIZE";
pub const ENV_COORDINATOR: &str = "PQUAD_COORDINATOR";

/// Static role of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
}

/// Identity of one participant within its group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantContext {
    id: ParticipantId,
    group_size: usize,
}

impl ParticipantContext {
    pub fn new(id: ParticipantId, group_size: usize) -> Result<Self> {
        if group_size == 0 {
            anyhow::bail!("Group size must be at least 1");
        }
        if id >= group_size {
            anyhow::bail!("Participant id {} out of range for group size {}", id, group_size);
        }
        Ok(Self { id, group_size })
    }

    /// Group of one: the coordinator with no workers
    pub fn singleton() -> Self {
        Self { id: COORDINATOR, group_size: 1 }
    }

    /// Contexts of every member of a group of `group_size`, ascending by id
    pub fn all(group_size: usize) -> impl Iterator<Item = ParticipantContext> {
        (0..group_size).map(move |id| ParticipantContext { id, group_size })
    }

    #[inline]
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn role(&self) -> Role {
        if self.id == COORDINATOR {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.role() == Role::Coordinator
    }

    pub fn is_last(&self) -> bool {
        self.id + 1 == self.group_size
    }

    /// Worker ids in the order the coordinator gathers them
    pub fn workers(&self) -> impl Iterator<Item = ParticipantId> {
        1..self.group_size
    }
}

impl fmt::Display for ParticipantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.group_size)
    }
}

/// What the launcher told this process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEnvironment {
    pub context: ParticipantContext,
    /// Coordinator address; `None` for singleton groups
    pub coordinator_addr: Option<String>,
}

impl GroupEnvironment {
    /// Read the group environment from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the group environment through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rank = lookup(ENV_RANK);
        let size = lookup(ENV_SIZE);

        let (rank, size) = match (rank, size) {
            (None, None) => {
                return Ok(Self {
                    context: ParticipantContext::singleton(),
                    coordinator_addr: None,
                })
            }
            (Some(rank), Some(size)) => (rank, size),
            (Some(_), None) => anyhow::bail!("{} is set but {} is not", ENV_RANK, ENV_SIZE),
            (None, Some(_)) => anyhow::bail!("{} is set but {} is not", ENV_SIZE, ENV_RANK),
        };

        let id: ParticipantId = rank.trim().parse()
            .with_context(|| format!("Invalid {}: {:?}", ENV_RANK, rank))?;
        let group_size: usize = size.trim().parse()
            .with_context(|| format!("Invalid {}: {:?}", ENV_SIZE, size))?;
        let context = ParticipantContext::new(id, group_size)
            .context("Inconsistent process group environment")?;

        let coordinator_addr = lookup(ENV_COORDINATOR).filter(|s| !s.trim().is_empty());
        if group_size > 1 && coordinator_addr.is_none() {
            anyhow::bail!("{} must be set for groups larger than one", ENV_COORDINATOR);
        }

        Ok(Self { context, coordinator_addr })
    }
}
