//! In-process transport
//!
//! A group of [`LocalTransport`] endpoints connected by unbounded tokio
//! channels. Used for singleton runs and to exercise the aggregation protocol
//! without sockets.
//!
//! # Example
//!
//! ```
//! use pquad::distributed::local::local_group;
//! use pquad::distributed::transport::Transport;
//!
//! # tokio_test_block_on(async {
//! let mut group = local_group(2).unwrap();
//! let mut worker = group.pop().unwrap();
//! let mut coordinator = group.pop().unwrap();
//!
//! worker.send(0, 123, 0.5).await.unwrap();
//! assert_eq!(coordinator.receive(1, 123).await.unwrap(), 0.5);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use crate::distributed::group::{ParticipantContext, ParticipantId};
use crate::distributed::protocol::Tag;
use crate::distributed::transport::{Envelope, Mailbox, Transport};
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

/// One member of an in-process group
#[derive(Debug)]
pub struct LocalTransport {
    context: ParticipantContext,
    peers: Vec<UnboundedSender<Envelope>>,
    mailbox: Mailbox,
}

/// Create a fully connected in-process group, endpoints ordered by id
pub fn local_group(group_size: usize) -> Result<Vec<LocalTransport>> {
    if group_size == 0 {
        anyhow::bail!("Group size must be at least 1");
    }

    let (mailboxes, senders): (Vec<_>, Vec<_>) = (0..group_size).map(|_| Mailbox::new()).unzip();

    let endpoints = ParticipantContext::all(group_size)
        .zip(mailboxes)
        .map(|(context, mailbox)| LocalTransport {
            context,
            peers: senders.clone(),
            mailbox,
        })
        .collect();

    Ok(endpoints)
}

impl LocalTransport {
    /// Endpoint for a group of one
    pub fn singleton() -> Self {
        let (mailbox, sender) = Mailbox::new();
        Self {
            context: ParticipantContext::singleton(),
            peers: vec![sender],
            mailbox,
        }
    }
}

impl Transport for LocalTransport {
    fn context(&self) -> ParticipantContext {
        self.context
    }

    async fn send(&mut self, to: ParticipantId, tag: Tag, value: f64) -> Result<()> {
        let peer = self.peers.get(to)
            .ok_or_else(|| anyhow::anyhow!("No participant {} in group of {}", to, self.peers.len()))?;

        let envelope = Envelope { source: self.context.id(), tag, value };
        peer.send(envelope)
            .map_err(|_| anyhow::anyhow!("Participant {} is gone", to))
    }

    async fn receive(&mut self, from: ParticipantId, tag: Tag) -> Result<f64> {
        if from >= self.context.group_size() {
            anyhow::bail!("No participant {} in group of {}", from, self.context.group_size());
        }
        Ok(self.mailbox.receive(from, tag).await?.value)
    }

    async fn receive_any(&mut self, tag: Tag) -> Result<(ParticipantId, f64)> {
        let envelope = self.mailbox.receive_any(tag).await?;
        Ok((envelope.source, envelope.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_ids() {
        let group = local_group(3).unwrap();
        let ids: Vec<_> = group.iter().map(|t| t.context().id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(group.iter().all(|t| t.context().group_size() == 3));
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(local_group(0).is_err());
    }

    #[tokio::test]
    async fn test_point_to_point() {
        let mut group = local_group(3).unwrap();

        group[2].send(0, 9, 2.0).await.unwrap();
        group[1].send(0, 9, 1.0).await.unwrap();

        assert_eq!(group[0].receive(1, 9).await.unwrap(), 1.0);
        assert_eq!(group[0].receive(2, 9).await.unwrap(), 2.0);
    }

    #[tokio::test]
    async fn test_receive_any_arrival_order() {
        let mut group = local_group(3).unwrap();

        group[2].send(0, 9, 2.0).await.unwrap();
        group[1].send(0, 9, 1.0).await.unwrap();

        assert_eq!(group[0].receive_any(9).await.unwrap(), (2, 2.0));
        assert_eq!(group[0].receive_any(9).await.unwrap(), (1, 1.0));
    }

    #[tokio::test]
    async fn test_unknown_peer() {
        let mut group = local_group(2).unwrap();
        assert!(group[0].send(5, 9, 1.0).await.is_err());
        assert!(group[0].receive(5, 9).await.is_err());
    }

    #[tokio::test]
    async fn test_singleton_self_send() {
        let mut solo = LocalTransport::singleton();
        solo.send(0, 1, 3.0).await.unwrap();
        assert_eq!(solo.receive(0, 1).await.unwrap(), 3.0);
    }
}
