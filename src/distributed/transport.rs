//! Point-to-point message transport
//!
//! The aggregation protocol only needs two primitives from the process-group
//! runtime: send one tagged value to a given participant, and receive one
//! tagged value from a given participant. [`Transport`] captures exactly that,
//! plus a first-arrival receive used by the reduce variant.
//!
//! # Matching
//!
//! Incoming values are matched on `(source, tag)`. Every transport funnels its
//! deliveries into a [`Mailbox`]; a receive that sees a non-matching envelope
//! parks it and keeps waiting, and a later receive for that envelope picks it up
//! from the parked queue. Arrival order therefore never changes which value a
//! receive returns.
//!
//! # Blocking
//!
//! Receives wait for as long as it takes. A mailbox always keeps a sender to
//! itself alive, so a peer that disappears without sending leaves the receiver
//! waiting rather than failing.

use crate::distributed::group::{ParticipantContext, ParticipantId};
use crate::distributed::protocol::Tag;
use anyhow::Result;
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One delivered value with its routing information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub source: ParticipantId,
    pub tag: Tag,
    pub value: f64,
}

/// Message channel between the members of a process group
///
/// Implementations must deliver values between any given pair of participants
/// in send order.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Identity of the local participant
    fn context(&self) -> ParticipantContext;

    /// Send one tagged value to participant `to`
    async fn send(&mut self, to: ParticipantId, tag: Tag, value: f64) -> Result<()>;

    /// Receive the next value tagged `tag` from participant `from`
    async fn receive(&mut self, from: ParticipantId, tag: Tag) -> Result<f64>;

    /// Receive the next value tagged `tag` from whichever participant sent first
    async fn receive_any(&mut self, tag: Tag) -> Result<(ParticipantId, f64)>;
}

/// Inbox with `(source, tag)` matching
#[derive(Debug)]
pub struct Mailbox {
    inbox: UnboundedReceiver<Envelope>,
    parked: VecDeque<Envelope>,
    // Keeps `inbox` open for as long as the mailbox lives
    loopback: UnboundedSender<Envelope>,
}

impl Mailbox {
    /// Create a mailbox and the sender that feeds it
    pub fn new() -> (Self, UnboundedSender<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mailbox = Self {
            inbox: rx,
            parked: VecDeque::new(),
            loopback: tx.clone(),
        };
        (mailbox, tx)
    }

    /// Deliver a value addressed to ourselves
    pub fn post(&self, envelope: Envelope) -> Result<()> {
        self.loopback.send(envelope)
            .map_err(|_| anyhow::anyhow!("Mailbox closed"))
    }

    /// Number of envelopes that arrived but were not yet asked for
    pub fn parked_len(&self) -> usize {
        self.parked.len()
    }

    /// Wait for the next envelope from `from` tagged `tag`
    pub async fn receive(&mut self, from: ParticipantId, tag: Tag) -> Result<Envelope> {
        self.receive_matching(|e| e.source == from && e.tag == tag).await
    }

    /// Wait for the next envelope tagged `tag` from anyone
    pub async fn receive_any(&mut self, tag: Tag) -> Result<Envelope> {
        self.receive_matching(|e| e.tag == tag).await
    }

    async fn receive_matching<P>(&mut self, matches: P) -> Result<Envelope>
    where
        P: Fn(&Envelope) -> bool,
    {
        if let Some(pos) = self.parked.iter().position(&matches) {
            if let Some(envelope) = self.parked.remove(pos) {
                return Ok(envelope);
            }
        }

        loop {
            let envelope = self.inbox.recv().await
                .ok_or_else(|| anyhow::anyhow!("Mailbox closed"))?;
            if matches(&envelope) {
                return Ok(envelope);
            }
            self.parked.push_back(envelope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn env(source: ParticipantId, tag: Tag, value: f64) -> Envelope {
        Envelope { source, tag, value }
    }

    #[tokio::test]
    async fn test_receive_skips_other_sources() {
        let (mut mailbox, tx) = Mailbox::new();
        tx.send(env(2, 7, 2.0)).unwrap();
        tx.send(env(1, 7, 1.0)).unwrap();

        assert_eq!(mailbox.receive(1, 7).await.unwrap().value, 1.0);
        assert_eq!(mailbox.parked_len(), 1);
        assert_eq!(mailbox.receive(2, 7).await.unwrap().value, 2.0);
        assert_eq!(mailbox.parked_len(), 0);
    }

    #[tokio::test]
    async fn test_receive_skips_other_tags() {
        let (mut mailbox, tx) = Mailbox::new();
        tx.send(env(1, 99, -1.0)).unwrap();
        tx.send(env(1, 7, 1.0)).unwrap();

        // Unrelated traffic from the same source is not mistaken for the tagged value
        assert_eq!(mailbox.receive(1, 7).await.unwrap().value, 1.0);
        assert_eq!(mailbox.receive(1, 99).await.unwrap().value, -1.0);
    }

    #[tokio::test]
    async fn test_same_source_keeps_send_order() {
        let (mut mailbox, tx) = Mailbox::new();
        tx.send(env(3, 7, 1.0)).unwrap();
        tx.send(env(3, 7, 2.0)).unwrap();
        tx.send(env(1, 7, 0.0)).unwrap();

        mailbox.receive(1, 7).await.unwrap();
        assert_eq!(mailbox.receive(3, 7).await.unwrap().value, 1.0);
        assert_eq!(mailbox.receive(3, 7).await.unwrap().value, 2.0);
    }

    #[tokio::test]
    async fn test_receive_any_takes_parked_first() {
        let (mut mailbox, tx) = Mailbox::new();
        tx.send(env(2, 7, 2.0)).unwrap();
        tx.send(env(1, 7, 1.0)).unwrap();

        mailbox.receive(1, 7).await.unwrap();
        let next = mailbox.receive_any(7).await.unwrap();
        assert_eq!(next.source, 2);
    }

    #[tokio::test]
    async fn test_post_to_self() {
        let (mut mailbox, _tx) = Mailbox::new();
        mailbox.post(env(0, 5, 4.5)).unwrap();
        assert_eq!(mailbox.receive(0, 5).await.unwrap().value, 4.5);
    }

    #[tokio::test]
    async fn test_receive_waits_when_senders_are_gone() {
        let (mut mailbox, tx) = Mailbox::new();
        drop(tx);

        let pending = tokio::time::timeout(Duration::from_millis(50), mailbox.receive(1, 7)).await;
        assert!(pending.is_err(), "receive should still be waiting");
    }
}
