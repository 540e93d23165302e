//! TCP transport
//!
//! Star topology: the coordinator listens, every worker connects to it. After
//! the handshake each connection is split; a reader task forwards incoming DATA
//! frames into the local [`Mailbox`] tagged with the connection's participant id,
//! and the write half is kept for sends.
//!
//! Workers can only talk to the coordinator, which is all the aggregation
//! protocol and the barrier need.

use crate::config::RuntimeConfig;
use crate::distributed::group::{ParticipantContext, ParticipantId, COORDINATOR};
use crate::distributed::protocol::*;
use crate::distributed::transport::{Envelope, Mailbox, Transport};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Group member connected over TCP
pub struct TcpTransport {
    context: ParticipantContext,
    writers: HashMap<ParticipantId, OwnedWriteHalf>,
    mailbox: Mailbox,
    readers: Vec<JoinHandle<()>>,
}

impl TcpTransport {
    /// Join the group described by `context`
    ///
    /// The coordinator binds `addr` and waits for every worker; workers connect
    /// to it.
    pub async fn join(context: ParticipantContext, addr: &str, runtime: &RuntimeConfig) -> Result<Self> {
        if context.is_coordinator() {
            let listener = TcpListener::bind(addr).await
                .with_context(|| format!("Failed to bind coordinator on {}", addr))?;
            Self::coordinator(context, listener, runtime.debug).await
        } else {
            let interval = Duration::from_millis(runtime.connect_interval_ms);
            Self::worker(context, addr, runtime.connect_attempts, interval, runtime.debug).await
        }
    }

    /// Accept one connection from every worker
    pub async fn coordinator(context: ParticipantContext, listener: TcpListener, debug: bool) -> Result<Self> {
        if !context.is_coordinator() {
            anyhow::bail!("Participant {} cannot accept workers", context.id());
        }

        let (mailbox, inbox) = Mailbox::new();
        let mut writers = HashMap::new();
        let mut readers = Vec::new();
        let expected = context.group_size() - 1;

        if debug && expected > 0 {
            if let Ok(local) = listener.local_addr() {
                eprintln!("DEBUG: Coordinator waiting for {} workers on {}", expected, local);
            }
        }

        while writers.len() < expected {
            let (mut stream, addr) = listener.accept().await
                .context("Failed to accept connection")?;
            stream.set_nodelay(true)
                .context("Failed to set TCP_NODELAY")?;

            let hello = match read_message(&mut stream).await {
                Ok(Message::Hello(hello)) => hello,
                Ok(other) => {
                    eprintln!("Warning: Ignoring connection from {}: expected HELLO, got {:?}", addr, other);
                    continue;
                }
                Err(e) => {
                    eprintln!("Warning: Ignoring connection from {}: {:#}", addr, e);
                    continue;
                }
            };

            if let Err(reason) = check_hello(&context, &hello, &writers) {
                eprintln!("Warning: Rejected participant {} from {}: {}", hello.participant_id, addr, reason);
                let reject = Message::Reject(RejectMessage { reason });
                if let Err(e) = write_message(&mut stream, &reject).await {
                    eprintln!("Warning: Failed to send REJECT to {}: {:#}", addr, e);
                }
                continue;
            }

            let welcome = Message::Welcome(WelcomeMessage {
                protocol_version: PROTOCOL_VERSION,
                group_size: context.group_size(),
            });
            write_message(&mut stream, &welcome).await
                .with_context(|| format!("Failed to welcome participant {}", hello.participant_id))?;

            if debug {
                eprintln!("DEBUG: Participant {} joined from {} ({})", hello.participant_id, addr, hello.host);
            }

            let (read_half, write_half) = stream.into_split();
            readers.push(tokio::spawn(forward(read_half, hello.participant_id, inbox.clone(), debug)));
            writers.insert(hello.participant_id, write_half);
        }

        Ok(Self { context, writers, mailbox, readers })
    }

    /// Connect to the coordinator at `addr`
    pub async fn worker(
        context: ParticipantContext,
        addr: &str,
        attempts: u32,
        interval: Duration,
        debug: bool,
    ) -> Result<Self> {
        if context.is_coordinator() {
            anyhow::bail!("The coordinator does not connect to itself");
        }

        let mut stream = connect_with_retry(addr, attempts, interval, debug).await?;
        stream.set_nodelay(true)
            .context("Failed to set TCP_NODELAY")?;

        let hello = Message::Hello(HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            participant_id: context.id(),
            group_size: context.group_size(),
            host: get_host_id(),
        });
        write_message(&mut stream, &hello).await
            .context("Failed to send HELLO")?;

        match read_message(&mut stream).await.context("No handshake reply from coordinator")? {
            Message::Welcome(welcome) => {
                if welcome.protocol_version != PROTOCOL_VERSION {
                    anyhow::bail!(
                        "Protocol version mismatch: coordinator={}, participant={}",
                        welcome.protocol_version, PROTOCOL_VERSION
                    );
                }
            }
            Message::Reject(reject) => {
                anyhow::bail!("Coordinator rejected participant {}: {}", context.id(), reject.reason)
            }
            other => anyhow::bail!("Expected WELCOME, got {:?}", other),
        }

        if debug {
            eprintln!("DEBUG: Participant {} joined coordinator at {}", context.id(), addr);
        }

        let (mailbox, inbox) = Mailbox::new();
        let (read_half, write_half) = stream.into_split();
        let readers = vec![tokio::spawn(forward(read_half, COORDINATOR, inbox, debug))];

        let mut writers = HashMap::new();
        writers.insert(COORDINATOR, write_half);

        Ok(Self { context, writers, mailbox, readers })
    }
}

impl Transport for TcpTransport {
    fn context(&self) -> ParticipantContext {
        self.context
    }

    async fn send(&mut self, to: ParticipantId, tag: Tag, value: f64) -> Result<()> {
        if to == self.context.id() {
            return self.mailbox.post(Envelope { source: to, tag, value });
        }

        let writer = self.writers.get_mut(&to)
            .ok_or_else(|| anyhow::anyhow!("No route from participant {} to {}", self.context.id(), to))?;

        write_message(writer, &Message::Data(DataMessage { tag, value })).await
            .with_context(|| format!("Failed to send to participant {}", to))
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

impl Drop for TcpTransport {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

/// Validate a worker handshake against the group
fn check_hello(
    context: &ParticipantContext,
    hello: &HelloMessage,
    joined: &HashMap<ParticipantId, OwnedWriteHalf>,
) -> std::result::Result<(), String> {
    if hello.protocol_version != PROTOCOL_VERSION {
        return Err(format!(
            "protocol version mismatch: coordinator={}, participant={}",
            PROTOCOL_VERSION, hello.protocol_version
        ));
    }
    if hello.group_size != context.group_size() {
        return Err(format!(
            "group size mismatch: coordinator={}, participant={}",
            context.group_size(), hello.group_size
        ));
    }
    if hello.participant_id == COORDINATOR || hello.participant_id >= context.group_size() {
        return Err(format!("participant id {} is not a worker id", hello.participant_id));
    }
    if joined.contains_key(&hello.participant_id) {
        return Err(format!("participant {} already joined", hello.participant_id));
    }
    Ok(())
}

/// Forward DATA frames from one connection into the mailbox
async fn forward(mut reader: OwnedReadHalf, source: ParticipantId, inbox: UnboundedSender<Envelope>, debug: bool) {
    loop {
        match read_message(&mut reader).await {
            Ok(Message::Data(data)) => {
                let envelope = Envelope { source, tag: data.tag, value: data.value };
                if inbox.send(envelope).is_err() {
                    break;
                }
            }
            Ok(other) => {
                if debug {
                    eprintln!("DEBUG: Ignoring unexpected message from participant {}: {:?}", source, other);
                }
            }
            Err(e) => {
                if debug {
                    eprintln!("DEBUG: Connection to participant {} closed: {:#}", source, e);
                }
                break;
            }
        }
    }
}

/// Connect to `addr`, retrying while the coordinator is still starting up
async fn connect_with_retry(addr: &str, attempts: u32, interval: Duration, debug: bool) -> Result<TcpStream> {
    let mut last_error = None;

    for attempt in 1..=attempts.max(1) {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                if debug {
                    eprintln!("DEBUG: Connect to {} failed (attempt {}/{}): {}", addr, attempt, attempts, e);
                }
                last_error = Some(e);
                sleep(interval).await;
            }
        }
    }

    match last_error {
        Some(e) => Err(e).with_context(|| format!("Failed to connect to coordinator at {} after {} attempts", addr, attempts)),
        None => anyhow::bail!("Failed to connect to coordinator at {}", addr),
    }
}

fn get_host_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::aggregation::{aggregate, barrier, AggregationMode, PartialResult};

    const TAG: Tag = PARTIAL_RESULT_TAG;

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    async fn run_worker(id: ParticipantId, group_size: usize, addr: &str, value: f64) -> Result<()> {
        let ctx = ParticipantContext::new(id, group_size)?;
        let mut transport = TcpTransport::worker(ctx, addr, 50, Duration::from_millis(20), false).await?;
        aggregate(&mut transport, AggregationMode::Gather, PartialResult { owner: id, value }, TAG, |_, _| {}).await?;
        barrier(&mut transport).await
    }

    #[tokio::test]
    async fn test_gather_over_tcp() {
        let (listener, addr) = bind().await;

        let coordinator = async {
            let ctx = ParticipantContext::new(0, 3)?;
            let mut transport = TcpTransport::coordinator(ctx, listener, false).await?;
            let mut order = Vec::new();
            let result = aggregate(
                &mut transport,
                AggregationMode::Gather,
                PartialResult { owner: 0, value: 1.0 },
                TAG,
                |p, _| order.push(p.owner),
            )
            .await?;
            barrier(&mut transport).await?;
            Ok::<_, anyhow::Error>((result, order))
        };

        let (coordinator, w1, w2) = tokio::join!(
            coordinator,
            run_worker(1, 3, &addr, 2.0),
            run_worker(2, 3, &addr, 4.0),
        );
        w1.unwrap();
        w2.unwrap();

        let (result, order) = coordinator.unwrap();
        assert_eq!(result.unwrap().value, 7.0);
        assert_eq!(order, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let (listener, addr) = bind().await;

        let coordinator = async {
            let ctx = ParticipantContext::new(0, 3)?;
            TcpTransport::coordinator(ctx, listener, false).await
        };

        let (coordinator, first, duplicate, last) = tokio::join!(
            coordinator,
            TcpTransport::worker(ParticipantContext::new(1, 3).unwrap(), &addr, 50, Duration::from_millis(20), false),
            async {
                // Let the genuine participant 1 join first
                sleep(Duration::from_millis(100)).await;
                TcpTransport::worker(ParticipantContext::new(1, 3).unwrap(), &addr, 50, Duration::from_millis(20), false).await
            },
            async {
                sleep(Duration::from_millis(200)).await;
                TcpTransport::worker(ParticipantContext::new(2, 3).unwrap(), &addr, 50, Duration::from_millis(20), false).await
            },
        );

        assert!(first.is_ok());
        let err = duplicate.err().unwrap();
        assert!(format!("{:#}", err).contains("already joined"));
        assert!(last.is_ok());
        assert!(coordinator.is_ok());
    }

    #[tokio::test]
    async fn test_group_size_mismatch_rejected() {
        let (listener, addr) = bind().await;

        let coordinator = async {
            let ctx = ParticipantContext::new(0, 2)?;
            TcpTransport::coordinator(ctx, listener, false).await
        };

        let (coordinator, bad, good) = tokio::join!(
            coordinator,
            TcpTransport::worker(ParticipantContext::new(1, 3).unwrap(), &addr, 50, Duration::from_millis(20), false),
            async {
                sleep(Duration::from_millis(100)).await;
                TcpTransport::worker(ParticipantContext::new(1, 2).unwrap(), &addr, 50, Duration::from_millis(20), false).await
            },
        );

        let err = bad.err().unwrap();
        assert!(format!("{:#}", err).contains("group size mismatch"));
        assert!(good.is_ok());
        assert!(coordinator.is_ok());
    }

    #[tokio::test]
    async fn test_connect_gives_up() {
        // Grab a free port and release it so nothing is listening
        let (listener, addr) = bind().await;
        drop(listener);

        let ctx = ParticipantContext::new(1, 2).unwrap();
        let result = TcpTransport::worker(ctx, &addr, 2, Duration::from_millis(10), false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_without_route() {
        let (listener, addr) = bind().await;

        let coordinator = async {
            let ctx = ParticipantContext::new(0, 3)?;
            TcpTransport::coordinator(ctx, listener, false).await
        };
        let (coordinator, w1, w2) = tokio::join!(
            coordinator,
            TcpTransport::worker(ParticipantContext::new(1, 3).unwrap(), &addr, 50, Duration::from_millis(20), false),
            TcpTransport::worker(ParticipantContext::new(2, 3).unwrap(), &addr, 50, Duration::from_millis(20), false),
        );
        let _coordinator = coordinator.unwrap();
        let _w2 = w2.unwrap();
        let mut w1 = w1.unwrap();

        // Workers only have a route to the coordinator
        assert!(w1.send(2, TAG, 1.0).await.is_err());
    }
}
