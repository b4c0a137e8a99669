//! Reconnecting socket.
//!
//! A background task owns the live [`Transport`] and redials on every drop
//! following the [`Connection`] schedule. Frames sent while the socket is
//! down are queued and flushed, in order, on the next open.
//!
//! ```text
//!  handle.send() ──▶ cmd channel ──┐
//!                                  ▼
//!                      ┌───────────────────────┐   dial / redial
//!   cancel token ────▶ │      socket_loop      │ ◀───────────── Connector
//!                      └───────────┬───────────┘
//!                                  │ SocketEvent
//!                                  ▼
//!                            event channel
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Connector, Outbound, Transport};
use crate::error::{ClientError, Result};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::state::connection::{Connection, ReconnectPolicy};

/// How long `shutdown` waits for a clean close before aborting the task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// What the socket reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Connection (re)established
    Open,

    /// A recognised message from the backend
    Message(InboundMessage),

    /// Connection lost; next dial after `delay`
    Reconnecting { attempt: u32, delay: Duration },

    /// Torn down; no more events follow
    Closed,
}

/// Handle to a socket kept alive by a background task.
///
/// Dropping the handle stops the task without a clean close; prefer
/// [`shutdown`](Self::shutdown).
pub struct ReconnectingSocket {
    url: String,
    commands: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReconnectingSocket {
    /// Start dialing `url`. Must be called inside a tokio runtime.
    pub fn open<C: Connector>(
        connector: C,
        url: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let url = url.into();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let connection = Connection::new(url.clone(), policy, rand::random::<f64>());
        let task = tokio::spawn(socket_loop(
            connector,
            connection,
            cmd_rx,
            event_tx,
            cancel.clone(),
        ));

        let socket = Self {
            url,
            commands: cmd_tx,
            cancel,
            task: Some(task),
        };
        (socket, event_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send raw text; queued while the connection is down.
    pub fn send_text(&self, text: String) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::NotConnected);
        }
        self.commands
            .send(text)
            .map_err(|_| ClientError::NotConnected)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Close the connection and stop reconnecting.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_err() {
            warn!(url = %self.url, "socket task did not stop in time, aborting");
            task.abort();
        }
    }
}

impl Outbound for ReconnectingSocket {
    fn send(&self, msg: &OutboundMessage) -> Result<()> {
        self.send_text(msg.to_text()?)
    }
}

impl Drop for ReconnectingSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Why a live connection stopped.
enum Pump {
    /// Remote side dropped or errored; redial
    Dropped,
    /// Owner asked to stop
    Stopped,
}

async fn socket_loop<C: Connector>(
    connector: C,
    mut conn: Connection,
    mut commands: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SocketEvent>,
    cancel: CancellationToken,
) {
    loop {
        conn.redialing();
        let dialed = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connector.connect(&conn.url) => result,
        };

        match dialed {
            Ok(mut transport) => {
                info!(url = %conn.url, "socket open");
                let backlog = conn.opened();

                let outcome = match flush(&mut transport, &mut conn, backlog).await {
                    Ok(()) => {
                        let _ = events.send(SocketEvent::Open);
                        pump(&mut transport, &mut conn, &mut commands, &events, &cancel).await
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to flush queued frames");
                        Pump::Dropped
                    }
                };
                if let Pump::Stopped = outcome {
                    if let Err(e) = transport.close().await {
                        debug!(error = %e, "close handshake failed");
                    }
                    break;
                }
            }
            Err(e) => warn!(url = %conn.url, error = %e, "socket dial failed"),
        }

        let Some(delay) = conn.dropped() else {
            info!(url = %conn.url, queued = conn.queued(), "reconnect attempts exhausted");
            break;
        };
        debug!(
            attempt = conn.failures(),
            ?delay,
            queued = conn.queued(),
            idle = ?conn.idle_time(),
            "reconnect scheduled"
        );
        let _ = events.send(SocketEvent::Reconnecting {
            attempt: conn.failures(),
            delay,
        });
        if !wait_for_retry(delay, &mut conn, &mut commands, &cancel).await {
            break;
        }
    }

    conn.close();
    let _ = events.send(SocketEvent::Closed);
    debug!(url = %conn.url, "socket loop finished");
}

/// Send frames queued while disconnected. On failure the unsent tail goes
/// back into the queue.
async fn flush<T: Transport>(
    transport: &mut T,
    conn: &mut Connection,
    backlog: Vec<String>,
) -> Result<()> {
    let mut pending = backlog.into_iter();
    while let Some(frame) = pending.next() {
        if let Err(e) = transport.send(frame.clone()).await {
            conn.enqueue(frame);
            pending.for_each(|f| conn.enqueue(f));
            return Err(e);
        }
    }
    Ok(())
}

async fn pump<T: Transport>(
    transport: &mut T,
    conn: &mut Connection,
    commands: &mut mpsc::UnboundedReceiver<String>,
    events: &mpsc::UnboundedSender<SocketEvent>,
    cancel: &CancellationToken,
) -> Pump {
    loop {
        tokio::select! {
            // Accepted frames go out before a stop is honoured
            biased;

            command = commands.recv() => match command {
                Some(frame) => {
                    if let Err(e) = transport.send(frame.clone()).await {
                        warn!(error = %e, "socket send failed");
                        conn.enqueue(frame);
                        return Pump::Dropped;
                    }
                }
                // Every handle is gone
                None => return Pump::Stopped,
            },

            _ = cancel.cancelled() => {
                drain(transport, commands).await;
                return Pump::Stopped;
            }

            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => {
                    conn.touch();
                    if let Some(msg) = InboundMessage::parse(&text) {
                        let _ = events.send(SocketEvent::Message(msg));
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "socket receive failed");
                    return Pump::Dropped;
                }
                None => {
                    info!(url = %conn.url, "socket closed by peer");
                    return Pump::Dropped;
                }
            },
        }
    }
}

/// Send whatever was accepted before the stop. Best effort: the first
/// failure ends the drain.
async fn drain<T: Transport>(
    transport: &mut T,
    commands: &mut mpsc::UnboundedReceiver<String>,
) {
    while let Ok(frame) = commands.try_recv() {
        if let Err(e) = transport.send(frame).await {
            warn!(error = %e, "failed to send frame before close");
            return;
        }
    }
}

/// Sleep out a reconnect delay, queueing any frames sent meanwhile.
/// Returns `false` if the socket should stop instead of redialing.
async fn wait_for_retry(
    delay: Duration,
    conn: &mut Connection,
    commands: &mut mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(frame) => conn.enqueue(frame),
                None => return false,
            },
        }
    }
}
