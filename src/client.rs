//! Connection driver.
//!
//! [`Connection::spawn`] opens the transport and starts the protocol task:
//! a single loop owning the framed stream, the session, the handshake
//! machine, and the handler registry. Inbound lines are tokenized and
//! routed (handshake first, registry after); outbound lines drain from the
//! sender queue. On any exit the task posts exactly one forced
//! `Disconnected` event and stops.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::codec::LineCodec;
use crate::config::ConnectionConfig;
use crate::dispatch::{Context, Registry};
use crate::entity::EntityId;
use crate::error::{EngineError, LineParseError};
use crate::event::{Event, EventKind};
use crate::handlers;
use crate::handshake::{Progress, Registration};
use crate::input::{handle_input, InputError, InputTarget};
use crate::line::LineRef;
use crate::sender::Sender;
use crate::session::Session;

/// Handle to one live connection.
///
/// Dropping the handle does not stop the protocol task; send QUIT via
/// [`Connection::quit`] or let the server close the link.
pub struct Connection {
    bus: Arc<EventBus>,
    sender: Sender,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: JoinHandle<()>,
}

impl Connection {
    /// Connect over TCP and start the protocol task.
    pub async fn spawn(
        addr: impl ToSocketAddrs,
        config: ConnectionConfig,
    ) -> std::io::Result<Connection> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Connection::from_stream(stream, config))
    }

    /// Start the protocol task on an already-established transport.
    ///
    /// Used directly for TLS-wrapped or in-memory streams.
    pub fn from_stream<S>(stream: S, config: ConnectionConfig) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let bus = Arc::new(EventBus::new());
        let (sender, outbound) = Sender::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(
            stream,
            Arc::new(config),
            Arc::clone(&bus),
            sender.clone(),
            outbound,
            shutdown_rx,
            handlers::default_registry(),
        ));
        Connection {
            bus,
            sender,
            shutdown: Mutex::new(Some(shutdown_tx)),
            task,
        }
    }

    /// The event bus for this connection.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The outbound line writer.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Parse one typed line in the given conversation context.
    pub fn handle_input(&self, input: &str, target: InputTarget<'_>) -> Result<(), InputError> {
        handle_input(input, target, &self.sender)
    }

    /// Send QUIT; the server closes the link, which ends the task.
    pub fn quit(&self, reason: Option<&str>) {
        self.sender.send_quit(reason);
    }

    /// Tear the connection down locally without waiting for the server.
    ///
    /// The protocol task exits and posts its forced disconnect event;
    /// repeated calls are no-ops.
    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the protocol task to finish.
    pub async fn closed(self) {
        let _ = self.task.await;
    }
}

/// The protocol task body. Returns only when the connection is over; the
/// single `Disconnected` emission lives here.
async fn run<S>(
    stream: S,
    config: Arc<ConnectionConfig>,
    bus: Arc<EventBus>,
    sender: Sender,
    mut outbound: tokio::sync::mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    registry: Registry,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let mut framed = Framed::new(stream, LineCodec);
    let mut session = Session::new(Arc::clone(&config));
    let mut registration = Registration::new(config);
    registration.start(&sender);
    let mut shutdown_armed = true;

    let error: EngineError = loop {
        tokio::select! {
            inbound = framed.next() => match inbound {
                Some(Ok(raw)) => {
                    if let Err(err) = process_line(
                        &raw,
                        &mut session,
                        &mut registration,
                        &registry,
                        &bus,
                        &sender,
                    ) {
                        break err;
                    }
                }
                Some(Err(err)) => break err.into(),
                None => break EngineError::Transport(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )),
            },
            Some(line) = outbound.recv() => {
                if let Err(err) = framed.send(line).await {
                    break err.into();
                }
            }
            res = &mut shutdown, if shutdown_armed => match res {
                Ok(()) => break EngineError::Transport(std::io::Error::new(
                    std::io::ErrorKind::Interrupted,
                    "shutdown requested",
                )),
                // Handle dropped without calling shutdown; keep running.
                Err(_) => shutdown_armed = false,
            }
        }
    };

    let reason = error.to_string();
    info!(reason = %reason, "connection ended");
    bus.emit(Event::new(
        EntityId::Server,
        format!("disconnected: {}", reason),
        EventKind::Disconnected { reason },
    ));
}

/// Route one inbound line. An `Err` ends the connection.
fn process_line(
    raw: &str,
    session: &mut Session,
    registration: &mut Registration,
    registry: &Registry,
    bus: &EventBus,
    sender: &Sender,
) -> Result<(), EngineError> {
    let line = match LineRef::parse(raw) {
        Ok(line) => line,
        Err(LineParseError::Empty) => return Ok(()),
        Err(err) => {
            warn!(line = raw, error = %err, "unparseable line dropped");
            return Ok(());
        }
    };

    // The server's last word before closing the link.
    if line.command.eq_ignore_ascii_case("ERROR") {
        let reason = line.arg(0).unwrap_or("unspecified").to_string();
        return Err(EngineError::ServerError(reason));
    }

    if registration.wants(line.command) {
        match registration.feed(&line, sender) {
            Ok(Progress::Pending) => {}
            Ok(Progress::Registered) => {
                session.nick = registration.current_nick().to_string();
                debug!(nick = %session.nick, "registered");
                bus.emit(Event::new(
                    EntityId::Server,
                    format!("connected as {}", session.nick),
                    EventKind::Connected,
                ));
            }
            Ok(Progress::NickRetry { taken, next }) => {
                session.nick = next.clone();
                bus.emit(Event::new(
                    EntityId::Server,
                    format!("nick {} is taken, trying {}", taken, next),
                    EventKind::NickInUse {
                        nick: taken,
                        next: Some(next),
                    },
                ));
            }
            Err(err) => return Err(err),
        }
        return Ok(());
    }

    let mut ctx = Context {
        session,
        bus,
        sender,
    };
    registry.dispatch(&mut ctx, &line);
    Ok(())
}
