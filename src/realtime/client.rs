//! Persistent WebSocket client with subscription replay.
//!
//! # Responsibilities
//! - Hold one connection to the real-time endpoint
//! - Subscribe standing and registered channels on every connect
//! - Dispatch inbound frames to handlers by type tag
//! - Reconnect with linear back-off up to a bounded attempt count
//!
//! # Data Flow
//! ```text
//! RealtimeClient ──commands──→ Worker task ←──frames──→ Server
//!       │                          │
//!       └──── HandlerTable ←───────┘ (dispatch)
//! ```
//!
//! # Design Decisions
//! - A single worker task owns the socket; the handle talks to it over mpsc
//! - Connection state is published on a watch channel; each worker carries a
//!   generation so a detached worker cannot overwrite its successor's state
//! - After the last reconnect attempt the worker idles until `reconnect()`
//!   or `disconnect()`

use futures_util::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::RealtimeConfig;
use crate::observability::metrics;
use crate::realtime::dispatch::{Dispatch, Handler, HandlerTable};
use crate::realtime::messages::{Frame, RealtimeError};
use crate::resilience::backoff::linear_backoff;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting before reconnect attempt `attempt` (1-based).
    Reconnecting { attempt: u32 },
}

#[derive(Debug)]
enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Send(Frame),
    Reconnect,
    Disconnect,
}

/// How a connected session ended.
enum SessionEnd {
    Dropped,
    Restart,
    Disconnect,
}

/// Handle to the real-time channel.
pub struct RealtimeClient {
    config: RealtimeConfig,
    handlers: HandlerTable,
    state: Arc<watch::Sender<ConnectionState>>,
    generation: Arc<AtomicU64>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeClient {
    pub fn new(config: RealtimeConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            handlers: HandlerTable::new(),
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            commands: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &crate::config::FleetConfig) -> Self {
        Self::new(config.realtime.clone())
    }

    /// Start the worker. No-op while one is already running.
    pub fn connect(&self) {
        let mut commands = lock(&self.commands);
        if commands.as_ref().is_some_and(|tx| !tx.is_closed()) {
            tracing::debug!("Real-time client already running");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let worker = Worker {
            config: self.config.clone(),
            handlers: self.handlers.clone(),
            state: self.state.clone(),
            generation,
            current_generation: self.generation.clone(),
            commands: rx,
        };
        *commands = Some(tx);
        *lock(&self.task) = Some(tokio::spawn(worker.run()));
    }

    /// Register `handler` under `channel`. Sent to the server now if
    /// connected, otherwise on the next connect.
    pub fn subscribe(&self, channel: &str, handler: Handler) {
        self.handlers.register(channel, handler);
        self.command(Command::Subscribe(channel.to_string()));
    }

    /// Forget `channel` and tell the server if connected.
    pub fn unsubscribe(&self, channel: &str) {
        self.handlers.remove(channel);
        self.command(Command::Unsubscribe(channel.to_string()));
    }

    /// Queue an outbound frame. Dropped with a warning if not connected
    /// when the worker picks it up.
    pub fn send(&self, frame: Frame) -> Result<(), RealtimeError> {
        if self.command(Command::Send(frame)) {
            Ok(())
        } else {
            Err(RealtimeError::NotRunning)
        }
    }

    /// Reconnect now, resetting the attempt counter. Starts the worker if
    /// it is not running.
    pub fn reconnect(&self) {
        if !self.command(Command::Reconnect) {
            self.connect();
        }
    }

    /// Close the socket, clear every registration and stop the worker.
    pub fn disconnect(&self) {
        if let Some(tx) = lock(&self.commands).take() {
            let _ = tx.send(Command::Disconnect);
        }
        // Detach; the worker exits on its own once it sees the command
        drop(lock(&self.task).take());
        self.handlers.clear();
        let generation = &self.generation;
        self.state.send_modify(|state| {
            generation.fetch_add(1, Ordering::SeqCst);
            *state = ConnectionState::Disconnected;
        });
        tracing::info!("Real-time client disconnected");
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Registered channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.handlers.channels()
    }

    fn command(&self, command: Command) -> bool {
        match lock(&self.commands).as_ref() {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Some(tx) = lock(&self.commands).take() {
            let _ = tx.send(Command::Disconnect);
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.config.url)
            .field("state", &self.state())
            .field("handlers", &self.handlers)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the socket for the lifetime of one `connect()`.
struct Worker {
    config: RealtimeConfig,
    handlers: HandlerTable,
    state: Arc<watch::Sender<ConnectionState>>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Worker {
    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            self.set_state(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            });

            let Some(result) = self.open().await else {
                self.set_state(ConnectionState::Disconnected);
                return;
            };

            match result {
                Ok(socket) => {
                    attempt = 0;
                    match self.session(socket).await {
                        SessionEnd::Disconnect => {
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                        SessionEnd::Restart => continue,
                        SessionEnd::Dropped => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.config.url, attempt, error = %e, "Real-time connect failed");
                }
            }

            attempt += 1;
            if attempt > self.config.max_reconnect_attempts {
                tracing::error!(
                    attempts = self.config.max_reconnect_attempts,
                    "Reconnect attempts exhausted, waiting for explicit reconnect"
                );
                self.set_state(ConnectionState::Disconnected);
                if !self.wait_for_reconnect().await {
                    return;
                }
                attempt = 0;
                continue;
            }

            let delay = linear_backoff(attempt, self.config.reconnect_delay_ms);
            self.set_state(ConnectionState::Reconnecting { attempt });
            metrics::record_reconnect_attempt();
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

            if !self.sleep(delay).await {
                self.set_state(ConnectionState::Disconnected);
                return;
            }
        }
    }

    /// Connect, still honouring commands. `None` means disconnect was requested.
    async fn open(&mut self) -> Option<Result<Socket, tokio_tungstenite::tungstenite::Error>> {
        let connect = connect_async(self.config.url.clone());
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => return Some(result.map(|(socket, _)| socket)),
                command = self.commands.recv() => match command {
                    None | Some(Command::Disconnect) => return None,
                    Some(other) => defer_offline(other),
                },
            }
        }
    }

    /// Back-off delay. `false` means disconnect was requested.
    async fn sleep(&mut self, delay: Duration) -> bool {
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return true,
                command = self.commands.recv() => match command {
                    None | Some(Command::Disconnect) => return false,
                    Some(Command::Reconnect) => return true,
                    Some(other) => defer_offline(other),
                },
            }
        }
    }

    /// Idle after exhaustion. `false` means disconnect was requested.
    async fn wait_for_reconnect(&mut self) -> bool {
        loop {
            match self.commands.recv().await {
                None | Some(Command::Disconnect) => return false,
                Some(Command::Reconnect) => return true,
                Some(other) => defer_offline(other),
            }
        }
    }

    async fn session(&mut self, socket: Socket) -> SessionEnd {
        let (mut sink, mut stream) = socket.split();
        self.set_state(ConnectionState::Connected);
        tracing::info!(url = %self.config.url, "Real-time channel connected");

        let mut subscribed = HashSet::new();
        let mut channels = self.config.standing_channels.clone();
        channels.extend(self.handlers.channels());
        for channel in channels {
            if subscribed.insert(channel.clone())
                && send_frame(&mut sink, &Frame::subscribe(&channel)).await.is_err()
            {
                return SessionEnd::Dropped;
            }
        }

        loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => handle_text(&self.handlers, text.as_str()),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => handle_text(&self.handlers, text),
                        Err(_) => tracing::warn!("Ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(frame = ?frame, "Real-time channel closed by server");
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Real-time channel error");
                        return SessionEnd::Dropped;
                    }
                    None => {
                        tracing::info!("Real-time channel dropped");
                        return SessionEnd::Dropped;
                    }
                },
                command = self.commands.recv() => {
                    let sent = match command {
                        Some(Command::Subscribe(channel)) => {
                            if subscribed.insert(channel.clone()) {
                                send_frame(&mut sink, &Frame::subscribe(&channel)).await
                            } else {
                                Ok(())
                            }
                        }
                        Some(Command::Unsubscribe(channel)) => {
                            subscribed.remove(&channel);
                            send_frame(&mut sink, &Frame::unsubscribe(&channel)).await
                        }
                        Some(Command::Send(frame)) => send_frame(&mut sink, &frame).await,
                        Some(Command::Reconnect) => {
                            let _ = sink.close().await;
                            return SessionEnd::Restart;
                        }
                        None | Some(Command::Disconnect) => {
                            let _ = sink.send(Message::Close(None)).await;
                            let _ = sink.close().await;
                            return SessionEnd::Disconnect;
                        }
                    };
                    if let Err(e) = sent {
                        tracing::warn!(error = %e, "Real-time send failed");
                        return SessionEnd::Dropped;
                    }
                }
            }
        }
    }

    /// Publish `state` unless this worker has been superseded.
    fn set_state(&self, state: ConnectionState) {
        let mut previous = state;
        let changed = self.state.send_if_modified(|current| {
            if self.current_generation.load(Ordering::SeqCst) != self.generation
                || *current == state
            {
                return false;
            }
            previous = std::mem::replace(current, state);
            true
        });
        if changed {
            metrics::record_realtime_connected(state == ConnectionState::Connected);
            tracing::debug!(from = ?previous, to = ?state, "Real-time state changed");
        }
    }
}

/// Commands arriving while no socket is open. Subscriptions live in the
/// handler table and are replayed on connect.
fn defer_offline(command: Command) {
    match command {
        Command::Send(frame) => {
            tracing::warn!(kind = %frame.kind, "Not connected, dropping outbound frame");
        }
        other => tracing::trace!(command = ?other, "Deferred until connected"),
    }
}

fn handle_text(handlers: &HandlerTable, text: &str) {
    match handlers.dispatch_text(text) {
        Dispatch::Delivered { kind } => tracing::trace!(kind = %kind, "Event delivered"),
        Dispatch::Control => {}
        Dispatch::Unhandled { kind } => tracing::debug!(kind = %kind, "No handler for event type"),
        Dispatch::HandlerFailed { kind } => tracing::warn!(kind = %kind, "Event handler panicked"),
        Dispatch::Malformed(e) => tracing::warn!(error = %e, "Discarding malformed frame"),
    }
}

async fn send_frame<S>(sink: &mut S, frame: &Frame) -> Result<(), RealtimeError>
where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = frame.encode()?;
    sink.send(Message::text(text)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> RealtimeConfig {
        RealtimeConfig {
            // Nothing listens on the discard port
            url: "ws://127.0.0.1:9/ws".to_string(),
            max_reconnect_attempts: 2,
            reconnect_delay_ms: 5,
            standing_channels: vec![],
        }
    }

    #[test]
    fn test_subscribe_before_connect_is_remembered() {
        let client = RealtimeClient::new(unreachable_config());
        client.subscribe("truck_location", Arc::new(|_| {}));
        client.subscribe("alerts", Arc::new(|_| {}));
        assert_eq!(client.channels(), vec!["alerts", "truck_location"]);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.unsubscribe("alerts");
        assert_eq!(client.channels(), vec!["truck_location"]);
    }

    #[test]
    fn test_send_without_worker_fails() {
        let client = RealtimeClient::new(unreachable_config());
        let err = client.send(Frame::subscribe("x")).unwrap_err();
        assert!(matches!(err, RealtimeError::NotRunning));
    }

    #[tokio::test]
    async fn test_exhaustion_then_disconnect() {
        let client = RealtimeClient::new(unreachable_config());
        let mut state = client.watch_state();
        client.connect();

        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == ConnectionState::Reconnecting { attempt: 2 }),
        )
        .await
        .expect("second attempt scheduled")
        .unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| *s == ConnectionState::Disconnected),
        )
        .await
        .expect("gives up after max attempts")
        .unwrap();

        // Worker idles rather than exiting
        assert!(client.send(Frame::subscribe("x")).is_ok());

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.send(Frame::subscribe("x")).is_err());
    }
}
