//! The relay engine: one actor task that owns all mutable relay state.
//!
//! ```text
//!  RelayHandle ──commands──┐
//!  connect attempts ───────┤
//!  session events ─────────┼──→ select! ──→ RelayRouter ──→ effects
//!  retry timer ────────────┘                                   │
//!                              game commands (with timeout) ←──┤
//!                              dispatcher task ←── outbox ─────┘
//!                               ├─ NotificationSink
//!                               └─ StateStore (history)
//! ```
//!
//! Every state change happens inside [`RelayEngine::run`], one wake-up at
//! a time. Slow I/O to the chat channel and the history file goes
//! through a bounded queue to a separate dispatcher task, so it delays
//! intake by at most that queue's capacity.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use realmrelay_protocol::{
    ChannelId, GameCommand, GatewayMessage, Notification, SessionEvent, Severity,
};
use realmrelay_reconnect::{EndOutcome, ReconnectConfig, ReconnectSupervisor};
use realmrelay_router::{Effect, ModerationList, ModerationLists, RelayRouter, RouterConfig};
use realmrelay_transport::{
    EventStream, NotificationSink, SessionConnection, SessionConnector, TransportError,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::handle::EngineCommand;
use crate::{HistoryEntry, RelayConfig, RelayError, RelayHandle, RelayStatus, StateStore};

/// Capacity of the operator command channel.
const COMMAND_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a relay engine.
///
/// # Example
///
/// ```rust,ignore
/// let config = RelayConfig::from_file("config.json")?;
/// let (engine, handle) = RelayEngineBuilder::new()
///     .config(&config)
///     .build(connector, sink, store)
///     .await?;
/// let task = engine.spawn();
/// handle.connect().await?;
/// ```
pub struct RelayEngineBuilder {
    router: RouterConfig,
    reconnect: ReconnectConfig,
    lists: ModerationLists,
    send_timeout: Duration,
    notification_queue: usize,
}

impl RelayEngineBuilder {
    /// Creates a builder with default settings and empty moderation lists.
    pub fn new() -> Self {
        Self {
            router: RouterConfig::default(),
            reconnect: ReconnectConfig::default(),
            lists: ModerationLists::default(),
            send_timeout: Duration::from_secs(5),
            notification_queue: 64,
        }
    }

    /// Takes every setting from a file config.
    pub fn config(mut self, config: &RelayConfig) -> Self {
        self.router = config.router_config();
        self.reconnect = config.reconnect_config();
        self.lists = config.moderation_lists();
        self.send_timeout = config.send_timeout();
        self.notification_queue = config.notification_queue;
        self
    }

    pub fn router_config(mut self, config: RouterConfig) -> Self {
        self.router = config;
        self
    }

    pub fn reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = config;
        self
    }

    /// Initial moderation lists. Lists saved by an earlier run win.
    pub fn moderation_lists(mut self, lists: ModerationLists) -> Self {
        self.lists = lists;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Builds the engine and its handle.
    ///
    /// Reads the saved binding and moderation lists from `store`. A store
    /// that cannot be read is logged and treated as empty.
    pub async fn build<C, S, St>(
        self,
        connector: C,
        sink: S,
        store: St,
    ) -> Result<(RelayEngine<C, S, St>, RelayHandle), RelayError>
    where
        C: SessionConnector,
        S: NotificationSink,
        St: StateStore,
    {
        let binding = store.load_binding().await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to load channel binding");
            None
        });
        let lists = match store.load_moderation().await {
            Ok(Some(saved)) => saved,
            Ok(None) => self.lists,
            Err(e) => {
                tracing::error!(error = %e, "failed to load moderation lists");
                self.lists
            }
        };
        if let Some(channel) = &binding {
            tracing::info!(%channel, "restored relay channel");
        }

        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (attempt_tx, attempts) = mpsc::channel(4);

        let engine = RelayEngine {
            connector: Arc::new(connector),
            sink: Arc::new(sink),
            store: Arc::new(store),
            router: RelayRouter::new(self.router, Arc::new(lists)),
            supervisor: ReconnectSupervisor::new(self.reconnect),
            binding,
            connection: None,
            events: None,
            attempt_generation: 0,
            attempt_tx,
            attempts,
            commands,
            send_timeout: self.send_timeout,
            notification_queue: self.notification_queue.max(1),
        };
        Ok((engine, RelayHandle::new(command_tx)))
    }
}

impl Default for RelayEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The result of one connect attempt, tagged with the attempt that
/// produced it so superseded results can be discarded.
struct AttemptResult<T> {
    generation: u64,
    result: Result<(T, EventStream), TransportError>,
}

/// What woke the engine up.
enum Wake<T> {
    Command(Option<EngineCommand>),
    Attempt(AttemptResult<T>),
    Event(SessionEvent),
    Retry(u32),
}

/// Work for the dispatcher task.
enum Outbound {
    Notify {
        channel: ChannelId,
        notification: Notification,
    },
    Record(HistoryEntry),
}

/// A relay between one game session and one chat channel.
///
/// Created by [`RelayEngineBuilder::build`]; driven by [`run`](Self::run).
pub struct RelayEngine<C: SessionConnector, S: NotificationSink, St: StateStore> {
    connector: Arc<C>,
    sink: Arc<S>,
    store: Arc<St>,
    router: RelayRouter,
    supervisor: ReconnectSupervisor,
    binding: Option<ChannelId>,
    connection: Option<Arc<C::Connection>>,
    events: Option<EventStream>,
    /// Bumped for every attempt and on every full reset.
    attempt_generation: u64,
    attempt_tx: mpsc::Sender<AttemptResult<C::Connection>>,
    attempts: mpsc::Receiver<AttemptResult<C::Connection>>,
    commands: mpsc::Receiver<EngineCommand>,
    send_timeout: Duration,
    notification_queue: usize,
}

impl<C, S, St> RelayEngine<C, S, St>
where
    C: SessionConnector,
    S: NotificationSink,
    St: StateStore,
{
    /// Runs the engine on a new Tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs the engine until [`RelayHandle::shutdown`] or until every
    /// handle is dropped.
    pub async fn run(mut self) {
        let (outbox, outbox_rx) = mpsc::channel(self.notification_queue);
        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&self.sink),
            Arc::clone(&self.store),
            outbox_rx,
            self.send_timeout,
        ));
        tracing::info!("relay engine started");

        loop {
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                Some(done) = self.attempts.recv() => Wake::Attempt(done),
                event = next_event(&mut self.events) => Wake::Event(event),
                attempt = self.supervisor.wait_for_retry() => Wake::Retry(attempt),
            };

            match wake {
                Wake::Command(None) | Wake::Command(Some(EngineCommand::Shutdown)) => break,
                Wake::Command(Some(command)) => self.on_command(command, &outbox).await,
                Wake::Attempt(done) => self.on_attempt(done, &outbox).await,
                Wake::Event(event) => self.on_event(event, &outbox).await,
                Wake::Retry(attempt) => {
                    tracing::info!(attempt, "retrying realm connection");
                    self.start_attempt();
                }
            }
        }

        if let Some(connection) = self.connection.take() {
            let _ = self
                .with_timeout("disconnect", connection.disconnect("relay shutting down"))
                .await;
        }
        drop(outbox);
        let _ = dispatcher.await;
        tracing::info!("relay engine stopped");
    }

    // -----------------------------------------------------------------------
    // Operator commands
    // -----------------------------------------------------------------------

    async fn on_command(&mut self, command: EngineCommand, outbox: &mpsc::Sender<Outbound>) {
        match command {
            EngineCommand::Connect { reply } => {
                let result = self.supervisor.connect().map_err(RelayError::from);
                if result.is_ok() {
                    self.start_attempt();
                }
                let _ = reply.send(result);
            }
            EngineCommand::Disconnect { reply } => {
                let result = self.leave("disconnected by operator", outbox).await;
                let _ = reply.send(result);
            }
            EngineCommand::BindChannel { channel, reply } => {
                let result = self.bind(channel, outbox).await;
                let _ = reply.send(result);
            }
            EngineCommand::Participants { reply } => {
                let list = self.router.participants().into_iter().cloned().collect();
                let _ = reply.send(list);
            }
            EngineCommand::SendRaw { text, reply } => {
                let result = self.send_raw(text).await;
                let _ = reply.send(result);
            }
            EngineCommand::AdjustModeration {
                list,
                value,
                present,
                reply,
            } => {
                let result = self.adjust_moderation(list, &value, present).await;
                let _ = reply.send(result);
            }
            EngineCommand::Gateway { message } => self.on_gateway(message, outbox).await,
            EngineCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            // Handled by the run loop.
            EngineCommand::Shutdown => {}
        }
    }

    async fn bind(
        &mut self,
        channel: ChannelId,
        outbox: &mpsc::Sender<Outbound>,
    ) -> Result<(), RelayError> {
        tracing::info!(%channel, "relay channel bound");
        self.binding = Some(channel.clone());
        self.notify(
            outbox,
            Notification::titled(
                "Relay Channel Set",
                format!("Realm chat will be relayed to {channel}."),
                Severity::Success,
            ),
        )
        .await;
        self.store.save_binding(&channel).await.map_err(|e| {
            tracing::error!(error = %e, "failed to persist channel binding");
            RelayError::from(e)
        })
    }

    async fn send_raw(&self, text: String) -> Result<(), RelayError> {
        if text.trim().is_empty() {
            return Err(RelayError::CommandRejected("message is empty".into()));
        }
        let Some(connection) = &self.connection else {
            return Err(RelayError::NotConnected);
        };
        let line = GameCommand::Say { text }.render();
        self.with_timeout("command", connection.send_command(&line))
            .await
            .map_err(RelayError::from)
    }

    async fn adjust_moderation(
        &mut self,
        list: ModerationList,
        value: &str,
        present: bool,
    ) -> Result<Arc<ModerationLists>, RelayError> {
        let next = Arc::new(self.router.lists().with_entry(list, value, present)?);
        tracing::info!(?list, %value, present, "moderation list adjusted");
        self.router.set_lists(Arc::clone(&next));
        if let Err(e) = self.store.save_moderation(&next).await {
            tracing::error!(error = %e, "failed to persist moderation lists");
            return Err(e.into());
        }
        Ok(next)
    }

    fn status(&self) -> RelayStatus {
        RelayStatus {
            state: self.supervisor.state(),
            attempts: self.supervisor.attempts(),
            max_attempts: self.supervisor.config().max_attempts,
            retry_pending: self.supervisor.is_retry_pending(),
            participants: self.router.participants().len(),
            channel: self.binding.clone(),
        }
    }

    async fn on_gateway(&mut self, message: GatewayMessage, outbox: &mpsc::Sender<Outbound>) {
        let effects = self.router.handle_gateway(
            &message,
            self.binding.as_ref(),
            self.connection.is_some(),
        );
        self.apply(effects, outbox).await;
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Spawns one connect attempt. Its result comes back via `attempts`.
    fn start_attempt(&mut self) {
        self.attempt_generation += 1;
        let generation = self.attempt_generation;
        let connector = Arc::clone(&self.connector);
        let tx = self.attempt_tx.clone();
        tokio::spawn(async move {
            let result = connector.connect().await;
            let _ = tx.send(AttemptResult { generation, result }).await;
        });
    }

    async fn on_attempt(
        &mut self,
        done: AttemptResult<C::Connection>,
        outbox: &mpsc::Sender<Outbound>,
    ) {
        if done.generation != self.attempt_generation {
            tracing::debug!(generation = done.generation, "stale connect result discarded");
            if let Ok((connection, _events)) = done.result {
                let _ = self
                    .with_timeout("disconnect", connection.disconnect("superseded"))
                    .await;
            }
            return;
        }

        match done.result {
            Ok((connection, events)) => {
                if !self.supervisor.on_connected() {
                    let _ = self
                        .with_timeout("disconnect", connection.disconnect("not expected"))
                        .await;
                    return;
                }
                tracing::info!(connection_id = %connection.id(), "realm session established");
                self.connection = Some(Arc::new(connection));
                self.events = Some(events);
                self.notify(
                    outbox,
                    Notification::titled(
                        "Connected",
                        "The relay joined the realm.",
                        Severity::Success,
                    ),
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "connect attempt failed");
                self.on_ended(e.to_string(), outbox).await;
            }
        }
    }

    async fn on_event(&mut self, event: SessionEvent, outbox: &mpsc::Sender<Outbound>) {
        match event {
            SessionEvent::Ended => self.on_ended("session ended".into(), outbox).await,
            SessionEvent::Error { detail } => self.on_ended(detail, outbox).await,
            event => {
                let effects = self.router.handle_event(event, Instant::now());
                self.apply(effects, outbox).await;
            }
        }
    }

    /// The session (or an attempt) ended. The supervisor decides what next.
    async fn on_ended(&mut self, detail: String, outbox: &mpsc::Sender<Outbound>) {
        self.connection = None;
        self.events = None;

        match self.supervisor.on_ended(&detail) {
            EndOutcome::RetryScheduled { attempt, delay } => {
                let max = self.supervisor.config().max_attempts;
                self.notify(
                    outbox,
                    Notification::titled(
                        "Connection Lost",
                        format!(
                            "{detail}\nReconnecting in {}s (attempt {attempt} of {max}).",
                            delay.as_secs()
                        ),
                        Severity::Warning,
                    ),
                )
                .await;
            }
            EndOutcome::GaveUp => {
                self.router.reset();
                let attempts = self.supervisor.attempts();
                self.notify(
                    outbox,
                    Notification::titled(
                        "Connection Lost",
                        format!("{detail}\nGave up after {attempts} attempt(s). Use connect to try again."),
                        Severity::Danger,
                    ),
                )
                .await;
            }
            EndOutcome::Ignored => {}
        }
    }

    /// Full reset: leave the realm and forget everyone.
    async fn leave(&mut self, reason: &str, outbox: &mpsc::Sender<Outbound>) -> Result<(), RelayError> {
        self.supervisor.leave()?;
        // Anything still in flight belongs to the old generation.
        self.attempt_generation += 1;
        self.events = None;
        if let Some(connection) = self.connection.take() {
            if let Err(e) = self.with_timeout("disconnect", connection.disconnect(reason)).await {
                tracing::warn!(error = %e, "disconnect failed");
            }
        }
        self.router.reset();
        self.notify(
            outbox,
            Notification::titled("Disconnected", reason.to_string(), Severity::Warning),
        )
        .await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    /// Performs router effects in order.
    async fn apply(&mut self, effects: Vec<Effect>, outbox: &mpsc::Sender<Outbound>) {
        for effect in effects {
            match effect {
                Effect::Notify(notification) => self.notify(outbox, notification).await,
                Effect::Command(command) => {
                    let Some(connection) = &self.connection else {
                        tracing::debug!(%command, "no session, command dropped");
                        continue;
                    };
                    let line = command.render();
                    if let Err(e) = self.with_timeout("command", connection.send_command(&line)).await {
                        tracing::warn!(error = %e, "game command failed");
                    }
                }
                Effect::Kick { id, name, reason } => {
                    let Some(connection) = &self.connection else {
                        continue;
                    };
                    let kick = connection.send_moderation_action(&id, &name, reason);
                    if let Err(e) = self.with_timeout("kick", kick).await {
                        tracing::warn!(participant_id = %id, error = %e, "kick failed");
                    }
                }
                Effect::Record(record) => {
                    let entry = HistoryEntry::from_record(record, Utc::now());
                    if outbox.send(Outbound::Record(entry)).await.is_err() {
                        tracing::error!("dispatcher gone, history entry lost");
                    }
                }
                Effect::Leave => {
                    if let Err(e) = self.leave("left by in-game command", outbox).await {
                        tracing::debug!(error = %e, "in-game leave ignored");
                    }
                }
            }
        }
    }

    async fn notify(&self, outbox: &mpsc::Sender<Outbound>, notification: Notification) {
        let Some(channel) = &self.binding else {
            tracing::debug!(%notification, "no relay channel bound, notification dropped");
            return;
        };
        let out = Outbound::Notify {
            channel: channel.clone(),
            notification,
        };
        if outbox.send(out).await.is_err() {
            tracing::error!("dispatcher gone, notification lost");
        }
    }

    async fn with_timeout(
        &self,
        what: &str,
        send: impl Future<Output = Result<(), TransportError>>,
    ) -> Result<(), TransportError> {
        bounded(self.send_timeout, what, send).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Next event of the current session. Pends forever when there is none,
/// so the `select!` branch simply never fires.
async fn next_event(events: &mut Option<EventStream>) -> SessionEvent {
    if let Some(stream) = events {
        if let Some(event) = stream.next().await {
            return event;
        }
    }
    std::future::pending().await
}

async fn bounded(
    limit: Duration,
    what: &str,
    send: impl Future<Output = Result<(), TransportError>>,
) -> Result<(), TransportError> {
    match tokio::time::timeout(limit, send).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::SendFailed(format!(
            "{what} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

/// Drains the outbox in order: notifications to the sink, history to
/// the store. Exits when the engine drops its sender.
async fn dispatch<S: NotificationSink, St: StateStore>(
    sink: Arc<S>,
    store: Arc<St>,
    mut outbox: mpsc::Receiver<Outbound>,
    send_timeout: Duration,
) {
    while let Some(out) = outbox.recv().await {
        match out {
            Outbound::Notify {
                channel,
                notification,
            } => {
                let sent = bounded(send_timeout, "notification", sink.send(&channel, &notification));
                if let Err(e) = sent.await {
                    tracing::warn!(%channel, error = %e, "notification not delivered");
                }
            }
            Outbound::Record(entry) => {
                if let Err(e) = store.append_history(&entry).await {
                    tracing::error!(error = %e, "failed to append history");
                }
            }
        }
    }
}
