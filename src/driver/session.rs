//! Async shell around a [`TurnDriver`].
//!
//! Processes one event at a time from three sources: user intents, the
//! socket (multiplayer only) and the opponent timer (solo only).

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{OpponentTimer, TurnDriver, TurnPhase};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::protocol::OutboundMessage;
use crate::state::game::{GameMode, GameStore, SOLO_ROOM_ID};
use crate::transport::{self, Outbound, ReconnectingSocket, SocketEvent, WsConnector};

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Roll,
    /// Piece index, 0-based
    Move(usize),
    Chat(String),
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Intent(Intent),
    Socket(SocketEvent),
    /// Opponent delay elapsed for the given schedule
    OpponentDue(u64),
}

/// What [`GameSession::run`] reports to its observer.
#[derive(Debug)]
pub enum Update<'a> {
    /// Game state changed
    Changed(&'a GameStore),
    /// A user action was refused or could not be sent
    Rejected(ClientError),
    Connection(&'a SocketEvent),
}

pub struct GameSession<R = StdRng> {
    driver: TurnDriver<R>,
    socket: Option<ReconnectingSocket>,
    socket_events: Option<mpsc::UnboundedReceiver<SocketEvent>>,
    connected: bool,
    timer: OpponentTimer,
    timer_tx: mpsc::UnboundedSender<u64>,
    timer_rx: mpsc::UnboundedReceiver<u64>,
    opponent_delay: Duration,
}

impl GameSession<StdRng> {
    /// Solo game against the scripted opponent.
    pub fn solo(config: &ClientConfig) -> Self {
        Self::new(TurnDriver::new(SOLO_ROOM_ID, GameMode::Solo), config.opponent_delay)
    }

    /// Multiplayer game on `/game/{room_id}`. Must be called inside a
    /// tokio runtime.
    pub fn connect(config: &ClientConfig, room_id: &str, token: Option<&str>) -> Result<Self> {
        let url = transport::socket_url(&config.ws_base, &transport::game_path(room_id), token)?;
        info!(room_id, "joining game");
        let (socket, events) = ReconnectingSocket::open(WsConnector, url, config.reconnect.clone());
        let driver = TurnDriver::new(room_id, GameMode::Multiplayer);
        Ok(Self::new(driver, config.opponent_delay).with_socket(socket, events))
    }
}

impl<R: Rng> GameSession<R> {
    pub fn new(driver: TurnDriver<R>, opponent_delay: Duration) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            driver,
            socket: None,
            socket_events: None,
            connected: false,
            timer: OpponentTimer::new(),
            timer_tx,
            timer_rx,
            opponent_delay,
        }
    }

    #[must_use]
    pub fn with_socket(
        mut self,
        socket: ReconnectingSocket,
        events: mpsc::UnboundedReceiver<SocketEvent>,
    ) -> Self {
        self.socket = Some(socket);
        self.socket_events = Some(events);
        self
    }

    pub fn driver(&self) -> &TurnDriver<R> {
        &self.driver
    }

    pub fn store(&self) -> &GameStore {
        self.driver.store()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn opponent_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Start the opponent delay when the cursor has just reached its seat.
    fn arm_opponent(&mut self) {
        if self.driver.phase() == TurnPhase::AwaitingScriptedOpponent && !self.timer.is_pending() {
            self.timer
                .schedule(self.opponent_delay, self.timer_tx.clone());
        }
    }

    /// Wait for the next event. `None` when the user leaves or the intent
    /// channel closes.
    pub async fn next_event(
        &mut self,
        intents: &mut mpsc::UnboundedReceiver<Intent>,
    ) -> Option<SessionEvent> {
        self.arm_opponent();
        tokio::select! {
            intent = intents.recv() => match intent {
                None | Some(Intent::Leave) => None,
                Some(intent) => Some(SessionEvent::Intent(intent)),
            },
            Some(event) = next_socket_event(&mut self.socket_events) => {
                Some(SessionEvent::Socket(event))
            }
            Some(generation) = self.timer_rx.recv() => Some(SessionEvent::OpponentDue(generation)),
        }
    }

    /// Apply one event. `Ok(true)` when game state changed.
    pub fn handle(&mut self, event: SessionEvent) -> Result<bool> {
        let changed = match event {
            SessionEvent::Intent(intent) => self.handle_intent(intent)?,
            SessionEvent::Socket(event) => self.handle_socket(event),
            SessionEvent::OpponentDue(generation) => {
                self.timer.fired(generation) && self.driver.play_opponent().is_some()
            }
        };
        self.arm_opponent();
        Ok(changed)
    }

    fn handle_intent(&mut self, intent: Intent) -> Result<bool> {
        let outbound = match intent {
            Intent::Roll => self.driver.roll()?,
            Intent::Move(piece_index) => self.driver.move_piece(piece_index)?,
            Intent::Chat(text) => match self.driver.chat(&text) {
                Some(msg) => Some(msg),
                None => return Ok(false),
            },
            Intent::Leave => return Ok(false),
        };
        match outbound {
            Some(msg) => {
                self.send(&msg)?;
                Ok(false)
            }
            // Applied locally
            None => Ok(true),
        }
    }

    fn send(&self, msg: &OutboundMessage) -> Result<()> {
        let socket = self.socket.as_ref().ok_or(ClientError::NotConnected)?;
        debug!(?msg, "sending");
        socket.send(msg)
    }

    fn handle_socket(&mut self, event: SocketEvent) -> bool {
        match event {
            SocketEvent::Message(msg) => {
                self.driver.apply_inbound(&msg);
                true
            }
            SocketEvent::Open => {
                self.connected = true;
                false
            }
            SocketEvent::Reconnecting { attempt, delay } => {
                self.connected = false;
                debug!(attempt, ?delay, "waiting to reconnect");
                false
            }
            SocketEvent::Closed => {
                self.connected = false;
                self.socket_events = None;
                false
            }
        }
    }

    /// Drive the session until the user leaves, then tear it down.
    pub async fn run<F>(&mut self, mut intents: mpsc::UnboundedReceiver<Intent>, mut observer: F)
    where
        F: FnMut(Update<'_>),
    {
        while let Some(event) = self.next_event(&mut intents).await {
            let socket_event = match &event {
                SessionEvent::Socket(e) => Some(e.clone()),
                _ => None,
            };
            match self.handle(event) {
                Ok(true) => observer(Update::Changed(self.driver.store())),
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "action rejected");
                    observer(Update::Rejected(e));
                }
            }
            if let Some(e) = socket_event.filter(|e| !matches!(e, SocketEvent::Message(_))) {
                observer(Update::Connection(&e));
            }
        }
        self.shutdown().await;
    }

    /// Cancel the opponent timer and close the socket.
    pub async fn shutdown(&mut self) {
        self.timer.cancel();
        if let Some(mut socket) = self.socket.take() {
            socket.shutdown().await;
        }
        self.socket_events = None;
        self.connected = false;
        info!(room_id = ?self.driver.store().room_id, "session closed");
    }
}

async fn next_socket_event(
    events: &mut Option<mpsc::UnboundedReceiver<SocketEvent>>,
) -> Option<SocketEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;

    use crate::protocol::InboundMessage;
    use crate::state::connection::ReconnectPolicy;
    use crate::transport::mock::{MockConnector, Script};

    const DELAY: Duration = Duration::from_millis(800);

    fn make_solo() -> GameSession<StdRng> {
        let driver = TurnDriver::with_rng(SOLO_ROOM_ID, GameMode::Solo, StdRng::seed_from_u64(42));
        GameSession::new(driver, DELAY)
    }

    fn make_multi(connector: MockConnector) -> GameSession<StdRng> {
        let driver = TurnDriver::with_rng("g1", GameMode::Multiplayer, StdRng::seed_from_u64(42));
        let (socket, events) = ReconnectingSocket::open(
            connector,
            "ws://test/game/g1",
            ReconnectPolicy::fixed(Duration::from_millis(50)),
        );
        GameSession::new(driver, DELAY).with_socket(socket, events)
    }

    #[tokio::test(start_paused = true)]
    async fn test_solo_opponent_moves_after_delay() {
        let mut session = make_solo();
        let (_tx, mut intents) = mpsc::unbounded_channel();

        assert_eq!(session.handle(SessionEvent::Intent(Intent::Move(0))).unwrap(), true);
        assert_eq!(session.store().turn(), 1);
        assert!(session.opponent_pending());

        let start = tokio::time::Instant::now();
        let event = session.next_event(&mut intents).await.unwrap();
        assert!(matches!(event, SessionEvent::OpponentDue(_)));
        assert!(start.elapsed() >= DELAY);

        assert_eq!(session.handle(event).unwrap(), true);
        assert_eq!(session.store().turn(), 2);
        assert!(session.store().progress(1, 0).unwrap() >= 1);
        assert!(!session.opponent_pending());
        assert!(session
            .store()
            .log()
            .last()
            .is_some_and(|e| e.message.starts_with("AI rolled")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_solo_rejects_actions_while_opponent_thinks() {
        let mut session = make_solo();
        session.handle(SessionEvent::Intent(Intent::Move(1))).unwrap();

        let err = session
            .handle(SessionEvent::Intent(Intent::Roll))
            .unwrap_err();
        assert!(matches!(err, ClientError::NotYourTurn));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_opponent() {
        let mut session = make_solo();
        session.handle(SessionEvent::Intent(Intent::Move(0))).unwrap();
        assert!(session.opponent_pending());

        session.shutdown().await;
        assert!(!session.opponent_pending());
        tokio::time::sleep(DELAY * 2).await;
        assert!(session.timer_rx.try_recv().is_err());
        assert_eq!(session.store().turn(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_solo_run_until_leave() {
        let mut session = make_solo();
        let (tx, intents) = mpsc::unbounded_channel();
        tx.send(Intent::Roll).unwrap();
        tx.send(Intent::Move(2)).unwrap();
        tx.send(Intent::Roll).unwrap();
        tx.send(Intent::Leave).unwrap();

        let mut changes = 0;
        let mut rejected = Vec::new();
        session
            .run(intents, |update| match update {
                Update::Changed(_) => changes += 1,
                Update::Rejected(e) => rejected.push(e.to_string()),
                Update::Connection(_) => {}
            })
            .await;

        assert_eq!(changes, 2);
        assert_eq!(rejected, vec!["it's not your turn".to_string()]);
        assert_eq!(session.store().turn(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplayer_round_trip() {
        let connector = MockConnector::new(vec![Script::idle(&[
            r#"{"type":"dice","value":5}"#,
            r#"{"type":"move","playerIndex":0,"pieceIndex":3,"steps":5}"#,
        ])]);
        let handle = connector.clone();
        let mut session = make_multi(connector);
        let (_tx, mut intents) = mpsc::unbounded_channel();

        let open = session.next_event(&mut intents).await.unwrap();
        assert_eq!(session.handle(open).unwrap(), false);
        assert!(session.is_connected());

        assert_eq!(session.handle(SessionEvent::Intent(Intent::Roll)).unwrap(), false);
        assert_eq!(
            session.handle(SessionEvent::Intent(Intent::Move(3))).unwrap(),
            false
        );
        // Chat text is trimmed; blank text is not sent
        session
            .handle(SessionEvent::Intent(Intent::Chat(" gl ".to_string())))
            .unwrap();
        session
            .handle(SessionEvent::Intent(Intent::Chat("  ".to_string())))
            .unwrap();

        for _ in 0..2 {
            let event = session.next_event(&mut intents).await.unwrap();
            assert!(matches!(event, SessionEvent::Socket(SocketEvent::Message(_))));
            assert_eq!(session.handle(event).unwrap(), true);
        }
        assert_eq!(session.store().dice(), Some(5));
        assert_eq!(session.store().progress(0, 3), Some(5));
        assert_eq!(session.store().turn(), 1);
        assert!(!session.opponent_pending());

        session.shutdown().await;
        assert_eq!(
            handle.sent(),
            vec![
                r#"{"type":"roll"}"#.to_string(),
                r#"{"type":"move","pieceIndex":3}"#.to_string(),
                r#"{"type":"chat","content":"gl"}"#.to_string(),
            ]
        );
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplayer_ignores_unknown_frames() {
        let connector = MockConnector::new(vec![Script::idle(&[
            r#"{"type":"explode"}"#,
            r#"{"type":"system","content":"Blue joined"}"#,
        ])]);
        let mut session = make_multi(connector);
        let (_tx, mut intents) = mpsc::unbounded_channel();

        let open = session.next_event(&mut intents).await.unwrap();
        session.handle(open).unwrap();
        let event = session.next_event(&mut intents).await.unwrap();
        assert_eq!(
            event,
            SessionEvent::Socket(SocketEvent::Message(InboundMessage::System {
                content: "Blue joined".to_string()
            }))
        );
        session.handle(event).unwrap();
        assert_eq!(session.store().turn(), 0);
        assert_eq!(session.store().log().len(), 1);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_without_socket() {
        let driver = TurnDriver::with_rng("g1", GameMode::Multiplayer, StdRng::seed_from_u64(1));
        let mut session = GameSession::new(driver, DELAY);
        let err = session
            .handle(SessionEvent::Intent(Intent::Roll))
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }
}
