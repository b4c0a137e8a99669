//! Connection state for the room/game socket.
//!
//! Tracks the lifecycle of one persistent connection, the reconnect delay
//! schedule and frames queued while the socket is down.
//!
//! ```text
//!              open              drop
//! Connecting ───────▶ Open ───────────▶ Reconnecting { attempt }
//!     ▲                                        │
//!     └──────────── retry delay elapsed ───────┘
//!
//! any ── close / retries exhausted ──▶ Closed
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Base of the first reconnect delay.
pub const DEFAULT_MIN_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Random extra added to the base once per connection.
pub const DEFAULT_RECONNECT_JITTER: Duration = Duration::from_millis(4000);

/// Delay ceiling.
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_millis(10_000);

/// Delay multiplier per consecutive failure.
pub const DEFAULT_RECONNECT_GROW_FACTOR: f64 = 1.3;

/// Reconnect delay schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub min_delay: Duration,
    pub jitter: Duration,
    pub max_delay: Duration,
    pub grow_factor: f64,
    /// `None` retries forever
    pub max_retries: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_RECONNECT_DELAY,
            jitter: DEFAULT_RECONNECT_JITTER,
            max_delay: DEFAULT_MAX_RECONNECT_DELAY,
            grow_factor: DEFAULT_RECONNECT_GROW_FACTOR,
            max_retries: None,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed delay, no growth or jitter. Mostly for tests.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min_delay: delay,
            jitter: Duration::ZERO,
            max_delay: delay,
            grow_factor: 1.0,
            max_retries: None,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// First-retry delay for a connection, given a jitter sample in `[0, 1)`.
    pub fn base_delay(&self, jitter_sample: f64) -> Duration {
        self.min_delay + self.jitter.mul_f64(jitter_sample.clamp(0.0, 1.0))
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, base: Duration, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let scaled = base.as_secs_f64() * self.grow_factor.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.map_or(true, |max| attempt <= max)
    }
}

/// Connection status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Initial dial in progress
    Connecting,

    /// Socket is open
    Open { since: Instant },

    /// Waiting to redial
    Reconnecting { attempt: u32, retry_at: Instant },

    /// Torn down; no further retries
    Closed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open { .. } => "open",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Lifecycle of one persistent connection.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Full socket URL, credential included
    pub url: String,

    pub status: ConnectionStatus,

    pub policy: ReconnectPolicy,

    /// First-retry delay, fixed for the connection's lifetime
    base_delay: Duration,

    /// Consecutive failed dials since the last open
    failures: u32,

    /// Times the socket has been opened
    pub open_count: u32,

    /// Frames waiting for the socket to open
    queue: VecDeque<String>,

    pub last_activity: Instant,
}

impl Connection {
    pub fn new(url: String, policy: ReconnectPolicy, jitter_sample: f64) -> Self {
        let base_delay = policy.base_delay(jitter_sample);
        Self {
            url,
            status: ConnectionStatus::Connecting,
            policy,
            base_delay,
            failures: 0,
            open_count: 0,
            queue: VecDeque::new(),
            last_activity: Instant::now(),
        }
    }

    /// Socket opened. Returns queued frames to flush, oldest first.
    pub fn opened(&mut self) -> Vec<String> {
        let now = Instant::now();
        self.status = ConnectionStatus::Open { since: now };
        self.failures = 0;
        self.open_count += 1;
        self.last_activity = now;
        self.queue.drain(..).collect()
    }

    /// Socket dropped or a dial failed. Returns the wait before the next
    /// dial, or `None` when retries are exhausted (status becomes `Closed`).
    pub fn dropped(&mut self) -> Option<Duration> {
        if self.status.is_closed() {
            return None;
        }
        self.failures = self.failures.saturating_add(1);
        if !self.policy.allows(self.failures) {
            self.close();
            return None;
        }
        let delay = self.policy.delay_for(self.base_delay, self.failures);
        self.status = ConnectionStatus::Reconnecting {
            attempt: self.failures,
            retry_at: Instant::now() + delay,
        };
        Some(delay)
    }

    /// Redial started.
    pub fn redialing(&mut self) {
        if !self.status.is_closed() {
            self.status = ConnectionStatus::Connecting;
        }
    }

    /// Tear down for good; queued frames are discarded.
    pub fn close(&mut self) {
        self.status = ConnectionStatus::Closed;
        self.queue.clear();
    }

    /// Queue a frame for the next open.
    pub fn enqueue(&mut self, frame: String) {
        self.queue.push_back(frame);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Record activity (any frame received).
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_connection(policy: ReconnectPolicy) -> Connection {
        Connection::new("ws://localhost/game/r1".to_string(), policy, 0.0)
    }

    #[test]
    fn test_connection_new() {
        let conn = make_connection(ReconnectPolicy::default());
        assert_eq!(conn.status, ConnectionStatus::Connecting);
        assert_eq!(conn.open_count, 0);
        assert_eq!(conn.queued(), 0);
    }

    #[test]
    fn test_default_delay_schedule() {
        let policy = ReconnectPolicy::default();
        let base = policy.base_delay(0.0);
        assert_eq!(base, Duration::from_secs(1));
        assert_eq!(policy.base_delay(0.5), Duration::from_secs(3));

        assert_eq!(policy.delay_for(base, 1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(base, 2), Duration::from_millis(1300));
        // Ceiling
        assert_eq!(policy.delay_for(base, 50), Duration::from_secs(10));
    }

    #[test]
    fn test_unbounded_retries() {
        let mut conn = make_connection(ReconnectPolicy::default());
        for _ in 0..1000 {
            assert!(conn.dropped().is_some());
            conn.redialing();
        }
        assert_eq!(conn.failures(), 1000);
        assert!(!conn.status.is_closed());
    }

    #[test]
    fn test_max_retries_closes() {
        let mut conn =
            make_connection(ReconnectPolicy::fixed(Duration::from_millis(10)).with_max_retries(2));
        assert_eq!(conn.dropped(), Some(Duration::from_millis(10)));
        assert_eq!(conn.dropped(), Some(Duration::from_millis(10)));
        assert_eq!(conn.dropped(), None);
        assert!(conn.status.is_closed());
    }

    #[test]
    fn test_open_resets_failures() {
        let mut conn = make_connection(ReconnectPolicy::default());
        conn.dropped();
        conn.dropped();
        assert!(matches!(
            conn.status,
            ConnectionStatus::Reconnecting { attempt: 2, .. }
        ));

        conn.opened();
        assert!(conn.status.is_open());
        assert_eq!(conn.failures(), 0);
        assert_eq!(conn.open_count, 1);
    }

    #[test]
    fn test_queue_flushes_in_order() {
        let mut conn = make_connection(ReconnectPolicy::default());
        conn.enqueue(r#"{"type":"roll"}"#.to_string());
        conn.enqueue(r#"{"type":"move","pieceIndex":1}"#.to_string());

        let flushed = conn.opened();
        assert_eq!(
            flushed,
            vec![
                r#"{"type":"roll"}"#.to_string(),
                r#"{"type":"move","pieceIndex":1}"#.to_string()
            ]
        );
        assert_eq!(conn.queued(), 0);
    }

    #[test]
    fn test_close_is_final() {
        let mut conn = make_connection(ReconnectPolicy::default());
        conn.enqueue("x".to_string());
        conn.close();
        assert_eq!(conn.queued(), 0);
        assert_eq!(conn.dropped(), None);
        conn.redialing();
        assert!(conn.status.is_closed());
    }
}
