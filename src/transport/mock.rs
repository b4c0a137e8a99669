//! Scripted connector for socket and session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Connector, Transport};
use crate::error::{ClientError, Result};

/// One dial's worth of behaviour.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Frames delivered in order after connecting
    pub incoming: Vec<String>,
    /// Report a peer close once `incoming` runs out, instead of idling
    pub drop_after: bool,
}

impl Script {
    pub fn idle(incoming: &[&str]) -> Option<Self> {
        Some(Self {
            incoming: incoming.iter().map(|s| s.to_string()).collect(),
            drop_after: false,
        })
    }

    pub fn dropping(incoming: &[&str]) -> Option<Self> {
        Some(Self {
            incoming: incoming.iter().map(|s| s.to_string()).collect(),
            drop_after: true,
        })
    }
}

pub struct MockTransport {
    incoming: VecDeque<String>,
    drop_after: bool,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sent.lock().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        if let Some(text) = self.incoming.pop_front() {
            return Some(Ok(text));
        }
        if self.drop_after {
            return None;
        }
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Each dial takes the next script entry. `None`, or an exhausted script,
/// fails the dial.
#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<VecDeque<Option<Script>>>>,
    pub dials: Arc<AtomicUsize>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new(script: Vec<Option<Script>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, _url: &str) -> Result<MockTransport> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front().flatten();
        match next {
            Some(script) => Ok(MockTransport {
                incoming: script.incoming.into(),
                drop_after: script.drop_after,
                sent: self.sent.clone(),
                closed: self.closed.clone(),
            }),
            None => Err(ClientError::NotConnected),
        }
    }
}
