//! Scripted registry channel

use anidb_registry_core::protocol::messages::Reply;
use anidb_registry_core::protocol::transport::{RegistryChannel, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock does with the next command it receives
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Raw reply text, header line included
    Raw(String),
    /// Answer with zero bytes, as a banned client sees
    SilentDrop,
    /// Never answer; fails with a timeout after the given wait
    Timeout(Duration),
    /// Fail at the socket
    Io(std::io::ErrorKind),
}

/// Mock implementation of [`RegistryChannel`] for testing
///
/// Replies are consumed in order. Once the script runs out, every send times
/// out after 30 seconds, which with tokio's paused clock costs no real time.
/// Clones share the same script and send log, so a test can keep one handle
/// while the connection owns another.
///
/// # Examples
///
/// ```rust,no_run
/// use anidb_registry_test_utils::MockChannel;
/// use anidb_registry_core::{ConnectionHandler, RegistryConfig};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let channel = MockChannel::new().with_reply("345 NO SUCH CREATOR");
/// let handler = ConnectionHandler::from_config(Arc::new(channel.clone()), &RegistryConfig::default());
/// # let _ = handler;
/// assert!(channel.sent().is_empty());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<ScriptedReply>,
    sent: Vec<String>,
    latency: Duration,
}

const EXHAUSTED_TIMEOUT: Duration = Duration::from_secs(30);

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply
    pub fn with_reply(self, raw: impl Into<String>) -> Self {
        self.push(ScriptedReply::Raw(raw.into()));
        self
    }

    /// Queue any scripted outcome
    pub fn with(self, outcome: ScriptedReply) -> Self {
        self.push(outcome);
        self
    }

    /// Delay every reply by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = latency;
        self
    }

    pub fn push(&self, outcome: ScriptedReply) {
        self.state.lock().unwrap().script.push_back(outcome);
    }

    /// Every wire string received so far, in order
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn send_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    /// Scripted outcomes not yet consumed
    pub fn remaining(&self) -> usize {
        self.state.lock().unwrap().script.len()
    }
}

#[async_trait]
impl RegistryChannel for MockChannel {
    async fn send(&self, wire: &str) -> Result<Reply, TransportError> {
        let (next, latency) = {
            let mut state = self.state.lock().unwrap();
            state.sent.push(wire.to_string());
            let next = state
                .script
                .pop_front()
                .unwrap_or(ScriptedReply::Timeout(EXHAUSTED_TIMEOUT));
            (next, state.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match next {
            ScriptedReply::Raw(raw) => Reply::parse(&raw).map_err(|err| {
                TransportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            }),
            ScriptedReply::SilentDrop => Err(TransportError::SilentDrop),
            ScriptedReply::Timeout(wait) => {
                tokio::time::sleep(wait).await;
                Err(TransportError::Timeout(wait))
            }
            ScriptedReply::Io(kind) => Err(TransportError::Io(std::io::Error::new(
                kind,
                "scripted failure",
            ))),
        }
    }
}
