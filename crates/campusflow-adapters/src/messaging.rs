//! Mock messaging provider.
//!
//! Stands in for the WhatsApp provider when no account is configured.  Every
//! accepted message lands in an outbox that tests and the CLI can inspect.
//! Recipients can be marked unreachable to exercise the fallback-logging path.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AdapterError, Result};
use crate::traits::{MessageReceipt, Messenger};

/// A message accepted by [`MockMessenger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub sid: String,
    /// Channel-qualified recipient, e.g. `whatsapp:+15550100001`.
    pub to: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// [`Messenger`] that records instead of sending.
pub struct MockMessenger {
    channel: String,
    unreachable: HashSet<String>,
    outbox: Mutex<Vec<SentMessage>>,
    counter: AtomicU64,
}

impl MockMessenger {
    /// A messenger addressing recipients on the `whatsapp` channel.
    pub fn new() -> Self {
        Self::with_channel("whatsapp")
    }

    pub fn with_channel(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            unreachable: HashSet::new(),
            outbox: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Reject every message sent to the given numbers.
    pub fn with_unreachable<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unreachable.extend(numbers.into_iter().map(Into::into));
        self
    }

    /// Snapshot of every accepted message, in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send(&self, to: &str, body: &str) -> Result<MessageReceipt> {
        let to = to.trim();
        if to.is_empty() {
            return Err(AdapterError::InvalidInput("recipient number is empty".into()));
        }
        if body.trim().is_empty() {
            return Err(AdapterError::InvalidInput("message body is empty".into()));
        }
        if self.unreachable.contains(to) {
            warn!(to, "mock recipient unreachable");
            return Err(AdapterError::Unreachable {
                recipient: to.to_string(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let message = SentMessage {
            sid: format!("mock-sid-{n}"),
            to: format!("{}:{to}", self.channel),
            body: body.to_string(),
            sent_at: Utc::now(),
        };
        info!(to = %message.to, sid = %message.sid, "mock message sent");

        let receipt = MessageReceipt {
            sid: message.sid.clone(),
        };
        self.outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
        Ok(receipt)
    }
}
