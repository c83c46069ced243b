//! In-memory transport - records every send instead of touching the network
//!
//! Useful for:
//! - Running the engine without a console attached
//! - Asserting the exact wire traffic of an operation in tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::{Transport, WireMessage};
use crate::error::Result;
use crate::value::MixerValue;

/// Records sent messages in order. Clones share the same log.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<WireMessage>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far
    pub fn sent(&self) -> Vec<WireMessage> {
        self.sent.lock().clone()
    }

    /// Sends addressed to `address`
    pub fn sent_to(&self, address: &str) -> Vec<WireMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.address == address)
            .cloned()
            .collect()
    }

    /// Drain the log
    pub fn take(&self) -> Vec<WireMessage> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, address: &str, args: &[MixerValue]) -> Result<()> {
        debug!(address = %address, ?args, "recorded");
        self.sent
            .lock()
            .push(WireMessage::new(address, args.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let transport = MemoryTransport::new();
        let shared = transport.clone();
        transport.send("/xremote", &[]).await.unwrap();
        transport
            .send("/ch/01/mix/on", &[MixerValue::Int(1)])
            .await
            .unwrap();

        assert_eq!(shared.sent().len(), 2);
        assert_eq!(shared.sent_to("/ch/01/mix/on")[0].args, vec![MixerValue::Int(1)]);
        assert_eq!(shared.take()[0].address, "/xremote");
        assert!(transport.sent().is_empty());
    }
}
