//! State type definitions

use serde::Serialize;

use crate::value::MixerValue;

/// One logical field that changed as the result of an inbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// Logical address (primary or derived)
    pub address: String,
    pub value: MixerValue,
}

impl ChangeRecord {
    pub fn new(address: impl Into<String>, value: MixerValue) -> Self {
        Self {
            address: address.into(),
            value,
        }
    }
}

/// A resolved write, ready to go on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct WireWrite {
    pub address: String,
    pub value: MixerValue,
}
