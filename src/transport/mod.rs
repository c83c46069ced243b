//! Transports carrying OSC messages to and from the console
//!
//! The engine only needs fire-and-forget sends; inbound messages arrive on
//! an mpsc channel handed out when the transport is created.

use async_trait::async_trait;
use rosc::{OscArray, OscType};

use crate::error::Result;
use crate::value::MixerValue;

pub mod memory;
pub mod udp;

pub use memory::MemoryTransport;
pub use udp::UdpTransport;

/// One inbound OSC message
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub address: String,
    pub args: Vec<MixerValue>,
}

impl WireMessage {
    pub fn new(address: impl Into<String>, args: Vec<MixerValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

/// Outbound half of a console connection.
///
/// All methods take `&self` so a transport can sit behind `Arc<dyn Transport>`.
/// Delivery is not guaranteed (UDP semantics).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs ("udp", "memory")
    fn name(&self) -> &str;

    /// Send one message. An empty `args` is a read request.
    async fn send(&self, address: &str, args: &[MixerValue]) -> Result<()>;

    /// Stop receiving. Default: nothing to release.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Decoded OSC argument to a mixer value
pub fn from_osc(arg: &OscType) -> MixerValue {
    match arg {
        OscType::Int(i) => MixerValue::Int(i64::from(*i)),
        OscType::Long(i) => MixerValue::Int(*i),
        OscType::Float(f) => MixerValue::Float(f64::from(*f)),
        OscType::Double(f) => MixerValue::Float(*f),
        OscType::String(s) => MixerValue::Text(s.clone()),
        OscType::Bool(b) => MixerValue::Bool(*b),
        OscType::Char(c) => MixerValue::Text(c.to_string()),
        OscType::Blob(bytes) => {
            MixerValue::List(bytes.iter().map(|b| MixerValue::Int(i64::from(*b))).collect())
        },
        OscType::Array(array) => MixerValue::List(array.content.iter().map(from_osc).collect()),
        OscType::Inf => MixerValue::Float(f64::INFINITY),
        OscType::Nil => MixerValue::List(Vec::new()),
        other => MixerValue::Text(format!("{:?}", other)),
    }
}

/// Mixer value to OSC argument. Floats go out as 32-bit, which is what the
/// consoles parse; integers that do not fit 32 bits go out as `Long`.
pub fn to_osc(value: &MixerValue) -> OscType {
    match value {
        MixerValue::Bool(b) => OscType::Bool(*b),
        MixerValue::Int(i) => match i32::try_from(*i) {
            Ok(small) => OscType::Int(small),
            Err(_) => OscType::Long(*i),
        },
        MixerValue::Float(f) => OscType::Float(*f as f32),
        MixerValue::Text(s) => OscType::String(s.clone()),
        MixerValue::List(items) => OscType::Array(OscArray {
            content: items.iter().map(to_osc).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osc_conversion() {
        assert_eq!(from_osc(&OscType::Int(3)), MixerValue::Int(3));
        assert_eq!(from_osc(&OscType::Float(0.75)), MixerValue::Float(0.75));
        assert_eq!(from_osc(&OscType::String("Vox".into())), MixerValue::Text("Vox".into()));
        assert_eq!(to_osc(&MixerValue::Int(1)), OscType::Int(1));
        assert_eq!(to_osc(&MixerValue::Int(1 << 40)), OscType::Long(1 << 40));
        assert_eq!(to_osc(&MixerValue::Float(0.5)), OscType::Float(0.5));
        assert_eq!(to_osc(&MixerValue::Text("GO".into())), OscType::String("GO".into()));
    }
}
