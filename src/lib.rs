//! Mixer Bridge - mirror and control Behringer X32, X-Air and WING consoles over OSC
//!
//! A model's address table is compiled into a bidirectional wire/logical
//! mapping. Inbound OSC replies are decoded into a flat state mirror keyed
//! by logical address; writes go the other way and are confirmed by a
//! follow-up read. A renewal task keeps the console's push subscription
//! alive and reloads state after an outage.

pub mod config;
pub mod error;
pub mod mapping;
pub mod mixer;
pub mod models;
pub mod state;
pub mod subscription;
pub mod transform;
pub mod transport;
pub mod value;

pub use error::{MixerError, Result, TransformError};
pub use mixer::{Mixer, MixerOptions, MixerStatus};
pub use models::{MixerInfo, MixerModel, ModelProfile};
pub use state::ChangeRecord;
pub use value::MixerValue;
