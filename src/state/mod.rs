//! Mirrored mixer state and the engine that keeps it in sync with the wire

mod engine;
mod store;
mod types;

pub use engine::UpdateEngine;
pub use store::StateStore;
pub use types::{ChangeRecord, WireWrite};
