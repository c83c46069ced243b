//! MixerState - in-memory mirror of every logical field
//!
//! Cloning the store is cheap; all clones share the same map.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::ChangeRecord;
use crate::value::MixerValue;

/// Logical address -> last decoded value
#[derive(Clone, Default)]
pub struct StateStore {
    values: Arc<RwLock<HashMap<String, MixerValue>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store every record, in order
    pub fn apply(&self, records: &[ChangeRecord]) {
        if records.is_empty() {
            return;
        }
        let mut values = self.values.write();
        for record in records {
            values.insert(record.address.clone(), record.value.clone());
        }
    }

    pub fn get(&self, address: &str) -> Option<MixerValue> {
        self.values.read().get(address).cloned()
    }

    /// Copy of the whole mirror
    pub fn snapshot(&self) -> HashMap<String, MixerValue> {
        self.values.read().clone()
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("fields", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_snapshot() {
        let store = StateStore::new();
        store.apply(&[
            ChangeRecord::new("/ch/1/mix_fader", MixerValue::Float(0.75)),
            ChangeRecord::new("/ch/1/mix_fader_db", MixerValue::Float(0.0)),
        ]);
        assert_eq!(store.get("/ch/1/mix_fader"), Some(MixerValue::Float(0.75)));
        assert_eq!(store.len(), 2);

        let shared = store.clone();
        shared.apply(&[ChangeRecord::new("/ch/1/mix_fader", MixerValue::Float(0.5))]);
        assert_eq!(store.get("/ch/1/mix_fader"), Some(MixerValue::Float(0.5)));

        let snap = store.snapshot();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(snap.len(), 2);
    }
}
