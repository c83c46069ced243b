//! Update engine: inbound wire messages to change records, logical writes
//! to wire writes.

use std::sync::Arc;
use tracing::{trace, warn};

use super::store::StateStore;
use super::types::{ChangeRecord, WireWrite};
use crate::error::{MixerError, Result, TransformError};
use crate::mapping::{CompiledMapping, DataType, ResolvedEntry};
use crate::transform::{db_to_linear_scaled, linear_scaled_to_db};
use crate::value::MixerValue;

type DecodeResult<T> = std::result::Result<T, TransformError>;

/// Pick the raw value a field reads from a reply
fn select(values: &[MixerValue], index: Option<usize>) -> DecodeResult<MixerValue> {
    match index {
        Some(i) => values
            .get(i)
            .cloned()
            .ok_or(TransformError::MissingElement {
                index: i,
                len: values.len(),
            }),
        None if values.len() == 1 => Ok(values[0].clone()),
        None => Ok(MixerValue::List(values.to_vec())),
    }
}

fn to_integer(value: &MixerValue) -> DecodeResult<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .ok_or_else(|| TransformError::NotNumeric(value.to_string()))
}

/// Raw wire value to logical value according to the entry's data type
fn decode(entry: &ResolvedEntry, raw: MixerValue) -> DecodeResult<MixerValue> {
    match entry.data_type {
        DataType::None => Ok(raw),
        DataType::Boolean => Ok(MixerValue::Bool(raw.truthy())),
        DataType::BooleanInverted => Ok(MixerValue::Bool(!raw.truthy())),
        DataType::Enumerated => match &entry.enumeration {
            Some(enumeration) => enumeration.decode(&raw).map(MixerValue::Text),
            None => Ok(raw),
        },
        DataType::LinearScaled => match &entry.scale {
            Some(scale) => Ok(MixerValue::Float(linear_scaled_to_db(
                raw.require_f64()?,
                scale.min,
                scale.max,
            ))),
            None => Err(TransformError::MissingScale("linear_scaled")),
        },
        DataType::Integer => to_integer(&raw).map(MixerValue::Int),
    }
}

/// Logical value of a primary field to the value sent on the wire
fn encode(entry: &ResolvedEntry, value: MixerValue) -> DecodeResult<MixerValue> {
    let wire_value = match entry.data_type {
        DataType::None => match value {
            MixerValue::Bool(b) => MixerValue::Int(b as i64),
            other => other,
        },
        DataType::Boolean => MixerValue::Int(value.truthy() as i64),
        DataType::BooleanInverted => MixerValue::Int(!value.truthy() as i64),
        DataType::Enumerated => match &entry.enumeration {
            Some(enumeration) => enumeration.encode(&value)?,
            None => value,
        },
        DataType::LinearScaled => {
            let scale = entry
                .scale
                .as_ref()
                .ok_or(TransformError::MissingScale("linear_scaled"))?;
            MixerValue::Float(db_to_linear_scaled(value.require_f64()?, scale.min, scale.max))
        },
        DataType::Integer => MixerValue::Int(to_integer(&value)?),
    };

    match entry.write_transform {
        Some(transform) => transform.apply(&wire_value),
        None => Ok(wire_value),
    }
}

/// Translates between the wire and the logical state for one compiled table
#[derive(Debug, Clone)]
pub struct UpdateEngine {
    mapping: Arc<CompiledMapping>,
    store: StateStore,
}

impl UpdateEngine {
    pub fn new(mapping: Arc<CompiledMapping>, store: StateStore) -> Self {
        Self { mapping, store }
    }

    pub fn mapping(&self) -> &CompiledMapping {
        &self.mapping
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Change records for one inbound message, primary first.
    ///
    /// Unmapped addresses give an empty list. Nothing is stored.
    pub fn decode_message(
        &self,
        address: &str,
        values: &[MixerValue],
    ) -> DecodeResult<Vec<ChangeRecord>> {
        let Some(entry) = self.mapping.get(address) else {
            return Ok(Vec::new());
        };

        let primary = decode(entry, select(values, entry.value_index)?)?;
        let mut records = Vec::with_capacity(1 + entry.secondary.len());

        for output in &entry.secondary {
            let input = match output.value_index {
                Some(i) => select(values, Some(i))?,
                None => primary.clone(),
            };
            let derived = match output.forward {
                Some(transform) => transform.apply(&input, entry.scale.as_ref())?,
                None => input,
            };
            records.push(ChangeRecord::new(entry.secondary_address(output), derived));
        }

        records.insert(0, ChangeRecord::new(entry.logical_address.clone(), primary));
        Ok(records)
    }

    /// Decode and store an inbound message.
    ///
    /// A message that fails to decode is logged and dropped; the store is
    /// left untouched.
    pub fn on_wire_message(&self, address: &str, values: &[MixerValue]) -> Vec<ChangeRecord> {
        match self.decode_message(address, values) {
            Ok(records) => {
                if !records.is_empty() {
                    trace!(address = %address, changes = records.len(), "state updated");
                }
                self.store.apply(&records);
                records
            },
            Err(e) => {
                warn!(address = %address, "Dropping undecodable message: {}", e);
                Vec::new()
            },
        }
    }

    /// Resolve a logical write into the wire address and value to send
    pub fn encode_write(&self, address: &str, value: MixerValue) -> Result<WireWrite> {
        let (entry, primary_value) =
            if let Some((entry, output)) = self.mapping.lookup_secondary(address) {
                let reverse = output
                    .reverse
                    .ok_or_else(|| MixerError::ReadOnlyField(address.to_string()))?;
                let primary = reverse
                    .apply(&value, entry.scale.as_ref())
                    .map_err(|e| MixerError::transform(address, e))?;
                (entry, primary)
            } else if let Some(entry) = self.mapping.lookup_logical(address) {
                (entry, value)
            } else {
                return Err(MixerError::UnknownAddress(address.to_string()));
            };

        let wire_value =
            encode(entry, primary_value).map_err(|e| MixerError::transform(address, e))?;
        Ok(WireWrite {
            address: entry.wire_address.clone(),
            value: wire_value,
        })
    }
}
