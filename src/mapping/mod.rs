//! Address specifications and the mapping-table compiler
//!
//! An [`AddressSpec`] is one row of a model's address table: a wire
//! template, an optional logical template, and the decoding rules for the
//! value found at that address. [`compile`] expands every template against
//! a model's cardinalities and produces the [`CompiledMapping`] used by the
//! update engine.

mod compiler;
pub mod template;

pub use compiler::{compile, CompiledMapping, MappingRow, ResolvedEntry};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::transform::{Enumeration, ScaleConfig, Transform, WriteTransform};

/// How a primary field's raw wire value becomes its logical value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Stored as received (booleans written as 1/0)
    #[default]
    None,
    /// Truthy wire value means `true`
    Boolean,
    /// Truthy wire value means `false` (WING mute vs. `mix_on`)
    BooleanInverted,
    /// Looked up in the row's enumeration
    Enumerated,
    /// Affine map from 0..1 onto the row's scale
    LinearScaled,
    /// Whole numbers; fractional input is rounded
    Integer,
}

/// A derived field published at `<logical address><suffix>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryOutput {
    pub suffix: String,
    /// Element of the raw reply to read; defaults to the primary's decoded value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<Transform>,
    /// Without one the derived field is read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<Transform>,
}

impl SecondaryOutput {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            value_index: None,
            forward: None,
            reverse: None,
        }
    }

    pub fn value_index(mut self, index: usize) -> Self {
        self.value_index = Some(index);
        self
    }

    pub fn forward(mut self, transform: Transform) -> Self {
        self.forward = Some(transform);
        self
    }

    pub fn reverse(mut self, transform: Transform) -> Self {
        self.reverse = Some(transform);
        self
    }
}

/// One row of an address table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AddressSpec {
    /// Wire template, e.g. `/ch/{num_channel}/mix/fader`
    pub wire: String,
    /// Logical template; when absent the wire address is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_index: Option<usize>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Enumeration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_transform: Option<WriteTransform>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary: Vec<SecondaryOutput>,
    /// Per-placeholder zero-pad width of the wire address
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub wire_padding: BTreeMap<String, usize>,
    /// Per-placeholder zero-pad width of the logical address
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub logical_padding: BTreeMap<String, usize>,
    /// Per-placeholder first index on the wire
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub wire_indexing: BTreeMap<String, i64>,
    /// Per-placeholder first index in the logical address
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub logical_indexing: BTreeMap<String, i64>,
}

impl AddressSpec {
    pub fn new(wire: impl Into<String>) -> Self {
        Self {
            wire: wire.into(),
            ..Default::default()
        }
    }

    pub fn logical(mut self, logical: impl Into<String>) -> Self {
        self.logical = Some(logical.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn value_index(mut self, index: usize) -> Self {
        self.value_index = Some(index);
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn enumeration(mut self, enumeration: Enumeration) -> Self {
        self.data_type = DataType::Enumerated;
        self.enumeration = Some(enumeration);
        self
    }

    pub fn scale(mut self, scale: ScaleConfig) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn write_transform(mut self, transform: WriteTransform) -> Self {
        self.write_transform = Some(transform);
        self
    }

    pub fn secondary(mut self, output: SecondaryOutput) -> Self {
        self.secondary.push(output);
        self
    }

    pub fn wire_padding(mut self, placeholder: impl Into<String>, width: usize) -> Self {
        self.wire_padding.insert(placeholder.into(), width);
        self
    }

    pub fn logical_padding(mut self, placeholder: impl Into<String>, width: usize) -> Self {
        self.logical_padding.insert(placeholder.into(), width);
        self
    }

    pub fn wire_indexing(mut self, placeholder: impl Into<String>, start: i64) -> Self {
        self.wire_indexing.insert(placeholder.into(), start);
        self
    }

    pub fn logical_indexing(mut self, placeholder: impl Into<String>, start: i64) -> Self {
        self.logical_indexing.insert(placeholder.into(), start);
        self
    }

    /// Logical template, falling back to the wire template
    pub fn logical_template(&self) -> &str {
        self.logical.as_deref().unwrap_or(&self.wire)
    }
}

/// Instance counts per placeholder name (`num_channel -> 32`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinalities(BTreeMap<String, u32>);

impl Cardinalities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, count: u32) -> Self {
        self.0.insert(name.into(), count);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, count: u32) {
        self.0.insert(name.into(), count);
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for Cardinalities {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
