use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::OnceLock;
use tracing::{debug, trace};

use super::template::{self, Placeholder};
use super::{AddressSpec, Cardinalities, DataType, SecondaryOutput};
use crate::error::{MixerError, Result};
use crate::transform::{Enumeration, ScaleConfig, Transform, WriteTransform};

/// A fully expanded address table row
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub wire_address: String,
    pub logical_address: String,
    pub tag: Option<String>,
    pub value_index: Option<usize>,
    pub data_type: DataType,
    pub enumeration: Option<Enumeration>,
    pub scale: Option<ScaleConfig>,
    pub write_transform: Option<WriteTransform>,
    pub secondary: Vec<SecondaryOutput>,
}

impl ResolvedEntry {
    fn from_spec(spec: &AddressSpec, wire_address: String, logical_address: String) -> Self {
        Self {
            wire_address,
            logical_address,
            tag: spec.tag.clone(),
            value_index: spec.value_index,
            data_type: spec.data_type,
            enumeration: spec.enumeration.clone(),
            scale: spec.scale,
            write_transform: spec.write_transform,
            secondary: spec.secondary.clone(),
        }
    }

    /// Logical address of one of this entry's derived fields
    pub fn secondary_address(&self, output: &SecondaryOutput) -> String {
        format!("{}{}", self.logical_address, output.suffix)
    }
}

/// One `(wire, logical)` pair as reported by `dump_mapping`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRow {
    pub wire: String,
    pub logical: String,
}

/// The compiled, model-specific address table
#[derive(Debug, Clone, Default)]
pub struct CompiledMapping {
    forward: BTreeMap<String, ResolvedEntry>,
    secondary_index: HashMap<String, String>,
    /// logical -> wire, built once from the final `forward`
    reverse: OnceLock<HashMap<String, String>>,
}

impl CompiledMapping {
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Entry for a wire address
    pub fn get(&self, wire_address: &str) -> Option<&ResolvedEntry> {
        self.forward.get(wire_address)
    }

    /// Entry whose primary logical address is `logical_address`
    pub fn lookup_logical(&self, logical_address: &str) -> Option<&ResolvedEntry> {
        self.reverse()
            .get(logical_address)
            .and_then(|wire| self.forward.get(wire))
    }

    /// Owning entry and output definition of a derived field
    pub fn lookup_secondary(
        &self,
        logical_address: &str,
    ) -> Option<(&ResolvedEntry, &SecondaryOutput)> {
        let wire = self.secondary_index.get(logical_address)?;
        let entry = self.forward.get(wire)?;
        let output = entry
            .secondary
            .iter()
            .find(|o| entry.secondary_address(o) == logical_address)?;
        Some((entry, output))
    }

    /// Entries sorted by wire address
    pub fn entries(&self) -> impl Iterator<Item = &ResolvedEntry> {
        self.forward.values()
    }

    /// Wire addresses in sorted order
    pub fn wire_addresses(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(String::as_str)
    }

    pub fn dump(&self) -> Vec<MappingRow> {
        self.forward
            .values()
            .map(|e| MappingRow {
                wire: e.wire_address.clone(),
                logical: e.logical_address.clone(),
            })
            .collect()
    }

    fn reverse(&self) -> &HashMap<String, String> {
        self.reverse.get_or_init(|| {
            self.forward
                .values()
                .map(|e| (e.logical_address.clone(), e.wire_address.clone()))
                .collect()
        })
    }

    fn remove_wire(&mut self, wire_address: &str) {
        if let Some(old) = self.forward.remove(wire_address) {
            for output in &old.secondary {
                let key = old.secondary_address(output);
                if self.secondary_index.get(&key).map(String::as_str) == Some(wire_address) {
                    self.secondary_index.remove(&key);
                }
            }
        }
    }

    /// Register a terminal entry. The newest entry wins both a wire address
    /// and a logical address; whatever it displaces is removed entirely.
    fn register(&mut self, entry: ResolvedEntry, owners: &mut HashMap<String, String>) {
        let wire = entry.wire_address.clone();
        let logical = entry.logical_address.clone();

        if let Some(previous) = self.forward.get(&wire) {
            if previous.logical_address != logical {
                debug!(
                    "Wire {} rebound from {} to {}",
                    wire, previous.logical_address, logical
                );
                owners.remove(&previous.logical_address);
            }
            self.remove_wire(&wire);
        }

        if let Some(owner) = owners.get(&logical).cloned() {
            if owner != wire {
                debug!("Logical {} moved from {} to {}", logical, owner, wire);
                self.remove_wire(&owner);
            }
        }

        for output in &entry.secondary {
            self.secondary_index
                .insert(entry.secondary_address(output), wire.clone());
        }
        owners.insert(logical, wire.clone());
        self.forward.insert(wire, entry);
        self.reverse = OnceLock::new();
    }
}

fn validate(spec: &AddressSpec, cardinalities: &Cardinalities) -> Result<()> {
    let wire_names = template::placeholders(&spec.wire)?;
    for p in &wire_names {
        if cardinalities.get(&p.name).is_none() {
            return Err(MixerError::Configuration(format!(
                "placeholder {{{}}} in {} has no cardinality",
                p.name, spec.wire
            )));
        }
    }

    if let Some(logical) = &spec.logical {
        for p in template::placeholders(logical)? {
            if !wire_names.iter().any(|w| w.name == p.name) {
                return Err(MixerError::Configuration(format!(
                    "placeholder {{{}}} in {} does not appear in {}",
                    p.name, logical, spec.wire
                )));
            }
        }
    }

    match spec.data_type {
        DataType::Enumerated if spec.enumeration.is_none() => {
            return Err(MixerError::Configuration(format!(
                "{} is enumerated but has no enumeration",
                spec.wire
            )));
        },
        DataType::LinearScaled if spec.scale.is_none() => {
            return Err(MixerError::Configuration(format!(
                "{} is linear_scaled but has no scale",
                spec.wire
            )));
        },
        _ => {},
    }

    for output in &spec.secondary {
        if output.suffix.is_empty() {
            return Err(MixerError::Configuration(format!(
                "{} declares a derived field with an empty suffix",
                spec.wire
            )));
        }
        let needs_scale = [output.forward, output.reverse]
            .iter()
            .flatten()
            .any(|t| matches!(t, Transform::LinfToDb | Transform::DbToLinf));
        if needs_scale && spec.scale.is_none() {
            return Err(MixerError::Configuration(format!(
                "{}{} uses a linf transform but {} has no scale",
                spec.logical_template(),
                output.suffix,
                spec.wire
            )));
        }
    }
    Ok(())
}

/// A partially substituted spec on the worklist
struct Pending {
    wire: String,
    logical: String,
}

fn expand(
    spec: &AddressSpec,
    cardinalities: &Cardinalities,
    out: &mut Vec<(String, String)>,
) -> Result<()> {
    // Without a logical template the wire template is reused, expanded
    // with the logical padding and indexing rules.
    let has_logical = spec.logical.is_some();
    let mut worklist = VecDeque::from([Pending {
        wire: spec.wire.clone(),
        logical: spec.logical_template().to_string(),
    }]);

    while let Some(item) = worklist.pop_front() {
        let Some(placeholder) = template::first_placeholder(&item.wire)? else {
            out.push((item.wire, item.logical));
            continue;
        };

        let Placeholder { name, width, start } = placeholder;
        let count = cardinalities.get(&name).ok_or_else(|| {
            MixerError::Configuration(format!("placeholder {{{}}} has no cardinality", name))
        })?;

        let wire_start = start
            .or_else(|| spec.wire_indexing.get(&name).copied())
            .unwrap_or(1);
        let wire_width = width
            .or_else(|| spec.wire_padding.get(&name).copied())
            .unwrap_or_else(|| template::digit_count(count));

        let logical_token = if has_logical {
            template::find_named(&item.logical, &name)?
        } else {
            None
        };
        let logical_start = logical_token
            .as_ref()
            .and_then(|p| p.start)
            .or_else(|| spec.logical_indexing.get(&name).copied())
            .unwrap_or(1);
        let logical_width = logical_token
            .as_ref()
            .and_then(|p| p.width)
            .or_else(|| spec.logical_padding.get(&name).copied())
            .unwrap_or(0);

        for offset in 0..i64::from(count) {
            let wire = template::substitute(&item.wire, &name, wire_start + offset, wire_width)?;
            let logical =
                template::substitute(&item.logical, &name, logical_start + offset, logical_width)?;
            worklist.push_back(Pending { wire, logical });
        }
    }
    Ok(())
}

/// Expand `specs` against `cardinalities` into a concrete mapping.
///
/// Every spec is validated first, including ones a tag filter would skip.
/// A non-empty `include_tags` drops tagged specs whose tag is not listed;
/// untagged specs are always kept. Specs are registered in declaration
/// order and later terminals win collisions.
pub fn compile(
    cardinalities: &Cardinalities,
    specs: &[AddressSpec],
    include_tags: &[String],
) -> Result<CompiledMapping> {
    for spec in specs {
        validate(spec, cardinalities)?;
    }

    let mut mapping = CompiledMapping::default();
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut expanded = Vec::new();

    for spec in specs {
        if let Some(tag) = &spec.tag {
            if !include_tags.is_empty() && !include_tags.iter().any(|t| t == tag) {
                trace!("Skipping {} (tag {})", spec.wire, tag);
                continue;
            }
        }

        expanded.clear();
        expand(spec, cardinalities, &mut expanded)?;
        for (wire, logical) in expanded.drain(..) {
            let entry = ResolvedEntry::from_spec(spec, wire, logical);
            mapping.register(entry, &mut owners);
        }
    }

    debug!("Compiled {} wire addresses", mapping.len());
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;

    fn cards() -> Cardinalities {
        Cardinalities::new()
            .with("num_channel", 32)
            .with("num_bus", 16)
            .with("num_head_amp", 128)
            .with("num_fx", 0)
    }

    #[test]
    fn test_default_padding_follows_cardinality() {
        let specs = vec![AddressSpec::new("/ch/{num_channel}/fader")];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.len(), 32);
        assert!(m.get("/ch/01/fader").is_some());
        assert!(m.get("/ch/32/fader").is_some());
        assert!(m.get("/ch/1/fader").is_none());
        assert!(m.get("/ch/33/fader").is_none());
        // no logical template: the wire template with logical numbering
        assert_eq!(m.get("/ch/01/fader").unwrap().logical_address, "/ch/1/fader");
    }

    #[test]
    fn test_logical_padding_is_independent() {
        let specs = vec![AddressSpec::new("/ch/{num_channel}/mix/fader")
            .logical("/chan/{num_channel}/mix_fader")];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.get("/ch/07/mix/fader").unwrap().logical_address, "/chan/7/mix_fader");
        assert_eq!(m.lookup_logical("/chan/7/mix_fader").unwrap().wire_address, "/ch/07/mix/fader");
    }

    #[test]
    fn test_multiple_placeholders() {
        let specs = vec![AddressSpec::new("/ch/{num_channel}/mix/{num_bus}/level")
            .logical("/chsend/{num_channel}/{num_bus}/mix_fader")];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.len(), 32 * 16);
        let e = m.get("/ch/05/mix/12/level").unwrap();
        assert_eq!(e.logical_address, "/chsend/5/12/mix_fader");
    }

    #[test]
    fn test_indexing_offsets_logical_number() {
        let specs = vec![AddressSpec::new("/headamp/{num_head_amp}/gain")
            .logical("/headamp/{num_head_amp}/gain")
            .wire_indexing("num_head_amp", 0)];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.len(), 128);
        assert_eq!(m.get("/headamp/000/gain").unwrap().logical_address, "/headamp/1/gain");
        assert_eq!(m.get("/headamp/127/gain").unwrap().logical_address, "/headamp/128/gain");
        assert!(m.get("/headamp/128/gain").is_none());
    }

    #[test]
    fn test_inline_token_options() {
        let specs = vec![AddressSpec::new("/bus/{num_bus:1}/x").logical("/b/{num_bus:2,0}")];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.get("/bus/1/x").unwrap().logical_address, "/b/00");
        assert_eq!(m.get("/bus/16/x").unwrap().logical_address, "/b/15");
    }

    #[test]
    fn test_headamp_without_logical_template() {
        let specs = vec![AddressSpec::new("/headamp/{num_head_amp:3,0}/phantom")];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.get("/headamp/000/phantom").unwrap().logical_address, "/headamp/1/phantom");
    }

    #[test]
    fn test_zero_cardinality_expands_to_nothing() {
        let specs = vec![AddressSpec::new("/fx/{num_fx}/type")];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_tag_filter() {
        let specs = vec![
            AddressSpec::new("/ch/{num_channel}/fader").tag("channels"),
            AddressSpec::new("/bus/{num_bus}/fader").tag("busses"),
            AddressSpec::new("/main/st/fader"),
        ];
        let m = compile(&cards(), &specs, &["busses".to_string()]).unwrap();
        assert_eq!(m.len(), 17);
        assert!(m.get("/main/st/fader").is_some());
        assert!(m.get("/ch/01/fader").is_none());

        let all = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(all.len(), 32 + 16 + 1);
    }

    #[test]
    fn test_unknown_placeholder_is_configuration_error() {
        let specs = vec![
            AddressSpec::new("/ch/{num_channel}/fader").tag("channels"),
            AddressSpec::new("/mtx/{num_matrix}/fader").tag("matrices"),
        ];
        // validated even though the tag filter would skip it
        let err = compile(&cards(), &specs, &["channels".to_string()]).unwrap_err();
        assert!(matches!(err, MixerError::Configuration(_)));
    }

    #[test]
    fn test_logical_only_placeholder_rejected() {
        let specs = vec![AddressSpec::new("/main/st/fader").logical("/main/{num_bus}/fader")];
        assert!(matches!(
            compile(&cards(), &specs, &[]),
            Err(MixerError::Configuration(_))
        ));
    }

    #[test]
    fn test_enumerated_without_table_rejected() {
        let specs = vec![AddressSpec::new("/-stat/tape/state").data_type(DataType::Enumerated)];
        assert!(compile(&cards(), &specs, &[]).is_err());
    }

    #[test]
    fn test_same_wire_later_spec_wins() {
        let specs = vec![
            AddressSpec::new("/main/st/fader")
                .logical("/legacy/fader")
                .secondary(SecondaryOutput::new("_db").forward(Transform::FaderToDb)),
            AddressSpec::new("/main/st/fader").logical("/main/st/mix_fader"),
        ];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("/main/st/fader").unwrap().logical_address, "/main/st/mix_fader");
        assert!(m.lookup_logical("/legacy/fader").is_none());
        assert!(m.lookup_secondary("/legacy/fader_db").is_none());
        assert!(m.lookup_logical("/main/st/mix_fader").is_some());
    }

    #[test]
    fn test_same_logical_moves_to_later_wire() {
        let specs = vec![
            AddressSpec::new("/main/st/mix/fader").logical("/main/st/mix_fader"),
            AddressSpec::new("/lr/mix/fader").logical("/main/st/mix_fader"),
        ];
        let m = compile(&cards(), &specs, &[]).unwrap();
        assert_eq!(m.len(), 1);
        assert!(m.get("/main/st/mix/fader").is_none());
        assert_eq!(m.lookup_logical("/main/st/mix_fader").unwrap().wire_address, "/lr/mix/fader");
    }

    #[test]
    fn test_secondary_index() {
        let specs = vec![AddressSpec::new("/ch/{num_channel}/mix/fader")
            .logical("/chan/{num_channel}/mix_fader")
            .secondary(
                SecondaryOutput::new("_db")
                    .forward(Transform::FaderToDb)
                    .reverse(Transform::DbToFader),
            )];
        let m = compile(&cards(), &specs, &[]).unwrap();
        let (entry, output) = m.lookup_secondary("/chan/3/mix_fader_db").unwrap();
        assert_eq!(entry.wire_address, "/ch/03/mix/fader");
        assert_eq!(output.suffix, "_db");
        assert!(m.lookup_secondary("/chan/3/mix_fader").is_none());
    }

    #[test]
    fn test_dump_is_sorted_by_wire() {
        let specs = vec![
            AddressSpec::new("/b").logical("/x/b"),
            AddressSpec::new("/a").logical("/x/a"),
        ];
        let rows = compile(&cards(), &specs, &[]).unwrap().dump();
        assert_eq!(
            rows,
            vec![
                MappingRow {
                    wire: "/a".into(),
                    logical: "/x/a".into()
                },
                MappingRow {
                    wire: "/b".into(),
                    logical: "/x/b".into()
                },
            ]
        );
    }
}
