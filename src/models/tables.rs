//! Embedded address tables
//!
//! Each family's table ships as YAML inside the binary and is parsed once.

use std::sync::OnceLock;

use crate::error::{MixerError, Result};
use crate::mapping::{AddressSpec, DataType, SecondaryOutput};
use crate::transform::WriteTransform;

pub const XSERIES_YAML: &str = include_str!("tables/xseries.yaml");
pub const X32_YAML: &str = include_str!("tables/x32.yaml");
pub const XAIR_YAML: &str = include_str!("tables/xair.yaml");
pub const WING_YAML: &str = include_str!("tables/wing.yaml");

static XSERIES: OnceLock<Vec<AddressSpec>> = OnceLock::new();
static X32: OnceLock<Vec<AddressSpec>> = OnceLock::new();
static XAIR: OnceLock<Vec<AddressSpec>> = OnceLock::new();
static WING: OnceLock<Vec<AddressSpec>> = OnceLock::new();

/// Parse a YAML table (cached after first parse)
fn load(
    cache: &'static OnceLock<Vec<AddressSpec>>,
    name: &str,
    src: &str,
) -> Result<&'static [AddressSpec]> {
    if let Some(specs) = cache.get() {
        return Ok(specs);
    }
    let specs: Vec<AddressSpec> = serde_yaml::from_str(src)
        .map_err(|e| MixerError::Configuration(format!("address table {}: {}", name, e)))?;
    // Another thread may have won the race; either copy is identical
    Ok(cache.get_or_init(|| specs))
}

pub fn xseries() -> Result<&'static [AddressSpec]> {
    load(&XSERIES, "xseries", XSERIES_YAML)
}

pub fn x32() -> Result<&'static [AddressSpec]> {
    load(&X32, "x32", X32_YAML)
}

pub fn xair() -> Result<&'static [AddressSpec]> {
    load(&XAIR, "xair", XAIR_YAML)
}

pub fn wing() -> Result<&'static [AddressSpec]> {
    load(&WING, "wing", WING_YAML)
}

/// Bus to bus sends. The console ignores a bus sending to itself, so
/// those pairs are left out.
pub fn wing_bus_to_bus_sends(num_bus: u32, num_bus_send: u32) -> Vec<AddressSpec> {
    let mut specs = Vec::new();
    for bus in 1..=num_bus {
        for send in (1..=num_bus_send).filter(|s| *s != bus) {
            specs.push(
                AddressSpec::new(format!("/bus/{}/send/{}/on", bus, send))
                    .logical(format!("/busbussend/{}/{}/mix_on", bus, send))
                    .tag("busbussends")
                    .value_index(2)
                    .data_type(DataType::Boolean),
            );
            specs.push(
                AddressSpec::new(format!("/bus/{}/send/{}/lvl", bus, send))
                    .logical(format!("/busbussend/{}/{}/mix_fader", bus, send))
                    .tag("busbussends")
                    .value_index(1)
                    .write_transform(WriteTransform::FaderToDb)
                    .secondary(SecondaryOutput::new("_db").value_index(0)),
            );
            specs.push(
                AddressSpec::new(format!("/bus/{}/send/{}/pre", bus, send))
                    .logical(format!("/busbussend/{}/{}/pre", bus, send))
                    .tag("busbussends")
                    .value_index(2)
                    .data_type(DataType::Boolean),
            );
        }
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_tables_parse() {
        assert!(xseries().unwrap().len() > 30);
        assert!(!x32().unwrap().is_empty());
        assert!(!xair().unwrap().is_empty());
        assert!(wing().unwrap().len() > 60);
    }

    #[test]
    fn test_status_row_comes_first() {
        assert_eq!(xseries().unwrap()[0].wire, "/xinfo");
        assert_eq!(wing().unwrap()[0].wire, "/?");
    }

    #[test]
    fn test_bus_to_bus_sends_skip_self() {
        let specs = wing_bus_to_bus_sends(4, 4);
        assert_eq!(specs.len(), 4 * 3 * 3);
        assert!(specs.iter().all(|s| s.wire != "/bus/2/send/2/on"));
        assert!(specs.iter().any(|s| s.wire == "/bus/2/send/3/lvl"));
    }
}
