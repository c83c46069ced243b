//! Model registry
//!
//! Per-console constants (port, pacing, protocol addresses, cardinalities)
//! and the ordered address table each model compiles from.

pub mod tables;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{MixerError, Result};
use crate::mapping::{AddressSpec, Cardinalities};

/// Supported consoles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MixerModel {
    X32,
    XR18,
    XR16,
    XR12,
    Wing,
    WingRack,
    WingCompact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    X32,
    XAir,
    Wing,
}

impl MixerModel {
    pub const ALL: [MixerModel; 7] = [
        MixerModel::X32,
        MixerModel::XR18,
        MixerModel::XR16,
        MixerModel::XR12,
        MixerModel::Wing,
        MixerModel::WingRack,
        MixerModel::WingCompact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MixerModel::X32 => "X32",
            MixerModel::XR18 => "XR18",
            MixerModel::XR16 => "XR16",
            MixerModel::XR12 => "XR12",
            MixerModel::Wing => "WING",
            MixerModel::WingRack => "WINGRACK",
            MixerModel::WingCompact => "WINGCOMPACT",
        }
    }

    fn family(&self) -> Family {
        match self {
            MixerModel::X32 => Family::X32,
            MixerModel::XR18 | MixerModel::XR16 | MixerModel::XR12 => Family::XAir,
            MixerModel::Wing | MixerModel::WingRack | MixerModel::WingCompact => Family::Wing,
        }
    }

    pub fn is_wing(&self) -> bool {
        self.family() == Family::Wing
    }

    /// Static profile for this model
    pub fn profile(&self) -> ModelProfile {
        ModelProfile::for_model(*self)
    }
}

impl fmt::Display for MixerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MixerModel {
    type Err = MixerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        MixerModel::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = MixerModel::ALL.iter().map(|m| m.as_str()).collect();
                MixerError::Configuration(format!(
                    "unsupported mixer model '{}' (expected one of {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Instance counts of each strip type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelCounts {
    pub channel: u32,
    pub bus: u32,
    pub bus_send: u32,
    pub dca: u32,
    pub fx: u32,
    pub auxin: u32,
    pub auxrtn: u32,
    pub matrix: u32,
    pub head_amp: u32,
    pub aes50_in: u32,
    pub mains: u32,
    pub mute_groups: u32,
    pub scenes: u32,
}

impl ModelCounts {
    /// Placeholder name -> count, as used by the address tables
    pub fn cardinalities(&self) -> Cardinalities {
        Cardinalities::new()
            .with("num_channel", self.channel)
            .with("num_bus", self.bus)
            .with("num_bus_send", self.bus_send)
            .with("num_dca", self.dca)
            .with("num_fx", self.fx)
            .with("num_auxin", self.auxin)
            .with("num_auxrtn", self.auxrtn)
            .with("num_matrix", self.matrix)
            .with("num_head_amp", self.head_amp)
            .with("num_aes50_in", self.aes50_in)
            .with("num_mains", self.mains)
            .with("num_mute_groups", self.mute_groups)
            .with("num_scenes", self.scenes)
    }
}

/// Per-model constants consumed by the engine and the subscription loop
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub model: MixerModel,
    pub port: u16,
    /// Pause after every send
    pub delay: Duration,
    pub counts: ModelCounts,
    pub has_mono: bool,
    pub info_address: &'static str,
    pub subscribe_address: &'static str,
    pub renew_address: &'static str,
    pub unsubscribe_address: &'static str,
    pub scene_load_address: &'static str,
    /// Second command for consoles that separate "select" from "go"
    pub scene_execute: Option<(&'static str, &'static str)>,
    pub renew_interval: Duration,
    pub liveness_window: Duration,
    pub connect_timeout: Duration,
    pub scene_settle: Duration,
}

const XSERIES_PORT: u16 = 10023;
const XAIR_PORT: u16 = 10024;
const WING_PORT: u16 = 2223;

impl ModelProfile {
    pub fn for_model(model: MixerModel) -> Self {
        let counts = match model {
            MixerModel::X32 => ModelCounts {
                channel: 32,
                bus: 16,
                dca: 8,
                fx: 8,
                auxin: 8,
                auxrtn: 8,
                matrix: 6,
                head_amp: 128,
                mains: 1,
                mute_groups: 6,
                scenes: 100,
                ..Default::default()
            },
            MixerModel::XR18 => ModelCounts {
                channel: 16,
                bus: 6,
                dca: 4,
                fx: 4,
                auxrtn: 2,
                head_amp: 16,
                mains: 1,
                mute_groups: 4,
                scenes: 100,
                ..Default::default()
            },
            MixerModel::XR16 => ModelCounts {
                channel: 16,
                bus: 4,
                dca: 4,
                fx: 4,
                head_amp: 8,
                mains: 1,
                mute_groups: 4,
                scenes: 100,
                ..Default::default()
            },
            MixerModel::XR12 => ModelCounts {
                channel: 12,
                bus: 2,
                dca: 4,
                fx: 4,
                head_amp: 4,
                mains: 1,
                mute_groups: 4,
                scenes: 100,
                ..Default::default()
            },
            MixerModel::Wing | MixerModel::WingRack | MixerModel::WingCompact => ModelCounts {
                channel: 40,
                bus: 16,
                bus_send: 16,
                dca: 16,
                auxin: 8,
                matrix: 8,
                head_amp: if model == MixerModel::Wing { 8 } else { 24 },
                aes50_in: 48,
                mains: 4,
                mute_groups: 8,
                scenes: 100,
                ..Default::default()
            },
        };

        let (port, info, subscribe, renew, scene_load, scene_execute) = match model.family() {
            Family::X32 => (
                XSERIES_PORT,
                "/xinfo",
                "/xremote",
                "/xremote",
                "/-action/goscene",
                None,
            ),
            Family::XAir => (XAIR_PORT, "/xinfo", "/xremote", "/xremote", "/-snap/load", None),
            Family::Wing => (
                WING_PORT,
                "/?",
                "/*s",
                "/*s",
                "/$ctl/lib/$actionidx",
                Some(("/$ctl/lib/$action", "GO")),
            ),
        };

        Self {
            model,
            port,
            delay: Duration::from_millis(2),
            counts,
            has_mono: model == MixerModel::X32,
            info_address: info,
            subscribe_address: subscribe,
            renew_address: renew,
            unsubscribe_address: "/unsubscribe",
            scene_load_address: scene_load,
            scene_execute,
            renew_interval: Duration::from_secs(9),
            liveness_window: Duration::from_secs(15),
            connect_timeout: Duration::from_millis(500),
            scene_settle: Duration::from_secs(1),
        }
    }

    pub fn cardinalities(&self) -> Cardinalities {
        self.counts.cardinalities()
    }

    /// Ordered address table. Later rows win collisions, so model-specific
    /// rows come after the shared ones.
    pub fn address_specs(&self) -> Result<Vec<AddressSpec>> {
        let mut specs = Vec::new();
        match self.model.family() {
            Family::X32 => {
                specs.extend_from_slice(tables::xseries()?);
                specs.extend_from_slice(tables::x32()?);
            },
            Family::XAir => {
                specs.extend_from_slice(tables::xseries()?);
                specs.extend_from_slice(tables::xair()?);
            },
            Family::Wing => {
                specs.extend_from_slice(tables::wing()?);
                specs.extend(tables::wing_bus_to_bus_sends(
                    self.counts.bus,
                    self.counts.bus_send,
                ));
            },
        }
        Ok(specs)
    }

    /// Addresses whose replies describe the console itself
    pub fn status_addresses(&self) -> &'static [&'static str] {
        if self.model.is_wing() {
            &["/?", "/*"]
        } else {
            &["/xinfo"]
        }
    }

    /// Static cardinality summary
    pub fn info(&self) -> MixerInfo {
        let c = &self.counts;
        let section = |number, base_address| InfoSection {
            number,
            base_address,
        };
        MixerInfo {
            channel: section(c.channel, "ch"),
            bus: section(c.bus, "bus"),
            matrix: section(c.matrix, "mtx"),
            dca: section(c.dca, "dca"),
            fx: section(c.fx, "fx"),
            auxin: section(c.auxin, "auxin"),
            auxrtn: section(c.auxrtn, "auxrtn"),
            scenes: section(c.scenes, "scene"),
            channel_sends: section(0, "chsend"),
            bus_sends: section(0, "bussend"),
            bus_mainsends: section(0, "busmainsend"),
            head_amps: section(c.head_amp, "headamp"),
            mains: section(c.mains, "main"),
            mute_groups: section(c.mute_groups, "mutegroups"),
            has_mono: self.has_mono,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InfoSection {
    pub number: u32,
    pub base_address: &'static str,
}

/// Result of `info()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixerInfo {
    pub channel: InfoSection,
    pub bus: InfoSection,
    pub matrix: InfoSection,
    pub dca: InfoSection,
    pub fx: InfoSection,
    pub auxin: InfoSection,
    pub auxrtn: InfoSection,
    pub scenes: InfoSection,
    pub channel_sends: InfoSection,
    pub bus_sends: InfoSection,
    pub bus_mainsends: InfoSection,
    pub head_amps: InfoSection,
    pub mains: InfoSection,
    pub mute_groups: InfoSection,
    pub has_mono: bool,
}
