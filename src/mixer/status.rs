use serde::Serialize;

use crate::value::MixerValue;

/// What the console reports about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MixerStatus {
    pub ip_address: String,
    pub name: String,
    pub model: String,
    pub firmware: String,
}

impl MixerStatus {
    /// Parse an info reply.
    ///
    /// X-series `/xinfo` answers with four strings `[ip, name, model, firmware]`.
    /// WING answers `/?` and `/*` with one comma-separated string
    /// `"WING,ip,name,model,serial,firmware"`; any other leading field is rejected.
    pub fn parse(args: &[MixerValue]) -> Option<Self> {
        match args {
            [MixerValue::Text(line)] => {
                let fields: Vec<&str> = line.split(',').collect();
                if fields.len() < 6 || fields[0] != "WING" {
                    return None;
                }
                Some(Self {
                    ip_address: fields[1].to_string(),
                    name: fields[2].to_string(),
                    model: fields[3].to_string(),
                    firmware: fields[5].to_string(),
                })
            },
            [ip, name, model, firmware, ..] => Some(Self {
                ip_address: ip.to_string(),
                name: name.to_string(),
                model: model.to_string(),
                firmware: firmware.to_string(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<MixerValue> {
        items.iter().map(|s| MixerValue::Text(s.to_string())).collect()
    }

    #[test]
    fn test_xinfo_reply() {
        let status =
            MixerStatus::parse(&texts(&["192.168.1.20", "FOH", "X32", "4.06"])).unwrap();
        assert_eq!(status.ip_address, "192.168.1.20");
        assert_eq!(status.name, "FOH");
        assert_eq!(status.model, "X32");
        assert_eq!(status.firmware, "4.06");
    }

    #[test]
    fn test_wing_reply() {
        let status = MixerStatus::parse(&texts(&[
            "WING,192.168.1.62,PGM,ngc-full,NO_SERIAL,3.0.5",
        ]))
        .unwrap();
        assert_eq!(status.ip_address, "192.168.1.62");
        assert_eq!(status.name, "PGM");
        assert_eq!(status.model, "ngc-full");
        assert_eq!(status.firmware, "3.0.5");
    }

    #[test]
    fn test_short_replies_are_ignored() {
        assert_eq!(MixerStatus::parse(&texts(&["WING,1.2.3.4"])), None);
        assert_eq!(MixerStatus::parse(&texts(&["a", "b"])), None);
        assert_eq!(MixerStatus::parse(&[]), None);
    }

    #[test]
    fn test_single_string_needs_wing_prefix() {
        let reply = texts(&["ERROR,192.168.1.62,PGM,ngc-full,NO_SERIAL,3.0.5"]);
        assert_eq!(MixerStatus::parse(&reply), None);
        assert_eq!(MixerStatus::parse(&texts(&["a,b,c,d,e,f"])), None);
    }
}
