//! Serial port detection.
//!
//! Candidates come from `arduino-cli board list` (JSON first, then the text
//! table) and, only when neither listing is available, from device nodes. A candidate that looks
//! like a pseudo-port is dropped in every tier, whatever else it matches.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Substrings marking wireless, incoming or debug pseudo-ports. Matched
/// case-insensitively.
pub const PSEUDO_MARKERS: &[&str] = &["bluetooth", "incoming", "rfcomm", "debug-console"];

/// Substrings of typical USB serial device names.
pub const USB_MARKERS: &[&str] = &[
    "usbmodem",
    "usbserial",
    "wchusbserial",
    "SLAB_USBtoUART",
    "ttyACM",
    "ttyUSB",
];

pub fn is_pseudo(port: &str) -> bool {
    let lower = port.to_ascii_lowercase();
    PSEUDO_MARKERS.iter().any(|marker| lower.contains(marker))
}

pub fn is_usb(port: &str) -> bool {
    USB_MARKERS.iter().any(|marker| port.contains(marker))
}

/// Source of device listings.
pub trait DeviceLister {
    /// `board list --format json` output.
    fn list_json(&self) -> Option<String>;
    /// `board list` table output.
    fn list_table(&self) -> Option<String>;
    /// Device node paths, for when the listings name nothing usable.
    fn device_nodes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Validate an explicit port override.
pub fn check_override(port: &str) -> Result<String> {
    let port = port.trim();
    if is_pseudo(port) {
        return Err(PipelineError::PseudoPort {
            port: port.to_string(),
        });
    }
    Ok(port.to_string())
}

/// Finds the port a board is attached to.
pub struct PortDetector<'a, L: DeviceLister + ?Sized> {
    lister: &'a L,
}

impl<'a, L: DeviceLister + ?Sized> PortDetector<'a, L> {
    pub fn new(lister: &'a L) -> Self {
        Self { lister }
    }

    /// Detect the port for `target_id` (an FQBN).
    pub fn detect(&self, target_id: &str) -> Result<String> {
        let base = target_id.rsplit(':').next().unwrap_or(target_id);
        let needles: Vec<&str> = [target_id, base]
            .into_iter()
            .filter(|n| !n.is_empty())
            .collect();

        let json = self.lister.list_json();
        if let Some(port) = json.as_deref().and_then(|text| from_json(text, &needles)) {
            info!(port = %port, source = "board list (json)", "port detected");
            return Ok(port);
        }

        let table = self.lister.list_table();
        if let Some(port) = table.as_deref().and_then(|text| from_table(text, &needles)) {
            info!(port = %port, source = "board list", "port detected");
            return Ok(port);
        }

        // Device nodes carry no board association, so they are only a guess
        // when `arduino-cli` produced no listing at all.
        if json.is_none() && table.is_none() {
            if let Some(port) = self
                .lister
                .device_nodes()
                .into_iter()
                .find(|node| is_usb(node) && !is_pseudo(node))
            {
                warn!(
                    port = %port,
                    source = "device nodes",
                    "board list unavailable; guessing the first USB serial node (set PORT to override)"
                );
                return Ok(port);
            }
        }

        Err(PipelineError::PortNotFound {
            target: target_id.to_string(),
            listing: table.or(json).unwrap_or_default(),
        })
    }
}

fn mentions(window: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| window.contains(needle))
}

/// Structured tier: each listed entry is the association window for every
/// address inside it. A USB match wins at once; otherwise the first match.
fn from_json(text: &str, needles: &[&str]) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let entries: &[Value] = match &value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(map) => map.get("detected_ports")?.as_array()?.as_slice(),
        _ => return None,
    };

    let mut fallback = None;
    for entry in entries {
        if !mentions(&entry.to_string(), needles) {
            continue;
        }
        let mut addresses = Vec::new();
        collect_addresses(entry, &mut addresses);
        for address in addresses {
            if is_pseudo(address) {
                debug!(address, "rejecting pseudo-port");
                continue;
            }
            if is_usb(address) {
                return Some(address.to_string());
            }
            fallback.get_or_insert_with(|| address.to_string());
        }
    }
    fallback
}

fn collect_addresses<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                match inner {
                    Value::String(address) if key == "address" => out.push(address),
                    _ => collect_addresses(inner, out),
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_addresses(item, out)),
        _ => {}
    }
}

/// Table tier: first column of the first line naming the board, else the
/// first token that looks like a USB serial device.
fn from_table(text: &str, needles: &[&str]) -> Option<String> {
    let hit = needles
        .iter()
        .find_map(|needle| text.lines().find(|line| line.contains(needle)));
    if let Some(port) = hit.and_then(|line| line.split_whitespace().next()) {
        if !is_pseudo(port) {
            return Some(port.to_string());
        }
        debug!(port, "rejecting pseudo-port");
    }
    text.split_whitespace()
        .find(|token| is_usb(token) && !is_pseudo(token))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Listing {
        json: Option<String>,
        table: Option<String>,
        nodes: Vec<String>,
    }

    impl DeviceLister for Listing {
        fn list_json(&self) -> Option<String> {
            self.json.clone()
        }
        fn list_table(&self) -> Option<String> {
            self.table.clone()
        }
        fn device_nodes(&self) -> Vec<String> {
            self.nodes.clone()
        }
    }

    const GIGA: &str = "arduino:mbed_giga:giga";

    #[test]
    fn json_usb_match_wins() {
        let listing = Listing {
            json: Some(
                r#"{ "detected_ports": [
                    { "port": { "address": "1-1", "protocol": "dfu" },
                      "matching_boards": [ { "fqbn": "arduino:mbed_giga:giga" } ] },
                    { "port": { "address": "/dev/cu.usbmodem1101", "protocol": "serial" },
                      "matching_boards": [ { "fqbn": "arduino:mbed_giga:giga" } ] }
                ] }"#
                    .into(),
            ),
            ..Listing::default()
        };
        assert_eq!(
            PortDetector::new(&listing).detect(GIGA).unwrap(),
            "/dev/cu.usbmodem1101"
        );
    }

    #[test]
    fn json_non_usb_match_is_kept_without_better() {
        let listing = Listing {
            json: Some(
                r#"[ { "port": { "address": "1-1" },
                       "matching_boards": [ { "fqbn": "arduino:renesas_uno:minima" } ] } ]"#
                    .into(),
            ),
            ..Listing::default()
        };
        assert_eq!(
            PortDetector::new(&listing)
                .detect("arduino:renesas_uno:minima")
                .unwrap(),
            "1-1"
        );
    }

    #[test]
    fn trailing_segment_is_enough() {
        let listing = Listing {
            json: Some(r#"[ { "port": { "address": "/dev/ttyACM0" }, "boards": [ { "name": "giga" } ] } ]"#.into()),
            ..Listing::default()
        };
        assert_eq!(PortDetector::new(&listing).detect(GIGA).unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn bluetooth_entry_is_never_returned() {
        let listing = Listing {
            json: Some(
                r#"[
                    { "port": { "address": "/dev/cu.Bluetooth-Incoming-Port" },
                      "matching_boards": [ { "fqbn": "arduino:mbed_giga:giga" } ] },
                    { "port": { "address": "/dev/cu.usbmodem2101" } }
                ]"#
                .into(),
            ),
            table: Some(
                "Port                            Protocol Type    Board Name FQBN\n\
                 /dev/cu.Bluetooth-Incoming-Port serial   Unknown Giga       arduino:mbed_giga:giga\n\
                 /dev/cu.usbmodem2101            serial   Unknown\n"
                    .into(),
            ),
            ..Listing::default()
        };
        assert_eq!(
            PortDetector::new(&listing).detect(GIGA).unwrap(),
            "/dev/cu.usbmodem2101"
        );
    }

    #[test]
    fn only_pseudo_ports_means_not_found() {
        let listing = Listing {
            json: Some(
                r#"[ { "port": { "address": "/dev/cu.Bluetooth-Incoming-Port" },
                       "matching_boards": [ { "fqbn": "arduino:mbed_giga:giga" } ] } ]"#
                    .into(),
            ),
            table: Some("/dev/cu.Bluetooth-Incoming-Port serial arduino:mbed_giga:giga\n".into()),
            nodes: vec!["/dev/rfcomm0".into(), "/dev/cu.debug-console".into()],
        };
        let err = PortDetector::new(&listing).detect(GIGA).unwrap_err();
        match err {
            PipelineError::PortNotFound { target, listing } => {
                assert_eq!(target, GIGA);
                assert!(listing.contains("Bluetooth"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn table_first_column_of_matching_line() {
        let listing = Listing {
            json: Some("not json".into()),
            table: Some(
                "Port Protocol Type Board Name FQBN Core\n\
                 1-1  dfu      USB  UNO R4     arduino:renesas_uno:minima arduino:renesas_uno\n"
                    .into(),
            ),
            ..Listing::default()
        };
        assert_eq!(
            PortDetector::new(&listing)
                .detect("arduino:renesas_uno:minima")
                .unwrap(),
            "1-1"
        );
    }

    #[test]
    fn device_nodes_are_the_last_resort() {
        let listing = Listing {
            nodes: vec!["/dev/tty0".into(), "/dev/ttyUSB0".into()],
            ..Listing::default()
        };
        assert_eq!(PortDetector::new(&listing).detect(GIGA).unwrap(), "/dev/ttyUSB0");
    }

    #[test]
    fn device_nodes_are_ignored_when_a_listing_exists() {
        let listing = Listing {
            table: Some("Port Protocol Type Board Name FQBN Core\n/dev/ttyS0 serial Unknown\n".into()),
            nodes: vec!["/dev/ttyUSB0".into()],
            ..Listing::default()
        };
        assert!(matches!(
            PortDetector::new(&listing).detect(GIGA),
            Err(PipelineError::PortNotFound { .. })
        ));
    }

    #[test]
    fn override_is_checked_for_pseudo_markers() {
        assert_eq!(check_override(" /dev/ttyACM1 ").unwrap(), "/dev/ttyACM1");
        assert!(matches!(
            check_override("/dev/tty.BLUETOOTH-modem"),
            Err(PipelineError::PseudoPort { .. })
        ));
    }
}
