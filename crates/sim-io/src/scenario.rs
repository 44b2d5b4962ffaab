//! TOML scenario files.
//!
//! A scenario describes the simulated bench (pin bank and power rail), the
//! peripherals bound to it, and the steps to replay:
//!
//! ```toml
//! name = "overhead panel"
//!
//! [board]
//! pin_count = 32
//! reserved_pins = [0]
//!
//! [power]
//! initial = true
//! always_on = ["clock"]
//!
//! [angle_maps]
//! trim = [[-10.0, 180.0], [10.0, 0.0]]
//!
//! [[int_leds]]
//! pin = 3
//! identifier = "gear"
//!
//! [[servos]]
//! pin = 9
//! identifier = "trim"
//!
//! [[steps]]
//! op = "servo"
//! device = "trim"
//! angle = 0.0
//! ```

use crate::protocol::Step;
use serde::{Deserialize, Serialize};
use sim_core::{LedConfig, PinId, SimError, DEFAULT_HISTORY_LIMIT, NO_REST_ANGLE};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PIN_COUNT: u16 = 64;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(String),

    #[error("scenario validation failed: {0}")]
    Validation(String),

    #[error("failed to build device: {0}")]
    Build(#[from] SimError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_pin_count")]
    pub pin_count: u16,
    #[serde(default)]
    pub reserved_pins: Vec<PinId>,
    /// Pin writes kept for inspection; 0 disables recording.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            pin_count: DEFAULT_PIN_COUNT,
            reserved_pins: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn default_pin_count() -> u16 {
    DEFAULT_PIN_COUNT
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerConfig {
    #[serde(default = "powered")]
    pub initial: bool,
    /// Devices that ignore the rail.
    #[serde(default)]
    pub always_on: Vec<String>,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            initial: true,
            always_on: Vec::new(),
        }
    }
}

fn powered() -> bool {
    true
}

/// Servo entry. Without an inline `table` the servo is bound by identifier
/// and its table is resolved from `[angle_maps]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoSpec {
    pub pin: PinId,
    pub identifier: String,
    #[serde(default)]
    pub table: Option<Vec<[f64; 2]>>,
    #[serde(default = "no_rest_angle")]
    pub rest_angle: i32,
    #[serde(default = "powered")]
    pub enable_test: bool,
}

fn no_rest_angle() -> i32 {
    NO_REST_ANGLE
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub power: PowerConfig,
    /// Named `[angle, output]` tables for servos bound by identifier.
    #[serde(default)]
    pub angle_maps: BTreeMap<String, Vec<[f64; 2]>>,
    #[serde(default)]
    pub int_leds: Vec<LedConfig<i32>>,
    #[serde(default)]
    pub real_leds: Vec<LedConfig<f64>>,
    #[serde(default)]
    pub servos: Vec<ServoSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Loads and validates scenario files.
pub trait ScenarioLoader: Sized {
    fn from_toml_str(text: &str) -> Result<Self, ScenarioError>;

    fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl ScenarioLoader for Scenario {
    fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            toml::from_str(text).map_err(|e| ScenarioError::Parse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Identifiers of every configured device, in declaration order.
    pub fn device_identifiers(&self) -> impl Iterator<Item = &str> {
        self.int_leds
            .iter()
            .map(|l| l.identifier.as_str())
            .chain(self.real_leds.iter().map(|l| l.identifier.as_str()))
            .chain(self.servos.iter().map(|s| s.identifier.as_str()))
    }

    fn device_pins(&self) -> impl Iterator<Item = (&str, PinId)> {
        self.int_leds
            .iter()
            .map(|l| (l.identifier.as_str(), l.pin))
            .chain(self.real_leds.iter().map(|l| (l.identifier.as_str(), l.pin)))
            .chain(self.servos.iter().map(|s| (s.identifier.as_str(), s.pin)))
    }

    /// Structural checks that need the whole file. Per-device argument checks
    /// happen when the rig builds the devices.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.board.pin_count == 0 {
            return Err(ScenarioError::Validation(
                "board.pin_count must be non-zero".to_string(),
            ));
        }

        let mut identifiers = BTreeSet::new();
        for id in self.device_identifiers() {
            if !identifiers.insert(id) {
                return Err(ScenarioError::Validation(format!(
                    "duplicate device identifier '{id}'"
                )));
            }
        }

        let mut pins: BTreeMap<PinId, &str> = BTreeMap::new();
        for (id, pin) in self.device_pins() {
            if let Some(owner) = pins.insert(pin, id) {
                return Err(ScenarioError::Validation(format!(
                    "pin {pin} is bound to both '{owner}' and '{id}'"
                )));
            }
        }

        for id in &self.power.always_on {
            if !identifiers.contains(id.as_str()) {
                return Err(ScenarioError::Validation(format!(
                    "power.always_on names unknown device '{id}'"
                )));
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            if let Some(device) = step.device() {
                if !identifiers.contains(device) {
                    return Err(ScenarioError::Validation(format!(
                        "step {i} ({}) targets unknown device '{device}'",
                        step.op()
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LedValue;
    use std::io::Write;

    const PANEL: &str = r#"
name = "panel"

[power]
always_on = ["clock"]

[angle_maps]
trim = [[-10.0, 180.0], [10.0, 0.0]]

[[int_leds]]
pin = 3
identifier = "gear"

[[real_leds]]
pin = 4
identifier = "clock"
low_limit = 0.5
high_limit = 2.5
invert_limits = true

[[servos]]
pin = 9
identifier = "trim"
rest_angle = 0

[[servos]]
pin = 10
identifier = "flaps"
table = [[0.0, 1000.0], [180.0, 3000.0]]

[[steps]]
op = "led"
device = "gear"
value = 2

[[steps]]
op = "power"
on = false

[[steps]]
op = "self_test_all"
"#;

    #[test]
    fn parses_full_scenario() {
        let scenario = Scenario::from_toml_str(PANEL).unwrap();
        assert_eq!(scenario.name, "panel");
        assert_eq!(scenario.board, BoardConfig::default());
        assert!(scenario.power.initial);

        assert_eq!(scenario.int_leds[0], LedConfig::integer(3, "gear"));
        assert!(scenario.real_leds[0].invert_limits);
        assert_eq!(scenario.servos[0].rest_angle, 0);
        assert!(scenario.servos[0].table.is_none());
        assert_eq!(scenario.servos[1].rest_angle, NO_REST_ANGLE);
        assert_eq!(scenario.angle_maps["trim"].len(), 2);

        assert_eq!(
            scenario.steps,
            vec![
                Step::Led {
                    device: "gear".to_string(),
                    value: LedValue::Integer(2)
                },
                Step::Power { on: false },
                Step::SelfTestAll,
            ]
        );
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let text = r#"
[[int_leds]]
pin = 3
identifier = "gear"

[[servos]]
pin = 4
identifier = "gear"
table = [[0.0, 0.0]]
"#;
        let err = Scenario::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(msg) if msg.contains("gear")));
    }

    #[test]
    fn shared_pins_are_rejected() {
        let text = r#"
[[int_leds]]
pin = 3
identifier = "gear"

[[int_leds]]
pin = 3
identifier = "brake"
"#;
        assert!(matches!(
            Scenario::from_toml_str(text),
            Err(ScenarioError::Validation(_))
        ));
    }

    #[test]
    fn steps_must_target_known_devices() {
        let text = r#"
[[steps]]
op = "settle"
device = "ghost"
"#;
        let err = Scenario::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            Scenario::from_toml_str("[[int_leds]\npin = "),
            Err(ScenarioError::Parse(_))
        ));
        assert!(matches!(
            Scenario::from_toml_str("[[steps]]\nop = \"dance\"\n"),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            Scenario::load(&path),
            Err(ScenarioError::FileNotFound(p)) if p == path
        ));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PANEL.as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.steps.len(), 3);
    }
}
