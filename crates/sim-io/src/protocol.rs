use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const fn v1() -> Self {
        Self { major: 1, minor: 0 }
    }

    pub fn is_supported(&self) -> bool {
        self.major == 1
    }
}

/// Value written to an LED. Integer LEDs only take whole numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedValue {
    Integer(i64),
    Real(f64),
}

impl LedValue {
    /// Whole-number view, `None` for fractional or out-of-range values.
    pub fn as_i32(self) -> Option<i32> {
        match self {
            Self::Integer(v) => i32::try_from(v).ok(),
            Self::Real(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => {
                Some(v as i32)
            }
            Self::Real(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Real(v) => v,
        }
    }
}

/// One operation against the rig. Scenario files and the stdin stream share
/// this shape: `{"op":"servo","device":"flaps","angle":45.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Power { on: bool },
    Led { device: String, value: LedValue },
    Servo { device: String, angle: f64 },
    Settle { device: String },
    SelfTest { device: String },
    SelfTestAll,
}

impl Step {
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    pub fn op(&self) -> &'static str {
        match self {
            Self::Power { .. } => "power",
            Self::Led { .. } => "led",
            Self::Servo { .. } => "servo",
            Self::Settle { .. } => "settle",
            Self::SelfTest { .. } => "self_test",
            Self::SelfTestAll => "self_test_all",
        }
    }

    pub fn device(&self) -> Option<&str> {
        match self {
            Self::Led { device, .. }
            | Self::Servo { device, .. }
            | Self::Settle { device }
            | Self::SelfTest { device } => Some(device),
            Self::Power { .. } | Self::SelfTestAll => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Passed,
    Skipped,
    PoweredOff,
    OutOfRange,
    PinFault,
    UnknownDevice,
    InvalidStep,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Passed => "passed",
            Self::Skipped => "skipped",
            Self::PoweredOff => "powered_off",
            Self::OutOfRange => "out_of_range",
            Self::PinFault => "pin_fault",
            Self::UnknownDevice => "unknown_device",
            Self::InvalidStep => "invalid_step",
        }
    }

    /// Skipped self-tests count as accepted; the device was simply not exercised.
    /// `PoweredOff` mirrors an operation error and counts as rejected.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Ok | Self::Passed | Self::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub protocol_version: ProtocolVersion,
    pub sequence: u64,
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servo_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub powered: bool,
}

impl OutcomeRecord {
    pub fn new(sequence: u64, op: &str, device: Option<&str>, status: Status, powered: bool) -> Self {
        Self {
            msg_type: "outcome".to_string(),
            protocol_version: ProtocolVersion::v1(),
            sequence,
            op: op.to_string(),
            device: device.map(str::to_string),
            status,
            output: None,
            servo_value: None,
            steps: None,
            detail: None,
            powered,
        }
    }

    pub fn with_output(mut self, output: f64) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_servo_value(mut self, value: Option<i64>) -> Self {
        self.servo_value = value;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Totals emitted after the last step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub scenario: String,
    pub outcomes: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub pin_writes: u64,
    pub pin_faults: u64,
    pub powered: bool,
}
