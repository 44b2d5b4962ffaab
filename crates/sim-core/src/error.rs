use crate::hal::{PinFault, PinId};
use thiserror::Error;

/// Construction-time failures. The object is never created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Operational failures. The peripheral keeps its last good state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    #[error("no simulated power")]
    PoweredOff,
    #[error("value {value} rejected by range [{low}, {high}] (inverted: {inverted})")]
    OutOfRange {
        value: f64,
        low: f64,
        high: f64,
        inverted: bool,
    },
    #[error("pin {pin} fault: {fault}")]
    PinFault { pin: PinId, fault: PinFault },
}

impl OutputError {
    /// Short machine-readable name, used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PoweredOff => "powered_off",
            Self::OutOfRange { .. } => "out_of_range",
            Self::PinFault { .. } => "pin_fault",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    PoweredOff,
}

/// Result of a self-test that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestOutcome {
    Passed { steps: usize },
    Skipped(SkipReason),
}

impl SelfTestOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}
