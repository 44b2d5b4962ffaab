use crate::error::{OutputError, SelfTestOutcome, SimError};
use crate::hal::{PinId, PinIo};
use crate::power::PowerFlag;

/// Identity plus power gating, embedded in every simulated peripheral.
#[derive(Debug, Clone)]
pub struct SimObject {
    identifier: String,
    power: PowerFlag,
}

impl SimObject {
    pub fn new(identifier: impl Into<String>, power: PowerFlag) -> Result<Self, SimError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(SimError::invalid("identifier must not be empty"));
        }
        Ok(Self { identifier, power })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn has_power(&self) -> bool {
        self.power.is_on()
    }

    pub fn power_source(&self) -> &PowerFlag {
        &self.power
    }

    pub fn set_power_source(&mut self, power: PowerFlag) {
        self.power = power;
    }

    /// `Err(PoweredOff)` unless the rail is up.
    pub fn require_power(&self) -> Result<(), OutputError> {
        if self.has_power() {
            Ok(())
        } else {
            Err(OutputError::PoweredOff)
        }
    }
}

pub trait PowerAware {
    fn has_power(&self) -> bool;
    fn set_power_source(&mut self, power: PowerFlag);
}

pub trait PinBound {
    fn pin(&self) -> PinId;
    fn identifier(&self) -> &str;
}

/// Common surface for driving any simulated peripheral in tests.
pub trait Peripheral: PowerAware + PinBound {
    fn kind(&self) -> &'static str;
    fn self_test(&mut self, pins: &mut dyn PinIo) -> Result<SelfTestOutcome, OutputError>;
}

/// Checks a pin against the pin collaborator at construction time.
pub(crate) fn claim_pin(pins: &dyn PinIo, pin: PinId) -> Result<PinId, SimError> {
    if pins.pin_is_valid(pin) {
        Ok(pin)
    } else {
        Err(SimError::invalid(format!("pin {pin} is not valid on this target")))
    }
}

impl PowerAware for SimObject {
    fn has_power(&self) -> bool {
        SimObject::has_power(self)
    }

    fn set_power_source(&mut self, power: PowerFlag) {
        SimObject::set_power_source(self, power)
    }
}
