use crate::error::{OutputError, SelfTestOutcome, SimError, SkipReason};
use crate::hal::{PinFault, PinId, PinIo};
use crate::limits::{LedLimits, Level, Setpoint};
use crate::object::{claim_pin, Peripheral, PinBound, PowerAware, SimObject};
use crate::power::PowerFlag;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOW_LIMIT: i32 = 1;
pub const DEFAULT_HIGH_LIMIT: i32 = 32000;

fn enabled() -> bool {
    true
}

fn default_low<T: Level>() -> T {
    T::from_limit(DEFAULT_LOW_LIMIT)
}

fn default_high<T: Level>() -> T {
    T::from_limit(DEFAULT_HIGH_LIMIT)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Level + Deserialize<'de>"))]
pub struct LedConfig<T> {
    pub pin: PinId,
    pub identifier: String,
    #[serde(default = "default_low::<T>")]
    pub low_limit: T,
    #[serde(default = "default_high::<T>")]
    pub high_limit: T,
    #[serde(default)]
    pub invert_limits: bool,
    #[serde(default = "enabled")]
    pub enable_test: bool,
}

impl LedConfig<i32> {
    /// Integer LED accepting `1..=32000`.
    pub fn integer(pin: PinId, identifier: impl Into<String>) -> Self {
        Self {
            pin,
            identifier: identifier.into(),
            low_limit: DEFAULT_LOW_LIMIT,
            high_limit: DEFAULT_HIGH_LIMIT,
            invert_limits: false,
            enable_test: true,
        }
    }
}

impl LedConfig<f64> {
    pub fn real(pin: PinId, identifier: impl Into<String>, low_limit: f64, high_limit: f64) -> Self {
        Self {
            pin,
            identifier: identifier.into(),
            low_limit,
            high_limit,
            invert_limits: false,
            enable_test: true,
        }
    }
}

impl<T> LedConfig<T> {
    pub fn limits(mut self, low_limit: T, high_limit: T) -> Self {
        self.low_limit = low_limit;
        self.high_limit = high_limit;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert_limits = true;
        self
    }

    pub fn without_test(mut self) -> Self {
        self.enable_test = false;
        self
    }
}

/// Bounded-range output peripheral.
#[derive(Debug, Clone)]
pub struct SimLed<T: Level> {
    object: SimObject,
    pin: PinId,
    limits: LedLimits<T>,
    enable_test: bool,
    last_good: Option<T>,
}

pub type IntLed = SimLed<i32>;
pub type RealLed = SimLed<f64>;

impl<T: Level> SimLed<T> {
    pub fn new(config: LedConfig<T>, power: PowerFlag, pins: &dyn PinIo) -> Result<Self, SimError> {
        let object = SimObject::new(config.identifier, power)?;
        let pin = claim_pin(pins, config.pin)?;
        let limits = LedLimits::new(config.low_limit, config.high_limit, config.invert_limits)?;
        Ok(Self {
            object,
            pin,
            limits,
            enable_test: config.enable_test,
            last_good: None,
        })
    }

    /// Validates `value` and forwards it to the pin.
    pub fn write(&mut self, pins: &mut dyn PinIo, value: T) -> Result<(), OutputError> {
        self.object.require_power()?;
        let setpoint = Setpoint::new(value).validate(&self.limits)?;

        pins.write_pin(self.pin, setpoint.value().to_output())
            .map_err(|fault| self.fault(fault))?;
        self.last_good = Some(setpoint.value());
        debug!("{} pin {} <- {}", self.object.identifier(), self.pin, value);
        Ok(())
    }

    pub fn accepts(&self, value: T) -> bool {
        self.limits.contains(value)
    }

    pub fn last_value(&self) -> Option<T> {
        self.last_good
    }

    pub fn limits(&self) -> &LedLimits<T> {
        &self.limits
    }

    pub fn test_enabled(&self) -> bool {
        self.enable_test
    }

    pub fn set_test_enabled(&mut self, enable: bool) {
        self.enable_test = enable;
    }

    /// Sweeps the accepted range, then puts the pin back at its last good
    /// level (or off).
    pub fn self_test(&mut self, pins: &mut dyn PinIo) -> Result<SelfTestOutcome, OutputError> {
        if !self.enable_test {
            return Ok(SelfTestOutcome::Skipped(SkipReason::Disabled));
        }
        if !self.object.has_power() {
            return Ok(SelfTestOutcome::Skipped(SkipReason::PoweredOff));
        }

        let mut steps = 0;
        let mut sweep = Ok(());
        for level in self.limits.sweep() {
            if let Err(fault) = pins.write_pin(self.pin, level.to_output()) {
                sweep = Err(self.fault(fault));
                break;
            }
            steps += 1;
        }

        let rest = self.last_good.unwrap_or_else(T::off);
        let restored = pins
            .write_pin(self.pin, rest.to_output())
            .map_err(|fault| self.fault(fault));

        sweep?;
        restored?;
        Ok(SelfTestOutcome::Passed { steps })
    }

    fn fault(&self, fault: PinFault) -> OutputError {
        warn!(
            "{} pin {} write failed: {}",
            self.object.identifier(),
            self.pin,
            fault
        );
        OutputError::PinFault {
            pin: self.pin,
            fault,
        }
    }
}

impl SimLed<i32> {
    pub fn integer(
        pin: PinId,
        identifier: impl Into<String>,
        low_limit: i32,
        high_limit: i32,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        let config = LedConfig::integer(pin, identifier).limits(low_limit, high_limit);
        Self::new(config, power, pins)
    }
}

impl SimLed<f64> {
    pub fn real(
        pin: PinId,
        identifier: impl Into<String>,
        low_limit: f64,
        high_limit: f64,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        Self::new(LedConfig::real(pin, identifier, low_limit, high_limit), power, pins)
    }
}

impl<T: Level> PowerAware for SimLed<T> {
    fn has_power(&self) -> bool {
        self.object.has_power()
    }

    fn set_power_source(&mut self, power: PowerFlag) {
        self.object.set_power_source(power);
    }
}

impl<T: Level> PinBound for SimLed<T> {
    fn pin(&self) -> PinId {
        self.pin
    }

    fn identifier(&self) -> &str {
        self.object.identifier()
    }
}

impl<T: Level> Peripheral for SimLed<T> {
    fn kind(&self) -> &'static str {
        "led"
    }

    fn self_test(&mut self, pins: &mut dyn PinIo) -> Result<SelfTestOutcome, OutputError> {
        SimLed::self_test(self, pins)
    }
}
