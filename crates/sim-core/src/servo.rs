use crate::error::{OutputError, SelfTestOutcome, SimError, SkipReason};
use crate::hal::{PinFault, PinId, PinIo};
use crate::object::{claim_pin, Peripheral, PinBound, PowerAware, SimObject};
use crate::power::PowerFlag;
use crate::registry::AngleMapSource;
use crate::scale_map::ScaleMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// `rest_angle` value meaning "hold position when power is lost".
pub const NO_REST_ANGLE: i32 = -1;

fn no_rest_angle() -> i32 {
    NO_REST_ANGLE
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    pub pin: PinId,
    pub identifier: String,
    #[serde(default = "no_rest_angle")]
    pub rest_angle: i32,
    #[serde(default = "enabled")]
    pub enable_test: bool,
}

impl ServoConfig {
    pub fn new(pin: PinId, identifier: impl Into<String>) -> Self {
        Self {
            pin,
            identifier: identifier.into(),
            rest_angle: NO_REST_ANGLE,
            enable_test: true,
        }
    }

    pub fn rest_angle(mut self, rest_angle: i32) -> Self {
        self.rest_angle = rest_angle;
        self
    }

    pub fn without_test(mut self) -> Self {
        self.enable_test = false;
        self
    }
}

fn parse_rest_angle(rest_angle: i32) -> Result<Option<i32>, SimError> {
    match rest_angle {
        NO_REST_ANGLE => Ok(None),
        angle if angle >= 0 => Ok(Some(angle)),
        angle => Err(SimError::invalid(format!(
            "rest angle {angle} must be {NO_REST_ANGLE} or non-negative"
        ))),
    }
}

/// Angle-addressed actuator driven through a scale table.
#[derive(Debug, Clone)]
pub struct SimServo {
    object: SimObject,
    pin: PinId,
    map: ScaleMap,
    rest_angle: Option<i32>,
    enable_test: bool,
    last_angle: Option<f64>,
    last_output: Option<f64>,
    settle_pending: bool,
}

/// First phase of identifier-only construction: pin and identity are bound,
/// the scale table is not yet resolved.
#[derive(Debug, Clone)]
pub struct UnresolvedServo {
    object: SimObject,
    pin: PinId,
    rest_angle: Option<i32>,
}

impl UnresolvedServo {
    pub fn identifier(&self) -> &str {
        self.object.identifier()
    }

    pub fn with_rest_angle(mut self, rest_angle: i32) -> Result<Self, SimError> {
        self.rest_angle = parse_rest_angle(rest_angle)?;
        Ok(self)
    }

    pub fn resolve(self, source: &dyn AngleMapSource) -> Result<SimServo, SimError> {
        let map = source.resolve_angle_map(self.object.identifier())?;
        Ok(SimServo::assemble(self.object, self.pin, map, self.rest_angle, true))
    }
}

impl SimServo {
    pub fn new(
        config: ServoConfig,
        map: ScaleMap,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        let object = SimObject::new(config.identifier, power)?;
        let pin = claim_pin(pins, config.pin)?;
        let rest_angle = parse_rest_angle(config.rest_angle)?;
        Ok(Self::assemble(object, pin, map, rest_angle, config.enable_test))
    }

    /// Builds the scale map from the first `map_size` rows of `table`.
    pub fn with_table(
        config: ServoConfig,
        table: &[[f64; 2]],
        map_size: usize,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        let map = ScaleMap::from_table(table, map_size)?;
        Self::new(config, map, power, pins)
    }

    /// Binds a pin to a named angle/direction configuration. Call
    /// [`UnresolvedServo::resolve`] to look the table up.
    pub fn bind(
        pin: PinId,
        angle_direction_identifier: impl Into<String>,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<UnresolvedServo, SimError> {
        let object = SimObject::new(angle_direction_identifier, power)?;
        let pin = claim_pin(pins, pin)?;
        Ok(UnresolvedServo {
            object,
            pin,
            rest_angle: None,
        })
    }

    fn assemble(
        object: SimObject,
        pin: PinId,
        map: ScaleMap,
        rest_angle: Option<i32>,
        enable_test: bool,
    ) -> Self {
        Self {
            object,
            pin,
            map,
            rest_angle,
            enable_test,
            last_angle: None,
            last_output: None,
            settle_pending: false,
        }
    }

    /// Output value for `angle`: table lookup, or the rest angle itself when
    /// the table does not cover it.
    pub fn resolve_output(&self, angle: f64) -> Option<f64> {
        self.map.resolve(angle).or_else(|| {
            self.rest_angle
                .map(f64::from)
                .filter(|rest| *rest == angle)
        })
    }

    /// Drives the servo to `angle` and returns the output written.
    ///
    /// Without power nothing moves; with a rest angle configured the servo
    /// is marked to settle there once power returns (see [`Self::settle`]).
    pub fn set_angle(&mut self, pins: &mut dyn PinIo, angle: f64) -> Result<f64, OutputError> {
        if !self.object.has_power() {
            if self.rest_angle.is_some() {
                self.settle_pending = true;
            }
            return Err(OutputError::PoweredOff);
        }

        let output = self.resolve_output(angle).ok_or(OutputError::OutOfRange {
            value: angle,
            low: self.map.min_angle(),
            high: self.map.max_angle(),
            inverted: false,
        })?;

        self.drive(pins, output)?;
        self.last_angle = Some(angle);
        self.settle_pending = false;
        debug!(
            "{} pin {} angle {} -> {}",
            self.object.identifier(),
            self.pin,
            angle,
            output
        );
        Ok(output)
    }

    /// Moves to the rest angle if power was lost while it was configured.
    /// Returns the output written, or `None` when nothing was pending.
    pub fn settle(&mut self, pins: &mut dyn PinIo) -> Result<Option<f64>, OutputError> {
        let Some(rest) = self.rest_angle.filter(|_| self.settle_pending) else {
            return Ok(None);
        };
        self.object.require_power()?;

        let angle = f64::from(rest);
        let output = self.resolve_output(angle).unwrap_or(angle);
        self.drive(pins, output)?;
        self.last_angle = Some(angle);
        self.settle_pending = false;
        Ok(Some(output))
    }

    pub fn is_settle_pending(&self) -> bool {
        self.settle_pending
    }

    pub fn last_angle(&self) -> Option<f64> {
        self.last_angle
    }

    pub fn last_output(&self) -> Option<f64> {
        self.last_output
    }

    /// Last output rounded half-up, as an RC servo driver consumes it.
    pub fn servo_value(&self) -> Option<i64> {
        self.last_output.map(|out| (out + 0.5).floor() as i64)
    }

    pub fn rest_angle(&self) -> Option<i32> {
        self.rest_angle
    }

    pub fn scale_map(&self) -> &ScaleMap {
        &self.map
    }

    pub fn test_enabled(&self) -> bool {
        self.enable_test
    }

    pub fn set_test_enabled(&mut self, enable: bool) {
        self.enable_test = enable;
    }

    /// Drives every table entry in order, then returns to the previous
    /// output (or the rest position, or the first entry).
    pub fn self_test(&mut self, pins: &mut dyn PinIo) -> Result<SelfTestOutcome, OutputError> {
        if !self.enable_test {
            return Ok(SelfTestOutcome::Skipped(SkipReason::Disabled));
        }
        if !self.object.has_power() {
            return Ok(SelfTestOutcome::Skipped(SkipReason::PoweredOff));
        }

        let mut steps = 0;
        let mut sweep = Ok(());
        for point in self.map.points() {
            if let Err(fault) = pins.write_pin(self.pin, point.output) {
                sweep = Err(self.fault(fault));
                break;
            }
            steps += 1;
        }

        let home = self
            .last_output
            .or_else(|| {
                self.rest_angle
                    .map(|rest| self.resolve_output(f64::from(rest)).unwrap_or(f64::from(rest)))
            })
            .unwrap_or(self.map.points()[0].output);
        let restored = pins
            .write_pin(self.pin, home)
            .map_err(|fault| self.fault(fault));

        sweep?;
        restored?;
        Ok(SelfTestOutcome::Passed { steps })
    }

    fn drive(&mut self, pins: &mut dyn PinIo, output: f64) -> Result<(), OutputError> {
        pins.write_pin(self.pin, output)
            .map_err(|fault| self.fault(fault))?;
        self.last_output = Some(output);
        Ok(())
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

impl PowerAware for SimServo {
    fn has_power(&self) -> bool {
        self.object.has_power()
    }

    fn set_power_source(&mut self, power: PowerFlag) {
        self.object.set_power_source(power);
    }
}

impl PinBound for SimServo {
    fn pin(&self) -> PinId {
        self.pin
    }

    fn identifier(&self) -> &str {
        self.object.identifier()
    }
}

impl Peripheral for SimServo {
    fn kind(&self) -> &'static str {
        "servo"
    }

    fn self_test(&mut self, pins: &mut dyn PinIo) -> Result<SelfTestOutcome, OutputError> {
        SimServo::self_test(self, pins)
    }
}
