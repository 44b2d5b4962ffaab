//! A simulated bench: one power rail, one pin bank and the peripherals a
//! scenario binds to them.

use crate::metrics;
use crate::protocol::{OutcomeRecord, RunSummary, Status, Step};
use crate::scenario::{Scenario, ScenarioError, ServoSpec};
use sim_core::{
    AngleMapRegistry, IntLed, OutputError, Peripheral, PinIo, PowerFlag, PowerSupply,
    RealLed, ScaleMap, SelfTestOutcome, ServoConfig, SimLed, SimServo, SimulatedPins, SkipReason,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Configured peripheral.
#[derive(Debug)]
pub enum Device {
    IntLed(IntLed),
    RealLed(RealLed),
    Servo(SimServo),
}

impl Device {
    pub fn kind(&self) -> &'static str {
        self.peripheral().kind()
    }

    pub fn as_servo(&self) -> Option<&SimServo> {
        match self {
            Self::Servo(servo) => Some(servo),
            _ => None,
        }
    }

    pub fn peripheral(&self) -> &dyn Peripheral {
        match self {
            Self::IntLed(led) => led,
            Self::RealLed(led) => led,
            Self::Servo(servo) => servo,
        }
    }

    fn peripheral_mut(&mut self) -> &mut dyn Peripheral {
        match self {
            Self::IntLed(led) => led,
            Self::RealLed(led) => led,
            Self::Servo(servo) => servo,
        }
    }
}

fn error_status(err: &OutputError) -> Status {
    match err {
        OutputError::PoweredOff => Status::PoweredOff,
        OutputError::OutOfRange { .. } => Status::OutOfRange,
        OutputError::PinFault { .. } => Status::PinFault,
    }
}

fn skip_detail(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Disabled => "self-test disabled",
        SkipReason::PoweredOff => "no power",
    }
}

pub struct Rig {
    name: String,
    supply: PowerSupply,
    pins: SimulatedPins,
    registry: AngleMapRegistry,
    devices: BTreeMap<String, Device>,
    order: Vec<String>,
    sequence: u64,
    accepted: u64,
    rejected: u64,
}

impl Rig {
    /// Builds every configured device. Fails on the first device whose
    /// arguments are rejected or whose angle map cannot be resolved.
    pub fn build(scenario: &Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;

        let supply = PowerSupply::new(scenario.power.initial);
        let pins = SimulatedPins::new(scenario.board.pin_count)
            .with_reserved(scenario.board.reserved_pins.iter().copied())
            .with_history_limit(scenario.board.history_limit);

        let mut registry = AngleMapRegistry::new();
        for (id, rows) in &scenario.angle_maps {
            registry.register(id.clone(), ScaleMap::from_table(rows, rows.len())?)?;
        }

        let power_for = |id: &str| {
            if scenario.power.always_on.iter().any(|a| a == id) {
                PowerFlag::always_on()
            } else {
                supply.flag()
            }
        };

        let mut built = Vec::new();
        for cfg in &scenario.int_leds {
            let led = SimLed::new(cfg.clone(), power_for(&cfg.identifier), &pins)?;
            built.push((cfg.identifier.clone(), Device::IntLed(led)));
        }
        for cfg in &scenario.real_leds {
            let led = SimLed::new(cfg.clone(), power_for(&cfg.identifier), &pins)?;
            built.push((cfg.identifier.clone(), Device::RealLed(led)));
        }
        for spec in &scenario.servos {
            let servo = build_servo(spec, power_for(&spec.identifier), &pins, &registry)?;
            built.push((spec.identifier.clone(), Device::Servo(servo)));
        }

        let order = built.iter().map(|(id, _)| id.clone()).collect();
        let devices = built.into_iter().collect::<BTreeMap<_, _>>();
        info!(
            scenario = %scenario.name,
            devices = devices.len(),
            angle_maps = registry.len(),
            powered = supply.is_on(),
            "Rig assembled"
        );
        metrics::record_power(supply.is_on());

        Ok(Self {
            name: scenario.name.clone(),
            supply,
            pins,
            registry,
            devices,
            order,
            sequence: 0,
            accepted: 0,
            rejected: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supply(&self) -> &PowerSupply {
        &self.supply
    }

    pub fn pins(&self) -> &SimulatedPins {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut SimulatedPins {
        &mut self.pins
    }

    pub fn registry(&self) -> &AngleMapRegistry {
        &self.registry
    }

    pub fn device(&self, identifier: &str) -> Option<&Device> {
        self.devices.get(identifier)
    }

    /// Devices in scenario declaration order.
    pub fn devices(&self) -> impl Iterator<Item = (&str, &Device)> {
        self.order
            .iter()
            .filter_map(|id| self.devices.get(id).map(|d| (id.as_str(), d)))
    }

    pub fn run<'a>(&mut self, steps: impl IntoIterator<Item = &'a Step>) -> Vec<OutcomeRecord> {
        steps.into_iter().flat_map(|step| self.apply(step)).collect()
    }

    /// Applies one step. Every step yields at least one outcome except
    /// `self_test_all` on an empty rig.
    pub fn apply(&mut self, step: &Step) -> Vec<OutcomeRecord> {
        let outcomes = match step {
            Step::Power { on } => {
                self.supply.set(*on);
                metrics::record_power(*on);
                info!(on = *on, "Power rail switched");
                vec![(String::new(), self.record(step, None, Status::Ok))]
            }
            Step::SelfTestAll => {
                let ids = self.order.clone();
                ids.iter()
                    .map(|id| self.apply_to_device(step, id))
                    .collect()
            }
            _ => match step.device() {
                Some(id) => vec![self.apply_to_device(step, id)],
                None => Vec::new(),
            },
        };

        let stats = self.pins.write_stats();
        metrics::record_pin_stats(&stats);

        outcomes
            .into_iter()
            .map(|(kind, outcome)| {
                if outcome.status.is_accepted() {
                    self.accepted += 1;
                    debug!(
                        seq = outcome.sequence,
                        op = %outcome.op,
                        device = outcome.device.as_deref().unwrap_or("-"),
                        status = outcome.status.as_str(),
                        "Step applied"
                    );
                } else {
                    self.rejected += 1;
                    warn!(
                        seq = outcome.sequence,
                        op = %outcome.op,
                        device = outcome.device.as_deref().unwrap_or("-"),
                        status = outcome.status.as_str(),
                        detail = outcome.detail.as_deref().unwrap_or(""),
                        "Step rejected"
                    );
                }
                metrics::record_outcome(&kind, &outcome);
                outcome
            })
            .collect()
    }

    fn apply_to_device(&mut self, step: &Step, id: &str) -> (String, OutcomeRecord) {
        self.sequence += 1;
        let sequence = self.sequence;
        let powered = self.supply.is_on();
        let op = step.op();
        let pins = &mut self.pins;

        let Some(device) = self.devices.get_mut(id) else {
            return (
                String::new(),
                OutcomeRecord::new(sequence, op, Some(id), Status::UnknownDevice, powered),
            );
        };
        let kind = device.kind().to_string();
        let base = |status| OutcomeRecord::new(sequence, op, Some(id), status, powered);

        let outcome = match (step, device) {
            (Step::Led { value, .. }, Device::IntLed(led)) => match value.as_i32() {
                Some(v) => match led.write(pins, v) {
                    Ok(()) => base(Status::Ok).with_output(f64::from(v)),
                    Err(e) => base(error_status(&e)).with_detail(e.to_string()),
                },
                None => base(Status::InvalidStep)
                    .with_detail(format!("integer LED needs a whole number, got {}", value.as_f64())),
            },
            (Step::Led { value, .. }, Device::RealLed(led)) => {
                let v = value.as_f64();
                match led.write(pins, v) {
                    Ok(()) => base(Status::Ok).with_output(v),
                    Err(e) => base(error_status(&e)).with_detail(e.to_string()),
                }
            }
            (Step::Servo { angle, .. }, Device::Servo(servo)) => {
                match servo.set_angle(pins, *angle) {
                    Ok(out) => base(Status::Ok)
                        .with_output(out)
                        .with_servo_value(servo.servo_value()),
                    Err(e) => base(error_status(&e)).with_detail(e.to_string()),
                }
            }
            (Step::Settle { .. }, Device::Servo(servo)) => match servo.settle(pins) {
                Ok(Some(out)) => base(Status::Ok)
                    .with_output(out)
                    .with_servo_value(servo.servo_value()),
                Ok(None) => base(Status::Skipped).with_detail("nothing pending"),
                Err(e) => base(error_status(&e)).with_detail(e.to_string()),
            },
            (Step::SelfTest { .. } | Step::SelfTestAll, device) => {
                match device.peripheral_mut().self_test(pins) {
                    Ok(SelfTestOutcome::Passed { steps }) => {
                        base(Status::Passed).with_steps(steps)
                    }
                    Ok(SelfTestOutcome::Skipped(reason)) => {
                        base(Status::Skipped).with_detail(skip_detail(reason))
                    }
                    Err(e) => base(error_status(&e)).with_detail(e.to_string()),
                }
            }
            (_, device) => base(Status::InvalidStep)
                .with_detail(format!("'{op}' does not apply to a {}", device.kind())),
        };
        (kind, outcome)
    }

    fn record(&mut self, step: &Step, device: Option<&str>, status: Status) -> OutcomeRecord {
        self.sequence += 1;
        OutcomeRecord::new(self.sequence, step.op(), device, status, self.supply.is_on())
    }

    pub fn summary(&self) -> RunSummary {
        let stats = self.pins.write_stats();
        RunSummary {
            msg_type: "summary".to_string(),
            scenario: self.name.clone(),
            outcomes: self.sequence,
            accepted: self.accepted,
            rejected: self.rejected,
            pin_writes: stats.writes,
            pin_faults: stats.faults,
            powered: self.supply.is_on(),
        }
    }
}

fn build_servo(
    spec: &ServoSpec,
    power: PowerFlag,
    pins: &SimulatedPins,
    registry: &AngleMapRegistry,
) -> Result<SimServo, ScenarioError> {
    let mut servo = match &spec.table {
        Some(rows) => {
            let config =
                ServoConfig::new(spec.pin, spec.identifier.clone()).rest_angle(spec.rest_angle);
            SimServo::with_table(config, rows, rows.len(), power, pins)?
        }
        None => SimServo::bind(spec.pin, spec.identifier.clone(), power, pins)?
            .with_rest_angle(spec.rest_angle)?
            .resolve(registry)?,
    };
    servo.set_test_enabled(spec.enable_test);
    Ok(servo)
}
