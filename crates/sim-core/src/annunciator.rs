//! Warning-panel indicator logic: input-driven annunciators, system
//! annunciators that latch newly active channels, and a master caution that
//! aggregates systems.

use crate::error::{OutputError, SimError};
use crate::hal::{PinId, PinIo};
use crate::limits::{LedLimits, Level};
use crate::object::{claim_pin, SimObject};
use crate::power::PowerFlag;

/// Channels per system annunciator, and systems per master caution.
pub const MAX_CHANNELS: usize = 12;

fn lit_state(active: bool, allow_test: bool, lamp_test: bool, powered: bool) -> bool {
    powered && (active || (allow_test && lamp_test))
}

fn drive_lamp(
    object: &SimObject,
    pin: Option<PinId>,
    lit: bool,
    pins: &mut dyn PinIo,
) -> Result<(), OutputError> {
    match pin {
        Some(pin) => pins
            .write_pin(pin, if lit { 1.0 } else { 0.0 })
            .map_err(|fault| {
                log::warn!("{} lamp pin {} failed: {}", object.identifier(), pin, fault);
                OutputError::PinFault { pin, fault }
            }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indication {
    pub active: bool,
    pub lit: bool,
}

/// Indicator that is active while its input lies in an activation window.
#[derive(Debug, Clone)]
pub struct Annunciator<T: Level> {
    object: SimObject,
    pin: Option<PinId>,
    window: LedLimits<T>,
    allow_test: bool,
    state: Indication,
}

impl<T: Level> Annunciator<T> {
    /// `pin = None` for indicators that only feed other logic.
    pub fn new(
        identifier: impl Into<String>,
        pin: Option<PinId>,
        window: LedLimits<T>,
        allow_test: bool,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        let object = SimObject::new(identifier, power)?;
        let pin = pin.map(|p| claim_pin(pins, p)).transpose()?;
        Ok(Self {
            object,
            pin,
            window,
            allow_test,
            state: Indication::default(),
        })
    }

    pub fn update(&mut self, input: T, lamp_test: bool) -> Indication {
        let active = self.window.contains(input);
        self.state = Indication {
            active,
            lit: lit_state(active, self.allow_test, lamp_test, self.object.has_power()),
        };
        self.state
    }

    pub fn indication(&self) -> Indication {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn is_lit(&self) -> bool {
        self.state.lit
    }

    pub fn identifier(&self) -> &str {
        self.object.identifier()
    }

    pub fn drive(&self, pins: &mut dyn PinIo) -> Result<(), OutputError> {
        drive_lamp(&self.object, self.pin, self.state.lit, pins)
    }
}

/// Latches newly active channels until reset by its master caution.
#[derive(Debug, Clone)]
pub struct SystemAnnunciator {
    object: SimObject,
    pin: Option<PinId>,
    allow_test: bool,
    acknowledged: Vec<bool>,
    recall: bool,
    has_active: bool,
    state: Indication,
}

impl SystemAnnunciator {
    pub fn new(
        identifier: impl Into<String>,
        pin: Option<PinId>,
        channels: usize,
        allow_test: bool,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        let object = SimObject::new(identifier, power)?;
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SimError::invalid(format!(
                "{}: channel count {channels} must be 1..={MAX_CHANNELS}",
                object.identifier()
            )));
        }
        let pin = pin.map(|p| claim_pin(pins, p)).transpose()?;
        Ok(Self {
            object,
            pin,
            allow_test,
            acknowledged: vec![false; channels],
            recall: false,
            has_active: false,
            state: Indication::default(),
        })
    }

    pub fn channels(&self) -> usize {
        self.acknowledged.len()
    }

    /// Feeds the current channel states. Extra entries are ignored, missing
    /// ones count as inactive.
    pub fn update(&mut self, channels: &[bool], lamp_test: bool) -> Indication {
        let mut active = self.state.active;
        if self.recall {
            active = true;
        } else {
            self.has_active = false;
            for (i, ack) in self.acknowledged.iter_mut().enumerate() {
                if channels.get(i).copied().unwrap_or(false) {
                    self.has_active = true;
                    if !*ack {
                        active = true;
                        *ack = true;
                    }
                } else {
                    *ack = false;
                }
            }
        }

        self.state = Indication {
            active,
            lit: lit_state(active, self.allow_test, lamp_test, self.object.has_power()),
        };
        self.state
    }

    /// Any channel currently active, acknowledged or not.
    pub fn has_active(&self) -> bool {
        self.has_active
    }

    pub fn in_recall(&self) -> bool {
        self.recall
    }

    pub fn indication(&self) -> Indication {
        self.state
    }

    pub fn identifier(&self) -> &str {
        self.object.identifier()
    }

    pub fn drive(&self, pins: &mut dyn PinIo) -> Result<(), OutputError> {
        drive_lamp(&self.object, self.pin, self.state.lit, pins)
    }

    fn reset(&mut self) {
        self.state.active = false;
        self.state.lit = false;
    }

    fn set_recall(&mut self, on: bool) {
        if on {
            self.recall = true;
        } else if self.recall {
            self.acknowledged.iter_mut().for_each(|ack| *ack = false);
            self.recall = false;
            self.reset();
        }
    }
}

/// Active while any system has an active channel, acknowledged or not.
/// `reset` only clears it until the next update.
#[derive(Debug, Clone)]
pub struct MasterCaution {
    object: SimObject,
    pin: Option<PinId>,
    allow_test: bool,
    systems: Vec<SystemAnnunciator>,
    state: Indication,
}

impl MasterCaution {
    pub fn new(
        identifier: impl Into<String>,
        pin: Option<PinId>,
        systems: Vec<SystemAnnunciator>,
        allow_test: bool,
        power: PowerFlag,
        pins: &dyn PinIo,
    ) -> Result<Self, SimError> {
        let object = SimObject::new(identifier, power)?;
        if systems.len() > MAX_CHANNELS {
            return Err(SimError::invalid(format!(
                "{}: {} systems exceed the limit of {MAX_CHANNELS}",
                object.identifier(),
                systems.len()
            )));
        }
        let pin = pin.map(|p| claim_pin(pins, p)).transpose()?;
        Ok(Self {
            object,
            pin,
            allow_test,
            systems,
            state: Indication::default(),
        })
    }

    /// `channels[i]` feeds system `i`.
    pub fn update(&mut self, channels: &[&[bool]], lamp_test: bool) -> Indication {
        let mut active = self.state.active;
        for (i, system) in self.systems.iter_mut().enumerate() {
            system.update(channels.get(i).copied().unwrap_or(&[]), lamp_test);
            if system.has_active() {
                active = true;
            }
        }
        self.state = Indication {
            active,
            lit: lit_state(active, self.allow_test, lamp_test, self.object.has_power()),
        };
        self.state
    }

    /// Extinguishes the master and every system light; active channels stay
    /// acknowledged.
    pub fn reset(&mut self) {
        self.systems.iter_mut().for_each(SystemAnnunciator::reset);
        self.state.active = false;
        self.state.lit = false;
    }

    pub fn set_recall(&mut self, on: bool) {
        for system in &mut self.systems {
            system.set_recall(on);
        }
    }

    pub fn systems(&self) -> &[SystemAnnunciator] {
        &self.systems
    }

    pub fn system(&self, identifier: &str) -> Option<&SystemAnnunciator> {
        self.systems.iter().find(|s| s.identifier() == identifier)
    }

    pub fn indication(&self) -> Indication {
        self.state
    }

    /// Writes the master lamp and every system lamp.
    pub fn drive(&self, pins: &mut dyn PinIo) -> Result<(), OutputError> {
        for system in &self.systems {
            system.drive(pins)?;
        }
        drive_lamp(&self.object, self.pin, self.state.lit, pins)
    }
}
