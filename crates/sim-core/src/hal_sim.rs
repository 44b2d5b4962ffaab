use crate::hal::{PinFault, PinId, PinIo, WriteStats};
use std::collections::{BTreeSet, VecDeque};

/// Writes kept by a new bank before the oldest are dropped.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinWrite {
    pub seq: u64,
    pub pin: PinId,
    pub value: f64,
}

/// In-memory pin bank with a bounded write history and fault injection.
#[derive(Debug, Clone)]
pub struct SimulatedPins {
    levels: Vec<Option<f64>>,
    reserved: BTreeSet<PinId>,
    faulted: BTreeSet<PinId>,
    history: VecDeque<PinWrite>,
    history_limit: usize,
    stats: WriteStats,
}

impl SimulatedPins {
    /// Pins `0..pin_count` are valid.
    pub fn new(pin_count: u16) -> Self {
        Self {
            levels: vec![None; pin_count as usize],
            reserved: BTreeSet::new(),
            faulted: BTreeSet::new(),
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            stats: WriteStats::default(),
        }
    }

    /// Marks pins as unusable for peripherals (e.g. bootstrap or serial pins).
    pub fn with_reserved(mut self, pins: impl IntoIterator<Item = PinId>) -> Self {
        self.reserved.extend(pins);
        self
    }

    /// Keeps at most `limit` writes, oldest dropped first. 0 turns recording
    /// off; levels and stats are tracked either way.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.trim_history();
        self
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    pub fn pin_count(&self) -> u16 {
        self.levels.len() as u16
    }

    /// Latest level written to `pin`, if any.
    pub fn level(&self, pin: PinId) -> Option<f64> {
        self.levels.get(pin as usize).copied().flatten()
    }

    /// Recorded writes, oldest first. `seq` keeps counting across dropped
    /// entries.
    pub fn history(&self) -> &VecDeque<PinWrite> {
        &self.history
    }

    pub fn writes_to(&self, pin: PinId) -> impl Iterator<Item = f64> + '_ {
        self.history
            .iter()
            .filter(move |w| w.pin == pin)
            .map(|w| w.value)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn inject_fault(&mut self, pin: PinId) {
        self.faulted.insert(pin);
    }

    pub fn clear_fault(&mut self, pin: PinId) {
        self.faulted.remove(&pin);
    }
}

impl Default for SimulatedPins {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PinIo for SimulatedPins {
    fn pin_is_valid(&self, pin: PinId) -> bool {
        (pin as usize) < self.levels.len() && !self.reserved.contains(&pin)
    }

    fn write_pin(&mut self, pin: PinId, value: f64) -> Result<(), PinFault> {
        if !self.pin_is_valid(pin) {
            self.stats.faults += 1;
            return Err(PinFault::Unavailable);
        }
        if self.faulted.contains(&pin) {
            self.stats.faults += 1;
            return Err(PinFault::DriverFault);
        }

        self.levels[pin as usize] = Some(value);
        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(PinWrite {
                seq: self.stats.writes,
                pin,
                value,
            });
        }
        self.stats.writes += 1;
        self.stats.last_pin = Some(pin);
        Ok(())
    }

    fn write_stats(&self) -> WriteStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_and_out_of_bank_pins_are_invalid() {
        let pins = SimulatedPins::new(8).with_reserved([0, 1]);
        assert!(!pins.pin_is_valid(0));
        assert!(!pins.pin_is_valid(8));
        assert!(pins.pin_is_valid(2));
    }

    #[test]
    fn records_levels_and_history() {
        let mut pins = SimulatedPins::new(4);
        pins.write_pin(2, 0.5).unwrap();
        pins.write_pin(2, 1.0).unwrap();
        pins.write_pin(3, 7.0).unwrap();

        assert_eq!(pins.level(2), Some(1.0));
        assert_eq!(pins.level(1), None);
        assert_eq!(pins.writes_to(2).collect::<Vec<_>>(), vec![0.5, 1.0]);
        assert_eq!(pins.history()[2].seq, 2);
        assert_eq!(pins.write_stats().writes, 3);
        assert_eq!(pins.write_stats().last_pin, Some(3));
    }

    #[test]
    fn history_drops_oldest_writes_past_the_limit() {
        let mut pins = SimulatedPins::new(4).with_history_limit(3);
        for i in 0..10 {
            pins.write_pin(1, f64::from(i)).unwrap();
        }
        assert_eq!(pins.history().len(), 3);
        assert_eq!(pins.writes_to(1).collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
        assert_eq!(pins.history()[0].seq, 7);
        assert_eq!(pins.write_stats().writes, 10);
    }

    #[test]
    fn zero_limit_disables_recording() {
        let mut pins = SimulatedPins::new(4).with_history_limit(0);
        pins.write_pin(2, 5.0).unwrap();
        assert!(pins.history().is_empty());
        assert_eq!(pins.level(2), Some(5.0));
        assert_eq!(pins.write_stats().writes, 1);
    }

    #[test]
    fn injected_fault_rejects_write_and_keeps_level() {
        let mut pins = SimulatedPins::new(4);
        pins.write_pin(1, 3.0).unwrap();
        pins.inject_fault(1);
        assert_eq!(pins.write_pin(1, 4.0), Err(PinFault::DriverFault));
        assert_eq!(pins.level(1), Some(3.0));
        assert_eq!(pins.write_stats().faults, 1);

        pins.clear_fault(1);
        assert!(pins.write_pin(1, 4.0).is_ok());
    }
}
