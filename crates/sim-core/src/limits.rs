use crate::error::{OutputError, SimError};
use std::fmt;
use std::marker::PhantomData;

/// Numeric type an LED can be driven with.
pub trait Level: Copy + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn to_output(self) -> f64;
    fn is_finite_level(self) -> bool;
    fn midpoint(low: Self, high: Self) -> Self;
    /// Nearest representable test value below `self`, if any.
    fn step_below(self) -> Option<Self>;
    fn step_above(self) -> Option<Self>;
    /// Level that extinguishes the output.
    fn off() -> Self;
    /// Converts an integral limit constant.
    fn from_limit(limit: i32) -> Self;
}

impl Level for i32 {
    fn to_output(self) -> f64 {
        self as f64
    }

    fn is_finite_level(self) -> bool {
        true
    }

    fn midpoint(low: Self, high: Self) -> Self {
        (low as i64 + (high as i64 - low as i64) / 2) as i32
    }

    fn step_below(self) -> Option<Self> {
        self.checked_sub(1)
    }

    fn step_above(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn off() -> Self {
        0
    }

    fn from_limit(limit: i32) -> Self {
        limit
    }
}

impl Level for f64 {
    fn to_output(self) -> f64 {
        self
    }

    fn is_finite_level(self) -> bool {
        self.is_finite()
    }

    fn midpoint(low: Self, high: Self) -> Self {
        low / 2.0 + high / 2.0
    }

    fn step_below(self) -> Option<Self> {
        let v = self - 1.0;
        (v.is_finite() && v < self).then_some(v)
    }

    fn step_above(self) -> Option<Self> {
        let v = self + 1.0;
        (v.is_finite() && v > self).then_some(v)
    }

    fn off() -> Self {
        0.0
    }

    fn from_limit(limit: i32) -> Self {
        f64::from(limit)
    }
}

/// Inclusive window; when `inverted` the accepted set is its complement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedLimits<T> {
    low: T,
    high: T,
    inverted: bool,
}

impl<T: Level> LedLimits<T> {
    pub fn new(low: T, high: T, inverted: bool) -> Result<Self, SimError> {
        if !low.is_finite_level() || !high.is_finite_level() {
            return Err(SimError::invalid(format!(
                "limits must be finite (low={low}, high={high})"
            )));
        }
        if low > high {
            return Err(SimError::invalid(format!(
                "low limit {low} is above high limit {high}"
            )));
        }
        Ok(Self {
            low,
            high,
            inverted,
        })
    }

    pub fn low(&self) -> T {
        self.low
    }

    pub fn high(&self) -> T {
        self.high
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn contains(&self, value: T) -> bool {
        if !value.is_finite_level() {
            return false;
        }
        let inside = self.low <= value && value <= self.high;
        inside != self.inverted
    }

    /// Deterministic set of accepted values used by self-tests.
    pub fn sweep(&self) -> Vec<T> {
        let candidates = if self.inverted {
            vec![self.low.step_below(), self.high.step_above()]
        } else {
            vec![
                Some(self.low),
                Some(T::midpoint(self.low, self.high)),
                Some(self.high),
            ]
        };

        let mut points: Vec<T> = Vec::with_capacity(candidates.len());
        for value in candidates.into_iter().flatten() {
            if self.contains(value) && points.last() != Some(&value) {
                points.push(value);
            }
        }
        points
    }

    fn rejection(&self, value: T) -> OutputError {
        OutputError::OutOfRange {
            value: value.to_output(),
            low: self.low.to_output(),
            high: self.high.to_output(),
            inverted: self.inverted,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Unvalidated;

#[derive(Debug, Clone, Copy)]
pub struct Validated;

/// Requested output level; only a `Validated` setpoint reaches a pin.
#[derive(Debug, Clone, Copy)]
pub struct Setpoint<T, State = Unvalidated> {
    value: T,
    _state: PhantomData<State>,
}

impl<T: Level> Setpoint<T, Unvalidated> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            _state: PhantomData,
        }
    }

    pub fn validate(self, limits: &LedLimits<T>) -> Result<Setpoint<T, Validated>, OutputError> {
        if !limits.contains(self.value) {
            return Err(limits.rejection(self.value));
        }
        Ok(Setpoint {
            value: self.value,
            _state: PhantomData,
        })
    }
}

impl<T: Level> Setpoint<T, Validated> {
    pub fn value(&self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reversed_pair() {
        let res = LedLimits::new(10, 5, false);
        assert!(matches!(res, Err(SimError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_nonfinite_limits() {
        assert!(LedLimits::new(f64::NAN, 1.0, false).is_err());
        assert!(LedLimits::new(0.0, f64::INFINITY, false).is_err());
    }

    #[test]
    fn bounds_are_inclusive() {
        let limits = LedLimits::new(1, 5, false).unwrap();
        assert!(limits.contains(1));
        assert!(limits.contains(5));
        assert!(!limits.contains(0));
        assert!(!limits.contains(6));
    }

    #[test]
    fn collapsed_window_accepts_single_value() {
        let limits = LedLimits::new(3, 3, false).unwrap();
        assert!(limits.contains(3));
        assert!(!limits.contains(2));

        let inverted = LedLimits::new(3, 3, true).unwrap();
        assert!(!inverted.contains(3));
        assert!(inverted.contains(2));
        assert!(inverted.contains(4));
    }

    #[test]
    fn nan_never_accepted_even_inverted() {
        let limits = LedLimits::new(0.0, 1.0, true).unwrap();
        assert!(!limits.contains(f64::NAN));
        let res = Setpoint::new(f64::NAN).validate(&limits);
        assert!(matches!(res, Err(OutputError::OutOfRange { .. })));
    }

    #[test]
    fn sweep_stays_inside_accepted_set() {
        let plain = LedLimits::new(0, 255, false).unwrap();
        assert_eq!(plain.sweep(), vec![0, 127, 255]);

        let single = LedLimits::new(4, 4, false).unwrap();
        assert_eq!(single.sweep(), vec![4]);

        let inverted = LedLimits::new(-0.1, 0.2, true).unwrap();
        let points = inverted.sweep();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| inverted.contains(*p)));

        let edge = LedLimits::new(i32::MIN, i32::MAX, true).unwrap();
        assert!(edge.sweep().is_empty());
    }

    #[test]
    fn validated_setpoint_keeps_value() {
        let limits = LedLimits::new(0.10, 0.15, false).unwrap();
        let sp = Setpoint::new(0.12).validate(&limits).unwrap();
        assert_eq!(sp.value(), 0.12);
    }
}
