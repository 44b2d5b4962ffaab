use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One angle→output correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalePoint {
    pub angle: f64,
    pub output: f64,
}

impl From<(f64, f64)> for ScalePoint {
    fn from((angle, output): (f64, f64)) -> Self {
        Self { angle, output }
    }
}

/// Immutable, shared angle→output table ordered by angle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleMap {
    points: Arc<[ScalePoint]>,
}

impl ScaleMap {
    pub fn new(points: impl Into<Vec<ScalePoint>>) -> Result<Self, SimError> {
        let points: Vec<ScalePoint> = points.into();
        if points.is_empty() {
            return Err(SimError::invalid("scale map must have at least one entry"));
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.angle.is_finite() || !p.output.is_finite())
        {
            return Err(SimError::invalid(format!(
                "scale map entry ({}, {}) is not finite",
                bad.angle, bad.output
            )));
        }
        if let Some(i) = (1..points.len()).find(|&i| points[i].angle < points[i - 1].angle) {
            return Err(SimError::invalid(format!(
                "scale map angles must not decrease (entry {i}: {} after {})",
                points[i].angle,
                points[i - 1].angle
            )));
        }
        Ok(Self {
            points: points.into(),
        })
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, SimError> {
        Self::new(pairs.iter().copied().map(ScalePoint::from).collect::<Vec<_>>())
    }

    /// Uses the first `map_size` rows of `table`.
    pub fn from_table(table: &[[f64; 2]], map_size: usize) -> Result<Self, SimError> {
        if map_size == 0 {
            return Err(SimError::invalid("map size must be non-zero"));
        }
        if map_size > table.len() {
            return Err(SimError::invalid(format!(
                "map size {map_size} exceeds table length {}",
                table.len()
            )));
        }
        Self::new(
            table[..map_size]
                .iter()
                .map(|&[angle, output]| ScalePoint { angle, output })
                .collect::<Vec<_>>(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ScalePoint] {
        &self.points
    }

    pub fn min_angle(&self) -> f64 {
        self.points[0].angle
    }

    pub fn max_angle(&self) -> f64 {
        self.points[self.points.len() - 1].angle
    }

    pub fn covers(&self, angle: f64) -> bool {
        angle.is_finite() && self.min_angle() <= angle && angle <= self.max_angle()
    }

    /// Exact entry or linear interpolation between neighbours; `None` when
    /// the angle is outside the table.
    pub fn resolve(&self, angle: f64) -> Option<f64> {
        if !self.covers(angle) {
            return None;
        }

        let upper = self.points.iter().position(|p| angle <= p.angle)?;
        let hi = self.points[upper];
        if angle == hi.angle {
            return Some(hi.output);
        }

        // covers() guarantees angle > points[0].angle here, so upper >= 1.
        let lo = self.points[upper - 1];
        let t = (angle - lo.angle) / (hi.angle - lo.angle);
        Some(lo.output + t * (hi.output - lo.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servo_table() -> ScaleMap {
        ScaleMap::from_pairs(&[(0.0, 1000.0), (90.0, 2000.0), (180.0, 3000.0)]).unwrap()
    }

    #[test]
    fn empty_map_is_invalid() {
        assert!(matches!(
            ScaleMap::new(Vec::<ScalePoint>::new()),
            Err(SimError::InvalidArgument(_))
        ));
        assert!(ScaleMap::from_table(&[[0.0, 1.0]], 0).is_err());
    }

    #[test]
    fn map_size_beyond_table_is_invalid() {
        assert!(ScaleMap::from_table(&[[0.0, 1.0]], 2).is_err());
    }

    #[test]
    fn from_table_truncates_to_map_size() {
        let map = ScaleMap::from_table(&[[0.0, 10.0], [10.0, 20.0], [20.0, 99.0]], 2).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.max_angle(), 10.0);
    }

    #[test]
    fn decreasing_angles_are_invalid() {
        let res = ScaleMap::from_pairs(&[(0.0, 0.0), (10.0, 1.0), (5.0, 2.0)]);
        assert!(matches!(res, Err(SimError::InvalidArgument(_))));
    }

    #[test]
    fn exact_and_interpolated_lookups() {
        let map = servo_table();
        assert_eq!(map.resolve(0.0), Some(1000.0));
        assert_eq!(map.resolve(45.0), Some(1500.0));
        assert_eq!(map.resolve(90.0), Some(2000.0));
        assert_eq!(map.resolve(135.0), Some(2500.0));
        assert_eq!(map.resolve(180.0), Some(3000.0));
    }

    #[test]
    fn outside_table_is_unresolved() {
        let map = servo_table();
        assert_eq!(map.resolve(200.0), None);
        assert_eq!(map.resolve(-0.5), None);
        assert_eq!(map.resolve(f64::NAN), None);
    }

    #[test]
    fn descending_outputs_interpolate() {
        let map = ScaleMap::from_pairs(&[(-10.0, 180.0), (10.0, 0.0)]).unwrap();
        assert_eq!(map.resolve(0.0), Some(90.0));
    }

    #[test]
    fn single_entry_map_covers_one_angle() {
        let map = ScaleMap::from_pairs(&[(30.0, 1234.0)]).unwrap();
        assert_eq!(map.resolve(30.0), Some(1234.0));
        assert_eq!(map.resolve(31.0), None);
    }

    #[test]
    fn repeated_angle_takes_first_entry() {
        let map = ScaleMap::from_pairs(&[(0.0, 0.0), (10.0, 5.0), (10.0, 50.0), (20.0, 60.0)]).unwrap();
        assert_eq!(map.resolve(10.0), Some(5.0));
        assert_eq!(map.resolve(15.0), Some(55.0));
    }

    #[test]
    fn clones_share_storage() {
        let map = servo_table();
        let copy = map.clone();
        assert!(std::ptr::eq(map.points().as_ptr(), copy.points().as_ptr()));
    }
}
