//! The square sampling lattice and the N×N matrices materialized on it.
//!
//! A [`Grid`] of size N has coordinates `0..N-1` on both axes and a
//! continuous domain of `[0, N)`. A [`Field`] stores one f64 per lattice
//! point, addressed as `field[i][j]` = value at `(domain_x[i], domain_y[j])`.

use glam::DVec2;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::error::SimError;

/// Immutable square lattice shared by every field of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    #[serde(skip)]
    size: usize,
    domain_x: Vec<f64>,
    domain_y: Vec<f64>,
}

impl Grid {
    /// Creates a grid with coordinates `0..size` on both axes.
    ///
    /// Returns `SimError::InvalidDimensions` if `size` is zero or if
    /// `size * size` overflows `usize`.
    pub fn new(size: usize) -> Result<Self, SimError> {
        if size == 0 {
            return Err(SimError::InvalidDimensions);
        }
        size.checked_mul(size).ok_or(SimError::InvalidDimensions)?;
        let coords: Vec<f64> = (0..size).map(|i| i as f64).collect();
        Ok(Self {
            size,
            domain_x: coords.clone(),
            domain_y: coords,
        })
    }

    /// Number of lattice points per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn domain_x(&self) -> &[f64] {
        &self.domain_x
    }

    pub fn domain_y(&self) -> &[f64] {
        &self.domain_y
    }

    /// Exclusive upper bound of the continuous domain on both axes.
    pub fn extent(&self) -> f64 {
        self.size as f64
    }

    /// Whether `p` lies inside `[0, N) x [0, N)`. NaN coordinates are outside.
    pub fn contains(&self, p: DVec2) -> bool {
        let extent = self.extent();
        (0.0..extent).contains(&p.x) && (0.0..extent).contains(&p.y)
    }

    /// Checks `p` against the domain, reporting it as `InvalidPosition` if outside.
    pub fn check(&self, p: DVec2) -> Result<DVec2, SimError> {
        if self.contains(p) {
            Ok(p)
        } else {
            Err(SimError::InvalidPosition {
                x: p.x,
                y: p.y,
                size: self.size,
            })
        }
    }

    /// Clamps `p` onto the lattice hull `[0, N-1]` on both axes.
    ///
    /// The hull lies inside `[0, N)`, so a clamped point always passes
    /// [`contains`](Self::contains).
    pub fn clamp(&self, p: DVec2) -> DVec2 {
        let last = (self.size - 1) as f64;
        p.clamp(DVec2::ZERO, DVec2::splat(last))
    }

    /// Iterates over lattice points yielding `(i, j, position)` with `j` fastest.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize, DVec2)> + '_ {
        self.domain_x.iter().enumerate().flat_map(move |(i, &x)| {
            self.domain_y
                .iter()
                .enumerate()
                .map(move |(j, &y)| (i, j, DVec2::new(x, y)))
        })
    }
}

/// An N×N matrix of values over a [`Grid`], stored with `j` varying fastest.
///
/// Serializes as nested rows (`[[f64; N]; N]`) so JSON consumers can index
/// it as `field[i][j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    size: usize,
    data: Vec<f64>,
}

impl Field {
    /// Creates a zero-filled field sized to `grid`.
    pub fn zeros(grid: &Grid) -> Self {
        Self {
            size: grid.size(),
            data: vec![0.0; grid.size() * grid.size()],
        }
    }

    /// Builds a field by evaluating `f(i, j, position)` at every lattice point.
    ///
    /// Points are visited in [`Grid::points`] order, which makes the call
    /// order (and therefore any RNG draws inside `f`) deterministic.
    pub fn from_fn(grid: &Grid, mut f: impl FnMut(usize, usize, DVec2) -> f64) -> Self {
        Self {
            size: grid.size(),
            data: grid.points().map(|(i, j, p)| f(i, j, p)).collect(),
        }
    }

    /// Creates a field from row-major data, validating that `data.len() == size * size`.
    pub fn from_data(size: usize, data: Vec<f64>) -> Result<Self, SimError> {
        if size == 0 {
            return Err(SimError::InvalidDimensions);
        }
        let expected = size.checked_mul(size).ok_or(SimError::InvalidDimensions)?;
        if data.len() != expected {
            return Err(SimError::InvalidArgument(format!(
                "field data has {} values, expected {expected}",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Read-only access to the underlying data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at lattice index `(i, j)`, or `None` outside the grid.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.size && j < self.size {
            Some(self.data[i * self.size + j])
        } else {
            None
        }
    }

    /// Iterates over rows; row `i` holds the values at `domain_x[i]`.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.size)
    }

    /// Smallest and largest value in the field.
    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.size))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// Two-component velocity field sharing one grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowField {
    pub u: Field,
    pub v: Field,
}

impl FlowField {
    /// Velocity at lattice index `(i, j)`, or `None` outside the grid.
    pub fn get(&self, i: usize, j: usize) -> Option<DVec2> {
        Some(DVec2::new(self.u.get(i, j)?, self.v.get(i, j)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_integer_coordinates() {
        let grid = Grid::new(4).unwrap();
        assert_eq!(grid.size(), 4);
        assert_eq!(grid.domain_x(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(grid.domain_y(), grid.domain_x());
    }

    #[test]
    fn new_with_zero_size_returns_error() {
        assert!(matches!(Grid::new(0), Err(SimError::InvalidDimensions)));
    }

    #[test]
    fn new_with_overflow_size_returns_error() {
        assert!(Grid::new(usize::MAX).is_err());
    }

    #[test]
    fn contains_is_half_open() {
        let grid = Grid::new(100).unwrap();
        assert!(grid.contains(DVec2::new(0.0, 0.0)));
        assert!(grid.contains(DVec2::new(99.999, 50.0)));
        assert!(!grid.contains(DVec2::new(100.0, 50.0)));
        assert!(!grid.contains(DVec2::new(-0.001, 50.0)));
        assert!(!grid.contains(DVec2::new(f64::NAN, 50.0)));
    }

    #[test]
    fn check_reports_invalid_position() {
        let grid = Grid::new(100).unwrap();
        let err = grid.check(DVec2::new(150.0, 10.0)).unwrap_err();
        assert_eq!(
            err,
            SimError::InvalidPosition {
                x: 150.0,
                y: 10.0,
                size: 100
            }
        );
    }

    #[test]
    fn clamp_pulls_points_onto_lattice_hull() {
        let grid = Grid::new(100).unwrap();
        assert_eq!(grid.clamp(DVec2::new(-3.0, 120.0)), DVec2::new(0.0, 99.0));
        assert_eq!(grid.clamp(DVec2::new(42.5, 7.0)), DVec2::new(42.5, 7.0));
    }

    #[test]
    fn points_visit_every_cell_with_j_fastest() {
        let grid = Grid::new(3).unwrap();
        let pts: Vec<_> = grid.points().collect();
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], (0, 0, DVec2::new(0.0, 0.0)));
        assert_eq!(pts[1], (0, 1, DVec2::new(0.0, 1.0)));
        assert_eq!(pts[3], (1, 0, DVec2::new(1.0, 0.0)));
    }

    #[test]
    fn from_fn_indexes_by_i_then_j() {
        let grid = Grid::new(3).unwrap();
        let field = Field::from_fn(&grid, |i, j, _| (i * 10 + j) as f64);
        assert_eq!(field.get(2, 1), Some(21.0));
        assert_eq!(field.get(0, 2), Some(2.0));
        assert_eq!(field.get(3, 0), None);
    }

    #[test]
    fn zeros_matches_grid_size() {
        let grid = Grid::new(5).unwrap();
        let field = Field::zeros(&grid);
        assert_eq!(field.size(), 5);
        assert!(field.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_data_rejects_wrong_length() {
        assert!(Field::from_data(2, vec![0.0; 3]).is_err());
        assert!(Field::from_data(0, vec![]).is_err());
        assert!(Field::from_data(2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn min_max_spans_values() {
        let field = Field::from_data(2, vec![0.3, -0.1, 0.9, 0.0]).unwrap();
        assert_eq!(field.min_max(), (-0.1, 0.9));
    }

    #[test]
    fn field_serializes_as_nested_rows() {
        let field = Field::from_data(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json, serde_json::json!([[1.0, 2.0], [3.0, 4.0]]));
    }

    #[test]
    fn grid_serializes_domains_only() {
        let grid = Grid::new(2).unwrap();
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"domain_x": [0.0, 1.0], "domain_y": [0.0, 1.0]})
        );
    }

    #[test]
    fn flow_field_get_pairs_components() {
        let grid = Grid::new(2).unwrap();
        let flow = FlowField {
            u: Field::from_fn(&grid, |i, _, _| i as f64),
            v: Field::from_fn(&grid, |_, j, _| -(j as f64)),
        };
        assert_eq!(flow.get(1, 1), Some(DVec2::new(1.0, -1.0)));
        assert_eq!(flow.get(2, 0), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamped_points_are_always_contained(
                size in 1_usize..=200,
                x in -1e4_f64..1e4,
                y in -1e4_f64..1e4,
            ) {
                let grid = Grid::new(size).unwrap();
                let p = grid.clamp(DVec2::new(x, y));
                prop_assert!(grid.contains(p), "{p:?} not inside grid of size {size}");
            }

            #[test]
            fn from_fn_is_size_squared(size in 1_usize..=64) {
                let grid = Grid::new(size).unwrap();
                let field = Field::from_fn(&grid, |_, _, p| p.x + p.y);
                prop_assert_eq!(field.data().len(), size * size);
                prop_assert_eq!(field.rows().count(), size);
            }
        }
    }
}
