#![deny(unsafe_code)]
//! Analytic plume field model.
//!
//! The plume is a single Gaussian of spread sigma centered on a source point;
//! the flow is a rigid rotation about the same point. Both are closed forms,
//! so a sensor at any continuous position reads exactly what the displayed
//! grid shows there, minus the grid's per-cell noise.

pub mod sensors;

use glam::DVec2;
use plume_core::{Field, FlowField, Grid, RandomSource, SimConfig, SimError};

pub use sensors::{Sensor, SensorSampler};

/// Noise-free plume concentration at `p`, in `(0, 1]` with the peak at `center`.
pub fn evaluate_concentration(p: DVec2, center: DVec2, sigma: f64) -> f64 {
    let d2 = p.distance_squared(center);
    (-d2 / (2.0 * sigma * sigma)).exp()
}

/// Noise-free rotational flow at `p`: `u = -(y - cy) / scale`, `v = (x - cx) / scale`.
pub fn evaluate_flow(p: DVec2, center: DVec2, scale: f64) -> DVec2 {
    (p - center).perp() / scale
}

/// Plume geometry plus the noise applied when materializing it on a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldModel {
    center: DVec2,
    sigma: f64,
    flow_scale: f64,
    concentration_noise: f64,
    flow_noise: f64,
}

impl FieldModel {
    pub fn new(
        center: DVec2,
        sigma: f64,
        flow_scale: f64,
        concentration_noise: f64,
        flow_noise: f64,
    ) -> Self {
        Self {
            center,
            sigma,
            flow_scale,
            concentration_noise,
            flow_noise,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            config.center,
            config.sigma,
            config.flow_scale,
            config.field_noise,
            config.flow_noise,
        )
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn flow_scale(&self) -> f64 {
        self.flow_scale
    }

    pub fn concentration_at(&self, p: DVec2) -> f64 {
        evaluate_concentration(p, self.center, self.sigma)
    }

    pub fn flow_at(&self, p: DVec2) -> DVec2 {
        evaluate_flow(p, self.center, self.flow_scale)
    }

    /// Materializes the noisy concentration and flow fields on `grid`.
    ///
    /// Each cell draws three noise values in order (concentration, u, v),
    /// cells visited with `j` fastest, so a seeded `rng` reproduces the
    /// fields exactly. Concentration is floored at zero after noise.
    pub fn generate(
        &self,
        grid: &Grid,
        rng: &mut impl RandomSource,
    ) -> Result<(Field, FlowField), SimError> {
        let n = grid.size() * grid.size();
        let mut concentration = Vec::with_capacity(n);
        let mut u = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);

        for (_, _, p) in grid.points() {
            let c = self.concentration_at(p) + rng.jitter(self.concentration_noise);
            let flow = self.flow_at(p);
            concentration.push(c.max(0.0));
            u.push(flow.x + rng.jitter(self.flow_noise));
            v.push(flow.y + rng.jitter(self.flow_noise));
        }

        let size = grid.size();
        Ok((
            Field::from_data(size, concentration)?,
            FlowField {
                u: Field::from_data(size, u)?,
                v: Field::from_data(size, v)?,
            },
        ))
    }
}
