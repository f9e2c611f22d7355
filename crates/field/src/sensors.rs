//! Sparse point observations of the plume.
//!
//! A [`SensorSampler`] places `count` sensors with either a uniform or a
//! center-biased spatial policy and reads the closed-form field at each
//! continuous position, plus independent noise. Readings never come from
//! grid lookups, so they stay consistent with the analytic model at any
//! resolution.

use glam::DVec2;
use plume_core::{Grid, RandomSource, SamplingMode, SimConfig};
use serde::Serialize;

use crate::FieldModel;

/// One noisy observation of concentration and flow at a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sensor {
    pub position: DVec2,
    pub concentration: f64,
    pub flow: DVec2,
}

/// Placement policy and noise widths for a sensor set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSampler {
    count: usize,
    mode: SamplingMode,
    radius_primary: f64,
    radius_secondary: f64,
    noise_uniform: f64,
    noise_biased: f64,
    flow_noise: f64,
}

impl SensorSampler {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            count: config.sensor_count,
            mode: config.sampling,
            radius_primary: config.bias_radius_primary,
            radius_secondary: config.bias_radius_secondary,
            noise_uniform: config.sensor_noise_uniform,
            noise_biased: config.sensor_noise_biased,
            flow_noise: config.sensor_flow_noise,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn with_mode(self, mode: SamplingMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_count(self, count: usize) -> Self {
        Self { count, ..self }
    }

    /// Largest distance from the plume center a biased sensor can be drawn at.
    pub fn max_bias_radius(&self) -> f64 {
        self.radius_primary.abs() + self.radius_secondary.abs()
    }

    /// Concentration noise width for the active mode.
    ///
    /// Biased sensors sit where the plume is strong, so they use the tighter
    /// band; uniform sensors use the same band as the grid.
    pub fn concentration_noise(&self) -> f64 {
        match self.mode {
            SamplingMode::Uniform => self.noise_uniform,
            SamplingMode::CenterBiased => self.noise_biased,
        }
    }

    /// Draws the full sensor set.
    pub fn sample(
        &self,
        grid: &Grid,
        model: &FieldModel,
        rng: &mut impl RandomSource,
    ) -> Vec<Sensor> {
        let noise = self.concentration_noise();
        (0..self.count)
            .map(|_| {
                let position = self.draw_position(grid, model.center(), rng);
                let concentration = (model.concentration_at(position) + rng.jitter(noise)).max(0.0);
                let flow = model.flow_at(position)
                    + DVec2::new(rng.jitter(self.flow_noise), rng.jitter(self.flow_noise));
                Sensor {
                    position,
                    concentration,
                    flow,
                }
            })
            .collect()
    }

    fn draw_position(&self, grid: &Grid, center: DVec2, rng: &mut impl RandomSource) -> DVec2 {
        let p = match self.mode {
            SamplingMode::Uniform => {
                let extent = grid.extent();
                DVec2::new(rng.next_range(0.0, extent), rng.next_range(0.0, extent))
            }
            SamplingMode::CenterBiased => {
                let angle = rng.next_angle();
                let radius = (rng.next_f64() * self.radius_primary
                    + rng.next_f64() * self.radius_secondary)
                    .abs();
                center + DVec2::from_angle(angle) * radius
            }
        };
        if grid.contains(p) {
            p
        } else {
            grid.clamp(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plume_core::Xorshift64;

    fn setup(mode: SamplingMode) -> (Grid, FieldModel, SensorSampler) {
        let config = SimConfig {
            sampling: mode,
            ..SimConfig::default()
        };
        (
            Grid::new(config.grid_size).unwrap(),
            FieldModel::from_config(&config),
            SensorSampler::from_config(&config),
        )
    }

    fn median_distance(sensors: &[Sensor], center: DVec2) -> f64 {
        let mut d: Vec<f64> = sensors.iter().map(|s| s.position.distance(center)).collect();
        d.sort_by(f64::total_cmp);
        d[d.len() / 2]
    }

    #[test]
    fn sample_produces_requested_count() {
        let (grid, model, sampler) = setup(SamplingMode::CenterBiased);
        let sensors = sampler.sample(&grid, &model, &mut Xorshift64::new(3));
        assert_eq!(sensors.len(), 30);
        let sensors = sampler
            .with_count(7)
            .sample(&grid, &model, &mut Xorshift64::new(3));
        assert_eq!(sensors.len(), 7);
    }

    #[test]
    fn uniform_sensors_lie_in_half_open_domain() {
        let (grid, model, sampler) = setup(SamplingMode::Uniform);
        let sensors = sampler
            .with_count(2000)
            .sample(&grid, &model, &mut Xorshift64::new(11));
        for s in &sensors {
            assert!(grid.contains(s.position), "{:?} outside domain", s.position);
        }
    }

    #[test]
    fn biased_sensors_stay_within_combined_radius() {
        let (grid, model, sampler) = setup(SamplingMode::CenterBiased);
        let sensors = sampler
            .with_count(2000)
            .sample(&grid, &model, &mut Xorshift64::new(12));
        for s in &sensors {
            let d = s.position.distance(model.center());
            assert!(d < sampler.max_bias_radius() + 1e-9, "sensor at distance {d}");
            assert!(grid.contains(s.position));
        }
    }

    #[test]
    fn biased_sensors_cluster_nearer_center_than_uniform() {
        let (grid, model, biased) = setup(SamplingMode::CenterBiased);
        let uniform = biased.with_mode(SamplingMode::Uniform);
        let mut rng = Xorshift64::new(21);
        let b = biased.with_count(1000).sample(&grid, &model, &mut rng);
        let u = uniform.with_count(1000).sample(&grid, &model, &mut rng);
        let (mb, mu) = (
            median_distance(&b, model.center()),
            median_distance(&u, model.center()),
        );
        // r = r1*30 + r2*20 has median 25; uniform over 100x100 is ~40.
        assert!(mb < 30.0, "biased median distance {mb}");
        assert!(mu > 32.0, "uniform median distance {mu}");
    }

    #[test]
    fn biased_positions_are_clamped_when_radii_exceed_domain() {
        let config = SimConfig {
            grid_size: 20,
            center: DVec2::new(10.0, 10.0),
            bias_radius_primary: 40.0,
            ..SimConfig::default()
        };
        let grid = Grid::new(config.grid_size).unwrap();
        let model = FieldModel::from_config(&config);
        let sensors = SensorSampler::from_config(&config)
            .with_count(500)
            .sample(&grid, &model, &mut Xorshift64::new(8));
        assert!(sensors.iter().all(|s| grid.contains(s.position)));
    }

    #[test]
    fn readings_track_closed_form_within_noise() {
        for mode in [SamplingMode::Uniform, SamplingMode::CenterBiased] {
            let (grid, model, sampler) = setup(mode);
            let half = sampler.concentration_noise() / 2.0;
            let sensors = sampler
                .with_count(500)
                .sample(&grid, &model, &mut Xorshift64::new(4));
            for s in &sensors {
                let truth = model.concentration_at(s.position);
                assert!(s.concentration >= 0.0);
                assert!(
                    (s.concentration - truth).abs() <= half + 1e-12,
                    "{mode:?}: reading {} vs truth {truth}",
                    s.concentration
                );
                let flow_err = s.flow - model.flow_at(s.position);
                assert!(flow_err.x.abs() <= 0.025 + 1e-12);
                assert!(flow_err.y.abs() <= 0.025 + 1e-12);
            }
        }
    }

    #[test]
    fn biased_concentration_noise_is_tighter_than_uniform() {
        let (_, _, sampler) = setup(SamplingMode::CenterBiased);
        assert!(
            sampler.concentration_noise()
                < sampler.with_mode(SamplingMode::Uniform).concentration_noise()
        );
    }

    #[test]
    fn same_seed_same_sensors() {
        let (grid, model, sampler) = setup(SamplingMode::CenterBiased);
        let a = sampler.sample(&grid, &model, &mut Xorshift64::new(77));
        let b = sampler.sample(&grid, &model, &mut Xorshift64::new(77));
        assert_eq!(a, b);
    }

    #[test]
    fn sensor_serializes_position_as_pair() {
        let s = Sensor {
            position: DVec2::new(1.0, 2.0),
            concentration: 0.5,
            flow: DVec2::new(-0.1, 0.2),
        };
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["position"], serde_json::json!([1.0, 2.0]));
        assert_eq!(json["concentration"], 0.5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_sensor_is_in_bounds(
                seed: u64,
                size in 1_usize..=150,
                biased: bool,
            ) {
                let mode = if biased { SamplingMode::CenterBiased } else { SamplingMode::Uniform };
                let config = SimConfig {
                    grid_size: size,
                    center: DVec2::splat(size as f64 / 2.0),
                    sampling: mode,
                    ..SimConfig::default()
                };
                let grid = Grid::new(size).unwrap();
                let model = FieldModel::from_config(&config);
                let sensors = SensorSampler::from_config(&config)
                    .sample(&grid, &model, &mut Xorshift64::new(seed));
                for s in &sensors {
                    prop_assert!(grid.contains(s.position), "{:?} outside size {size}", s.position);
                }
            }
        }
    }
}
