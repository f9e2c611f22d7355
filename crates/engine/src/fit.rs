//! Fitting a concentration model to sensor readings.
//!
//! Learned surrogates live outside this crate and plug in through
//! [`SampleFitter`]. [`InverseDistanceFitter`] is the built-in baseline.

use glam::DVec2;
use plume_core::SimError;
use plume_field::Sensor;

/// Fewest readings any fitter accepts.
pub const MIN_SAMPLES: usize = 3;

/// A fitted model that predicts concentration at arbitrary points.
pub trait Predictor {
    fn predict(&self, p: DVec2) -> f64;
}

/// Builds a [`Predictor`] from a set of sensor readings.
pub trait SampleFitter {
    type Model: Predictor;

    /// Fails with `SimError::InvalidArgument` when given fewer than
    /// [`MIN_SAMPLES`] readings.
    fn fit(&self, samples: &[Sensor]) -> Result<Self::Model, SimError>;
}

/// Inverse-distance weighting: `z(p) = Σ wᵢ zᵢ / Σ wᵢ` with `wᵢ = 1 / dᵢ^power`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseDistanceFitter {
    power: f64,
    max_neighbors: Option<usize>,
}

impl Default for InverseDistanceFitter {
    fn default() -> Self {
        Self {
            power: 2.0,
            max_neighbors: None,
        }
    }
}

impl InverseDistanceFitter {
    pub fn with_power(self, power: f64) -> Self {
        Self { power, ..self }
    }

    /// Restricts each prediction to the `n` nearest readings.
    pub fn with_max_neighbors(self, n: usize) -> Self {
        Self {
            max_neighbors: Some(n),
            ..self
        }
    }
}

impl SampleFitter for InverseDistanceFitter {
    type Model = InverseDistanceModel;

    fn fit(&self, samples: &[Sensor]) -> Result<Self::Model, SimError> {
        if samples.len() < MIN_SAMPLES {
            return Err(SimError::InvalidArgument(format!(
                "need at least {MIN_SAMPLES} samples to fit, got {}",
                samples.len()
            )));
        }
        if !(self.power.is_finite() && self.power > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "power must be positive, got {}",
                self.power
            )));
        }
        if self.max_neighbors == Some(0) {
            return Err(SimError::InvalidArgument(
                "max_neighbors must be non-zero".into(),
            ));
        }
        Ok(InverseDistanceModel {
            samples: samples
                .iter()
                .map(|s| (s.position, s.concentration))
                .collect(),
            power: self.power,
            max_neighbors: self.max_neighbors,
        })
    }
}

/// Readings captured by [`InverseDistanceFitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct InverseDistanceModel {
    samples: Vec<(DVec2, f64)>,
    power: f64,
    max_neighbors: Option<usize>,
}

impl InverseDistanceModel {
    const COINCIDENT: f64 = 1e-10;

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Predictor for InverseDistanceModel {
    fn predict(&self, p: DVec2) -> f64 {
        let mut near: Vec<(f64, f64)> = self
            .samples
            .iter()
            .map(|&(q, z)| (q.distance(p), z))
            .collect();

        if let Some(&(_, z)) = near.iter().find(|(d, _)| *d < Self::COINCIDENT) {
            return z;
        }
        if let Some(n) = self.max_neighbors {
            near.sort_by(|a, b| a.0.total_cmp(&b.0));
            near.truncate(n);
        }

        let (weighted, total) = near.iter().fold((0.0, 0.0), |(ws, w), &(d, z)| {
            let weight = d.powf(self.power).recip();
            (ws + weight * z, w + weight)
        });
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }
}
