//! Reproducible configuration for a simulation session.
//!
//! A [`SimConfig`] captures every constant that shapes a session: grid size,
//! plume geometry, noise widths, sensor policy, vehicle motion and energy
//! accounting, and the optional PRNG seed. Two sessions started from equal
//! configs with the same seed and start position evolve identically.
//!
//! All noise parameters are *widths*: a width `w` means uniform noise drawn
//! from `[-w/2, w/2)`.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::SimError;
use crate::params::{param_f64, param_opt_u64, param_string, param_usize, param_vec2};

const DEFAULT_GRID_SIZE: usize = 100;
const DEFAULT_CENTER: DVec2 = DVec2::new(50.0, 50.0);
const DEFAULT_SIGMA: f64 = 8.0;
const DEFAULT_FIELD_NOISE: f64 = 0.03;
const DEFAULT_FLOW_NOISE: f64 = 0.05;
const DEFAULT_FLOW_SCALE: f64 = 50.0;
const DEFAULT_SENSOR_COUNT: usize = 30;
const DEFAULT_BIAS_RADIUS_PRIMARY: f64 = 30.0;
const DEFAULT_BIAS_RADIUS_SECONDARY: f64 = 20.0;
const DEFAULT_SENSOR_NOISE_UNIFORM: f64 = 0.03;
const DEFAULT_SENSOR_NOISE_BIASED: f64 = 0.01;
const DEFAULT_SENSOR_FLOW_NOISE: f64 = 0.05;
const DEFAULT_ATTRACTION_GAIN: f64 = 0.2;
const DEFAULT_STEP_NOISE: f64 = 1.5;
const DEFAULT_MAX_ENERGY: f64 = 100.0;
const DEFAULT_STEP_COST: f64 = 5.0;
const DEFAULT_DISTANCE_BASE: f64 = 1.0;
const DEFAULT_DISTANCE_PER_UNIT: f64 = 0.5;
const DEFAULT_SPEED_BASE: f64 = 1.0;
const DEFAULT_SPEED_QUADRATIC: f64 = 0.1;
/// Largest accepted grid; bigger ones would allocate billions of cells.
pub const MAX_GRID_SIZE: usize = 4096;
const DEFAULT_TARGET_RADIUS: f64 = 15.0;

/// Spatial policy used to place sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingMode {
    /// Positions uniform over the whole domain.
    Uniform,
    /// Polar placement around the plume center, denser near the middle.
    CenterBiased,
}

impl SamplingMode {
    pub fn name(self) -> &'static str {
        match self {
            SamplingMode::Uniform => "uniform",
            SamplingMode::CenterBiased => "center-biased",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "uniform" => Some(SamplingMode::Uniform),
            "center-biased" | "center_biased" | "biased" => Some(SamplingMode::CenterBiased),
            _ => None,
        }
    }
}

/// How much energy one step costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnergyPolicy {
    /// The same cost every step, regardless of how far the vehicle moved.
    Flat { cost: f64 },
    /// `base + per_unit * distance` for the distance actually travelled.
    Distance { base: f64, per_unit: f64 },
    /// `base + quadratic * distance²`: drag grows with the square of speed.
    Speed { base: f64, quadratic: f64 },
}

impl EnergyPolicy {
    /// Energy consumed by a step that moved the vehicle `distance` units.
    pub fn cost(&self, distance: f64) -> f64 {
        match *self {
            EnergyPolicy::Flat { cost } => cost,
            EnergyPolicy::Distance { base, per_unit } => base + per_unit * distance,
            EnergyPolicy::Speed { base, quadratic } => base + quadratic * distance * distance,
        }
    }
}

impl Default for EnergyPolicy {
    fn default() -> Self {
        EnergyPolicy::Flat {
            cost: DEFAULT_STEP_COST,
        }
    }
}

/// Every tunable constant of a session.
///
/// Use [`Default`] for the canonical parameter set: a 100×100 grid, a plume of
/// sigma 8 centered at (50, 50), 30 center-biased sensors, and a vehicle with
/// 100 energy paying 5 per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Lattice points per axis; the domain is `[0, grid_size)`.
    pub grid_size: usize,
    /// Plume source position.
    pub center: DVec2,
    /// Gaussian spread of the plume.
    pub sigma: f64,
    /// Width of the per-cell concentration noise.
    pub field_noise: f64,
    /// Width of the per-cell flow noise, per component.
    pub flow_noise: f64,
    /// Distance over which the rotational flow reaches unit speed.
    pub flow_scale: f64,
    pub sensor_count: usize,
    pub sampling: SamplingMode,
    /// `R1` in the center-biased radius `|r1·R1 + r2·R2|`.
    pub bias_radius_primary: f64,
    /// `R2` in the center-biased radius.
    pub bias_radius_secondary: f64,
    /// Concentration noise width for uniformly placed sensors.
    pub sensor_noise_uniform: f64,
    /// Concentration noise width for center-biased sensors.
    pub sensor_noise_biased: f64,
    pub sensor_flow_noise: f64,
    /// Point the vehicle is attracted to.
    pub target: DVec2,
    /// Fraction of the remaining offset to the target covered per step.
    pub attraction_gain: f64,
    /// Width of the per-axis positional noise added to each step.
    pub step_noise: f64,
    pub max_energy: f64,
    pub energy_policy: EnergyPolicy,
    /// Distance to the target under which a step counts as having reached it.
    pub target_radius: f64,
    /// PRNG seed; `None` draws one from process entropy at session start.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            center: DEFAULT_CENTER,
            sigma: DEFAULT_SIGMA,
            field_noise: DEFAULT_FIELD_NOISE,
            flow_noise: DEFAULT_FLOW_NOISE,
            flow_scale: DEFAULT_FLOW_SCALE,
            sensor_count: DEFAULT_SENSOR_COUNT,
            sampling: SamplingMode::CenterBiased,
            bias_radius_primary: DEFAULT_BIAS_RADIUS_PRIMARY,
            bias_radius_secondary: DEFAULT_BIAS_RADIUS_SECONDARY,
            sensor_noise_uniform: DEFAULT_SENSOR_NOISE_UNIFORM,
            sensor_noise_biased: DEFAULT_SENSOR_NOISE_BIASED,
            sensor_flow_noise: DEFAULT_SENSOR_FLOW_NOISE,
            target: DEFAULT_CENTER,
            attraction_gain: DEFAULT_ATTRACTION_GAIN,
            step_noise: DEFAULT_STEP_NOISE,
            max_energy: DEFAULT_MAX_ENERGY,
            energy_policy: EnergyPolicy::default(),
            target_radius: DEFAULT_TARGET_RADIUS,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Default config with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Reads a config from a JSON object, falling back to defaults per key.
    ///
    /// Accepts both the shape produced by serializing a `SimConfig` and a
    /// flat shorthand: `"energy_policy": "flat" | "distance" | "speed"`
    /// combined with `step_cost`, `distance_base`, `distance_per_unit`,
    /// `speed_base` and `speed_quadratic`. When `target`
    /// is absent it follows `center`.
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        let center = param_vec2(params, "center", d.center);
        let sampling_name = param_string(params, "sampling", d.sampling.name());
        Self {
            grid_size: param_usize(params, "grid_size", d.grid_size),
            center,
            sigma: param_f64(params, "sigma", d.sigma),
            field_noise: param_f64(params, "field_noise", d.field_noise),
            flow_noise: param_f64(params, "flow_noise", d.flow_noise),
            flow_scale: param_f64(params, "flow_scale", d.flow_scale),
            sensor_count: param_usize(params, "sensor_count", d.sensor_count),
            sampling: SamplingMode::from_name(&sampling_name).unwrap_or(d.sampling),
            bias_radius_primary: param_f64(params, "bias_radius_primary", d.bias_radius_primary),
            bias_radius_secondary: param_f64(
                params,
                "bias_radius_secondary",
                d.bias_radius_secondary,
            ),
            sensor_noise_uniform: param_f64(
                params,
                "sensor_noise_uniform",
                d.sensor_noise_uniform,
            ),
            sensor_noise_biased: param_f64(params, "sensor_noise_biased", d.sensor_noise_biased),
            sensor_flow_noise: param_f64(params, "sensor_flow_noise", d.sensor_flow_noise),
            target: param_vec2(params, "target", center),
            attraction_gain: param_f64(params, "attraction_gain", d.attraction_gain),
            step_noise: param_f64(params, "step_noise", d.step_noise),
            max_energy: param_f64(params, "max_energy", d.max_energy),
            energy_policy: energy_policy_from_json(params),
            target_radius: param_f64(params, "target_radius", d.target_radius),
            seed: param_opt_u64(params, "seed", d.seed),
        }
    }

    /// The config as a JSON object in the shape [`from_json`](Self::from_json) reads back.
    pub fn to_json(&self) -> Value {
        let energy_policy = match self.energy_policy {
            EnergyPolicy::Flat { cost } => json!({"kind": "flat", "cost": cost}),
            EnergyPolicy::Distance { base, per_unit } => {
                json!({"kind": "distance", "base": base, "per_unit": per_unit})
            }
            EnergyPolicy::Speed { base, quadratic } => {
                json!({"kind": "speed", "base": base, "quadratic": quadratic})
            }
        };
        json!({
            "grid_size": self.grid_size,
            "center": [self.center.x, self.center.y],
            "sigma": self.sigma,
            "field_noise": self.field_noise,
            "flow_noise": self.flow_noise,
            "flow_scale": self.flow_scale,
            "sensor_count": self.sensor_count,
            "sampling": self.sampling.name(),
            "bias_radius_primary": self.bias_radius_primary,
            "bias_radius_secondary": self.bias_radius_secondary,
            "sensor_noise_uniform": self.sensor_noise_uniform,
            "sensor_noise_biased": self.sensor_noise_biased,
            "sensor_flow_noise": self.sensor_flow_noise,
            "target": [self.target.x, self.target.y],
            "attraction_gain": self.attraction_gain,
            "step_noise": self.step_noise,
            "max_energy": self.max_energy,
            "energy_policy": energy_policy,
            "target_radius": self.target_radius,
            "seed": self.seed,
        })
    }

    /// Checks every value for range and finiteness.
    ///
    /// Returns `SimError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.grid_size == 0 {
            return Err(SimError::config("grid_size", "must be non-zero"));
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(SimError::config(
                "grid_size",
                format!("must be at most {MAX_GRID_SIZE}, got {}", self.grid_size),
            ));
        }
        if !self.center.is_finite() {
            return Err(SimError::config("center", "must be finite"));
        }
        if !self.target.is_finite() {
            return Err(SimError::config("target", "must be finite"));
        }
        positive("sigma", self.sigma)?;
        positive("flow_scale", self.flow_scale)?;
        positive("max_energy", self.max_energy)?;
        if self.sensor_count == 0 {
            return Err(SimError::config("sensor_count", "must be non-zero"));
        }
        for (name, value) in [
            ("field_noise", self.field_noise),
            ("flow_noise", self.flow_noise),
            ("bias_radius_primary", self.bias_radius_primary),
            ("bias_radius_secondary", self.bias_radius_secondary),
            ("sensor_noise_uniform", self.sensor_noise_uniform),
            ("sensor_noise_biased", self.sensor_noise_biased),
            ("sensor_flow_noise", self.sensor_flow_noise),
            ("attraction_gain", self.attraction_gain),
            ("step_noise", self.step_noise),
            ("target_radius", self.target_radius),
        ] {
            non_negative(name, value)?;
        }
        match self.energy_policy {
            EnergyPolicy::Flat { cost } => positive("energy_policy.cost", cost)?,
            EnergyPolicy::Distance { base, per_unit } => {
                positive("energy_policy.base", base)?;
                non_negative("energy_policy.per_unit", per_unit)?;
            }
            EnergyPolicy::Speed { base, quadratic } => {
                positive("energy_policy.base", base)?;
                non_negative("energy_policy.quadratic", quadratic)?;
            }
        }
        Ok(())
    }

    /// Number of steps a full battery lasts under a flat policy.
    ///
    /// Returns `None` for distance-scaled policies, whose step count depends
    /// on the path taken.
    pub fn steps_until_depletion(&self) -> Option<usize> {
        match self.energy_policy {
            EnergyPolicy::Flat { cost } if cost > 0.0 => {
                Some((self.max_energy / cost).ceil() as usize)
            }
            _ => None,
        }
    }
}

fn energy_policy_from_json(params: &Value) -> EnergyPolicy {
    match params.get("energy_policy") {
        Some(v @ Value::Object(_)) => {
            serde_json::from_value(v.clone()).unwrap_or_default()
        }
        Some(Value::String(kind)) if kind == "speed" => EnergyPolicy::Speed {
            base: param_f64(params, "speed_base", DEFAULT_SPEED_BASE),
            quadratic: param_f64(params, "speed_quadratic", DEFAULT_SPEED_QUADRATIC),
        },
        Some(Value::String(kind)) if kind == "distance" => EnergyPolicy::Distance {
            base: param_f64(params, "distance_base", DEFAULT_DISTANCE_BASE),
            per_unit: param_f64(params, "distance_per_unit", DEFAULT_DISTANCE_PER_UNIT),
        },
        _ => EnergyPolicy::Flat {
            cost: param_f64(params, "step_cost", DEFAULT_STEP_COST),
        },
    }
}

fn positive(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(name, format!("must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::config(name, format!("must be non-negative, got {value}")))
    }
}
