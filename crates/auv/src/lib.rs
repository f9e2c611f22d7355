#![deny(unsafe_code)]
//! Vehicle state and the proportional stepping policy.
//!
//! Each step pulls the vehicle a fixed fraction of the way toward its target,
//! adds per-axis uniform noise, clamps the result onto the grid, charges the
//! configured energy cost, and reads the plume concentration at the new
//! position. Once energy reaches zero every further step is refused with
//! `SimError::NotOperational`, leaving the state untouched.

use std::ops::ControlFlow;

use glam::DVec2;
use plume_core::{EnergyPolicy, Grid, RandomSource, SimConfig, SimError};
use plume_field::FieldModel;
use serde::Serialize;

/// One vehicle's mutable state over a session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuvState {
    position: DVec2,
    energy: f64,
    time_step: u64,
    trajectory: Vec<DVec2>,
    energy_history: Vec<f64>,
    readings: Vec<f64>,
}

impl AuvState {
    /// A fresh vehicle at `position` with a full battery.
    pub fn new(position: DVec2, max_energy: f64) -> Self {
        Self {
            position,
            energy: max_energy,
            time_step: 0,
            trajectory: vec![position],
            energy_history: vec![max_energy],
            readings: Vec::new(),
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    /// Every position the vehicle has occupied, starting with the initial one.
    pub fn trajectory(&self) -> &[DVec2] {
        &self.trajectory
    }

    /// Energy after each step, starting with the initial charge.
    pub fn energy_history(&self) -> &[f64] {
        &self.energy_history
    }

    /// Concentration read at the end of each step.
    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    pub fn is_operational(&self) -> bool {
        self.energy > 0.0
    }

    /// Teleports the vehicle to `position`, which must already be validated.
    ///
    /// The move is recorded in the trajectory but costs no energy and does
    /// not advance time.
    pub fn relocate(&mut self, position: DVec2) {
        self.position = position;
        self.trajectory.push(position);
    }

    /// Serializable view of the full state.
    pub fn snapshot(&self) -> AuvSnapshot {
        AuvSnapshot {
            position: self.position,
            trajectory: self.trajectory.clone(),
            energy: self.energy,
            energy_history: self.energy_history.clone(),
            readings: self.readings.clone(),
            time_step: self.time_step,
            operational: self.is_operational(),
        }
    }
}

/// Owned copy of an [`AuvState`] for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuvSnapshot {
    pub position: DVec2,
    pub trajectory: Vec<DVec2>,
    pub energy: f64,
    pub energy_history: Vec<f64>,
    pub readings: Vec<f64>,
    pub time_step: u64,
    pub operational: bool,
}

/// Outcome of a single successful step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepResult {
    pub position: DVec2,
    pub energy: f64,
    pub time_step: u64,
    /// Noise-free plume concentration at the new position.
    pub concentration: f64,
    pub operational: bool,
    pub distance_to_target: f64,
    pub target_reached: bool,
}

/// Motion and energy rules shared by every step of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPolicy {
    target: DVec2,
    attraction_gain: f64,
    step_noise: f64,
    energy_policy: EnergyPolicy,
    target_radius: f64,
}

impl MotionPolicy {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            target: config.target,
            attraction_gain: config.attraction_gain,
            step_noise: config.step_noise,
            energy_policy: config.energy_policy,
            target_radius: config.target_radius,
        }
    }

    pub fn target(&self) -> DVec2 {
        self.target
    }

    pub fn energy_policy(&self) -> EnergyPolicy {
        self.energy_policy
    }

    /// Advances `state` by one step.
    ///
    /// Fails with `NotOperational` when the battery is empty; in that case
    /// neither `state` nor `rng` is touched.
    pub fn step(
        &self,
        state: &mut AuvState,
        grid: &Grid,
        model: &FieldModel,
        rng: &mut impl RandomSource,
    ) -> Result<StepResult, SimError> {
        if !state.is_operational() {
            return Err(SimError::NotOperational {
                energy: state.energy,
            });
        }

        let pull = (self.target - state.position) * self.attraction_gain;
        let noise = DVec2::new(rng.jitter(self.step_noise), rng.jitter(self.step_noise));
        let next = grid.clamp(state.position + pull + noise);
        let travelled = next.distance(state.position);

        state.energy = (state.energy - self.energy_policy.cost(travelled)).max(0.0);
        state.time_step += 1;
        state.position = next;
        state.trajectory.push(next);
        state.energy_history.push(state.energy);

        let concentration = model.concentration_at(next);
        state.readings.push(concentration);

        let distance_to_target = next.distance(self.target);
        let result = StepResult {
            position: next,
            energy: state.energy,
            time_step: state.time_step,
            concentration,
            operational: state.is_operational(),
            distance_to_target,
            target_reached: distance_to_target < self.target_radius,
        };
        log::debug!(
            "step {}: ({:.2}, {:.2}) c={:.4} energy={:.1}",
            result.time_step,
            next.x,
            next.y,
            concentration,
            result.energy
        );
        if !result.operational {
            log::warn!("vehicle energy depleted after {} steps", result.time_step);
        }
        Ok(result)
    }

    /// Applies up to `n` steps, stopping after the step that empties the battery.
    ///
    /// Returns the results produced so far; the vector is empty only when the
    /// vehicle was already depleted.
    pub fn run_steps(
        &self,
        state: &mut AuvState,
        grid: &Grid,
        model: &FieldModel,
        rng: &mut impl RandomSource,
        n: usize,
    ) -> Vec<StepResult> {
        self.run_steps_with(state, grid, model, rng, n, |_| ControlFlow::Continue(()))
    }

    /// Like [`run_steps`](Self::run_steps), but consults `observer` after every
    /// step; returning `ControlFlow::Break` ends the batch early.
    pub fn run_steps_with(
        &self,
        state: &mut AuvState,
        grid: &Grid,
        model: &FieldModel,
        rng: &mut impl RandomSource,
        n: usize,
        mut observer: impl FnMut(&StepResult) -> ControlFlow<()>,
    ) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            let Ok(result) = self.step(state, grid, model, rng) else {
                break;
            };
            results.push(result);
            if !result.operational || observer(&result).is_break() {
                break;
            }
        }
        results
    }
}
