#![deny(unsafe_code)]
//! Session-owning simulation engine.
//!
//! [`SimulationEngine`] holds at most one session: a grid, the noisy
//! concentration and flow fields materialized on it, a fixed set of sensor
//! readings, and one vehicle. Starting a new session replaces the previous
//! one wholesale. Every random draw of a session comes from a single
//! [`Xorshift64`] stream in a fixed order (fields, then sensors, then steps),
//! so a seeded config and start position reproduce the whole run.
//!
//! Hosts serving several clients keep one engine per client in a
//! [`SessionPool`](pool::SessionPool).

pub mod fit;
pub mod pool;

use std::ops::ControlFlow;

use glam::DVec2;
use plume_auv::{AuvState, MotionPolicy};
use plume_core::{Field, FlowField, Grid, SimConfig, SimError, Xorshift64};
use plume_field::{FieldModel, SensorSampler};
use serde::Serialize;

pub use fit::{InverseDistanceFitter, Predictor, SampleFitter};
pub use plume_auv::{AuvSnapshot, StepResult};
pub use plume_field::Sensor;
pub use pool::SessionPool;

/// Everything owned by one running simulation.
#[derive(Debug)]
struct Session {
    config: SimConfig,
    seed: u64,
    grid: Grid,
    model: FieldModel,
    policy: MotionPolicy,
    concentration: Field,
    flow: FlowField,
    sensors: Vec<Sensor>,
    auv: AuvState,
    rng: Xorshift64,
}

/// Summary returned when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Seed the session's random stream was built from.
    pub seed: u64,
    pub grid_size: usize,
    pub plume_center: DVec2,
    pub sensor_count: usize,
    pub initial_position: DVec2,
    pub max_energy: f64,
    /// `None` when the energy policy depends on distance travelled.
    pub steps_until_depletion: Option<usize>,
}

/// Borrowed view of the session's grid and fields, ready to serialize.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSnapshot<'a> {
    pub grid: &'a Grid,
    pub center: DVec2,
    pub concentration: &'a Field,
    pub flow: &'a FlowField,
}

/// Owner of the active session.
#[derive(Debug, Default)]
pub struct SimulationEngine {
    session: Option<Session>,
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fresh session and makes it the active one.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` fails validation, `InvalidPosition` if
    /// `initial` lies outside `[0, N)²`. On error any previous session is
    /// left in place.
    pub fn start_session(
        &mut self,
        initial: DVec2,
        config: SimConfig,
    ) -> Result<SessionSummary, SimError> {
        config.validate()?;
        let grid = Grid::new(config.grid_size)?;
        let initial = grid.check(initial)?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = Xorshift64::new(seed);
        let model = FieldModel::from_config(&config);
        let (concentration, flow) = model.generate(&grid, &mut rng)?;
        let sensors = SensorSampler::from_config(&config).sample(&grid, &model, &mut rng);

        let summary = SessionSummary {
            seed,
            grid_size: grid.size(),
            plume_center: model.center(),
            sensor_count: sensors.len(),
            initial_position: initial,
            max_energy: config.max_energy,
            steps_until_depletion: config.steps_until_depletion(),
        };
        log::info!(
            "session started: seed {seed}, {}x{} grid, {} {} sensors, vehicle at ({:.2}, {:.2})",
            grid.size(),
            grid.size(),
            sensors.len(),
            config.sampling.name(),
            initial.x,
            initial.y
        );

        self.session = Some(Session {
            policy: MotionPolicy::from_config(&config),
            auv: AuvState::new(initial, config.max_energy),
            config,
            seed,
            grid,
            model,
            concentration,
            flow,
            sensors,
            rng,
        });
        Ok(summary)
    }

    fn session(&self) -> Result<&Session, SimError> {
        self.session.as_ref().ok_or(SimError::NoActiveSession)
    }

    fn session_mut(&mut self) -> Result<&mut Session, SimError> {
        self.session.as_mut().ok_or(SimError::NoActiveSession)
    }

    /// Advances the vehicle by one step.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        let s = self.session_mut()?;
        s.policy.step(&mut s.auv, &s.grid, &s.model, &mut s.rng)
    }

    /// Runs up to `n` steps, stopping early once the battery empties.
    ///
    /// A vehicle that is already depleted yields an empty batch.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `n == 0`, `NoActiveSession` without a session.
    pub fn run_multiple_steps(&mut self, n: usize) -> Result<Vec<StepResult>, SimError> {
        self.run_steps_with(n, |_| ControlFlow::Continue(()))
    }

    /// Like [`run_multiple_steps`](Self::run_multiple_steps), but lets
    /// `observer` stop the batch between steps.
    pub fn run_steps_with(
        &mut self,
        n: usize,
        observer: impl FnMut(&StepResult) -> ControlFlow<()>,
    ) -> Result<Vec<StepResult>, SimError> {
        let s = self.session_mut()?;
        if n == 0 {
            return Err(SimError::InvalidArgument(
                "step count must be at least 1".into(),
            ));
        }
        Ok(s
            .policy
            .run_steps_with(&mut s.auv, &s.grid, &s.model, &mut s.rng, n, observer))
    }

    pub fn field_snapshot(&self) -> Result<FieldSnapshot<'_>, SimError> {
        let s = self.session()?;
        Ok(FieldSnapshot {
            grid: &s.grid,
            center: s.model.center(),
            concentration: &s.concentration,
            flow: &s.flow,
        })
    }

    pub fn sensors(&self) -> Result<&[Sensor], SimError> {
        Ok(&self.session()?.sensors)
    }

    pub fn state(&self) -> Result<AuvSnapshot, SimError> {
        Ok(self.session()?.auv.snapshot())
    }

    /// Moves the vehicle to `p` without spending energy or time.
    pub fn relocate(&mut self, p: DVec2) -> Result<DVec2, SimError> {
        let s = self.session_mut()?;
        let p = s.grid.check(p)?;
        s.auv.relocate(p);
        log::debug!("vehicle relocated to ({:.2}, {:.2})", p.x, p.y);
        Ok(p)
    }

    /// Fits `fitter` to the session's sensor readings.
    pub fn fit_sensors<F: SampleFitter>(&self, fitter: &F) -> Result<F::Model, SimError> {
        fitter.fit(self.sensors()?)
    }

    /// Config of the active session.
    pub fn config(&self) -> Result<&SimConfig, SimError> {
        Ok(&self.session()?.config)
    }

    pub fn seed(&self) -> Result<u64, SimError> {
        Ok(self.session()?.seed)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Discards the active session, if any.
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            log::info!("session reset");
        }
    }
}
