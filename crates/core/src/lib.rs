#![deny(unsafe_code)]
//! Core types for the plume-tracking simulation.
//!
//! Provides the [`Grid`]/[`Field`] data model, [`SimConfig`] with its
//! [`SamplingMode`] and [`EnergyPolicy`], the [`SimError`] type, the
//! [`RandomSource`] trait with the [`Xorshift64`] PRNG, and JSON param helpers.

pub mod config;
pub mod error;
pub mod grid;
pub mod params;
pub mod prng;

pub use config::{EnergyPolicy, SamplingMode, SimConfig, MAX_GRID_SIZE};
pub use error::SimError;
pub use grid::{Field, FlowField, Grid};
pub use prng::{RandomSource, Xorshift64};
