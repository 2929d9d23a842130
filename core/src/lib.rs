//! Lateral vehicle dynamics for driving assistance control
//!
//! This crate provides a linearized bicycle model that converts between steering input and the
//! resulting lateral motion of a vehicle (lateral speed, yaw rate and path curvature), and a
//! curvature estimator that fuses the geometry of a predicted path with a 3-degree-of-freedom
//! version of the same model. It is meant to be called from a fixed-rate control loop: every
//! query is a bounded, deterministic computation on small fixed-size matrices.
//!
//! The dynamic model follows _The Science of Vehicle Dynamics_ (2014) by M. Guiggiani. Variables
//! are named for the quantity they represent (e.g. `tire_stiffness_front` rather than `cF`); within
//! function bodies the book's symbols are used where that keeps the equations readable.
//!
//! This crate is primarily built off of [`nalgebra`](https://crates.io/crates/nalgebra) for the
//! state-space matrices and linear solves. Parameter files are read with `serde`.
//!
//! ## Crate overview
//!
//! - [params]: The immutable vehicle parameter record and its configuration file formats.
//! - [model]: [`VehicleModel`], the recalibratable parameter store with the forward and inverse
//!   curvature, yaw rate and steady state queries.
//! - [dynamics]: The 2-state and 3-state continuous-time state-space matrices and the dynamic
//!   and kinematic steady state solutions.
//! - [fusion]: Predicted path container and the segment-wise curvature fusion estimator.
//! - [error]: The crate error type.
//!
//! ## Coordinate and state definitions
//!
//! The 2-state model uses
//!
//! $$
//! x = [v, r], \quad w = [\delta, \phi]
//! $$
//!
//! with lateral speed $v$ (m/s), yaw rate $r$ (rad/s), steering wheel angle $\delta$ (rad) and
//! road roll $\phi$ (rad). The 3-state model adds the longitudinal speed $u$ (m/s),
//!
//! $$
//! x = [u, v, r], \quad w = [\delta, a_x]
//! $$
//!
//! driven by the measured longitudinal acceleration $a_x$ (m/s²).
//!
//! ## Example
//!
//! ```rust
//! use vehicle_model::{VehicleModel, VehicleParameters};
//!
//! let params = VehicleParameters {
//!     mass: 1500.0,
//!     rotational_inertia: 2500.0,
//!     wheelbase: 2.7,
//!     center_to_front: 1.35,
//!     steer_ratio_rear: 0.0,
//!     tire_stiffness_front: 80000.0,
//!     tire_stiffness_rear: 80000.0,
//!     steer_ratio: 15.0,
//! };
//! let mut model = VehicleModel::new(&params);
//! model.recalibrate(1.0, 15.0);
//! let steer = model.steer_from_curvature(0.01, 20.0, 0.0);
//! assert!((model.curvature(steer, 20.0, 0.0) - 0.01).abs() < 1e-9);
//! ```

pub mod dynamics;
pub mod error;
pub mod fusion;
pub mod model;
pub mod params;

pub use error::ModelError;
pub use fusion::{PathSample, PredictedPath};
pub use model::{ActiveParameters, VehicleModel};
pub use params::VehicleParameters;

/// Gravitational acceleration used for the roll input, m/s²
pub const ACCELERATION_DUE_TO_GRAVITY: f64 = 9.8;
/// Speed in m/s at or below which the kinematic model replaces the dynamic one
pub const KINEMATIC_SPEED_THRESHOLD: f64 = 0.1;
/// Number of path samples per curvature fusion segment
pub const SEGMENT_LENGTH_3DOF: usize = 5;
/// Weight of the path-vs-model deviation in the fused curvature
pub const CURVATURE_CORRECTION_ALPHA_3DOF: f64 = 0.5;
/// Default averaging horizon of the fused curvature, s
pub const DEFAULT_TIME_HORIZON: f64 = 2.0;
