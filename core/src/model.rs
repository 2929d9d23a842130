//! Vehicle model: parameter store and curvature/yaw-rate mappings
//!
//! [`VehicleModel`] is constructed once from a [`VehicleParameters`] record and then recalibrated
//! as the estimated tire stiffness and steering ratio change. Geometry and mass properties are
//! fixed for the lifetime of the model; the tire stiffness and steering ratio are held as a single
//! [`ActiveParameters`] snapshot that [`VehicleModel::recalibrate`] replaces in one assignment.
//! Recalibration requires `&mut self`, so a query can never observe a partially updated set.
//! Callers sharing one model across threads wrap it in `Arc<RwLock<VehicleModel>>`.
//!
//! # Steady state curvature
//!
//! With slip factor $K$ the steady state curvature produced by a steering wheel angle $\delta$ at
//! speed $u$ on a road with roll $\phi$ is
//!
//! $$
//! \kappa = \frac{1 - \chi}{l (1 - K u^2)} \frac{\delta}{s_R} + \frac{g \phi}{1/K - u^2}
//! $$
//!
//! The first factor is the [curvature factor](VehicleModel::curvature_factor) and the second term the
//! [roll compensation](VehicleModel::roll_compensation). Both denominators can vanish at a critical
//! speed for an oversteering vehicle; this is not guarded and produces infinite results.

use crate::dynamics;
use crate::error::ModelError;
use crate::params::VehicleParameters;
use crate::{ACCELERATION_DUE_TO_GRAVITY, KINEMATIC_SPEED_THRESHOLD};
use log::debug;
use nalgebra::Vector2;
use std::fmt::{self, Display};

/// Below this magnitude the slip factor is treated as zero and no roll compensation is applied.
const SLIP_FACTOR_EPSILON: f64 = 1e-6;

/// Tire stiffness and steering ratio currently in effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveParameters {
    /// Multiplier applied to the baseline tire stiffness
    pub stiffness_factor: f64,
    /// Front axle cornering stiffness in N/rad
    pub tire_stiffness_front: f64,
    /// Rear axle cornering stiffness in N/rad
    pub tire_stiffness_rear: f64,
    /// Steering wheel angle to front wheel angle ratio
    pub steer_ratio: f64,
}

impl ActiveParameters {
    /// Baseline front and rear stiffness scaled by `stiffness_factor`
    fn scaled(stiffness_factor: f64, steer_ratio: f64, front: f64, rear: f64) -> ActiveParameters {
        ActiveParameters {
            stiffness_factor,
            tire_stiffness_front: stiffness_factor * front,
            tire_stiffness_rear: stiffness_factor * rear,
            steer_ratio,
        }
    }
}

/// Linearized bicycle model of the vehicle's lateral dynamics.
#[derive(Clone, Copy, Debug)]
pub struct VehicleModel {
    mass: f64,
    rotational_inertia: f64,
    wheelbase: f64,
    center_to_front: f64,
    center_to_rear: f64,
    steer_ratio_rear: f64,
    tire_stiffness_front_baseline: f64,
    tire_stiffness_rear_baseline: f64,
    active: ActiveParameters,
}

impl Display for VehicleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VehicleModel {{ m: {:.1} kg, l: {:.3} m, aF: {:.3} m, aR: {:.3} m, cF: {:.1} N/rad, cR: {:.1} N/rad, sR: {:.2}, slip factor: {:.3e} }}",
            self.mass,
            self.wheelbase,
            self.center_to_front,
            self.center_to_rear,
            self.active.tire_stiffness_front,
            self.active.tire_stiffness_rear,
            self.active.steer_ratio,
            self.slip_factor()
        )
    }
}

impl VehicleModel {
    /// Create a new model from the vehicle parameters, with unit stiffness factor and the
    /// nominal steering ratio.
    pub fn new(params: &VehicleParameters) -> VehicleModel {
        VehicleModel {
            mass: params.mass,
            rotational_inertia: params.rotational_inertia,
            wheelbase: params.wheelbase,
            center_to_front: params.center_to_front,
            center_to_rear: params.center_to_rear(),
            steer_ratio_rear: params.steer_ratio_rear,
            tire_stiffness_front_baseline: params.tire_stiffness_front,
            tire_stiffness_rear_baseline: params.tire_stiffness_rear,
            active: ActiveParameters::scaled(
                1.0,
                params.steer_ratio,
                params.tire_stiffness_front,
                params.tire_stiffness_rear,
            ),
        }
    }
    /// Update the model with a new stiffness factor and steering ratio.
    ///
    /// No validation is performed. A zero or negative value is accepted and yields degenerate
    /// results downstream.
    ///
    /// # Arguments
    /// * `stiffness_factor` - Multiplier on the baseline front and rear tire stiffness.
    /// * `steer_ratio` - Steering wheel angle to front wheel angle ratio.
    pub fn recalibrate(&mut self, stiffness_factor: f64, steer_ratio: f64) {
        self.active = ActiveParameters::scaled(
            stiffness_factor,
            steer_ratio,
            self.tire_stiffness_front_baseline,
            self.tire_stiffness_rear_baseline,
        );
        debug!(
            "Recalibrated vehicle model: stiffness factor {:.4}, steer ratio {:.4}",
            stiffness_factor, steer_ratio
        );
    }
    /// Snapshot of the tire stiffness and steering ratio currently in effect
    pub fn active_parameters(&self) -> ActiveParameters {
        self.active
    }
    pub fn mass(&self) -> f64 {
        self.mass
    }
    pub fn rotational_inertia(&self) -> f64 {
        self.rotational_inertia
    }
    pub fn wheelbase(&self) -> f64 {
        self.wheelbase
    }
    pub fn center_to_front(&self) -> f64 {
        self.center_to_front
    }
    pub fn center_to_rear(&self) -> f64 {
        self.center_to_rear
    }
    pub fn steer_ratio_rear(&self) -> f64 {
        self.steer_ratio_rear
    }
    pub fn tire_stiffness_front(&self) -> f64 {
        self.active.tire_stiffness_front
    }
    pub fn tire_stiffness_rear(&self) -> f64 {
        self.active.tire_stiffness_rear
    }
    pub fn steer_ratio(&self) -> f64 {
        self.active.steer_ratio
    }
    pub fn stiffness_factor(&self) -> f64 {
        self.active.stiffness_factor
    }
    /// Returns the steady state solution (lateral speed, yaw rate).
    ///
    /// At or below [`KINEMATIC_SPEED_THRESHOLD`] the dynamic model is not usable (tire slip is
    /// undefined) and the kinematic model is used instead.
    ///
    /// # Arguments
    /// * `steering_angle` - Steering wheel angle in radians.
    /// * `speed` - Longitudinal speed in m/s.
    /// * `roll` - Road roll in radians.
    ///
    /// # Returns
    /// * `Ok([v, r])` lateral speed in m/s and yaw rate in rad/s.
    /// * `Err(ModelError::SingularSystem)` if the dynamic system matrix is singular.
    pub fn steady_state(
        &self,
        steering_angle: f64,
        speed: f64,
        roll: f64,
    ) -> Result<Vector2<f64>, ModelError> {
        if speed > KINEMATIC_SPEED_THRESHOLD {
            dynamics::dynamic_steady_state(steering_angle, speed, roll, self)
        } else {
            Ok(dynamics::kinematic_steady_state(steering_angle, speed, self))
        }
    }
    /// Slip factor of the vehicle with the active tire stiffness, see [`dynamics::slip_factor`].
    pub fn slip_factor(&self) -> f64 {
        dynamics::slip_factor(self)
    }
    /// Returns the curvature factor in 1/m.
    ///
    /// Multiplied by the front wheel angle (not the steering wheel angle) this gives the curvature.
    pub fn curvature_factor(&self, speed: f64) -> f64 {
        let sf = self.slip_factor();
        (1.0 - self.steer_ratio_rear) / (1.0 - sf * speed.powi(2)) / self.wheelbase
    }
    /// Curvature offset caused by driving on a rolled road, in 1/m.
    ///
    /// A vehicle with (effectively) zero slip factor needs no compensation.
    pub fn roll_compensation(&self, roll: f64, speed: f64) -> f64 {
        let sf = self.slip_factor();
        if sf.abs() < SLIP_FACTOR_EPSILON {
            0.0
        } else {
            (ACCELERATION_DUE_TO_GRAVITY * roll) / ((1.0 / sf) - speed.powi(2))
        }
    }
    /// Returns the steady state curvature in 1/m. Multiplied by the speed this gives the yaw rate.
    ///
    /// # Arguments
    /// * `steering_angle` - Steering wheel angle in radians.
    /// * `speed` - Longitudinal speed in m/s.
    /// * `roll` - Road roll in radians.
    pub fn curvature(&self, steering_angle: f64, speed: f64, roll: f64) -> f64 {
        self.curvature_factor(speed) * steering_angle / self.steer_ratio()
            + self.roll_compensation(roll, speed)
    }
    /// Steering wheel angle in radians required to drive the given curvature.
    ///
    /// Exact inverse of [`VehicleModel::curvature`].
    pub fn steer_from_curvature(&self, curvature: f64, speed: f64, roll: f64) -> f64 {
        (curvature - self.roll_compensation(roll, speed)) * self.steer_ratio()
            / self.curvature_factor(speed)
    }
    /// Steering wheel angle in radians required to reach the given yaw rate.
    ///
    /// The yaw rate is converted to a curvature by dividing by the speed, which is not guarded
    /// against zero.
    pub fn steer_from_yaw_rate(&self, yaw_rate: f64, speed: f64, roll: f64) -> f64 {
        let curvature = yaw_rate / speed;
        self.steer_from_curvature(curvature, speed, roll)
    }
    /// Steady state yaw rate in rad/s
    pub fn yaw_rate(&self, steering_angle: f64, speed: f64, roll: f64) -> f64 {
        self.curvature(steering_angle, speed, roll) * speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn balanced() -> VehicleParameters {
        VehicleParameters {
            mass: 1500.0,
            rotational_inertia: 2500.0,
            wheelbase: 2.7,
            center_to_front: 1.35,
            steer_ratio_rear: 0.0,
            tire_stiffness_front: 80000.0,
            tire_stiffness_rear: 80000.0,
            steer_ratio: 15.0,
        }
    }

    fn understeer() -> VehicleParameters {
        VehicleParameters {
            center_to_front: 1.2,
            tire_stiffness_front: 85000.0,
            tire_stiffness_rear: 90000.0,
            steer_ratio: 15.3,
            ..balanced()
        }
    }

    #[test]
    fn test_new_uses_nominal_parameters() {
        let model = VehicleModel::new(&understeer());
        assert_eq!(model.stiffness_factor(), 1.0);
        assert_eq!(model.tire_stiffness_front(), 85000.0);
        assert_eq!(model.tire_stiffness_rear(), 90000.0);
        assert_eq!(model.steer_ratio(), 15.3);
        assert_approx_eq!(model.center_to_rear(), 1.5, 1e-12);
    }
    #[test]
    fn test_new_matches_unit_recalibration() {
        let params = understeer();
        let fresh = VehicleModel::new(&params);
        let mut recalibrated = VehicleModel::new(&params);
        recalibrated.recalibrate(1.3, 12.0);
        recalibrated.recalibrate(1.0, params.steer_ratio);
        assert_eq!(fresh.active_parameters(), recalibrated.active_parameters());
        assert_eq!(
            fresh.active_parameters(),
            ActiveParameters {
                stiffness_factor: 1.0,
                tire_stiffness_front: 85000.0,
                tire_stiffness_rear: 90000.0,
                steer_ratio: 15.3,
            }
        );
    }
    #[test]
    fn test_recalibrate_scales_baseline() {
        let mut model = VehicleModel::new(&understeer());
        model.recalibrate(0.8, 14.0);
        assert_approx_eq!(model.tire_stiffness_front(), 68000.0, 1e-9);
        assert_approx_eq!(model.tire_stiffness_rear(), 72000.0, 1e-9);
        assert_eq!(model.steer_ratio(), 14.0);
        // Always relative to the baseline, never compounded
        model.recalibrate(0.5, 14.0);
        assert_approx_eq!(model.tire_stiffness_front(), 42500.0, 1e-9);
        assert_eq!(model.active_parameters().stiffness_factor, 0.5);
    }
    #[test]
    fn test_recalibrate_accepts_degenerate_values() {
        let mut model = VehicleModel::new(&understeer());
        model.recalibrate(0.0, 0.0);
        assert_eq!(model.tire_stiffness_front(), 0.0);
        assert!(!model.curvature(0.1, 10.0, 0.0).is_finite());
    }
    #[test]
    fn test_balanced_vehicle_has_zero_slip_factor() {
        let model = VehicleModel::new(&balanced());
        assert_eq!(model.slip_factor(), 0.0);
        assert_approx_eq!(model.curvature_factor(30.0), 1.0 / 2.7, 1e-15);
        assert_eq!(model.roll_compensation(0.1, 20.0), 0.0);
    }
    #[test]
    fn test_roll_compensation_formula() {
        let model = VehicleModel::new(&understeer());
        let sf = model.slip_factor();
        let expected = ACCELERATION_DUE_TO_GRAVITY * 0.05 / (1.0 / sf - 400.0);
        assert_approx_eq!(model.roll_compensation(0.05, 20.0), expected, 1e-15);
        // Understeer: the term opposes the roll
        assert!(model.roll_compensation(0.05, 20.0) < 0.0);
    }
    #[test]
    fn test_curvature_decreases_with_speed_when_understeering() {
        let model = VehicleModel::new(&understeer());
        let slow = model.curvature(0.5, 5.0, 0.0);
        let fast = model.curvature(0.5, 30.0, 0.0);
        assert!(slow > fast);
        assert!(fast > 0.0);
    }
    #[test]
    fn test_steer_from_curvature_roundtrip() {
        let model = VehicleModel::new(&balanced());
        let steer = model.steer_from_curvature(0.01, 20.0, 0.0);
        assert_approx_eq!(model.curvature(steer, 20.0, 0.0), 0.01, 1e-9);
        assert_approx_eq!(steer, 0.01 * 15.0 * 2.7, 1e-12);
    }
    #[test]
    fn test_steer_from_yaw_rate_matches_curvature() {
        let model = VehicleModel::new(&understeer());
        let from_yaw = model.steer_from_yaw_rate(0.2, 10.0, 0.01);
        let from_curv = model.steer_from_curvature(0.02, 10.0, 0.01);
        assert_approx_eq!(from_yaw, from_curv, 1e-12);
        assert_approx_eq!(model.yaw_rate(from_yaw, 10.0, 0.01), 0.2, 1e-12);
    }
    #[test]
    fn test_steer_from_yaw_rate_at_standstill_is_unchecked() {
        let model = VehicleModel::new(&understeer());
        assert!(!model.steer_from_yaw_rate(0.1, 0.0, 0.0).is_finite());
    }
    #[test]
    fn test_steady_state_zero_input() {
        let model = VehicleModel::new(&understeer());
        let x = model.steady_state(0.0, 5.0, 0.0).unwrap();
        assert_eq!(x[0], 0.0);
        assert_eq!(x[1], 0.0);
    }
    #[test]
    fn test_steady_state_yaw_rate_matches_curvature() {
        let model = VehicleModel::new(&understeer());
        for &u in &[2.0, 10.0, 25.0] {
            let x = model.steady_state(0.3, u, 0.0).unwrap();
            assert_approx_eq!(x[1], model.yaw_rate(0.3, u, 0.0), 1e-9);
        }
    }
    #[test]
    fn test_steady_state_kinematic_regime() {
        let model = VehicleModel::new(&understeer());
        let x = model.steady_state(0.3, 0.1, 0.2).unwrap();
        let expected = dynamics::kinematic_steady_state(0.3, 0.1, &model);
        assert_eq!(x, expected);
    }
    #[test]
    fn test_display() {
        let s = format!("{}", VehicleModel::new(&understeer()));
        assert!(s.starts_with("VehicleModel {"));
        assert!(s.contains("sR: 15.30"));
    }
}
