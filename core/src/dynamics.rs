//! Linear state-space formulations of the bicycle model
//!
//! Dynamic bicycle model following _The Science of Vehicle Dynamics_ (2014) by M. Guiggiani.
//! The lateral dynamics are linearized around a constant longitudinal speed $u$:
//!
//! $$
//! \dot{x} = A x + B w
//! $$
//!
//! # 2-state model
//!
//! State $x = [v, r]$ (lateral speed in m/s, yaw rate in rad/s) and input $w = [\delta, \phi]$
//! (steering wheel angle and road roll in radians).
//!
//! $$
//! A = \begin{bmatrix}
//! -\frac{c_F + c_R}{m u} & -\frac{c_F a_F - c_R a_R}{m u} - u \\\\
//! -\frac{c_F a_F - c_R a_R}{j u} & -\frac{c_F a_F^2 + c_R a_R^2}{j u}
//! \end{bmatrix}
//! \quad
//! B = \begin{bmatrix}
//! \frac{c_F + \chi c_R}{m s_R} & -g \\\\
//! \frac{c_F a_F - \chi c_R a_R}{j s_R} & 0
//! \end{bmatrix}
//! $$
//!
//! # 3-state model
//!
//! State $x = [u, v, r]$ and input $w = [\delta, a_x]$. Longitudinal speed is carried as a state
//! driven directly by the measured longitudinal acceleration. The lateral and yaw rows reuse the
//! 2-state dynamics with the front axle as the only steering contribution and no roll input.
//!
//! Both builders divide by the speed and are only meaningful above
//! [`KINEMATIC_SPEED_THRESHOLD`](crate::KINEMATIC_SPEED_THRESHOLD). Below it the tire slip angle is
//! undefined and the steady state is taken from the kinematic model instead.

use crate::ACCELERATION_DUE_TO_GRAVITY;
use crate::error::ModelError;
use crate::model::VehicleModel;
use nalgebra::{Matrix2, Matrix3, Matrix3x2, Vector2};

/// Returns the A and B matrices of the 2-state (lateral speed, yaw rate) system.
///
/// # Arguments
/// * `speed` - Longitudinal speed in m/s. Must be strictly positive.
/// * `model` - Vehicle model holding the active tire stiffness and steer ratio.
///
/// # Returns
/// * `(A, B)` where B's first column is the steering input and the second column the roll input.
pub fn dynamic_state_matrices(speed: f64, model: &VehicleModel) -> (Matrix2<f64>, Matrix2<f64>) {
    let u = speed;
    let m = model.mass();
    let j = model.rotational_inertia();
    let a_f = model.center_to_front();
    let a_r = model.center_to_rear();
    let c_f = model.tire_stiffness_front();
    let c_r = model.tire_stiffness_rear();
    let s_r = model.steer_ratio();
    let chi = model.steer_ratio_rear();

    let a = Matrix2::new(
        -(c_f + c_r) / (m * u),
        -(c_f * a_f - c_r * a_r) / (m * u) - u,
        -(c_f * a_f - c_r * a_r) / (j * u),
        -(c_f * a_f.powi(2) + c_r * a_r.powi(2)) / (j * u),
    );
    let b = Matrix2::new(
        (c_f + chi * c_r) / m / s_r,
        -ACCELERATION_DUE_TO_GRAVITY,
        (c_f * a_f - chi * c_r * a_r) / j / s_r,
        0.0,
    );
    (a, b)
}

/// Returns the A and B matrices of the 3-state (longitudinal speed, lateral speed, yaw rate) system.
///
/// The lateral speed and yaw rate are accepted for symmetry with the state vector; the
/// linearization only depends on the longitudinal speed.
///
/// # Arguments
/// * `speed` - Longitudinal speed in m/s. Must be strictly positive.
/// * `lateral_speed` - Lateral speed in m/s.
/// * `yaw_rate` - Yaw rate in rad/s.
/// * `model` - Vehicle model holding the active tire stiffness and steer ratio.
///
/// # Returns
/// * `(A, B)` with A 3×3 and B 3×2; B's columns are steering angle and longitudinal acceleration.
pub fn dynamic_state_matrices_3dof(
    speed: f64,
    _lateral_speed: f64,
    _yaw_rate: f64,
    model: &VehicleModel,
) -> (Matrix3<f64>, Matrix3x2<f64>) {
    let u = speed;
    let m = model.mass();
    let j = model.rotational_inertia();
    let a_f = model.center_to_front();
    let a_r = model.center_to_rear();
    let c_f = model.tire_stiffness_front();
    let c_r = model.tire_stiffness_rear();
    let s_r = model.steer_ratio();

    #[rustfmt::skip]
    let a = Matrix3::new(
        0.0, 0.0, 0.0,
        0.0, -(c_f + c_r) / (m * u), -u - (c_f * a_f - c_r * a_r) / (m * u),
        0.0, -(c_f * a_f - c_r * a_r) / (j * u), -(c_f * a_f.powi(2) + c_r * a_r.powi(2)) / (j * u),
    );
    #[rustfmt::skip]
    let b = Matrix3x2::new(
        0.0, 1.0,
        c_f / (m * s_r), 0.0,
        c_f * a_f / (j * s_r), 0.0,
    );
    (a, b)
}

/// Steady state solution of the 2-state dynamic model, $\dot{x} = 0 \Rightarrow x = -A^{-1} B w$.
///
/// # Arguments
/// * `steering_angle` - Steering wheel angle in radians.
/// * `speed` - Longitudinal speed in m/s.
/// * `roll` - Road roll in radians.
/// * `model` - Vehicle model.
///
/// # Returns
/// * `Ok([v, r])` lateral speed and yaw rate.
/// * `Err(ModelError::SingularSystem)` if A cannot be inverted.
pub fn dynamic_steady_state(
    steering_angle: f64,
    speed: f64,
    roll: f64,
    model: &VehicleModel,
) -> Result<Vector2<f64>, ModelError> {
    let (a, b) = dynamic_state_matrices(speed, model);
    let input = Vector2::new(steering_angle, roll);
    a.lu()
        .solve(&(-(b * input)))
        .ok_or(ModelError::SingularSystem { speed })
}

/// Steady state solution at low speed where tire slip is undefined.
///
/// Uses pure kinematic relations: the vehicle rotates about the rear axle with no slip.
///
/// # Returns
/// * `[v, r]` lateral speed and yaw rate.
pub fn kinematic_steady_state(steering_angle: f64, speed: f64, model: &VehicleModel) -> Vector2<f64> {
    let gain = Vector2::new(
        model.center_to_rear() / model.steer_ratio() / model.wheelbase() * speed,
        1.0 / model.steer_ratio() / model.wheelbase() * speed,
    );
    gain * steering_angle
}

/// The slip factor measures how the curvature changes with speed.
///
/// Positive for an oversteering vehicle, negative (the usual case) for an understeering one.
pub fn slip_factor(model: &VehicleModel) -> f64 {
    let c_f = model.tire_stiffness_front();
    let c_r = model.tire_stiffness_rear();
    model.mass() * (c_f * model.center_to_front() - c_r * model.center_to_rear())
        / (model.wheelbase().powi(2) * c_f * c_r)
}
