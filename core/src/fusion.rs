//! Curvature fusion of a predicted path with the 3-DoF vehicle model
//!
//! The estimator combines two curvature sources over short, fixed-length segments of a predicted
//! path:
//!
//! 1. **Baseline**: the geometric curvature of the path itself,
//!    $\kappa = |\ddot{x}\dot{y} - \ddot{y}\dot{x}| / (\dot{x}^2 + \dot{y}^2)^{3/2}$, from numerical
//!    time derivatives of the positions. Points where it is undefined are ignored.
//! 2. **3-DoF**: one forward-Euler step of the 3-state model
//!    ([`dynamic_state_matrices_3dof`](crate::dynamics::dynamic_state_matrices_3dof)) over the
//!    segment duration, starting from the measured speed, lateral acceleration and yaw rate, giving
//!    $\kappa = r / u$.
//!
//! Each segment's baseline is corrected by its deviation from the model,
//! $\kappa_c = \kappa_b + \alpha (\kappa_b - \kappa_{3dof})$ with
//! $\alpha$ = [`CURVATURE_CORRECTION_ALPHA_3DOF`], and the corrected values inside the time horizon
//! are averaged.
//!
//! Insufficient samples or an empty time window are not errors; the estimate is 0.0 in both cases.

use crate::dynamics::dynamic_state_matrices_3dof;
use crate::error::ModelError;
use crate::model::VehicleModel;
use crate::{CURVATURE_CORRECTION_ALPHA_3DOF, KINEMATIC_SPEED_THRESHOLD, SEGMENT_LENGTH_3DOF};
use log::{debug, trace};
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One sample of a predicted path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSample {
    /// Longitudinal position in m
    pub x: f64,
    /// Lateral position in m
    pub y: f64,
    /// Time in s
    pub t: f64,
}

/// Time-ordered predicted path of the vehicle.
///
/// Positions and times are stored as parallel sequences of equal length. Timestamps are assumed
/// to be strictly increasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PredictedPath {
    x: Vec<f64>,
    y: Vec<f64>,
    t: Vec<f64>,
}

impl PredictedPath {
    /// Create a path from position and time sequences.
    ///
    /// # Returns
    /// * `Err(ModelError::PathLengthMismatch)` if the sequences differ in length.
    pub fn new(x: Vec<f64>, y: Vec<f64>, t: Vec<f64>) -> Result<PredictedPath, ModelError> {
        if x.len() != y.len() || x.len() != t.len() {
            return Err(ModelError::PathLengthMismatch {
                x: x.len(),
                y: y.len(),
                t: t.len(),
            });
        }
        Ok(PredictedPath { x, y, t })
    }
    /// Create a path from individual samples
    pub fn from_samples(samples: &[PathSample]) -> PredictedPath {
        PredictedPath {
            x: samples.iter().map(|s| s.x).collect(),
            y: samples.iter().map(|s| s.y).collect(),
            t: samples.iter().map(|s| s.t).collect(),
        }
    }
    /// Reads a headered CSV file with columns `x`, `y` and `t`.
    ///
    /// # Returns
    /// * `Ok(PredictedPath)` if successful.
    /// * `Err` if the file cannot be read or parsed.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<PredictedPath, Box<dyn std::error::Error>> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut samples = Vec::new();
        for result in rdr.deserialize() {
            let sample: PathSample = result?;
            samples.push(sample);
        }
        Ok(PredictedPath::from_samples(&samples))
    }
    pub fn len(&self) -> usize {
        self.t.len()
    }
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
    pub fn x(&self) -> &[f64] {
        &self.x
    }
    pub fn y(&self) -> &[f64] {
        &self.y
    }
    pub fn t(&self) -> &[f64] {
        &self.t
    }
}

/// Numerical first derivative of `values` with respect to `times`.
///
/// Interior points use the second-order accurate central difference for non-uniform spacing, the
/// two end points use first-order one-sided differences.
pub fn gradient<const N: usize>(values: &[f64; N], times: &[f64; N]) -> [f64; N] {
    let mut out = [0.0; N];
    if N < 2 {
        return out;
    }
    out[0] = (values[1] - values[0]) / (times[1] - times[0]);
    out[N - 1] = (values[N - 1] - values[N - 2]) / (times[N - 1] - times[N - 2]);
    for i in 1..N - 1 {
        let h_prev = times[i] - times[i - 1];
        let h_next = times[i + 1] - times[i];
        out[i] = -h_next / (h_prev * (h_prev + h_next)) * values[i - 1]
            + (h_next - h_prev) / (h_prev * h_next) * values[i]
            + h_prev / (h_next * (h_prev + h_next)) * values[i + 1];
    }
    out
}

/// Mean of the defined (non-NaN) values, NaN if there are none.
fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

type Segment = [f64; SEGMENT_LENGTH_3DOF];

fn segment(values: &[f64], start: usize) -> Segment {
    let mut out = [0.0; SEGMENT_LENGTH_3DOF];
    out.copy_from_slice(&values[start..start + SEGMENT_LENGTH_3DOF]);
    out
}

/// Geometric path curvature of one segment, averaged over the points where it is defined.
///
/// Also returns the first longitudinal velocity sample, used as a speed fallback.
fn segment_path_curvature(x: &Segment, y: &Segment, t: &Segment) -> (f64, f64) {
    let dx = gradient(x, t);
    let dy = gradient(y, t);
    let ddx = gradient(&dx, t);
    let ddy = gradient(&dy, t);
    let curvatures: Segment = std::array::from_fn(|i| {
        (ddx[i] * dy[i] - ddy[i] * dx[i]).abs() / (dx[i].powi(2) + dy[i].powi(2)).powf(1.5)
    });
    (nan_mean(&curvatures), dx[0])
}

impl VehicleModel {
    /// Curvature estimate combining the predicted path with the 3-DoF model driven by measured
    /// inputs, corrected for the deviation between the two.
    ///
    /// # Arguments
    /// * `path` - Predicted path of the vehicle.
    /// * `lateral_accel` - Measured lateral acceleration in m/s².
    /// * `longitudinal_accel` - Measured longitudinal acceleration in m/s².
    /// * `yaw_rate` - Measured yaw rate in rad/s.
    /// * `measured_speed` - Measured longitudinal speed in m/s.
    /// * `steering_angle` - Steering wheel angle in radians.
    /// * `time_horizon` - Time in s over which corrected curvatures are averaged, usually
    ///   [`DEFAULT_TIME_HORIZON`](crate::DEFAULT_TIME_HORIZON).
    ///
    /// # Returns
    /// * Corrected curvature in 1/m, or 0.0 if the path is too short or nothing falls within the horizon.
    #[allow(clippy::too_many_arguments)]
    pub fn fused_curvature(
        &self,
        path: &PredictedPath,
        lateral_accel: f64,
        longitudinal_accel: f64,
        yaw_rate: f64,
        measured_speed: f64,
        steering_angle: f64,
        time_horizon: f64,
    ) -> f64 {
        let (xs, ys, times) = (path.x(), path.y(), path.t());
        if xs.len() < SEGMENT_LENGTH_3DOF || ys.len() < SEGMENT_LENGTH_3DOF {
            debug!(
                "Predicted path has {} samples, need {} for curvature fusion",
                xs.len().min(ys.len()),
                SEGMENT_LENGTH_3DOF
            );
            return 0.0;
        }

        // Segments are consumed in order while accumulating sample time steps; a segment counts
        // as long as the horizon had not been reached before it.
        let mut total_time = 0.0;
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut segment_index = 0;
        while (segment_index + 1) * SEGMENT_LENGTH_3DOF <= xs.len() {
            if total_time >= time_horizon {
                break;
            }
            let start = segment_index * SEGMENT_LENGTH_3DOF;
            let t_seg = segment(times, start);
            let (baseline, dx0) =
                segment_path_curvature(&segment(xs, start), &segment(ys, start), &t_seg);

            let u = if measured_speed > KINEMATIC_SPEED_THRESHOLD {
                measured_speed
            } else {
                dx0
            };
            let v = if u > KINEMATIC_SPEED_THRESHOLD {
                lateral_accel / u
            } else {
                0.0
            };
            let (a, b) = dynamic_state_matrices_3dof(u, v, yaw_rate, self);
            let mut state = Vector3::new(u, v, yaw_rate);
            let input = Vector2::new(steering_angle, longitudinal_accel);
            let delta_t = t_seg[SEGMENT_LENGTH_3DOF - 1] - t_seg[0];
            state += (a * state + b * input) * delta_t;
            let curvature_3dof = if state[0] > KINEMATIC_SPEED_THRESHOLD {
                state[2] / state[0]
            } else {
                0.0
            };

            let corrected = baseline + CURVATURE_CORRECTION_ALPHA_3DOF * (baseline - curvature_3dof);
            trace!(
                "Segment {}: baseline {:.6}, 3-DoF {:.6}, corrected {:.6}",
                segment_index, baseline, curvature_3dof, corrected
            );
            if segment_index + 1 < times.len() {
                total_time += times[segment_index + 1] - times[segment_index];
                if !corrected.is_nan() {
                    sum += corrected;
                    count += 1;
                }
            }
            segment_index += 1;
        }

        if count == 0 {
            debug!(
                "No defined curvature within {:.2} s horizon ({} segments visited)",
                time_horizon, segment_index
            );
            return 0.0;
        }
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_TIME_HORIZON;
    use crate::params::VehicleParameters;
    use assert_approx_eq::assert_approx_eq;

    fn model() -> VehicleModel {
        VehicleModel::new(&VehicleParameters {
            mass: 1500.0,
            rotational_inertia: 2500.0,
            wheelbase: 2.7,
            center_to_front: 1.35,
            steer_ratio_rear: 0.0,
            tire_stiffness_front: 80000.0,
            tire_stiffness_rear: 80000.0,
            steer_ratio: 15.0,
        })
    }

    fn straight_path(n: usize, speed: f64, dt: f64) -> PredictedPath {
        let t: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let x = t.iter().map(|t| speed * t).collect();
        PredictedPath::new(x, vec![0.0; n], t).unwrap()
    }

    #[test]
    fn test_gradient_linear_nonuniform() {
        let t = [0.0, 0.1, 0.3, 0.6, 1.0];
        let f = t.map(|t| 3.0 * t + 1.0);
        for d in gradient(&f, &t) {
            assert_approx_eq!(d, 3.0, 1e-12);
        }
    }
    #[test]
    fn test_gradient_quadratic_interior_exact() {
        let t = [0.0, 0.1, 0.3, 0.6, 1.0];
        let f = t.map(|t| t * t);
        let d = gradient(&f, &t);
        for i in 1..4 {
            assert_approx_eq!(d[i], 2.0 * t[i], 1e-12);
        }
        // One-sided ends
        assert_approx_eq!(d[0], 0.1, 1e-12);
        assert_approx_eq!(d[4], (1.0 - 0.36) / 0.4, 1e-12);
    }
    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
        assert!(nan_mean(&[]).is_nan());
    }
    #[test]
    fn test_path_length_mismatch() {
        let err = PredictedPath::new(vec![0.0; 5], vec![0.0; 4], vec![0.0; 5]).unwrap_err();
        assert_eq!(err, ModelError::PathLengthMismatch { x: 5, y: 4, t: 5 });
    }
    #[test]
    fn test_from_samples() {
        let samples = [
            PathSample { x: 0.0, y: 0.0, t: 0.0 },
            PathSample { x: 1.0, y: 0.5, t: 0.1 },
        ];
        let path = PredictedPath::from_samples(&samples);
        assert_eq!(path.len(), 2);
        assert_eq!(path.y(), &[0.0, 0.5]);
        assert_eq!(path.t(), &[0.0, 0.1]);
    }
    #[test]
    fn test_short_path_returns_zero() {
        let m = model();
        let path = straight_path(4, 10.0, 0.1);
        assert_eq!(m.fused_curvature(&path, 1.0, 0.0, 0.1, 10.0, 0.2, DEFAULT_TIME_HORIZON), 0.0);
        let empty = PredictedPath::default();
        assert_eq!(m.fused_curvature(&empty, 0.0, 0.0, 0.0, 0.0, 0.0, DEFAULT_TIME_HORIZON), 0.0);
    }
    #[test]
    fn test_straight_path_is_zero() {
        let m = model();
        let path = straight_path(20, 15.0, 0.1);
        let curvature = m.fused_curvature(&path, 0.0, 0.0, 0.0, 15.0, 0.0, DEFAULT_TIME_HORIZON);
        assert_approx_eq!(curvature, 0.0, 1e-9);
    }
    #[test]
    fn test_circle_without_model_deviation() {
        // Constant-speed circle, 3-DoF model held at zero curvature: corrected = 1.5 baseline.
        // The one-sided end differences of a 5 point segment recover 0.7 of the true
        // acceleration on average (0.5, 0.75, 1, 0.75, 0.5).
        let m = model();
        let (radius, speed, dt) = (50.0, 10.0, 0.05);
        let t: Vec<f64> = (0..10).map(|i| i as f64 * dt).collect();
        let x = t.iter().map(|t| radius * (speed * t / radius).sin()).collect();
        let y = t.iter().map(|t| radius * (1.0 - (speed * t / radius).cos())).collect();
        let path = PredictedPath::new(x, y, t).unwrap();
        let curvature = m.fused_curvature(&path, 0.0, 0.0, 0.0, speed, 0.0, DEFAULT_TIME_HORIZON);
        assert_approx_eq!(curvature, 1.5 * 0.7 / radius, 1e-4);
    }
    #[test]
    fn test_stationary_path_falls_back_to_zero() {
        // Every point has zero velocity: the geometric curvature is undefined everywhere
        let m = model();
        let t: Vec<f64> = (0..10).map(|i| i as f64 * 0.1).collect();
        let path = PredictedPath::new(vec![3.0; 10], vec![1.0; 10], t).unwrap();
        assert_eq!(m.fused_curvature(&path, 0.0, 0.0, 0.0, 0.0, 0.0, DEFAULT_TIME_HORIZON), 0.0);
    }
    #[test]
    fn test_zero_horizon_collects_nothing() {
        let m = model();
        let path = straight_path(20, 15.0, 0.1);
        assert_eq!(m.fused_curvature(&path, 0.5, 0.0, 0.1, 15.0, 0.1, 0.0), 0.0);
    }
}
