//! Vehicle parameter record and configuration file support
//!
//! [`VehicleParameters`] is the immutable description of the vehicle that the model is built
//! from: mass properties, geometry, baseline tire cornering stiffness and the nominal steering
//! ratio. The record is consumed as-is; values are not validated, so a zero or negative entry
//! simply propagates into degenerate model output.
//!
//! The record can be stored and loaded as JSON, YAML or TOML. The generic [`VehicleParameters::from_file`]
//! and [`VehicleParameters::to_file`] pick the format from the file extension.
//!
//! ```
//! use vehicle_model::params::VehicleParameters;
//!
//! let params: VehicleParameters = toml::from_str(
//!     r#"
//!     mass = 1500.0
//!     rotational_inertia = 2500.0
//!     wheelbase = 2.7
//!     center_to_front = 1.35
//!     tire_stiffness_front = 80000.0
//!     tire_stiffness_rear = 80000.0
//!     steer_ratio = 15.0
//!     "#,
//! ).unwrap();
//! assert_eq!(params.steer_ratio_rear, 0.0);
//! assert_eq!(params.center_to_rear(), 1.35);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Physical description of the vehicle used to build the bicycle model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleParameters {
    /// Vehicle mass in kg
    pub mass: f64,
    /// Yaw moment of inertia in kg·m²
    pub rotational_inertia: f64,
    /// Distance between front and rear axle in m
    pub wheelbase: f64,
    /// Distance from the center of gravity to the front axle in m
    pub center_to_front: f64,
    /// Ratio of rear wheel angle to front wheel angle (0 for front-steered vehicles)
    #[serde(default)]
    pub steer_ratio_rear: f64,
    /// Baseline front axle cornering stiffness in N/rad
    pub tire_stiffness_front: f64,
    /// Baseline rear axle cornering stiffness in N/rad
    pub tire_stiffness_rear: f64,
    /// Nominal ratio of steering wheel angle to front wheel angle
    pub steer_ratio: f64,
}

impl Display for VehicleParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VehicleParameters {{ m: {:.1} kg, j: {:.1} kg m^2, l: {:.3} m, aF: {:.3} m, chi: {:.3}, cF: {:.1} N/rad, cR: {:.1} N/rad, sR: {:.2} }}",
            self.mass,
            self.rotational_inertia,
            self.wheelbase,
            self.center_to_front,
            self.steer_ratio_rear,
            self.tire_stiffness_front,
            self.tire_stiffness_rear,
            self.steer_ratio
        )
    }
}

impl VehicleParameters {
    /// Distance from the center of gravity to the rear axle in m
    pub fn center_to_rear(&self) -> f64 {
        self.wheelbase - self.center_to_front
    }
    /// Write the parameters to a JSON file (pretty-printed).
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }
    /// Read the parameters from a JSON file.
    pub fn from_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(io::Error::other)
    }
    /// Write the parameters as YAML.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = serde_yaml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }
    /// Read the parameters from YAML.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(file).map_err(io::Error::other)
    }
    /// Write the parameters as TOML.
    pub fn to_toml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = toml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }
    /// Read the parameters from TOML.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut s = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut s)?;
        toml::from_str(&s).map_err(io::Error::other)
    }
    /// Generic write: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => self.to_json(p),
            Some("yaml") | Some("yml") => self.to_yaml(p),
            Some("toml") => self.to_toml(p),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported file extension",
            )),
        }
    }
    /// Generic read: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => Self::from_json(p),
            Some("yaml") | Some("yml") => Self::from_yaml(p),
            Some("toml") => Self::from_toml(p),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported file extension",
            )),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}
