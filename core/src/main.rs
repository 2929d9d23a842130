//! VEHICLE MODEL: offline evaluation of the lateral bicycle model.
//!
//! Loads a vehicle parameter file (TOML/JSON/YAML), applies an optional recalibration and prints
//! the forward and inverse curvature mappings and the steady state at the requested operating
//! point. When a predicted path CSV (`x,y,t` columns) is given, the fused curvature estimate is
//! printed as well.

use clap::Parser;
use log::{error, info};
use std::error::Error;
use std::path::PathBuf;
use vehicle_model::{DEFAULT_TIME_HORIZON, PredictedPath, VehicleModel, VehicleParameters};

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Evaluate the lateral bicycle model at an operating point.")]
struct Cli {
    /// Vehicle parameter file (TOML/JSON/YAML)
    #[arg(short, long)]
    params: PathBuf,

    /// Multiplier applied to the baseline tire stiffness
    #[arg(long, default_value_t = 1.0)]
    stiffness_factor: f64,

    /// Steering ratio override (defaults to the value in the parameter file)
    #[arg(long)]
    steer_ratio: Option<f64>,

    /// Longitudinal speed in m/s
    #[arg(long, allow_negative_numbers = true)]
    speed: f64,

    /// Steering wheel angle in radians
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    steer: f64,

    /// Road roll in radians
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    roll: f64,

    /// Predicted path CSV with x, y, t columns
    #[arg(long)]
    path: Option<PathBuf>,

    /// Measured lateral acceleration in m/s^2 (used with --path)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    lateral_accel: f64,

    /// Measured longitudinal acceleration in m/s^2 (used with --path)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    longitudinal_accel: f64,

    /// Measured yaw rate in rad/s (used with --path)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    yaw_rate: f64,

    /// Averaging horizon of the fused curvature in seconds
    #[arg(long, default_value_t = DEFAULT_TIME_HORIZON)]
    time_horizon: f64,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Route the library's log output to stderr or a file.
///
/// Recalibrations are logged at `debug`, per-segment curvature fusion at `trace`. Records carry
/// their module path so the two are easy to filter apart.
///
/// # Arguments
/// * `log_level` - Log level string (off, error, warn, info, debug, trace)
/// * `log_file` - Optional path to log file (logs to stderr if None)
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", log_level);
        log::LevelFilter::Info
    });

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{:<5}] {} - {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or(record.target()),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let params = VehicleParameters::from_file(&cli.params)?;
    info!("Loaded {} from {}", params, cli.params.display());

    let mut model = VehicleModel::new(&params);
    model.recalibrate(
        cli.stiffness_factor,
        cli.steer_ratio.unwrap_or(params.steer_ratio),
    );
    info!("{}", model);

    let (steer, speed, roll) = (cli.steer, cli.speed, cli.roll);
    let curvature = model.curvature(steer, speed, roll);
    let yaw_rate = model.yaw_rate(steer, speed, roll);
    let steady_state = model.steady_state(steer, speed, roll)?;

    println!("slip factor:             {:.6e}", model.slip_factor());
    println!("curvature factor [1/m]:  {:.6}", model.curvature_factor(speed));
    println!("roll compensation [1/m]: {:.6}", model.roll_compensation(roll, speed));
    println!("curvature [1/m]:         {:.6}", curvature);
    println!("yaw rate [rad/s]:        {:.6}", yaw_rate);
    println!(
        "steady state:            v = {:.6} m/s, r = {:.6} rad/s",
        steady_state[0], steady_state[1]
    );
    println!(
        "steer from curvature:    {:.6} rad",
        model.steer_from_curvature(curvature, speed, roll)
    );
    println!(
        "steer from yaw rate:     {:.6} rad",
        model.steer_from_yaw_rate(yaw_rate, speed, roll)
    );

    if let Some(path_file) = &cli.path {
        let path = PredictedPath::from_csv(path_file)?;
        info!("Loaded predicted path with {} samples", path.len());
        let fused = model.fused_curvature(
            &path,
            cli.lateral_accel,
            cli.longitudinal_accel,
            cli.yaw_rate,
            speed,
            steer,
            cli.time_horizon,
        );
        println!("fused curvature [1/m]:   {:.6}", fused);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, cli.log_file.as_ref())?;
    run(&cli).inspect_err(|e| error!("{}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_creates_missing_log_directory() {
        let dir = std::env::temp_dir().join(format!("vehicle_model_logs_{}", std::process::id()));
        let log_path = dir.join("nested").join("model.log");
        init_logger("not-a-level", Some(&log_path)).unwrap();
        log::info!("logger ready");
        assert!(log_path.exists());
        assert_eq!(log::max_level(), log::LevelFilter::Info);
        std::fs::remove_dir_all(&dir).ok();
    }
}
