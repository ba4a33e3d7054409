//! portflow - Driver Entry Point
//!
//! Deploys the reference Cartesian interpolator, feeds it an initial state and
//! a target, and prints every command it produces. Press Enter once to send
//! the target and again to stop.

use anyhow::Context;
use nalgebra::Vector3;
use portflow::driver::{ConsoleReporter, JsonLinesReporter, Reporter};
use portflow::tasks::interpolator;
use portflow::{
    CartesianInterpolator, Driver, DriverConfig, EulerZyx, PoseSample, Runtime, RuntimeConfig,
    StopSignal,
};
use std::f64::consts::{FRAC_PI_2, PI};
use std::io::BufRead;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directory for daily log files; file logging is off when unset
const LOG_DIR_ENV: &str = "PORTFLOW_LOG_DIR";

/// `json` selects the JSON Lines reporter
const REPORT_ENV: &str = "PORTFLOW_REPORT";

fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,portflow=debug"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "portflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    // Reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

/// First Enter is the go-ahead, the second one (or end of input) stops.
fn spawn_stdin_bridge(
    go_ahead: crossbeam_channel::Sender<()>,
    stop: StopSignal,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-bridge".to_string())
        .spawn(move || {
            eprintln!("Press Enter to send the target");
            let mut lines = std::io::stdin().lock().lines();
            if matches!(lines.next(), Some(Ok(_))) && go_ahead.send(()).is_ok() {
                eprintln!("Press Enter to stop");
                let _ = lines.next();
            }
            stop.stop();
        })?;
    Ok(())
}

fn reporter() -> Box<dyn Reporter> {
    match std::env::var(REPORT_ENV).as_deref() {
        Ok("json") => Box::new(JsonLinesReporter::stdout()),
        _ => Box::new(ConsoleReporter::stdout()),
    }
}

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging();
    tracing::info!("Starting portflow driver");

    let runtime = Runtime::init(RuntimeConfig::default()).context("initializing runtime")?;
    runtime.deploy("interpolator", interpolator::MODEL, CartesianInterpolator::new())?;

    let initial = PoseSample::from_euler(
        Vector3::zeros(),
        EulerZyx::new(-PI, -FRAC_PI_2, FRAC_PI_2),
        "current_state_tip",
        "current_state_root",
    )?;
    let target = PoseSample::from_euler(
        Vector3::new(1.0, 2.0, 3.0),
        EulerZyx::new(PI, FRAC_PI_2, -FRAC_PI_2),
        "target_tip",
        "target_root",
    )?;

    let (go_tx, go_rx) = crossbeam_channel::bounded(1);
    let stop = StopSignal::new();
    spawn_stdin_bridge(go_tx, stop.clone()).context("spawning stdin bridge")?;

    let driver = Driver::new(&runtime, DriverConfig::default());
    let mut reporter = reporter();
    let result = driver.run(initial, target, &go_rx, &stop, reporter.as_mut());

    runtime.shutdown();
    let summary = result?;
    tracing::info!(
        "Observed {} commands in {} polls",
        summary.commands,
        summary.polls
    );
    Ok(())
}
