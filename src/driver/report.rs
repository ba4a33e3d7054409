//! Reporting of observed commands.
//!
//! The console format is for humans and not a stable contract. Tools should
//! use [`JsonLinesReporter`], which writes one JSON object per command.

use crate::error::Result;
use crate::types::PoseSample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

const SEPARATOR: &str = "---------------------------------------------------";

/// Comparison of the target and one observed command.
///
/// Orientations are Euler angles in Z, Y, X order (yaw, pitch, roll).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReport {
    pub time: DateTime<Utc>,
    pub target_position: [f64; 3],
    pub commanded_position: [f64; 3],
    pub target_orientation: [f64; 3],
    pub commanded_orientation: [f64; 3],
}

impl CommandReport {
    pub fn new(target: &PoseSample, command: &PoseSample) -> Self {
        Self {
            time: command.time,
            target_position: xyz(target),
            commanded_position: xyz(command),
            target_orientation: target.euler().as_array(),
            commanded_orientation: command.euler().as_array(),
        }
    }
}

fn xyz(sample: &PoseSample) -> [f64; 3] {
    let p = &sample.position;
    [p.x, p.y, p.z]
}

/// Sink for command reports.
#[cfg_attr(test, mockall::automock)]
pub trait Reporter {
    fn report(&mut self, report: &CommandReport) -> Result<()>;
}

/// Human-readable reporter.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn triple(v: &[f64; 3]) -> String {
    format!("{} {} {}", v[0], v[1], v[2])
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, report: &CommandReport) -> Result<()> {
        writeln!(self.out, "Target position: {}", triple(&report.target_position))?;
        writeln!(self.out, "Commanded position: {}", triple(&report.commanded_position))?;
        writeln!(self.out, "Target orientation: {}", triple(&report.target_orientation))?;
        writeln!(
            self.out,
            "Commanded orientation: {}",
            triple(&report.commanded_orientation)
        )?;
        writeln!(self.out, "{SEPARATOR}")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Machine-readable reporter: one JSON object per line.
pub struct JsonLinesReporter<W: Write> {
    out: W,
}

impl JsonLinesReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn report(&mut self, report: &CommandReport) -> Result<()> {
        serde_json::to_writer(&mut self.out, report)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
