//! Runtime and hook helpers shared by integration tests

use portflow::driver::{CommandReport, Reporter};
use portflow::flow::{PortSetBuilder, ReadHandle, WriteHandle};
use portflow::task::{TaskContext, TaskHooks};
use portflow::tasks::interpolator;
use portflow::{
    CartesianInterpolator, ConfigProfile, ConfigStore, Result, Runtime, RuntimeConfig,
    StopSignal,
};

/// Interpolator profiles used across tests
pub const INTERPOLATOR_PROFILES: &str = r#"
[default]
period = 0.002
[default.default_constraint]
max_acceleration = 1.0
max_jerk = 10.0
[default.linear]
max_speed = 2.0
[default.angular]
max_speed = 3.0

[slow]
[slow.linear]
max_speed = 0.1
"#;

/// Runtime with the test interpolator profiles loaded
pub fn test_runtime() -> Runtime {
    let mut store = ConfigStore::new();
    store
        .insert_toml(interpolator::MODEL, INTERPOLATOR_PROFILES)
        .expect("test profiles parse");
    store
        .insert_toml(CounterHooks::MODEL, "[default]\nperiod = 0.001\n")
        .expect("test profiles parse");
    Runtime::with_store(RuntimeConfig::default(), store)
}

/// Runtime with the reference interpolator deployed as "interpolator"
pub fn runtime_with_interpolator() -> Runtime {
    let runtime = test_runtime();
    runtime
        .deploy("interpolator", interpolator::MODEL, CartesianInterpolator::new())
        .expect("deploy interpolator");
    runtime
}

/// Publishes an increasing counter every cycle and echoes `input` to `echo`.
#[derive(Default)]
pub struct CounterHooks {
    io: Option<(ReadHandle<u64>, WriteHandle<u64>, WriteHandle<u64>)>,
    count: u64,
}

impl CounterHooks {
    pub const MODEL: &'static str = "counter";
}

impl TaskHooks for CounterHooks {
    fn declare_ports(&self, ports: PortSetBuilder) -> PortSetBuilder {
        ports
            .input::<u64>("input")
            .output::<u64>("count")
            .output::<u64>("echo")
    }

    fn configure_hook(&mut self, ctx: &TaskContext, _profile: &ConfigProfile) -> Result<()> {
        if self.io.is_none() {
            self.io = Some((
                ctx.ports.input("input")?.reader(),
                ctx.ports.output("count")?.writer()?,
                ctx.ports.output("echo")?.writer()?,
            ));
        }
        self.count = 0;
        Ok(())
    }

    fn update_hook(&mut self, _ctx: &TaskContext) -> Result<()> {
        if let Some((input, count, echo)) = self.io.as_mut() {
            self.count += 1;
            count.write(self.count);
            if let Some(v) = input.read() {
                echo.write(v);
            }
        }
        Ok(())
    }
}

/// Collects reports and raises `stop` once `limit` have arrived
pub struct CollectingReporter {
    pub reports: Vec<CommandReport>,
    limit: usize,
    stop: StopSignal,
}

impl CollectingReporter {
    pub fn new(limit: usize, stop: StopSignal) -> Self {
        Self {
            reports: Vec::new(),
            limit,
            stop,
        }
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, report: &CommandReport) -> Result<()> {
        self.reports.push(report.clone());
        if self.reports.len() >= self.limit {
            self.stop.stop();
        }
        Ok(())
    }
}
