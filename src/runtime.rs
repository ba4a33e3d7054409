//! Process-wide runtime: component registry and configuration store.
//!
//! A [`Runtime`] is created once by the top-level orchestrator and passed by
//! reference to whatever needs it. There is no global instance. Dropping it (or
//! calling [`Runtime::shutdown`]) stops every component still running.

use crate::config::{ConfigProfile, ConfigStore, RuntimeConfig};
use crate::error::{PortflowError, Result};
use crate::task::{TaskComponent, TaskHooks, TaskState};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Runtime {
    config: RuntimeConfig,
    store: ConfigStore,
    tasks: RwLock<BTreeMap<String, Arc<TaskComponent>>>,
}

impl Runtime {
    /// Bring up the runtime, loading profiles from the resolved config directory.
    ///
    /// An explicitly configured directory must exist. When no directory is
    /// found by the search, the runtime starts with an empty store.
    pub fn init(config: RuntimeConfig) -> Result<Self> {
        let store = match config.resolve_config_dir() {
            Some(dir) => {
                tracing::info!("Loading configuration profiles from {:?}", dir);
                ConfigStore::load_dir(&dir)?
            }
            None => {
                tracing::warn!("No configuration directory found; starting with no profiles");
                ConfigStore::new()
            }
        };
        Ok(Self::with_store(config, store))
    }

    /// Bring up the runtime with an already loaded store.
    pub fn with_store(config: RuntimeConfig, store: ConfigStore) -> Self {
        Self {
            config,
            store,
            tasks: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Instantiate a component under a process-wide unique name.
    pub fn deploy(
        &self,
        name: &str,
        model: &str,
        hooks: impl TaskHooks,
    ) -> Result<Arc<TaskComponent>> {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(name) {
            return Err(PortflowError::Configuration(format!(
                "a task named '{name}' is already deployed"
            )));
        }
        let task = Arc::new(TaskComponent::new(
            name,
            model,
            Box::new(hooks),
            self.config.default_period,
        )?);
        tasks.insert(name.to_string(), Arc::clone(&task));
        tracing::info!(
            "Deployed task '{}' (model '{}', {} ports)",
            name,
            model,
            task.ports().len()
        );
        Ok(task)
    }

    /// Resolve a component by name.
    pub fn task(&self, name: &str) -> Result<Arc<TaskComponent>> {
        self.tasks
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PortflowError::NotFound(format!("task '{name}'")))
    }

    /// Names of all deployed components, sorted.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.read().keys().cloned().collect()
    }

    /// Resolve the ordered profiles for a component's model.
    pub fn resolve_profile<S: AsRef<str>>(
        &self,
        task: &TaskComponent,
        profiles: &[S],
        strict: bool,
    ) -> Result<ConfigProfile> {
        self.store
            .resolve(task.model(), profiles, strict, &task.properties())
    }

    /// Resolve profiles and configure the component with the result.
    pub fn apply_config<S: AsRef<str>>(
        &self,
        task: &TaskComponent,
        profiles: &[S],
        strict: bool,
    ) -> Result<()> {
        let profile = self.resolve_profile(task, profiles, strict)?;
        task.configure(&profile)
    }

    /// Stop every running component and forget all of them.
    pub fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.write());
        for (name, task) in tasks {
            if matches!(task.state(), TaskState::Running | TaskState::Exception) {
                match task.stop() {
                    Ok(()) => tracing::debug!("Stopped task '{}' during shutdown", name),
                    Err(e) => tracing::warn!("Task '{}' failed to stop: {}", name, e),
                }
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::PortSetBuilder;
    use crate::task::TaskContext;

    struct Idle;

    impl TaskHooks for Idle {
        fn declare_ports(&self, ports: PortSetBuilder) -> PortSetBuilder {
            ports.output::<u8>("tick")
        }

        fn configure_hook(&mut self, _ctx: &TaskContext, _profile: &ConfigProfile) -> Result<()> {
            Ok(())
        }

        fn update_hook(&mut self, _ctx: &TaskContext) -> Result<()> {
            Ok(())
        }
    }

    fn runtime() -> Runtime {
        let mut store = ConfigStore::new();
        store.insert_toml("idle", "[default]\nperiod = 0.002\n").unwrap();
        Runtime::with_store(RuntimeConfig::default(), store)
    }

    #[test]
    fn test_resolve_unknown_task() {
        let rt = runtime();
        assert!(matches!(rt.task("ghost"), Err(PortflowError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_deploy_rejected() {
        let rt = runtime();
        rt.deploy("a", "idle", Idle).unwrap();
        assert!(rt.deploy("a", "idle", Idle).is_err());
        assert_eq!(rt.task_names(), ["a"]);
    }

    #[test]
    fn test_apply_config_and_shutdown() {
        let rt = runtime();
        let task = rt.deploy("a", "idle", Idle).unwrap();
        rt.apply_config(&task, &["default"], true).unwrap();
        assert_eq!(task.period(), std::time::Duration::from_millis(2));
        task.start().unwrap();

        rt.shutdown();
        assert_eq!(task.state(), TaskState::Stopped);
        assert!(rt.task_names().is_empty());
    }

    #[test]
    fn test_missing_profile_leaves_task_unconfigured() {
        let rt = runtime();
        let task = rt.deploy("a", "idle", Idle).unwrap();
        let err = rt.apply_config(&task, &["fast"], false).unwrap_err();
        assert!(matches!(err, PortflowError::Configuration(_)));
        assert_eq!(task.state(), TaskState::Unconfigured);
    }

    #[test]
    fn test_init_with_missing_explicit_dir_fails() {
        let config = RuntimeConfig::default().with_config_dir("/nonexistent/portflow-config");
        assert!(Runtime::init(config).is_err());
    }
}
