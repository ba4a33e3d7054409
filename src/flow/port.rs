//! Ports and the per-component port registry.
//!
//! Each component declares its ports once, through [`PortSetBuilder`]. The
//! resulting [`PortSet`] maps names to type-erased channels. Lookups are typed
//! (`ports.input::<PoseSample>("target")`), so a name that is unknown, has the
//! wrong direction, or carries another type fails at acquisition, before any
//! sample moves.

use crate::error::{PortflowError, Result};
use crate::flow::channel::{ReadHandle, SampleChannel, WriteHandle};
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Whether a port is an input or output, seen from the owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Static descriptor for a component's port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: String,
    pub direction: PortDirection,
    pub type_name: &'static str,
}

/// A named, typed endpoint bound to one channel.
///
/// `writer()` and `reader()` delegate to the channel. Which side uses which
/// handle follows the direction: drivers write inputs and read outputs, the
/// owning component does the opposite.
pub struct Port<T> {
    descriptor: PortDescriptor,
    channel: SampleChannel<T>,
}

impl<T: Clone + Send + Sync + 'static> Port<T> {
    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Acquire the port's single writer role.
    pub fn writer(&self) -> Result<WriteHandle<T>> {
        self.channel.writer()
    }

    /// Create an independent reader on the port's channel.
    pub fn reader(&self) -> ReadHandle<T> {
        self.channel.reader()
    }
}

impl<T> Clone for Port<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            channel: self.channel.clone(),
        }
    }
}

impl<T> fmt::Debug for Port<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

struct PortEntry {
    descriptor: PortDescriptor,
    channel: Box<dyn Any + Send + Sync>,
}

/// Declares the ports of a component.
#[derive(Default)]
pub struct PortSetBuilder {
    entries: Vec<PortEntry>,
}

impl PortSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input<T: Clone + Send + Sync + 'static>(self, name: &str) -> Self {
        self.declare::<T>(name, PortDirection::Input)
    }

    pub fn output<T: Clone + Send + Sync + 'static>(self, name: &str) -> Self {
        self.declare::<T>(name, PortDirection::Output)
    }

    fn declare<T: Clone + Send + Sync + 'static>(
        mut self,
        name: &str,
        direction: PortDirection,
    ) -> Self {
        self.entries.push(PortEntry {
            descriptor: PortDescriptor {
                name: name.to_string(),
                direction,
                type_name: type_name::<T>(),
            },
            channel: Box::new(SampleChannel::<T>::new(name)),
        });
        self
    }

    /// Finish the declaration. Duplicate or empty names are rejected.
    pub fn build(self) -> Result<PortSet> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let name = entry.descriptor.name.as_str();
            if name.is_empty() {
                return Err(PortflowError::Configuration(
                    "port names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(PortflowError::Configuration(format!(
                    "port '{name}' declared twice"
                )));
            }
        }
        Ok(PortSet {
            entries: Arc::new(self.entries),
        })
    }
}

/// The fixed set of ports owned by one component.
///
/// Cheap to clone; clones share the same channels.
#[derive(Clone)]
pub struct PortSet {
    entries: Arc<Vec<PortEntry>>,
}

impl PortSet {
    pub fn builder() -> PortSetBuilder {
        PortSetBuilder::new()
    }

    /// Look up an input port by name and type.
    pub fn input<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<Port<T>> {
        self.lookup(name, PortDirection::Input)
    }

    /// Look up an output port by name and type.
    pub fn output<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<Port<T>> {
        self.lookup(name, PortDirection::Output)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &PortDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.descriptor.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
        direction: PortDirection,
    ) -> Result<Port<T>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.name == name)
            .ok_or_else(|| PortflowError::NotFound(format!("port '{name}'")))?;

        if entry.descriptor.direction != direction {
            return Err(PortflowError::PortMismatch {
                port: name.to_string(),
                message: format!(
                    "requested as {direction} but declared as {}",
                    entry.descriptor.direction
                ),
            });
        }

        let channel = entry
            .channel
            .downcast_ref::<SampleChannel<T>>()
            .ok_or_else(|| PortflowError::PortMismatch {
                port: name.to_string(),
                message: format!(
                    "requested type {} but port carries {}",
                    type_name::<T>(),
                    entry.descriptor.type_name
                ),
            })?;

        Ok(Port {
            descriptor: entry.descriptor.clone(),
            channel: channel.clone(),
        })
    }
}

impl fmt::Debug for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.descriptors()).finish()
    }
}
