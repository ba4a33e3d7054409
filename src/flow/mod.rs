//! Data-flow primitives: latest-value channels and typed ports.
//!
//! # Architecture
//!
//! ```text
//! [Driver] ──WriteHandle──► input Port ──ReadHandle──► [TaskComponent]
//! [Driver] ◄──ReadHandle─── output Port ◄─WriteHandle── [TaskComponent]
//! ```
//!
//! # Design
//!
//! - **Latest value wins**: a write replaces the unread sample, nothing queues.
//! - **Per-reader consumption**: every reader sees each value at most once.
//! - **Never blocks**: absence is `None`, not an error.
//! - **One writer per channel**: a second live writer is refused.

pub mod channel;
pub mod port;

pub use channel::{FlowStatus, ReadHandle, SampleChannel, WriteHandle};
pub use port::{Port, PortDescriptor, PortDirection, PortSet, PortSetBuilder};
