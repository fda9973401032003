//! A modular string-processing pipeline of transform stages.
//!
//! Lines read from an input source flow through a chain of stages, each
//! owning a worker thread and a bounded blocking inbox. A stage pops a
//! line, applies its transform, and forwards the result into the next
//! stage's inbox; the in-band sentinel `<END>` traverses the same path and
//! stops every worker in order.
//!
//! # Features
//!
//! - Manual-reset signal primitive with broadcast wakeup (no lost wakeups)
//! - Bounded FIFO queues with blocking put/get and a separate finished latch
//! - One worker thread per stage with a startup-ready handshake
//! - Forward hooks as capability values, so the same transform can appear
//!   twice with independent state
//! - Built-in transforms: logger, typewriter, uppercaser, rotator, flipper,
//!   expander
//!
//! # Example
//!
//! ```ignore
//! use analyzer::{OutputSink, PipelineBuilder};
//! use std::io::Cursor;
//!
//! let pipeline = PipelineBuilder::new(20)
//!     .add_stage("uppercaser")
//!     .add_stage("logger")
//!     .build()?;
//!
//! pipeline.run(Cursor::new("hello\n<END>\n"))?;
//! ```

pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod signal;
pub mod sink;
pub mod stage;
pub mod transform;

// Re-exports for convenience
pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use queue::BoundedQueue;
pub use signal::Signal;
pub use sink::OutputSink;
pub use stage::{ForwardHook, Stage};
pub use transform::{create_transform, Transform};

/// In-band token that ends the input loop and every stage worker
pub const SENTINEL: &str = "<END>";

/// Maximum accepted input line length in bytes, including the newline
/// terminator
pub const MAX_LINE_BYTES: usize = 1024;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
