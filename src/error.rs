use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or driving a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Queue capacity must be at least one slot
    #[error("Queue capacity must be greater than zero")]
    InvalidCapacity,

    /// No stages in pipeline
    #[error("Cannot build a pipeline with no stages")]
    NoStages,

    /// Stage name not present in the transform registry
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// Put attempted on a queue that has been shut down
    #[error("Queue has been shut down")]
    QueueClosed,

    /// A second forward hook was attached to the same stage
    #[error("Stage {0} already has a forward hook attached")]
    AlreadyAttached(String),

    /// Worker thread could not be spawned
    #[error("Failed to spawn worker for stage {stage}: {reason}")]
    ThreadSpawn { stage: String, reason: String },
}
