use crate::error::{PipelineError, Result};
use crate::sink::OutputSink;
use crate::stage::Stage;
use crate::transform::create_transform;
use crate::{MAX_LINE_BYTES, SENTINEL};
use std::io::BufRead;
use tracing::{debug, warn};

/// Builder for assembling a pipeline from registered transform names
pub struct PipelineBuilder {
    queue_capacity: usize,
    names: Vec<String>,
    sink: OutputSink,
    sentinel_on_eof: bool,
}

impl PipelineBuilder {
    /// Start a builder; every stage's inbox gets `queue_capacity` slots
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            names: Vec::new(),
            sink: OutputSink::stdout(),
            sentinel_on_eof: false,
        }
    }

    /// Append a stage by registry name
    pub fn add_stage(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Route transform output and the completion line through `sink`
    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Inject the sentinel when input ends without one. Off by default:
    /// the pipeline then waits for a sentinel that never arrives, which is
    /// the conservative contract.
    pub fn sentinel_on_eof(mut self, inject: bool) -> Self {
        self.sentinel_on_eof = inject;
        self
    }

    /// Resolve every name, spawn the stages, and wire the chain
    pub fn build(self) -> Result<Pipeline> {
        if self.names.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let mut stages: Vec<Stage> = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let transform = create_transform(name, &self.sink)
                .ok_or_else(|| PipelineError::UnknownStage(name.clone()))?;
            match Stage::spawn(name.clone(), self.queue_capacity, transform) {
                Ok(stage) => stages.push(stage),
                Err(err) => {
                    // Tear down what already started, newest first.
                    for mut stage in stages.into_iter().rev() {
                        let _ = stage.fini();
                    }
                    return Err(err);
                }
            }
        }

        // Stage i forwards into stage i + 1; the last stage has no hook.
        for i in 0..stages.len() - 1 {
            let hook = stages[i + 1].forward_hook();
            stages[i].attach(hook)?;
        }

        debug!(
            stages = stages.len(),
            capacity = self.queue_capacity,
            "pipeline ready"
        );
        Ok(Pipeline {
            stages,
            sink: self.sink,
            sentinel_on_eof: self.sentinel_on_eof,
        })
    }
}

/// An ordered chain of running stages fed from a line source
pub struct Pipeline {
    stages: Vec<Stage>,
    sink: OutputSink,
    sentinel_on_eof: bool,
}

impl Pipeline {
    /// Start building a pipeline
    pub fn builder(queue_capacity: usize) -> PipelineBuilder {
        PipelineBuilder::new(queue_capacity)
    }

    /// The running stages, in pipeline order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Feed one line into the first stage, blocking while its inbox is full
    pub fn place_work(&self, line: &str) -> Result<()> {
        self.stages[0].place_work(line)
    }

    /// Drive the pipeline from a line source until the sentinel or end of
    /// input, wait for every stage to observe the sentinel, tear the chain
    /// down in pipeline order, and write the completion line.
    pub fn run(mut self, input: impl BufRead) -> Result<()> {
        let mut saw_sentinel = false;
        for line in input.lines() {
            let mut line = match line {
                Ok(line) => line,
                Err(err) => {
                    // An unreadable source is treated as end of input.
                    warn!(%err, "input error, treating as end of input");
                    break;
                }
            };
            if line.len() > MAX_LINE_BYTES - 1 {
                let mut end = MAX_LINE_BYTES - 1;
                while !line.is_char_boundary(end) {
                    end -= 1;
                }
                line.truncate(end);
                warn!(limit = MAX_LINE_BYTES, "oversized input line truncated");
            }
            self.place_work(&line)?;
            if line == SENTINEL {
                saw_sentinel = true;
                break;
            }
        }

        if !saw_sentinel && self.sentinel_on_eof {
            self.place_work(SENTINEL)?;
        }

        // The sentinel must traverse the whole chain before teardown.
        for stage in &self.stages {
            stage.wait_finished();
        }
        for stage in &mut self.stages {
            stage.fini()?;
        }
        self.sink.write_line("Pipeline shutdown complete");
        Ok(())
    }
}
