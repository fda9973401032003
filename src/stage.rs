use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::queue::BoundedQueue;
use crate::signal::Signal;
use crate::transform::Transform;
use crate::SENTINEL;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Capability handle for forwarding one item into a downstream stage.
/// Each hook is bound to a single stage instance, so wiring the same
/// transform twice yields two independent targets.
pub type ForwardHook = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// One unit of the pipeline: a bounded inbox, a worker thread, a transform,
/// and an optional forward hook into the next stage.
///
/// The stage consumes from its own inbox only. The transform is applied by
/// the worker and never concurrently with itself. After the sentinel passes
/// through, the worker exits and no further items are consumed.
pub struct Stage {
    name: String,
    queue: Arc<BoundedQueue>,
    forward: Arc<OnceLock<ForwardHook>>,
    finished: Arc<AtomicBool>,
    metrics: StageMetrics,
    worker: Option<JoinHandle<()>>,
}

impl Stage {
    /// Create the stage's inbox and worker. Returns only after the worker
    /// raises its ready latch, so the caller may `place_work` immediately.
    pub fn spawn(
        name: impl Into<String>,
        queue_size: usize,
        transform: Box<dyn Transform>,
    ) -> Result<Stage> {
        let name = name.into();
        let queue = Arc::new(BoundedQueue::new(queue_size)?);
        let forward: Arc<OnceLock<ForwardHook>> = Arc::new(OnceLock::new());
        let finished = Arc::new(AtomicBool::new(false));
        let ready = Arc::new(Signal::new());
        let metrics = StageMetrics::new();

        let worker = Worker {
            name: name.clone(),
            queue: Arc::clone(&queue),
            forward: Arc::clone(&forward),
            finished: Arc::clone(&finished),
            ready: Arc::clone(&ready),
            metrics: metrics.clone(),
            transform,
        };
        let handle = thread::Builder::new()
            .name(format!("stage-{name}"))
            .spawn(move || worker.run())
            .map_err(|err| PipelineError::ThreadSpawn {
                stage: name.clone(),
                reason: err.to_string(),
            })?;

        ready.wait();
        debug!(stage = %name, queue_size, "stage worker ready");

        Ok(Stage {
            name,
            queue,
            forward,
            finished,
            metrics,
            worker: Some(handle),
        })
    }

    /// The stage's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy one line into the stage's inbox, blocking while it is full
    pub fn place_work(&self, item: &str) -> Result<()> {
        self.queue.put(item)
    }

    /// Bind the downstream target. Must be called at most once, before
    /// input flows.
    pub fn attach(&self, hook: ForwardHook) -> Result<()> {
        self.forward
            .set(hook)
            .map_err(|_| PipelineError::AlreadyAttached(self.name.clone()))
    }

    /// A hook that places work into this stage's inbox
    pub fn forward_hook(&self) -> ForwardHook {
        let queue = Arc::clone(&self.queue);
        Box::new(move |item| queue.put(item))
    }

    /// Block until this stage has observed the sentinel
    pub fn wait_finished(&self) {
        self.queue.wait_finished();
    }

    /// Counters recorded by the worker
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Stop the worker and release the inbox. The first call joins the
    /// worker; later calls are no-ops.
    pub fn fini(&mut self) -> Result<()> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        self.finished.store(true, Ordering::Release);
        // Wakes the worker if it is blocked on an empty inbox.
        self.queue.close();
        if handle.join().is_err() {
            error!(stage = %self.name, "worker panicked before join");
        }
        // Release anyone still parked on the finished latch.
        self.queue.signal_finished();
        debug!(stage = %self.name, "{}", self.metrics.snapshot().format());
        Ok(())
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        let _ = self.fini();
    }
}

/// State moved onto the worker thread
struct Worker {
    name: String,
    queue: Arc<BoundedQueue>,
    forward: Arc<OnceLock<ForwardHook>>,
    finished: Arc<AtomicBool>,
    ready: Arc<Signal>,
    metrics: StageMetrics,
    transform: Box<dyn Transform>,
}

impl Worker {
    fn run(mut self) {
        self.ready.signal();

        while !self.finished.load(Ordering::Acquire) {
            // Blocks while the inbox is empty; None means fini closed it.
            let Some(input) = self.queue.get() else { break };

            if input == SENTINEL {
                // The sentinel passes through untransformed and always ends
                // the worker, even if the downstream rejects it.
                self.forward(&input);
                self.finished.store(true, Ordering::Release);
                self.queue.signal_finished();
                break;
            }

            match self.transform.apply(&input) {
                Some(output) => {
                    self.forward(&output);
                    self.metrics.record_processed();
                }
                None => {
                    self.metrics.record_dropped();
                    warn!(stage = %self.name, input = %input, "transform dropped item");
                }
            }
        }
    }

    /// Hand an item downstream if a hook is attached. Hook errors are
    /// operational, not fatal: log and keep consuming.
    fn forward(&self, item: &str) {
        if let Some(hook) = self.forward.get() {
            if let Err(err) = hook(item) {
                self.metrics.record_forward_error();
                error!(stage = %self.name, %err, "failed to forward item downstream");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Records everything forwarded to it
    fn collecting_hook(into: Arc<Mutex<Vec<String>>>) -> ForwardHook {
        Box::new(move |item| {
            into.lock().push(item.to_owned());
            Ok(())
        })
    }

    /// Reverses each line; drops lines containing "drop"
    struct Reverser;

    impl Transform for Reverser {
        fn apply(&mut self, input: &str) -> Option<String> {
            if input.contains("drop") {
                None
            } else {
                Some(input.chars().rev().collect())
            }
        }

        fn name(&self) -> &str {
            "reverser"
        }
    }

    /// Appends a per-instance sequence number to each line
    struct Numberer {
        seen: u64,
    }

    impl Transform for Numberer {
        fn apply(&mut self, input: &str) -> Option<String> {
            self.seen += 1;
            Some(format!("{input}#{}", self.seen))
        }

        fn name(&self) -> &str {
            "numberer"
        }
    }

    #[test]
    fn test_place_work_immediately_after_spawn() {
        let mut stage = Stage::spawn("reverser", 2, Box::new(Reverser)).unwrap();
        stage.place_work("abc").unwrap();
        stage.place_work(SENTINEL).unwrap();
        stage.wait_finished();
        stage.fini().unwrap();
    }

    #[test]
    fn test_sentinel_forwarded_verbatim_and_last() {
        let forwarded = Arc::new(Mutex::new(Vec::new()));
        let mut stage = Stage::spawn("reverser", 4, Box::new(Reverser)).unwrap();
        stage.attach(collecting_hook(Arc::clone(&forwarded))).unwrap();

        stage.place_work("abc").unwrap();
        stage.place_work(SENTINEL).unwrap();
        stage.wait_finished();
        stage.fini().unwrap();

        assert_eq!(*forwarded.lock(), vec!["cba".to_owned(), SENTINEL.to_owned()]);
    }

    #[test]
    fn test_transform_drop_is_not_fatal() {
        let forwarded = Arc::new(Mutex::new(Vec::new()));
        let mut stage = Stage::spawn("reverser", 4, Box::new(Reverser)).unwrap();
        stage.attach(collecting_hook(Arc::clone(&forwarded))).unwrap();

        stage.place_work("drop me").unwrap();
        stage.place_work("keep").unwrap();
        stage.place_work(SENTINEL).unwrap();
        stage.wait_finished();
        stage.fini().unwrap();

        assert_eq!(*forwarded.lock(), vec!["peek".to_owned(), SENTINEL.to_owned()]);
        assert_eq!(stage.metrics().total_dropped(), 1);
        assert_eq!(stage.metrics().total_processed(), 1);
    }

    #[test]
    fn test_forward_error_logged_and_processing_continues() {
        let forwarded = Arc::new(Mutex::new(Vec::new()));
        let mut stage = Stage::spawn("reverser", 4, Box::new(Reverser)).unwrap();
        let sink = Arc::clone(&forwarded);
        let calls = Mutex::new(0u32);
        // Rejects the first item, accepts everything after.
        let flaky: ForwardHook = Box::new(move |item| {
            let mut calls = calls.lock();
            *calls += 1;
            if *calls == 1 {
                Err(PipelineError::QueueClosed)
            } else {
                sink.lock().push(item.to_owned());
                Ok(())
            }
        });
        stage.attach(flaky).unwrap();

        stage.place_work("first").unwrap();
        stage.place_work("second").unwrap();
        stage.place_work(SENTINEL).unwrap();
        stage.wait_finished();
        stage.fini().unwrap();

        assert_eq!(*forwarded.lock(), vec!["dnoces".to_owned(), SENTINEL.to_owned()]);
        assert_eq!(stage.metrics().total_forward_errors(), 1);
    }

    #[test]
    fn test_attach_twice_fails() {
        let mut stage = Stage::spawn("reverser", 2, Box::new(Reverser)).unwrap();
        let first = collecting_hook(Arc::new(Mutex::new(Vec::new())));
        let second = collecting_hook(Arc::new(Mutex::new(Vec::new())));
        assert!(stage.attach(first).is_ok());
        assert!(matches!(
            stage.attach(second),
            Err(PipelineError::AlreadyAttached(_))
        ));
        stage.fini().unwrap();
    }

    #[test]
    fn test_fini_without_sentinel_stops_idle_worker() {
        let mut stage = Stage::spawn("reverser", 2, Box::new(Reverser)).unwrap();
        stage.fini().unwrap();
    }

    #[test]
    fn test_fini_is_idempotent() {
        let mut stage = Stage::spawn("reverser", 2, Box::new(Reverser)).unwrap();
        stage.place_work(SENTINEL).unwrap();
        stage.wait_finished();
        assert!(stage.fini().is_ok());
        assert!(stage.fini().is_ok());
    }

    #[test]
    fn test_same_transform_twice_keeps_independent_state() {
        let first_out = Arc::new(Mutex::new(Vec::new()));
        let second_out = Arc::new(Mutex::new(Vec::new()));
        let mut first = Stage::spawn("numberer", 4, Box::new(Numberer { seen: 0 })).unwrap();
        let mut second = Stage::spawn("numberer", 4, Box::new(Numberer { seen: 0 })).unwrap();
        first.attach(collecting_hook(Arc::clone(&first_out))).unwrap();
        second.attach(collecting_hook(Arc::clone(&second_out))).unwrap();

        first.place_work("a").unwrap();
        first.place_work("b").unwrap();
        first.place_work(SENTINEL).unwrap();
        second.place_work("z").unwrap();
        second.place_work(SENTINEL).unwrap();

        first.wait_finished();
        second.wait_finished();
        first.fini().unwrap();
        second.fini().unwrap();

        assert_eq!(*first_out.lock(), vec!["a#1", "b#2", SENTINEL]);
        // The second instance starts counting from one; no cross-talk.
        assert_eq!(*second_out.lock(), vec!["z#1", SENTINEL]);
    }
}
