use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Shared sink for transforms that print and for the pipeline completion
/// line.
///
/// Standard output is implicitly shared by side-effecting transforms;
/// routing every write through one sink keeps each call atomic and lets
/// tests capture emitted text instead of scraping the process's stdout.
/// Cloning is cheap and all clones write to the same target.
#[derive(Debug, Clone)]
pub struct OutputSink {
    target: Arc<Mutex<Target>>,
}

#[derive(Debug)]
enum Target {
    Stdout,
    Memory(String),
}

impl OutputSink {
    /// Sink backed by process stdout. Writes are flushed immediately.
    pub fn stdout() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Stdout)),
        }
    }

    /// Sink backed by an in-memory buffer, for tests
    pub fn memory() -> Self {
        Self {
            target: Arc::new(Mutex::new(Target::Memory(String::new()))),
        }
    }

    /// Write a newline-terminated line
    pub fn write_line(&self, line: &str) {
        let mut target = self.target.lock();
        match &mut *target {
            Target::Stdout => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{line}");
                let _ = out.flush();
            }
            Target::Memory(buffer) => {
                buffer.push_str(line);
                buffer.push('\n');
            }
        }
    }

    /// Write a fragment without a newline, flushing so partial output is
    /// visible immediately (the typewriter effect depends on this).
    pub fn write_fragment(&self, fragment: &str) {
        let mut target = self.target.lock();
        match &mut *target {
            Target::Stdout => {
                let mut out = io::stdout().lock();
                let _ = write!(out, "{fragment}");
                let _ = out.flush();
            }
            Target::Memory(buffer) => buffer.push_str(fragment),
        }
    }

    /// The text captured by a memory sink; `None` for a stdout sink
    pub fn captured(&self) -> Option<String> {
        match &*self.target.lock() {
            Target::Memory(buffer) => Some(buffer.clone()),
            Target::Stdout => None,
        }
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::stdout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_lines() {
        let sink = OutputSink::memory();
        sink.write_line("first");
        sink.write_line("second");
        assert_eq!(sink.captured().unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_fragments_join_without_newlines() {
        let sink = OutputSink::memory();
        sink.write_fragment("a");
        sink.write_fragment("b");
        sink.write_fragment("\n");
        assert_eq!(sink.captured().unwrap(), "ab\n");
    }

    #[test]
    fn test_clones_share_the_buffer() {
        let sink = OutputSink::memory();
        let writer = sink.clone();
        writer.write_line("shared");
        assert_eq!(sink.captured().unwrap(), "shared\n");
    }

    #[test]
    fn test_stdout_sink_captures_nothing() {
        let sink = OutputSink::stdout();
        assert_eq!(sink.captured(), None);
    }
}
