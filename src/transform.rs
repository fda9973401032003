use crate::sink::OutputSink;
use std::thread;
use std::time::Duration;

/// A transform maps one input string to at most one output string.
///
/// Returning `None` drops the item: the stage logs the condition and moves
/// on. The empty string is ordinary data, not a drop. A transform runs on
/// its stage's worker and is never invoked concurrently with itself, so it
/// may keep internal state; every stage instance gets its own value, and
/// instances of the same transform must not share state.
pub trait Transform: Send {
    /// Apply the transform to one line
    fn apply(&mut self, input: &str) -> Option<String>;

    /// Stable display name
    fn name(&self) -> &str;
}

/// Names accepted by [`create_transform`]
pub const TRANSFORM_NAMES: [&str; 6] = [
    "logger",
    "typewriter",
    "uppercaser",
    "rotator",
    "flipper",
    "expander",
];

/// Resolve a registry name into a fresh transform instance. Printing
/// transforms are bound to `sink`.
pub fn create_transform(name: &str, sink: &OutputSink) -> Option<Box<dyn Transform>> {
    match name {
        "logger" => Some(Box::new(Logger::new(sink.clone()))),
        "typewriter" => Some(Box::new(Typewriter::new(sink.clone()))),
        "uppercaser" => Some(Box::new(Uppercaser)),
        "rotator" => Some(Box::new(Rotator)),
        "flipper" => Some(Box::new(Flipper)),
        "expander" => Some(Box::new(Expander)),
        _ => None,
    }
}

/// Writes every line with a `[logger]` prefix and passes it through
pub struct Logger {
    sink: OutputSink,
}

impl Logger {
    pub fn new(sink: OutputSink) -> Self {
        Self { sink }
    }
}

impl Transform for Logger {
    fn apply(&mut self, input: &str) -> Option<String> {
        self.sink.write_line(&format!("[logger] {input}"));
        Some(input.to_owned())
    }

    fn name(&self) -> &str {
        "logger"
    }
}

/// Converts the input to uppercase
pub struct Uppercaser;

impl Transform for Uppercaser {
    fn apply(&mut self, input: &str) -> Option<String> {
        Some(input.to_uppercase())
    }

    fn name(&self) -> &str {
        "uppercaser"
    }
}

/// Moves every character one position right; the last character wraps to
/// the front
pub struct Rotator;

impl Transform for Rotator {
    fn apply(&mut self, input: &str) -> Option<String> {
        match input.chars().next_back() {
            Some(last) => {
                let body = &input[..input.len() - last.len_utf8()];
                let mut rotated = String::with_capacity(input.len());
                rotated.push(last);
                rotated.push_str(body);
                Some(rotated)
            }
            None => Some(String::new()),
        }
    }

    fn name(&self) -> &str {
        "rotator"
    }
}

/// Reverses the order of characters
pub struct Flipper;

impl Transform for Flipper {
    fn apply(&mut self, input: &str) -> Option<String> {
        Some(input.chars().rev().collect())
    }

    fn name(&self) -> &str {
        "flipper"
    }
}

/// Inserts a single space between every two characters
pub struct Expander;

impl Transform for Expander {
    fn apply(&mut self, input: &str) -> Option<String> {
        let mut expanded = String::with_capacity(input.len() * 2);
        let mut chars = input.chars();
        if let Some(first) = chars.next() {
            expanded.push(first);
            for c in chars {
                expanded.push(' ');
                expanded.push(c);
            }
        }
        Some(expanded)
    }

    fn name(&self) -> &str {
        "expander"
    }
}

/// Types the line out character by character with a fixed delay, then
/// passes it through
pub struct Typewriter {
    sink: OutputSink,
    delay: Duration,
}

impl Typewriter {
    /// Pause between characters in the default configuration
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    pub fn new(sink: OutputSink) -> Self {
        Self::with_delay(sink, Self::DEFAULT_DELAY)
    }

    /// Override the per-character delay; tests use zero
    pub fn with_delay(sink: OutputSink, delay: Duration) -> Self {
        Self { sink, delay }
    }
}

impl Transform for Typewriter {
    fn apply(&mut self, input: &str) -> Option<String> {
        let mut encoded = [0u8; 4];
        for c in "[typewriter] ".chars().chain(input.chars()) {
            self.sink.write_fragment(c.encode_utf8(&mut encoded));
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
        self.sink.write_fragment("\n");
        Some(input.to_owned())
    }

    fn name(&self) -> &str {
        "typewriter"
    }
}
