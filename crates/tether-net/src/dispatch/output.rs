//! On/off outputs driven by `led_control` messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A two-level output such as an LED or relay.
pub trait BinaryOutput: Send {
    /// Drive the output.
    fn set(&mut self, on: bool);

    /// The current level.
    fn level(&self) -> bool;

    /// Invert the output and return the new level.
    fn toggle(&mut self) -> bool {
        let next = !self.level();
        self.set(next);
        next
    }
}

/// An output that only records its level.
///
/// Clones share the same level, so a handle kept outside the dispatcher
/// observes every change.
#[derive(Clone, Debug, Default)]
pub struct MemoryOutput {
    level: Arc<AtomicBool>,
}

impl MemoryOutput {
    /// Create an output in the off state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BinaryOutput for MemoryOutput {
    fn set(&mut self, on: bool) {
        self.level.store(on, Ordering::SeqCst);
    }

    fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}
