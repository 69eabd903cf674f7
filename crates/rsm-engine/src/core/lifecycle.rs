use std::fmt;

/// Engine lifecycle: `Created → Ready → CleanedUp`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Lifecycle {
    /// Constructed; no programs or targets yet.
    Created,
    /// `init` succeeded; frames can be rendered.
    Ready,
    /// Resources released. Terminal.
    CleanedUp,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Created => "created",
            Lifecycle::Ready => "ready",
            Lifecycle::CleanedUp => "cleaned up",
        };
        f.write_str(s)
    }
}
