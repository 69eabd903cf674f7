use std::fmt;

use crate::error::{EngineError, Result};

/// Where a frame currently is in the pass sequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FramePhase {
    Idle,
    GBuffer,
    /// RSM of the given light slot.
    Rsm(usize),
    DirectLighting,
    IndirectIllumination,
    Presented,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramePhase::Idle => f.write_str("idle"),
            FramePhase::GBuffer => f.write_str("g-buffer pass"),
            FramePhase::Rsm(slot) => write!(f, "RSM pass (light {slot})"),
            FramePhase::DirectLighting => f.write_str("direct lighting pass"),
            FramePhase::IndirectIllumination => f.write_str("indirect illumination pass"),
            FramePhase::Presented => f.write_str("presented"),
        }
    }
}

/// Enforces `GBuffer → Rsm* → DirectLighting → IndirectIllumination* → Presented`.
///
/// Re-entering the G-buffer pass before lighting is allowed since it rewrites
/// the same data. Every indirect pass adds into the accumulation buffer, so
/// they are counted per light. An indirect pass for a light whose RSM was not
/// rendered in the same frame is refused.
#[derive(Debug, Clone)]
pub struct FrameSequencer {
    phase: FramePhase,
    rsm_passes: Vec<usize>,
    indirect_passes: Vec<usize>,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            rsm_passes: Vec::new(),
            indirect_passes: Vec::new(),
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn enter(&mut self, requested: FramePhase) -> Result<()> {
        use FramePhase::*;

        let allowed = match (self.phase, requested) {
            (Idle | GBuffer, GBuffer) => true,
            (GBuffer | Rsm(_), Rsm(_)) => true,
            (GBuffer | Rsm(_), DirectLighting) => true,
            (DirectLighting | IndirectIllumination, IndirectIllumination) => true,
            (DirectLighting | IndirectIllumination, Presented) => true,
            _ => false,
        };
        if !allowed {
            return Err(EngineError::PassOrder {
                requested,
                current: self.phase,
            });
        }

        if requested == GBuffer && self.phase == Idle {
            self.rsm_passes.clear();
            self.indirect_passes.clear();
        }
        if let Rsm(slot) = requested {
            if !self.rsm_passes.contains(&slot) {
                self.rsm_passes.push(slot);
            }
        }
        self.phase = requested;
        Ok(())
    }

    /// Records an indirect pass for `slot` and returns how many times that
    /// light has now been added this frame.
    ///
    /// Fails with `PassOrder` unless `Rsm(slot)` ran earlier in this frame.
    pub fn indirect(&mut self, slot: usize) -> Result<usize> {
        if !self.rsm_passes.contains(&slot) {
            return Err(EngineError::PassOrder {
                requested: FramePhase::IndirectIllumination,
                current: self.phase,
            });
        }
        self.enter(FramePhase::IndirectIllumination)?;
        self.indirect_passes.push(slot);
        Ok(self.indirect_passes.iter().filter(|&&s| s == slot).count())
    }

    /// Light slots whose RSM was rendered this frame.
    pub fn rsm_passes(&self) -> &[usize] {
        &self.rsm_passes
    }

    pub fn indirect_passes(&self) -> &[usize] {
        &self.indirect_passes
    }

    /// Closes a presented frame.
    pub fn finish(&mut self) -> Result<()> {
        if self.phase != FramePhase::Presented {
            return Err(EngineError::PassOrder {
                requested: FramePhase::Idle,
                current: self.phase,
            });
        }
        self.phase = FramePhase::Idle;
        Ok(())
    }

    /// Abandons the current frame.
    pub fn reset(&mut self) {
        self.phase = FramePhase::Idle;
        self.rsm_passes.clear();
        self.indirect_passes.clear();
    }
}

impl Default for FrameSequencer {
    fn default() -> Self {
        Self::new()
    }
}
