//! Re-entrancy guard around the render function.

use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderPhase {
    #[default]
    Idle,
    Rendering,
    RenderingWithPendingRequest,
}

/// Guarantees one render pass at a time. Requests that arrive during a pass
/// collapse into a single trailing pass.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    phase: RenderPhase,
    passes: u64,
}

impl RenderScheduler {
    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_rendering(&self) -> bool {
        self.phase != RenderPhase::Idle
    }

    /// Returns `true` when the caller must run a pass now. While a pass is
    /// running the request is recorded and `false` is returned.
    pub fn request(&mut self) -> bool {
        match self.phase {
            RenderPhase::Idle => {
                self.phase = RenderPhase::Rendering;
                true
            }
            RenderPhase::Rendering => {
                trace!("render requested during pass; deferring");
                self.phase = RenderPhase::RenderingWithPendingRequest;
                false
            }
            RenderPhase::RenderingWithPendingRequest => false,
        }
    }

    /// Marks the current pass complete. Returns `true` when another pass was
    /// requested meanwhile and must run before going idle.
    pub fn finish_pass(&mut self) -> bool {
        self.passes += 1;
        match self.phase {
            RenderPhase::RenderingWithPendingRequest => {
                self.phase = RenderPhase::Rendering;
                true
            }
            RenderPhase::Rendering | RenderPhase::Idle => {
                self.phase = RenderPhase::Idle;
                false
            }
        }
    }
}
