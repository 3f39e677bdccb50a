use crate::RenderTargetId;
use std::sync::{Arc, Mutex};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EvictReason {
    /// Free for longer than the configured number of frames
    Expired,
    /// Released to bring the pool back under its budget
    OverBudget,
    /// Released by free_unused_resource(s)
    Explicit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderTargetPoolEvent {
    Alloc {
        pool_index: usize,
        resource_id: RenderTargetId,
        debug_name: String,
        size_kb: u64,
        fast_memory: bool,
    },
    Evict {
        pool_index: usize,
        resource_id: RenderTargetId,
        size_kb: u64,
        reason: EvictReason,
    },
    Phase {
        name: &'static str,
    },
}

impl RenderTargetPoolEvent {
    /// Phase events have no size
    pub fn size_kb(&self) -> u64 {
        match self {
            RenderTargetPoolEvent::Alloc { size_kb, .. } => *size_kb,
            RenderTargetPoolEvent::Evict { size_kb, .. } => *size_kb,
            RenderTargetPoolEvent::Phase { .. } => 0,
        }
    }
}

/// Observes allocations, evictions and frame phases of a pool. Purely informational.
pub trait RenderTargetPoolListener: Send {
    fn on_event(
        &mut self,
        event: &RenderTargetPoolEvent,
    );
}

/// Records events into a shared list. Allocations and evictions smaller than the threshold are
/// skipped to keep the timeline readable, phases are always kept.
pub struct RenderTargetPoolEventRecorder {
    size_threshold_kb: u64,
    events: Arc<Mutex<Vec<RenderTargetPoolEvent>>>,
}

impl RenderTargetPoolEventRecorder {
    pub fn new(size_threshold_kb: u64) -> Self {
        RenderTargetPoolEventRecorder {
            size_threshold_kb,
            events: Default::default(),
        }
    }

    /// Handle to the recorded events that stays valid after the recorder is given to a pool
    pub fn events(&self) -> Arc<Mutex<Vec<RenderTargetPoolEvent>>> {
        self.events.clone()
    }
}

impl RenderTargetPoolListener for RenderTargetPoolEventRecorder {
    fn on_event(
        &mut self,
        event: &RenderTargetPoolEvent,
    ) {
        let keep = match event {
            RenderTargetPoolEvent::Phase { .. } => true,
            _ => event.size_kb() >= self.size_threshold_kb,
        };

        if keep {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
