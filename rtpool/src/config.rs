#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Largest budget that can be requested through `from_min_budget_mb`
pub const MAX_MIN_BUDGET_MB: u32 = 2000;

pub const DEFAULT_MIN_BUDGET_MB: u32 = 400;

/// Free render targets older than this are released by the aging sweep
pub const DEFAULT_UNUSED_FRAMES_BEFORE_RELEASE: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct RenderTargetPoolConfig {
    /// When the pool is larger than this, free render targets are evicted (oldest first) until it
    /// fits again. In-use render targets are never evicted so the pool may stay over budget.
    pub min_budget_kb: u64,

    /// Number of ticks a free render target survives before the aging sweep releases it
    pub unused_frames_before_release: u32,

    /// Extra ticks a released texture is kept alive on top of the one tick every release waits.
    /// Raise this when the device queues more than one frame of work.
    pub max_frames_in_flight: u32,
}

impl Default for RenderTargetPoolConfig {
    fn default() -> Self {
        RenderTargetPoolConfig::from_min_budget_mb(DEFAULT_MIN_BUDGET_MB)
    }
}

impl RenderTargetPoolConfig {
    /// Budget in MB, clamped to 0..=2000
    pub fn from_min_budget_mb(min_budget_mb: u32) -> Self {
        RenderTargetPoolConfig {
            min_budget_kb: min_budget_mb.min(MAX_MIN_BUDGET_MB) as u64 * 1024,
            unused_frames_before_release: DEFAULT_UNUSED_FRAMES_BEFORE_RELEASE,
            max_frames_in_flight: 0,
        }
    }
}
