/// Totals over every render target the pool currently owns
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderTargetPoolStats {
    pub render_target_count: usize,
    pub pool_size_kb: u64,
    /// Part of pool_size_kb held by someone other than the pool
    pub used_size_kb: u64,
}

impl RenderTargetPoolStats {
    pub fn free_size_kb(&self) -> u64 {
        self.pool_size_kb - self.used_size_kb
    }
}
