use crate::cleanup::ResourceDropSink;
use crate::pooled_render_target::DroppedRenderTarget;
use crate::{
    EvictReason, PooledRenderTarget, RenderTargetId, RenderTargetPoolConfig, RenderTargetPoolEvent,
    RenderTargetPoolListener, RenderTargetPoolStats, RenderTargetSnapshot, SnapshotArena,
    TransitionBarrier,
};
use crossbeam_channel::{Receiver, Sender};
use rtpool_api::{RtDeviceContext, RtResourceState, RtResult, RtTextureDef, RtTextureFlags};

/// State the barrier moves auto-writable render targets into
pub const WRITABLE_RESOURCE_STATE: RtResourceState = RtResourceState::RENDER_TARGET;

/// How a find_or_allocate request was satisfied
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FindResult {
    /// The def was invalid, nothing happened
    Invalid,
    /// The caller's render target already matched and was kept
    Kept,
    /// A free render target from the pool was handed out
    Reused,
    /// A new render target was created
    Created,
}

impl FindResult {
    /// True if no new texture had to be created
    pub fn reused(self) -> bool {
        match self {
            FindResult::Kept | FindResult::Reused => true,
            FindResult::Invalid | FindResult::Created => false,
        }
    }
}

struct PoolSlot<TextureT: Clone> {
    render_target: PooledRenderTarget<TextureT>,
    unused_for_n_frames: u32,
}

impl<TextureT: Clone> PoolSlot<TextureT> {
    // Only the pool's own reference is left
    fn is_free(&self) -> bool {
        self.render_target.ref_count() == 1
    }

    // Returns true if the render target has been free for longer than the grace period
    fn on_frame_start(
        &mut self,
        unused_frames_before_release: u32,
    ) -> bool {
        if !self.is_free() {
            self.unused_for_n_frames = 0;
            return false;
        }

        self.unused_for_n_frames += 1;
        self.unused_for_n_frames > unused_frames_before_release
    }
}

/// Hands out render targets matching a texture def, reusing free ones where possible and
/// keeping the total size near a budget.
///
/// All calls must come from the thread that owns the pool. Other threads can read render targets
/// through snapshots.
pub struct RenderTargetPool<D: RtDeviceContext> {
    device_context: D,
    config: RenderTargetPoolConfig,

    // Evicted slots are left as None until the next tick compacts them so that indices stay
    // stable within a frame
    slots: Vec<Option<PoolSlot<D::Texture>>>,
    allocation_level_kb: u64,
    currently_over_budget: bool,
    next_resource_id: u64,

    // Textures arrive here when the last handle is dropped and wait in the drop sink until the
    // GPU is done with them
    drop_tx: Sender<DroppedRenderTarget<D::Texture>>,
    drop_rx: Receiver<DroppedRenderTarget<D::Texture>>,
    drop_sink: ResourceDropSink<DroppedRenderTarget<D::Texture>>,

    transition_barrier: TransitionBarrier<D::Fence>,
    snapshot_arena: SnapshotArena<D::Texture>,
    listener: Option<Box<dyn RenderTargetPoolListener>>,
}

impl<D: RtDeviceContext> RenderTargetPool<D> {
    pub fn new(
        device_context: D,
        config: RenderTargetPoolConfig,
    ) -> Self {
        let (drop_tx, drop_rx) = crossbeam_channel::unbounded();
        let drop_sink = ResourceDropSink::new(config.max_frames_in_flight);

        RenderTargetPool {
            device_context,
            config,
            slots: Default::default(),
            allocation_level_kb: 0,
            currently_over_budget: false,
            next_resource_id: 1,
            drop_tx,
            drop_rx,
            drop_sink,
            transition_barrier: TransitionBarrier::new(),
            snapshot_arena: SnapshotArena::new(),
            listener: None,
        }
    }

    pub fn device_context(&self) -> &D {
        &self.device_context
    }

    pub fn config(&self) -> &RenderTargetPoolConfig {
        &self.config
    }

    /// Takes effect on the next tick
    pub fn set_min_budget_kb(
        &mut self,
        min_budget_kb: u64,
    ) {
        self.config.min_budget_kb = min_budget_kb;
    }

    pub fn set_listener(
        &mut self,
        listener: Box<dyn RenderTargetPoolListener>,
    ) {
        self.listener = Some(listener);
    }

    pub fn remove_listener(&mut self) -> Option<Box<dyn RenderTargetPoolListener>> {
        self.listener.take()
    }

    /// Sum of the sizes of all render targets owned by the pool, in KB
    pub fn allocation_level_kb(&self) -> u64 {
        self.allocation_level_kb
    }

    /// True while the last tick could not get under budget
    pub fn is_over_budget(&self) -> bool {
        self.currently_over_budget
    }

    /// Number of slots, including holes left by evictions since the last tick. Use
    /// `get_stats().render_target_count` for the number of live render targets.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of completed ticks
    pub fn frame_index(&self) -> u32 {
        self.drop_sink.frame_index()
    }

    /// Textures released but not destroyed yet
    pub fn pending_destroy_count(&self) -> usize {
        self.drop_sink.len() + self.drop_rx.len()
    }

    /// Debug lookup. Indices change when the pool is compacted.
    pub fn element_by_index(
        &self,
        pool_index: usize,
    ) -> Option<&PooledRenderTarget<D::Texture>> {
        self.slots
            .get(pool_index)
            .and_then(|x| x.as_ref())
            .map(|x| &x.render_target)
    }

    /// Makes `render_target` refer to a texture matching `texture_def`.
    ///
    /// If the caller's current render target matches exactly it is kept (and renamed). Otherwise
    /// it is released and the first free render target with an exactly matching def is handed
    /// out. Requests for fast memory may fall back to an otherwise identical render target
    /// without it. If nothing matches, a new render target is created.
    #[profiling::function]
    pub fn find_or_allocate(
        &mut self,
        texture_def: &RtTextureDef,
        debug_name: &str,
        render_target: &mut Option<PooledRenderTarget<D::Texture>>,
    ) -> RtResult<FindResult> {
        if !texture_def.is_valid() {
            log::trace!(
                "Ignoring request for '{}' with invalid def {}",
                debug_name,
                texture_def
            );
            return Ok(FindResult::Invalid);
        }

        texture_def.verify();

        if let Some(current) = render_target {
            if current.texture_def().exact_equals(texture_def) {
                Self::rename(&self.device_context, current, debug_name);
                return Ok(FindResult::Kept);
            }

            log::trace!(
                "Releasing {} '{}', it does not match {}",
                current.resource_id(),
                current.debug_name(),
                texture_def
            );
        }

        // Releasing the old render target may free a slot this request can use
        *render_target = None;

        let mut found = self.find_free_slot(|def| def.exact_equals(texture_def));
        if found.is_none() && texture_def.flags.contains(RtTextureFlags::FAST_MEMORY) {
            found = self.find_free_slot(|def| def.relaxed_equals(texture_def));
        }

        if let Some(pool_index) = found {
            let reused = match &mut self.slots[pool_index] {
                Some(slot) => {
                    slot.unused_for_n_frames = 0;
                    slot.render_target.clone()
                }
                None => unreachable!(),
            };

            log::trace!(
                "REUSE {} '{}' -> '{}' {}",
                reused.resource_id(),
                reused.debug_name(),
                debug_name,
                texture_def
            );
            Self::rename(&self.device_context, &reused, debug_name);
            self.notify_alloc(pool_index, &reused);
            *render_target = Some(reused);
            return Ok(FindResult::Reused);
        }

        let created = self.create_render_target(texture_def, debug_name)?;
        self.allocation_level_kb += created.size_kb();
        self.slots.push(Some(PoolSlot {
            render_target: created.clone(),
            unused_for_n_frames: 0,
        }));

        log::debug!(
            "{} MB, created {} {} '{}'",
            (self.allocation_level_kb + 1023) / 1024,
            created.resource_id(),
            texture_def,
            debug_name
        );
        self.notify_alloc(self.slots.len() - 1, &created);
        *render_target = Some(created);
        Ok(FindResult::Created)
    }

    /// Wraps a texture created outside the pool. It is never matched, aged or counted against
    /// the budget, but it is destroyed through the pool once the last handle is dropped.
    pub fn create_untracked(
        &mut self,
        texture_def: &RtTextureDef,
        debug_name: &str,
        texture: D::Texture,
    ) -> PooledRenderTarget<D::Texture> {
        let size_kb = (self.device_context.texture_size_in_bytes(&texture) + 1023) / 1024;
        let resource_id = self.allocate_resource_id();
        log::trace!(
            "Untracked render target {} {} '{}'",
            resource_id,
            texture_def,
            debug_name
        );

        PooledRenderTarget::new(
            texture,
            texture_def.clone(),
            debug_name,
            resource_id,
            size_kb,
            true,
            self.drop_tx.clone(),
        )
    }

    /// Called once per frame before any render targets are requested
    #[profiling::function]
    pub fn tick_pool_elements(&mut self) -> RtResult<()> {
        {
            profiling::scope!("Retire");
            self.wait_for_transition_fence()?;
            let device_context = &self.device_context;
            self.drop_sink.on_frame_complete(|dropped| {
                log::trace!(
                    "Destroying texture of {} '{}'",
                    dropped.resource_id,
                    dropped.debug_name
                );
                device_context.destroy_texture(dropped.texture)
            })?;
        }

        self.compact_pool();

        {
            profiling::scope!("Age");
            let unused_frames_before_release = self.config.unused_frames_before_release;
            for pool_index in 0..self.slots.len() {
                let expired = match &mut self.slots[pool_index] {
                    Some(slot) => slot.on_frame_start(unused_frames_before_release),
                    None => false,
                };

                if expired {
                    self.evict_slot(pool_index, EvictReason::Expired);
                }
            }
        }

        self.enforce_budget();

        if self.listener.is_some() {
            self.notify(RenderTargetPoolEvent::Phase {
                name: "FromLastFrame",
            });
            for pool_index in 0..self.slots.len() {
                let in_use = match &self.slots[pool_index] {
                    Some(slot) if !slot.is_free() => Some(slot.render_target.clone()),
                    _ => None,
                };

                if let Some(render_target) = in_use {
                    self.notify_alloc(pool_index, &render_target);
                }
            }
            self.notify(RenderTargetPoolEvent::Phase { name: "Rendering" });
        }

        self.verify_allocation_level();
        Ok(())
    }

    /// Evicts the caller's render target right away, even if others still hold it (they keep
    /// the texture alive). Returns true if it was found in the pool. The texture is destroyed
    /// no earlier than the next tick.
    pub fn free_unused_resource(
        &mut self,
        render_target: &mut Option<PooledRenderTarget<D::Texture>>,
    ) -> RtResult<bool> {
        self.wait_for_transition_fence()?;

        let render_target = match render_target.take() {
            Some(render_target) => render_target,
            None => return Ok(false),
        };

        let pool_index = self.slots.iter().position(|x| {
            x.as_ref()
                .map(|x| x.render_target.ptr_eq(&render_target))
                .unwrap_or(false)
        });

        if let Some(pool_index) = pool_index {
            self.evict_slot(pool_index, EvictReason::Explicit);
        }

        std::mem::drop(render_target);
        self.retire_dropped_render_targets();
        self.verify_allocation_level();
        Ok(pool_index.is_some())
    }

    /// Evicts every free render target right away. Returns how many were evicted.
    pub fn free_unused_resources(&mut self) -> RtResult<usize> {
        self.wait_for_transition_fence()?;

        let mut evicted = 0;
        for pool_index in 0..self.slots.len() {
            let is_free = self.slots[pool_index]
                .as_ref()
                .map(|x| x.is_free())
                .unwrap_or(false);

            if is_free {
                self.evict_slot(pool_index, EvictReason::Explicit);
                evicted += 1;
            }
        }

        self.retire_dropped_render_targets();
        self.verify_allocation_level();
        Ok(evicted)
    }

    /// Moves every auto-writable render target back to the writable state in one batch. The
    /// returned fence is waited on before the pool is next modified.
    #[profiling::function]
    pub fn transition_targets_writable(&mut self) -> RtResult<()> {
        self.wait_for_transition_fence()?;

        let textures: Vec<_> = self
            .slots
            .iter()
            .filter_map(|x| x.as_ref())
            .filter(|x| {
                x.render_target
                    .texture_def()
                    .flags
                    .contains(RtTextureFlags::AUTO_WRITABLE)
            })
            .map(|x| x.render_target.texture())
            .collect();

        self.transition_barrier
            .issue(&self.device_context, &textures, WRITABLE_RESOURCE_STATE)
    }

    /// Transition a single reused render target that is about to be written
    pub fn transition_writable(
        &mut self,
        render_target: &PooledRenderTarget<D::Texture>,
    ) -> RtResult<()> {
        self.wait_for_transition_fence()?;
        self.transition_barrier.issue(
            &self.device_context,
            &[render_target.texture()],
            WRITABLE_RESOURCE_STATE,
        )
    }

    /// Blocks until the outstanding transition completes, then queues released textures for
    /// destruction
    pub fn wait_for_transition_fence(&mut self) -> RtResult<()> {
        self.transition_barrier.wait(&self.device_context)?;
        self.retire_dropped_render_targets();
        Ok(())
    }

    pub fn make_snapshot(
        &mut self,
        render_target: &PooledRenderTarget<D::Texture>,
    ) -> RenderTargetSnapshot<D::Texture> {
        self.snapshot_arena.make_snapshot(render_target)
    }

    /// No reader may use a snapshot after this
    pub fn destroy_all_snapshots(&mut self) {
        let destroyed = self.snapshot_arena.destroy_all_snapshots();
        log::trace!("Destroyed {} snapshots", destroyed);
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshot_arena.len()
    }

    pub fn get_stats(&self) -> RenderTargetPoolStats {
        let mut stats = RenderTargetPoolStats::default();
        for slot in self.slots.iter().filter_map(|x| x.as_ref()) {
            stats.render_target_count += 1;
            stats.pool_size_kb += slot.render_target.size_kb();
            if !slot.is_free() {
                stats.used_size_kb += slot.render_target.size_kb();
            }
        }

        debug_assert_eq!(stats.pool_size_kb, self.allocation_level_kb);
        stats
    }

    /// One line per render target, followed by the totals
    pub fn dump_memory_usage(
        &self,
        out: &mut impl std::fmt::Write,
    ) -> std::fmt::Result {
        writeln!(out, "Pooled render targets:")?;
        for slot in self.slots.iter().filter_map(|x| x.as_ref()) {
            let render_target = &slot.render_target;
            writeln!(
                out,
                "  {:>8.3}MB {} {} '{}'{}",
                render_target.size_kb() as f32 / 1024.0,
                render_target.resource_id(),
                render_target.texture_def(),
                render_target.debug_name(),
                if slot.is_free() {
                    format!(" (unused for {} frames)", slot.unused_for_n_frames)
                } else {
                    " (in use)".to_string()
                }
            )?;
        }

        let stats = self.get_stats();
        writeln!(
            out,
            "{:.3}MB total, {:.3}MB used, {} render targets",
            stats.pool_size_kb as f32 / 1024.0,
            stats.used_size_kb as f32 / 1024.0,
            stats.render_target_count
        )
    }

    pub fn log_memory_usage(&self) {
        let mut dump = String::new();
        if self.dump_memory_usage(&mut dump).is_ok() {
            log::info!("{}", dump);
        }
    }

    /// Releases everything the pool owns and destroys all textures immediately. The device must
    /// be idle. Render targets still held by callers are destroyed when their pool is next
    /// destroyed or dropped, or leaked if that already happened. Safe to call more than once.
    pub fn destroy(&mut self) -> RtResult<()> {
        // Keep tearing down even if the wait fails so nothing is left in the drop sink
        let wait_result = self.transition_barrier.wait(&self.device_context);

        if !self.snapshot_arena.is_empty() {
            self.snapshot_arena.destroy_all_snapshots();
        }

        let still_referenced = self
            .slots
            .iter()
            .filter_map(|x| x.as_ref())
            .filter(|x| !x.is_free())
            .count();
        if still_referenced > 0 {
            log::warn!(
                "Destroying render target pool while {} render targets are still in use",
                still_referenced
            );
        }

        self.slots.clear();
        self.allocation_level_kb = 0;
        self.retire_dropped_render_targets();

        let device_context = &self.device_context;
        let destroy_result = self
            .drop_sink
            .destroy(|dropped| device_context.destroy_texture(dropped.texture));

        wait_result?;
        destroy_result
    }

    fn find_free_slot<F: Fn(&RtTextureDef) -> bool>(
        &self,
        matches: F,
    ) -> Option<usize> {
        self.slots.iter().position(|x| match x {
            Some(slot) => slot.is_free() && (matches)(slot.render_target.texture_def()),
            None => false,
        })
    }

    fn create_render_target(
        &mut self,
        texture_def: &RtTextureDef,
        debug_name: &str,
    ) -> RtResult<PooledRenderTarget<D::Texture>> {
        log::trace!("CREATE '{}' {}", debug_name, texture_def);
        let texture =
            self.device_context
                .create_texture(texture_def, texture_def.category(), debug_name)?;

        let size_kb = (self.device_context.texture_size_in_bytes(&texture) + 1023) / 1024;
        let resource_id = self.allocate_resource_id();
        Ok(PooledRenderTarget::new(
            texture,
            texture_def.clone(),
            debug_name,
            resource_id,
            size_kb,
            false,
            self.drop_tx.clone(),
        ))
    }

    fn allocate_resource_id(&mut self) -> RenderTargetId {
        let resource_id = RenderTargetId(self.next_resource_id);
        self.next_resource_id += 1;
        resource_id
    }

    fn rename(
        device_context: &D,
        render_target: &PooledRenderTarget<D::Texture>,
        debug_name: &str,
    ) {
        if render_target.set_debug_name(debug_name) {
            device_context.set_debug_name(render_target.texture(), debug_name);
        }
    }

    // Drops the pool's reference. The texture is queued for destruction once nobody else holds
    // it either.
    fn evict_slot(
        &mut self,
        pool_index: usize,
        reason: EvictReason,
    ) {
        let slot = match self.slots[pool_index].take() {
            Some(slot) => slot,
            None => return,
        };

        let render_target = slot.render_target;
        self.allocation_level_kb -= render_target.size_kb();
        log::debug!(
            "Evicting {} '{}' ({:?}, unused for {} frames, {} KB)",
            render_target.resource_id(),
            render_target.debug_name(),
            reason,
            slot.unused_for_n_frames,
            render_target.size_kb()
        );

        if self.listener.is_some() {
            self.notify(RenderTargetPoolEvent::Evict {
                pool_index,
                resource_id: render_target.resource_id(),
                size_kb: render_target.size_kb(),
                reason,
            });
        }
    }

    fn enforce_budget(&mut self) {
        profiling::scope!("Enforce budget");
        let min_budget_kb = self.config.min_budget_kb;

        while self.allocation_level_kb > min_budget_kb {
            // Oldest free render target, first one wins ties
            let mut oldest: Option<(usize, u32)> = None;
            for (pool_index, slot) in self.slots.iter().enumerate() {
                if let Some(slot) = slot {
                    if slot.is_free()
                        && oldest
                            .map(|(_, age)| slot.unused_for_n_frames > age)
                            .unwrap_or(true)
                    {
                        oldest = Some((pool_index, slot.unused_for_n_frames));
                    }
                }
            }

            match oldest {
                Some((pool_index, _)) => self.evict_slot(pool_index, EvictReason::OverBudget),
                None => {
                    if !self.currently_over_budget {
                        log::warn!(
                            "Render target pool over budget {}/{} MB and nothing can be released",
                            (self.allocation_level_kb + 1023) / 1024,
                            min_budget_kb / 1024
                        );
                        self.currently_over_budget = true;
                    }
                    break;
                }
            }
        }

        if self.currently_over_budget && self.allocation_level_kb <= min_budget_kb {
            log::info!(
                "Render target pool budget resolved {}/{} MB",
                (self.allocation_level_kb + 1023) / 1024,
                min_budget_kb / 1024
            );
            self.currently_over_budget = false;
        }
    }

    fn compact_pool(&mut self) {
        self.slots.retain(|x| x.is_some());
    }

    fn retire_dropped_render_targets(&mut self) {
        for dropped in self.drop_rx.try_iter() {
            log::trace!(
                "Retiring texture of {} '{}'",
                dropped.resource_id,
                dropped.debug_name
            );
            self.drop_sink.retire(dropped);
        }
    }

    fn notify_alloc(
        &mut self,
        pool_index: usize,
        render_target: &PooledRenderTarget<D::Texture>,
    ) {
        if self.listener.is_some() {
            self.notify(RenderTargetPoolEvent::Alloc {
                pool_index,
                resource_id: render_target.resource_id(),
                debug_name: render_target.debug_name(),
                size_kb: render_target.size_kb(),
                fast_memory: render_target
                    .texture_def()
                    .flags
                    .contains(RtTextureFlags::FAST_MEMORY),
            });
        }
    }

    fn notify(
        &mut self,
        event: RenderTargetPoolEvent,
    ) {
        if let Some(listener) = &mut self.listener {
            listener.on_event(&event);
        }
    }

    fn verify_allocation_level(&self) {
        #[cfg(debug_assertions)]
        {
            let pool_size_kb: u64 = self
                .slots
                .iter()
                .filter_map(|x| x.as_ref())
                .map(|x| x.render_target.size_kb())
                .sum();
            assert_eq!(pool_size_kb, self.allocation_level_kb);
        }
    }
}

impl<D: RtDeviceContext> Drop for RenderTargetPool<D> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::error!("Error while destroying render target pool: {}", e);
        }
    }
}
