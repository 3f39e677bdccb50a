use crate::{
    EvictReason, FindResult, PooledRenderTarget, RenderTargetPool, RenderTargetPoolConfig,
    RenderTargetPoolEvent, RenderTargetPoolEventRecorder,
};
use rtpool_api::empty::{EmptyDeviceContext, EmptyDeviceOp, RtTextureEmpty};
use rtpool_api::{RtDeviceContext, RtFormat, RtResourceState, RtTextureDef, RtTextureFlags};

type TestPool = RenderTargetPool<EmptyDeviceContext>;
type TestRenderTarget = Option<PooledRenderTarget<RtTextureEmpty>>;

// 256x256 is 256 KB, 512x512 is 1024 KB
fn color_def(size: u32) -> RtTextureDef {
    RtTextureDef::new_2d(
        size,
        size,
        RtFormat::R8G8B8A8_UNORM,
        RtTextureFlags::RENDER_TARGET | RtTextureFlags::SHADER_RESOURCE,
    )
}

fn with_flags(
    mut def: RtTextureDef,
    flags: RtTextureFlags,
) -> RtTextureDef {
    def.flags |= flags;
    def
}

fn make_pool(min_budget_kb: u64) -> (EmptyDeviceContext, TestPool) {
    let device_context = EmptyDeviceContext::new();
    let config = RenderTargetPoolConfig {
        min_budget_kb,
        ..Default::default()
    };
    let pool = RenderTargetPool::new(device_context.clone(), config);
    (device_context, pool)
}

fn find(
    pool: &mut TestPool,
    def: &RtTextureDef,
    debug_name: &str,
    render_target: &mut TestRenderTarget,
) -> FindResult {
    let result = pool
        .find_or_allocate(def, debug_name, render_target)
        .unwrap();
    assert_ledger(pool);
    result
}

fn assert_ledger(pool: &TestPool) {
    assert_eq!(pool.get_stats().pool_size_kb, pool.allocation_level_kb());
}

fn tick(pool: &mut TestPool) {
    pool.tick_pool_elements().unwrap();
    assert_ledger(pool);
}

fn id_at(
    pool: &TestPool,
    pool_index: usize,
) -> Option<u64> {
    pool.element_by_index(pool_index).map(|x| x.resource_id().0)
}

fn op_position<F: Fn(&EmptyDeviceOp) -> bool>(
    op_log: &[EmptyDeviceOp],
    f: F,
) -> usize {
    op_log.iter().position(|x| f(x)).unwrap()
}

#[test]
fn test_reuse_then_evict_oldest_over_budget() {
    let (device_context, mut pool) = make_pool(200);

    let mut a = None;
    assert_eq!(find(&mut pool, &color_def(256), "A", &mut a), FindResult::Created);
    assert_eq!(pool.allocation_level_kb(), 256);
    let a_id = a.as_ref().unwrap().resource_id();
    a.take();

    let mut b = None;
    assert_eq!(find(&mut pool, &color_def(256), "B", &mut b), FindResult::Reused);
    assert_eq!(b.as_ref().unwrap().resource_id(), a_id);
    assert_eq!(pool.allocation_level_kb(), 256);
    assert_eq!(device_context.stats().created_count, 1);

    // Reuse renames the texture
    assert_eq!(b.as_ref().unwrap().debug_name(), "B");
    assert_eq!(
        device_context
            .debug_name(b.as_ref().unwrap().texture())
            .as_deref(),
        Some("B")
    );

    let mut c = None;
    assert_eq!(find(&mut pool, &color_def(512), "C", &mut c), FindResult::Created);
    assert_eq!(pool.allocation_level_kb(), 1280);

    b.take();
    tick(&mut pool);
    assert_eq!(pool.allocation_level_kb(), 1024);
    assert_eq!(pool.get_stats().render_target_count, 1);

    // C is still held so the pool cannot get under budget
    assert!(pool.is_over_budget());
}

#[test]
fn test_no_aliasing_while_held() {
    let (device_context, mut pool) = make_pool(0);

    let mut a = None;
    let mut b = None;
    assert_eq!(find(&mut pool, &color_def(256), "a", &mut a), FindResult::Created);
    assert_eq!(find(&mut pool, &color_def(256), "b", &mut b), FindResult::Created);

    let a = a.unwrap();
    let b = b.unwrap();
    assert!(!a.ptr_eq(&b));
    assert_ne!(a.texture(), b.texture());
    assert_eq!(device_context.stats().created_count, 2);
    assert_eq!(pool.allocation_level_kb(), 512);
}

#[test]
fn test_keep_matching_render_target() {
    let (device_context, mut pool) = make_pool(0);

    let mut rt = None;
    find(&mut pool, &color_def(256), "first", &mut rt);
    let id = rt.as_ref().unwrap().resource_id();
    device_context.clear_op_log();

    let result = find(&mut pool, &color_def(256), "second", &mut rt);
    assert_eq!(result, FindResult::Kept);
    assert!(result.reused());
    assert_eq!(rt.as_ref().unwrap().resource_id(), id);
    assert_eq!(rt.as_ref().unwrap().debug_name(), "second");
    assert_eq!(
        device_context.op_log(),
        vec![EmptyDeviceOp::SetDebugName {
            texture_id: rt.as_ref().unwrap().texture().texture_id(),
            debug_name: "second".to_string(),
        }]
    );
}

#[test]
fn test_mismatched_render_target_released_into_pool() {
    let (device_context, mut pool) = make_pool(0);

    let mut rt = None;
    find(&mut pool, &color_def(256), "small", &mut rt);
    let small_id = rt.as_ref().unwrap().resource_id();

    // The held render target is released and stays in the pool as a free entry
    assert_eq!(find(&mut pool, &color_def(512), "large", &mut rt), FindResult::Created);
    assert_eq!(pool.get_stats().render_target_count, 2);
    assert_eq!(pool.get_stats().used_size_kb, 1024);

    let mut other = None;
    assert_eq!(
        find(&mut pool, &color_def(256), "small again", &mut other),
        FindResult::Reused
    );
    assert_eq!(other.as_ref().unwrap().resource_id(), small_id);
    assert_eq!(device_context.stats().created_count, 2);
}

#[test]
fn test_first_free_slot_wins() {
    let (_device_context, mut pool) = make_pool(0);

    let mut rts: Vec<TestRenderTarget> = vec![None, None, None];
    for rt in &mut rts {
        find(&mut pool, &color_def(256), "rt", rt);
    }
    let ids: Vec<_> = rts
        .iter()
        .map(|x| x.as_ref().unwrap().resource_id())
        .collect();

    // Free the last two, the earlier slot is picked
    rts[1].take();
    rts[2].take();

    let mut rt = None;
    assert_eq!(find(&mut pool, &color_def(256), "rt", &mut rt), FindResult::Reused);
    assert_eq!(rt.as_ref().unwrap().resource_id(), ids[1]);
}

#[test]
fn test_fast_memory_falls_back_to_relaxed_match() {
    let (device_context, mut pool) = make_pool(0);
    let fast_def = with_flags(color_def(256), RtTextureFlags::FAST_MEMORY);

    let mut rt = None;
    find(&mut pool, &color_def(256), "slow", &mut rt);
    let slow_id = rt.as_ref().unwrap().resource_id();

    // Not an exact match, so the held one is released and then found by the relaxed pass
    assert_eq!(find(&mut pool, &fast_def, "fast", &mut rt), FindResult::Reused);
    assert_eq!(rt.as_ref().unwrap().resource_id(), slow_id);
    assert_eq!(device_context.stats().created_count, 1);
    rt.take();

    // A fast texture is not handed out to a request that did not ask for fast memory
    let mut fast = None;
    let mut fast_2 = None;
    find(&mut pool, &fast_def, "fast", &mut fast);
    find(&mut pool, &fast_def, "fast 2", &mut fast_2);
    assert_eq!(device_context.stats().created_count, 2);
    fast_2.take();

    let mut slow = None;
    assert_eq!(find(&mut pool, &color_def(256), "slow", &mut slow), FindResult::Created);
    assert_eq!(device_context.stats().created_count, 3);
}

#[test]
fn test_exact_match_preferred_over_relaxed() {
    let (_device_context, mut pool) = make_pool(0);
    let fast_def = with_flags(color_def(256), RtTextureFlags::FAST_MEMORY);

    let mut slow = None;
    let mut fast = None;
    find(&mut pool, &color_def(256), "slow", &mut slow);
    find(&mut pool, &fast_def, "fast", &mut fast);
    let fast_id = fast.as_ref().unwrap().resource_id();
    slow.take();
    fast.take();

    let mut rt = None;
    assert_eq!(find(&mut pool, &fast_def, "fast", &mut rt), FindResult::Reused);
    assert_eq!(rt.as_ref().unwrap().resource_id(), fast_id);
}

#[test]
fn test_invalid_def_is_ignored() {
    let (device_context, mut pool) = make_pool(0);

    let mut rt = None;
    find(&mut pool, &color_def(256), "held", &mut rt);
    let held_id = rt.as_ref().unwrap().resource_id();

    let mut invalid = color_def(256);
    invalid.extents.height = 0;
    let result = find(&mut pool, &invalid, "invalid", &mut rt);
    assert_eq!(result, FindResult::Invalid);
    assert!(!result.reused());

    // Untouched
    assert_eq!(rt.as_ref().unwrap().resource_id(), held_id);
    assert_eq!(pool.allocation_level_kb(), 256);
    assert_eq!(device_context.stats().created_count, 1);
}

#[test]
fn test_create_failure_is_returned() {
    let (device_context, mut pool) = make_pool(0);

    device_context.fail_next_create();
    let mut rt = None;
    assert!(pool
        .find_or_allocate(&color_def(256), "fails", &mut rt)
        .is_err());
    assert!(rt.is_none());
    assert_eq!(pool.allocation_level_kb(), 0);
    assert_eq!(pool.slot_count(), 0);
    assert_ledger(&pool);

    assert_eq!(find(&mut pool, &color_def(256), "works", &mut rt), FindResult::Created);
}

#[test]
fn test_budget_eviction_converges() {
    // 8 free entries of 256 KB with a budget of 1000 KB: ceil((2048 - 1000) / 256) = 5 evictions
    let (_device_context, mut pool) = make_pool(1000);

    let mut rts: Vec<TestRenderTarget> = (0..8).map(|_| None).collect();
    for rt in &mut rts {
        find(&mut pool, &color_def(256), "rt", rt);
    }
    let ids: Vec<_> = rts
        .iter()
        .map(|x| x.as_ref().unwrap().resource_id().0)
        .collect();
    rts.clear();

    tick(&mut pool);
    assert_eq!(pool.allocation_level_kb(), 768);
    assert_eq!(pool.get_stats().render_target_count, 3);
    assert!(!pool.is_over_budget());

    // All had the same age, so the first ones in slot order went first
    tick(&mut pool);
    let remaining: Vec<_> = (0..3).map(|i| id_at(&pool, i).unwrap()).collect();
    assert_eq!(remaining, ids[5..].to_vec());
}

#[test]
fn test_budget_evicts_oldest_first() {
    let (_device_context, mut pool) = make_pool(u64::MAX);

    let mut older = None;
    let mut newer = None;
    find(&mut pool, &color_def(256), "older", &mut older);
    find(&mut pool, &color_def(256), "newer", &mut newer);
    let newer_id = newer.as_ref().unwrap().resource_id();

    older.take();
    tick(&mut pool);
    tick(&mut pool);
    newer.take();

    pool.set_min_budget_kb(256);
    tick(&mut pool);
    assert_eq!(pool.get_stats().render_target_count, 1);
    assert_eq!(pool.element_by_index(1).unwrap().resource_id(), newer_id);
}

#[test]
fn test_over_budget_warning_resolves() {
    let (_device_context, mut pool) = make_pool(200);

    let mut rt = None;
    find(&mut pool, &color_def(256), "held", &mut rt);
    tick(&mut pool);
    assert!(pool.is_over_budget());
    tick(&mut pool);
    assert!(pool.is_over_budget());

    rt.take();
    tick(&mut pool);
    assert!(!pool.is_over_budget());
    assert_eq!(pool.allocation_level_kb(), 0);
}

#[test]
fn test_grace_period() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    rt.take();

    for _ in 0..10 {
        tick(&mut pool);
        assert_eq!(pool.get_stats().render_target_count, 1);
    }

    tick(&mut pool);
    assert_eq!(pool.get_stats().render_target_count, 0);
    assert_eq!(pool.allocation_level_kb(), 0);

    // Destroyed on the following tick
    assert_eq!(device_context.stats().live_count, 1);
    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 0);
}

#[test]
fn test_free_released_render_target_during_grace_period() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    rt.take();
    tick(&mut pool);

    let mut rt = pool.element_by_index(0).cloned();
    assert!(rt.is_some());
    assert!(pool.free_unused_resource(&mut rt).unwrap());
    assert!(rt.is_none());
    assert_eq!(pool.get_stats().render_target_count, 0);
    assert_eq!(pool.allocation_level_kb(), 0);
    assert_ledger(&pool);

    assert_eq!(device_context.stats().live_count, 1);
    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 0);
}

#[test]
fn test_reuse_resets_age() {
    let (_device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    rt.take();
    for _ in 0..8 {
        tick(&mut pool);
    }

    assert_eq!(find(&mut pool, &color_def(256), "rt", &mut rt), FindResult::Reused);
    rt.take();
    for _ in 0..10 {
        tick(&mut pool);
    }
    assert_eq!(pool.get_stats().render_target_count, 1);

    tick(&mut pool);
    assert_eq!(pool.get_stats().render_target_count, 0);
}

#[test]
fn test_in_use_render_targets_never_age_out() {
    let (_device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    for _ in 0..20 {
        tick(&mut pool);
    }
    assert_eq!(pool.get_stats().render_target_count, 1);
    assert_eq!(pool.get_stats().used_size_kb, 256);
}

#[test]
fn test_free_unused_resource_is_immediate_but_destroy_is_deferred() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    tick(&mut pool);

    assert!(pool.free_unused_resource(&mut rt).unwrap());
    assert!(rt.is_none());
    assert_eq!(pool.allocation_level_kb(), 0);
    assert_eq!(pool.get_stats().render_target_count, 0);
    assert_ledger(&pool);

    // The texture survives until the next tick
    assert_eq!(device_context.stats().live_count, 1);
    assert_eq!(pool.pending_destroy_count(), 1);

    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 0);
    assert_eq!(pool.pending_destroy_count(), 0);

    // Nothing to free
    assert!(!pool.free_unused_resource(&mut rt).unwrap());
}

#[test]
fn test_free_unused_resource_with_other_holders() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    let other_holder = rt.clone().unwrap();

    assert!(pool.free_unused_resource(&mut rt).unwrap());
    assert_eq!(pool.allocation_level_kb(), 0);

    // Still referenced elsewhere, so the texture stays alive
    tick(&mut pool);
    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 1);

    std::mem::drop(other_holder);
    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 0);
}

#[test]
fn test_free_unused_resources() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rts: Vec<TestRenderTarget> = vec![None, None, None];
    for rt in &mut rts {
        find(&mut pool, &color_def(256), "rt", rt);
    }
    rts[0].take();
    rts[2].take();

    assert_eq!(pool.free_unused_resources().unwrap(), 2);
    assert_eq!(pool.allocation_level_kb(), 256);
    assert_ledger(&pool);

    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 1);
    assert_eq!(pool.get_stats().render_target_count, 1);
}

#[test]
fn test_max_frames_in_flight_delays_destroy() {
    let device_context = EmptyDeviceContext::new();
    let config = RenderTargetPoolConfig {
        max_frames_in_flight: 2,
        ..Default::default()
    };
    let mut pool = RenderTargetPool::new(device_context.clone(), config);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    pool.free_unused_resource(&mut rt).unwrap();

    tick(&mut pool);
    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 1);
    tick(&mut pool);
    assert_eq!(device_context.stats().live_count, 0);
}

#[test]
fn test_transition_batches_auto_writable() {
    let (device_context, mut pool) = make_pool(u64::MAX);
    let writable_def = with_flags(color_def(256), RtTextureFlags::AUTO_WRITABLE);

    let mut a = None;
    let mut b = None;
    let mut c = None;
    find(&mut pool, &writable_def, "a", &mut a);
    find(&mut pool, &color_def(256), "b", &mut b);
    find(&mut pool, &writable_def, "c", &mut c);
    // Free render targets are transitioned too
    c.take();
    device_context.clear_op_log();

    pool.transition_targets_writable().unwrap();
    pool.transition_targets_writable().unwrap();

    let a_id = a.as_ref().unwrap().texture().texture_id();
    let c_id = pool.element_by_index(2).unwrap().texture().texture_id();
    assert_eq!(
        device_context.op_log(),
        vec![
            EmptyDeviceOp::TransitionTextures {
                texture_ids: vec![a_id, c_id],
                state: RtResourceState::RENDER_TARGET,
                fence_id: Some(1),
            },
            EmptyDeviceOp::WaitForFence { fence_id: 1 },
            EmptyDeviceOp::TransitionTextures {
                texture_ids: vec![a_id, c_id],
                state: RtResourceState::RENDER_TARGET,
                fence_id: Some(2),
            },
        ]
    );

    // The next tick waits for the outstanding fence
    tick(&mut pool);
    assert_eq!(
        device_context.op_log().last(),
        Some(&EmptyDeviceOp::WaitForFence { fence_id: 2 })
    );
    assert_eq!(device_context.stats().transition_batch_count, 2);
}

#[test]
fn test_transition_without_auto_writable_skips_device() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    pool.transition_targets_writable().unwrap();
    assert_eq!(device_context.stats().transition_batch_count, 0);
}

#[test]
fn test_transition_writable_single() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    let render_target = rt.as_ref().unwrap();
    pool.transition_writable(render_target).unwrap();

    assert_eq!(
        device_context.texture_state(render_target.texture()),
        Some(RtResourceState::RENDER_TARGET)
    );
    assert_eq!(device_context.stats().transition_batch_count, 1);

    pool.wait_for_transition_fence().unwrap();
    assert_eq!(device_context.stats().fence_wait_count, 1);
}

#[test]
fn test_fence_waited_before_destroy() {
    let (device_context, mut pool) = make_pool(u64::MAX);
    let writable_def = with_flags(color_def(256), RtTextureFlags::AUTO_WRITABLE);

    let mut rt = None;
    find(&mut pool, &writable_def, "rt", &mut rt);
    let texture_id = rt.as_ref().unwrap().texture().texture_id();

    pool.transition_targets_writable().unwrap();
    pool.free_unused_resource(&mut rt).unwrap();
    tick(&mut pool);

    let op_log = device_context.op_log();
    let transition = op_position(&op_log, |x| {
        matches!(x, EmptyDeviceOp::TransitionTextures { .. })
    });
    let wait = op_position(&op_log, |x| {
        *x == EmptyDeviceOp::WaitForFence { fence_id: 1 }
    });
    let destroy = op_position(&op_log, |x| {
        *x == EmptyDeviceOp::DestroyTexture { texture_id }
    });
    assert!(transition < wait);
    assert!(wait < destroy);
}

#[test]
fn test_snapshots_do_not_affect_bookkeeping() {
    let (_device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "scene_color", &mut rt);
    let render_target = rt.clone().unwrap();
    let stats_before = pool.get_stats();
    let ref_count_before = render_target.ref_count();

    let snapshot = pool.make_snapshot(&render_target);
    assert_eq!(pool.get_stats(), stats_before);
    assert_eq!(render_target.ref_count(), ref_count_before);
    assert_eq!(pool.snapshot_count(), 1);
    assert_eq!(snapshot.ref_count(), 1);
    assert_eq!(snapshot.texture_def(), render_target.texture_def());

    // Readable from another thread
    let reader_snapshot = snapshot.clone();
    let texture = std::thread::spawn(move || reader_snapshot.texture().clone())
        .join()
        .unwrap();
    assert_eq!(&texture, render_target.texture());

    pool.destroy_all_snapshots();
    assert_eq!(pool.get_stats(), stats_before);
    assert_eq!(render_target.ref_count(), ref_count_before);
    assert_eq!(pool.snapshot_count(), 0);
    assert!(!snapshot.is_alive());

    // A snapshot is never handed out by the pool, releasing the handle frees the slot
    std::mem::drop(render_target);
    rt.take();
    let mut other = None;
    assert_eq!(
        find(&mut pool, &color_def(256), "other", &mut other),
        FindResult::Reused
    );
}

#[test]
fn test_untracked_render_target() {
    let (device_context, mut pool) = make_pool(0);
    let def = color_def(256);
    let texture = device_context
        .create_texture(&def, def.category(), "external")
        .unwrap();

    let untracked = pool.create_untracked(&def, "external", texture);
    assert!(untracked.is_untracked());
    assert_eq!(pool.slot_count(), 0);
    assert_eq!(pool.allocation_level_kb(), 0);

    // Never matched
    let mut rt = None;
    assert_eq!(find(&mut pool, &def, "pooled", &mut rt), FindResult::Created);
    assert!(!rt.as_ref().unwrap().ptr_eq(&untracked));
    assert_eq!(pool.allocation_level_kb(), 256);

    std::mem::drop(untracked);
    tick(&mut pool);
    assert_eq!(device_context.stats().destroyed_count, 1);
    assert_eq!(device_context.stats().live_count, 1);
}

#[test]
fn test_compaction_preserves_order() {
    let (_device_context, mut pool) = make_pool(u64::MAX);

    let mut rts: Vec<TestRenderTarget> = (0..4).map(|_| None).collect();
    for rt in &mut rts {
        find(&mut pool, &color_def(256), "rt", rt);
    }

    pool.free_unused_resource(&mut rts[1]).unwrap();
    assert_eq!(pool.slot_count(), 4);
    assert!(pool.element_by_index(1).is_none());

    tick(&mut pool);
    assert_eq!(pool.slot_count(), 3);
    let ids: Vec<_> = (0..3).map(|i| id_at(&pool, i).unwrap()).collect();
    let expected: Vec<_> = [0, 2, 3]
        .iter()
        .map(|i| rts[*i].as_ref().unwrap().resource_id().0)
        .collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_listener_events() {
    let (_device_context, mut pool) = make_pool(u64::MAX);
    let recorder = RenderTargetPoolEventRecorder::new(0);
    let events = recorder.events();
    pool.set_listener(Box::new(recorder));

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    let resource_id = rt.as_ref().unwrap().resource_id();
    tick(&mut pool);
    pool.free_unused_resource(&mut rt).unwrap();

    let alloc = RenderTargetPoolEvent::Alloc {
        pool_index: 0,
        resource_id,
        debug_name: "rt".to_string(),
        size_kb: 256,
        fast_memory: false,
    };
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            alloc.clone(),
            RenderTargetPoolEvent::Phase {
                name: "FromLastFrame"
            },
            alloc,
            RenderTargetPoolEvent::Phase { name: "Rendering" },
            RenderTargetPoolEvent::Evict {
                pool_index: 0,
                resource_id,
                size_kb: 256,
                reason: EvictReason::Explicit,
            },
        ]
    );

    assert!(pool.remove_listener().is_some());
}

#[test]
fn test_dump_memory_usage() {
    let (_device_context, mut pool) = make_pool(u64::MAX);

    let mut held = None;
    let mut free = None;
    find(&mut pool, &color_def(256), "scene_color", &mut held);
    find(&mut pool, &color_def(256), "bloom", &mut free);
    free.take();

    let mut dump = String::new();
    pool.dump_memory_usage(&mut dump).unwrap();
    let lines: Vec<_> = dump.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Pooled render targets:");
    assert!(lines[1].contains("'scene_color' (in use)"));
    assert!(lines[1].contains("256x256 R8G8B8A8_UNORM"));
    assert!(lines[2].contains("'bloom' (unused for 0 frames)"));
    assert_eq!(lines[3], "0.500MB total, 0.250MB used, 2 render targets");
}

#[test]
fn test_destroy() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut a = None;
    let mut b = None;
    find(&mut pool, &color_def(256), "a", &mut a);
    find(&mut pool, &color_def(256), "b", &mut b);
    pool.free_unused_resource(&mut a).unwrap();
    b.take();
    let snapshot_source = pool.element_by_index(1).unwrap().clone();
    pool.make_snapshot(&snapshot_source);
    std::mem::drop(snapshot_source);

    pool.destroy().unwrap();
    assert_eq!(device_context.stats().live_count, 0);
    assert_eq!(device_context.stats().destroyed_count, 2);
    assert_eq!(pool.allocation_level_kb(), 0);
    assert_eq!(pool.snapshot_count(), 0);

    // Dropping after destroy does nothing more
    std::mem::drop(pool);
    assert_eq!(device_context.stats().destroyed_count, 2);
}

#[test]
fn test_render_targets_allocated_after_destroy_are_destroyed_on_drop() {
    let (device_context, mut pool) = make_pool(u64::MAX);
    pool.destroy().unwrap();

    let mut rt = None;
    assert_eq!(find(&mut pool, &color_def(256), "late", &mut rt), FindResult::Created);
    rt.take();
    assert_eq!(device_context.stats().live_count, 1);

    std::mem::drop(pool);
    assert_eq!(device_context.stats().live_count, 0);
    assert_eq!(device_context.stats().destroyed_count, 1);
}

#[test]
fn test_drop_after_destroy_with_frames_in_flight() {
    let device_context = EmptyDeviceContext::new();
    let config = RenderTargetPoolConfig {
        max_frames_in_flight: 1,
        ..Default::default()
    };
    let mut pool = RenderTargetPool::new(device_context.clone(), config);
    pool.destroy().unwrap();

    let mut a = None;
    let mut b = None;
    find(&mut pool, &color_def(256), "a", &mut a);
    find(&mut pool, &color_def(256), "b", &mut b);
    a.take();
    pool.free_unused_resource(&mut b).unwrap();
    tick(&mut pool);

    // b is still waiting out the frame in flight
    assert_eq!(pool.pending_destroy_count(), 1);
    std::mem::drop(pool);
    assert_eq!(device_context.stats().live_count, 0);
}

#[test]
fn test_drop_destroys_textures() {
    let (device_context, mut pool) = make_pool(u64::MAX);

    let mut rt = None;
    find(&mut pool, &color_def(256), "rt", &mut rt);
    rt.take();

    std::mem::drop(pool);
    assert_eq!(device_context.stats().live_count, 0);
}

#[test]
fn test_ledger_matches_after_mixed_operations() {
    let (_device_context, mut pool) = make_pool(512);
    let sizes = [256, 512, 256, 128, 512, 256];

    let mut held: Vec<TestRenderTarget> = Vec::new();
    for frame in 0..30 {
        tick(&mut pool);

        let size = sizes[frame % sizes.len()];
        let mut rt = None;
        find(&mut pool, &color_def(size), "rt", &mut rt);
        held.push(rt);

        if frame % 3 == 0 {
            std::mem::drop(held.remove(0));
        }
        if frame % 7 == 0 {
            pool.free_unused_resources().unwrap();
            assert_ledger(&pool);
        }
        if frame % 5 == 0 && !held.is_empty() {
            pool.free_unused_resource(&mut held[0]).unwrap();
            assert_ledger(&pool);
        }
    }
}
