use rtpool::{
    PooledRenderTarget, RenderTargetPool, RenderTargetPoolConfig, RenderTargetPoolEventRecorder,
};
use rtpool_api::empty::{EmptyDeviceContext, RtTextureEmpty};
use rtpool_api::{RtFormat, RtResult, RtTextureDef, RtTextureFlags};
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct DemoArgs {
    /// Pool budget in MB, clamped to 2000
    #[structopt(name = "min-budget-mb", long, default_value = "64")]
    pub min_budget_mb: u32,

    /// Number of frames to simulate
    #[structopt(name = "frames", long, default_value = "120")]
    pub frames: u32,

    /// The output resolution halves every N frames to force render targets to be replaced
    #[structopt(name = "resize-every", long, default_value = "40")]
    pub resize_every: u32,

    /// Record pool events for render targets of at least this many KB
    #[structopt(name = "record-events-kb", long)]
    pub record_events_kb: Option<u64>,
}

pub fn logging_init() {
    #[cfg(not(debug_assertions))]
    let log_level = log::LevelFilter::Info;
    #[cfg(debug_assertions)]
    let log_level = log::LevelFilter::Debug;

    // Setup logging
    env_logger::Builder::from_default_env()
        .default_format_timestamp_nanos(true)
        .filter_module("rtpool::pool", log::LevelFilter::Debug)
        .filter_module("rtpool::transition", log::LevelFilter::Info)
        .filter_module("rtpool_api::backends::empty", log::LevelFilter::Info)
        .filter_level(log_level)
        .init();
}

type DemoRenderTarget = Option<PooledRenderTarget<RtTextureEmpty>>;

// Render targets a simulated frame holds on to between passes
#[derive(Default)]
struct FrameTargets {
    scene_color: DemoRenderTarget,
    depth: DemoRenderTarget,
    bloom: Vec<DemoRenderTarget>,
}

fn render_frame(
    pool: &mut RenderTargetPool<EmptyDeviceContext>,
    frame_targets: &mut FrameTargets,
    width: u32,
    height: u32,
) -> RtResult<()> {
    profiling::scope!("render_frame");

    let scene_color_def = RtTextureDef::new_2d(
        width,
        height,
        RtFormat::R16G16B16A16_SFLOAT,
        RtTextureFlags::RENDER_TARGET
            | RtTextureFlags::SHADER_RESOURCE
            | RtTextureFlags::AUTO_WRITABLE
            | RtTextureFlags::FAST_MEMORY,
    );
    pool.find_or_allocate(&scene_color_def, "scene_color", &mut frame_targets.scene_color)?;

    let depth_def = RtTextureDef::new_2d(
        width,
        height,
        RtFormat::D32_SFLOAT,
        RtTextureFlags::DEPTH_STENCIL | RtTextureFlags::SHADER_RESOURCE,
    );
    pool.find_or_allocate(&depth_def, "depth", &mut frame_targets.depth)?;

    // Bloom downsample chain, released as soon as the frame is done with it
    let mut bloom_width = width / 2;
    let mut bloom_height = height / 2;
    let mut bloom = Vec::new();
    for mip in 0..5 {
        let bloom_def = RtTextureDef::new_2d(
            bloom_width,
            bloom_height,
            RtFormat::B10G11R11_UFLOAT_PACK32,
            RtTextureFlags::RENDER_TARGET | RtTextureFlags::SHADER_RESOURCE,
        );

        let mut render_target = None;
        let result = pool.find_or_allocate(
            &bloom_def,
            &format!("bloom_{}", mip),
            &mut render_target,
        )?;
        if let Some(render_target) = &render_target {
            if result.reused() {
                pool.transition_writable(render_target)?;
            }
        }
        bloom.push(render_target);

        bloom_width /= 2;
        bloom_height /= 2;
    }
    frame_targets.bloom = bloom;

    // A second thread reads the final color target through a snapshot
    if let Some(scene_color) = &frame_targets.scene_color {
        let snapshot = pool.make_snapshot(scene_color);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                log::trace!(
                    "Reader sees texture {} for '{}'",
                    snapshot.texture().texture_id(),
                    snapshot.debug_name()
                );
            });
        });
    }
    pool.destroy_all_snapshots();

    frame_targets.bloom.clear();
    pool.transition_targets_writable()
}

fn run(args: &DemoArgs) -> RtResult<()> {
    let device_context = EmptyDeviceContext::new();
    let config = RenderTargetPoolConfig::from_min_budget_mb(args.min_budget_mb);
    let mut pool = RenderTargetPool::new(device_context.clone(), config);

    let recorded_events = args.record_events_kb.map(|size_threshold_kb| {
        let recorder = RenderTargetPoolEventRecorder::new(size_threshold_kb);
        let events = recorder.events();
        pool.set_listener(Box::new(recorder));
        events
    });

    let mut frame_targets = FrameTargets::default();
    let mut width = 1920;
    let mut height = 1080;

    for frame in 0..args.frames {
        profiling::scope!("frame");
        if args.resize_every > 0 && frame > 0 && frame % args.resize_every == 0 {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            log::info!("Resized output to {}x{}", width, height);
        }

        pool.tick_pool_elements()?;
        render_frame(&mut pool, &mut frame_targets, width, height)?;
        profiling::finish_frame!();
    }

    let stats = pool.get_stats();
    log::info!(
        "{} render targets, {} KB in pool, {} KB in use, {} textures created",
        stats.render_target_count,
        stats.pool_size_kb,
        stats.used_size_kb,
        device_context.stats().created_count
    );
    pool.log_memory_usage();

    if let Some(recorded_events) = recorded_events {
        log::info!(
            "Recorded {} pool events",
            recorded_events.lock().unwrap().len()
        );
    }

    std::mem::drop(frame_targets);
    pool.destroy()?;
    log::info!(
        "Shut down with {} live textures",
        device_context.stats().live_count
    );
    Ok(())
}

fn main() {
    logging_init();

    let args = DemoArgs::from_args();
    if let Err(e) = run(&args) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
