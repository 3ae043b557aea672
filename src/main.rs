//! voxtrace CLI - headless rendering and snapshot tools.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use voxtrace::grid::{Material, SharedGrid, VoxelGrid};
use voxtrace::persist::{SaveSlots, Snapshot};
use voxtrace::render::{Renderer, SppController, TARGET_FPS};
use voxtrace::scene::{Preset, SceneConfig};

/// Verbosity levels
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("voxtrace");

    // Parse global flags
    let mut level = LOG_INFO;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => level = LOG_DEBUG,
            "-vv" | "--trace" => level = LOG_DEBUG + 1,
            "-q" | "--quiet" => level = LOG_QUIET,
            _ => filtered_args.push(arg),
        }
    }
    #[allow(clippy::let_unit_value)]
    let _guard = init_tracing(level);

    if filtered_args.is_empty() {
        print_usage(prog);
        return;
    }

    let rest = &filtered_args[1..];
    let result = match filtered_args[0] {
        "render" | "r" => cmd_render(rest),
        "info" | "i" => match rest.first() {
            Some(path) => cmd_info(Path::new(path)),
            None => usage_error(prog, "info <snapshot.vxs>"),
        },
        "save-preset" => match rest {
            [name, dir, ..] => cmd_save_preset(name, Path::new(dir)),
            _ => usage_error(prog, "save-preset <NAME> <DIR>"),
        },
        "slots" | "s" => cmd_slots(rest.first().map(PathBuf::from)),
        "help" | "h" | "-h" | "--help" => {
            print_usage(prog);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(prog);
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn usage_error(prog: &str, usage: &str) -> Result<()> {
    eprintln!("Usage: {} {}", prog, usage);
    std::process::exit(1);
}

fn console_filter(level: u8) -> EnvFilter {
    let default = match level {
        LOG_QUIET => "warn",
        LOG_INFO => "info",
        LOG_DEBUG => "debug",
        _ => "trace",
    };
    // RUST_LOG wins when set
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voxtrace={}", default)))
}

/// Console logging on stderr. With `VOXTRACE_TRACE=1`, spans also go to `trace.json`.
#[cfg(feature = "chrome-trace")]
fn init_tracing(level: u8) -> Option<tracing_chrome::FlushGuard> {
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(console_filter(level))
        .with(fmt);

    if std::env::var("VOXTRACE_TRACE").ok().as_deref() != Some("1") {
        let _ = registry.try_init();
        return None;
    }
    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file("trace.json")
        .build();
    registry.with(chrome_layer).try_init().ok()?;
    Some(guard)
}

/// Console logging on stderr.
#[cfg(not(feature = "chrome-trace"))]
fn init_tracing(level: u8) {
    let fmt = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(console_filter(level))
        .with(fmt)
        .try_init();
}

fn print_usage(prog: &str) {
    println!(
        "voxtrace - progressive voxel path tracer (built {} {})",
        voxtrace::BUILD_DATE,
        voxtrace::BUILD_TIME
    );
    println!();
    println!("Usage: {} [options] <command> [args]", prog);
    println!();
    println!("Commands:");
    println!("  r, render       Render a preset or snapshot to PNG");
    println!("      --preset NAME     wall | cornell | empty (default: wall)");
    println!("      --snapshot FILE   Load voxels from a snapshot instead");
    println!("      --config FILE     Scene config JSON");
    println!("      --size WxH        Image size (default: 640x360)");
    println!("      --frames N        Adaptive frames to run (default: 30)");
    println!("      --fps F           Target frame rate (default: {})", TARGET_FPS);
    println!("      --out FILE        Output PNG (default: render.png)");
    println!("  i, info FILE    Show snapshot contents");
    println!("  save-preset NAME DIR");
    println!("                  Store a preset as a new save slot");
    println!("  s, slots [DIR]  List save slots, newest first");
    println!("  h, help         Show this help");
    println!();
    println!("Options:");
    println!("  -v, --verbose  Debug output");
    println!("  -vv, --trace   Trace output (very verbose)");
    println!("  -q, --quiet    Warnings only");
}

struct RenderOpts {
    preset: Preset,
    snapshot: Option<PathBuf>,
    config: Option<PathBuf>,
    width: u32,
    height: u32,
    frames: u32,
    fps: f32,
    out: PathBuf,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            preset: Preset::Wall,
            snapshot: None,
            config: None,
            width: 640,
            height: 360,
            frames: 30,
            fps: TARGET_FPS,
            out: PathBuf::from("render.png"),
        }
    }
}

fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("size must look like WxH, got '{}'", s))?;
    let w: u32 = w.parse().with_context(|| format!("bad width '{}'", w))?;
    let h: u32 = h.parse().with_context(|| format!("bad height '{}'", h))?;
    if w == 0 || h == 0 {
        bail!("image size must be non-zero");
    }
    Ok((w, h))
}

fn parse_render_opts(args: &[&str]) -> Result<RenderOpts> {
    let mut opts = RenderOpts::default();
    let mut it = args.iter().copied();
    while let Some(flag) = it.next() {
        let mut value = || it.next().with_context(|| format!("{} needs a value", flag));
        match flag {
            "--preset" => opts.preset = value()?.parse()?,
            "--snapshot" => opts.snapshot = Some(PathBuf::from(value()?)),
            "--config" => opts.config = Some(PathBuf::from(value()?)),
            "--size" => (opts.width, opts.height) = parse_size(value()?)?,
            "--frames" => opts.frames = value()?.parse().context("--frames")?,
            "--fps" => opts.fps = value()?.parse().context("--fps")?,
            "--out" | "-o" => opts.out = PathBuf::from(value()?),
            other => bail!("unknown render option '{}'", other),
        }
    }
    Ok(opts)
}

fn read_snapshot(path: &Path) -> Result<(Snapshot, VoxelGrid)> {
    let blob = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot = Snapshot::decode(&blob).with_context(|| format!("decoding {}", path.display()))?;
    let mut grid = VoxelGrid::new(snapshot.resolution, snapshot.voxel_dx);
    snapshot.apply(&mut grid)?;
    Ok((snapshot, grid))
}

fn cmd_render(args: &[&str]) -> Result<()> {
    let opts = parse_render_opts(args)?;

    let grid = match &opts.snapshot {
        Some(path) => read_snapshot(path)?.1,
        None => opts.preset.build(),
    };
    let config = match &opts.config {
        Some(path) => SceneConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => opts.preset.config(),
    };
    tracing::info!(voxels = grid.non_empty_count(), "scene ready");

    let shared = Arc::new(SharedGrid::new(grid));
    let mut renderer = Renderer::new(shared, opts.width, opts.height)
        .with_camera(opts.preset.camera())
        .with_config(config);
    let mut controller = SppController::new(opts.fps);

    let start = Instant::now();
    for frame in 0..opts.frames {
        let stats = renderer.render_frame(&mut controller);
        tracing::debug!(
            frame,
            spp = stats.spp,
            ms = stats.elapsed.as_secs_f32() * 1000.0,
            total = stats.total_samples,
            "frame"
        );
    }

    let image = renderer.fetch_image();
    let rgb = image::RgbImage::from_raw(image.width, image.height, image.to_rgb8())
        .context("image buffer size mismatch")?;
    rgb.save(&opts.out)
        .with_context(|| format!("writing {}", opts.out.display()))?;

    println!(
        "Rendered {}x{} at {} spp in {:.2?} -> {}",
        image.width,
        image.height,
        renderer.samples(),
        start.elapsed(),
        opts.out.display()
    );
    Ok(())
}

fn cmd_info(path: &Path) -> Result<()> {
    let (snapshot, mut grid) = read_snapshot(path)?;
    grid.recompute_bounding_box();
    let (diffuse, emissive) = grid.material_counts();

    println!("Snapshot: {}", path.display());
    println!("Resolution: {}^3", snapshot.resolution);
    println!("Voxel size: {}", snapshot.voxel_dx);
    println!("Voxels: {}", grid.non_empty_count());
    println!("  {:?}: {}", Material::Diffuse, diffuse);
    println!("  {:?}: {}", Material::Emissive, emissive);
    match grid.index_bounds() {
        Some((lo, hi)) => {
            let bbox = grid.bounding_box();
            println!("Index range: {} .. {}", lo, hi);
            println!("Bounds: {} .. {}", bbox.min, bbox.max);
        }
        None => println!("Bounds: empty"),
    }
    Ok(())
}

fn cmd_save_preset(name: &str, dir: &Path) -> Result<()> {
    let preset: Preset = name.parse()?;
    let grid = preset.build();
    let path = SaveSlots::new(dir).save(&grid)?;
    println!("Saved {} ({} voxels) to {}", preset, grid.non_empty_count(), path.display());
    Ok(())
}

fn cmd_slots(dir: Option<PathBuf>) -> Result<()> {
    let slots = SaveSlots::new(dir.unwrap_or_else(SaveSlots::default_dir));
    let list = slots.list()?;
    if list.is_empty() {
        println!("No save slots in {}", slots.dir().display());
        return Ok(());
    }
    for path in list {
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("?");
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        println!("{:<36} {:>10} bytes", name, size);
    }
    Ok(())
}
