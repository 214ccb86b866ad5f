//! # Texture Stress
//!
//! Loads the same set of textures from many threads at once, drops every
//! reference and repeats. Each round must decode every file exactly once and
//! leave the cache empty afterwards.
//!
//! ```text
//! texture_stress --threads 16 --textures 64 --rounds 8
//! texture_stress --backend vulkan --assets ./Textures
//! ```

use std::path::{Path, PathBuf};
use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use clap::Parser;
use ember_demos::generate_textures;
use ember_graphics::{
    BackendType, DefaultTexture, GraphicsConfig, GraphicsCore, TextureLoadState, TextureRef,
};
use ember_vfs::{DirectorySource, MemorySource, Vfs};

const GENERATED_MOUNT: &str = "generated";
const DISK_MOUNT: &str = "disk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
enum CliBackend {
    /// Headless software device.
    #[default]
    Dummy,
    /// Native Vulkan device, falling back to dummy when unavailable.
    Vulkan,
}

impl From<CliBackend> for BackendType {
    fn from(cli: CliBackend) -> Self {
        match cli {
            CliBackend::Dummy => BackendType::Dummy,
            CliBackend::Vulkan => BackendType::Vulkan,
        }
    }
}

/// Ember texture streaming stress test.
#[derive(Parser, Debug)]
#[command(name = "texture_stress", version)]
struct Args {
    /// Device to run against.
    #[arg(long, default_value = "dummy", value_enum)]
    backend: CliBackend,

    /// Enable API validation layers.
    #[arg(long)]
    validation: bool,

    /// Number of loader threads.
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u16).range(1..))]
    threads: u16,

    /// Number of generated textures.
    #[arg(long, default_value = "32")]
    textures: usize,

    /// Edge length of generated textures in pixels.
    #[arg(long, default_value = "64")]
    size: u32,

    /// Number of names per round that point at nothing.
    #[arg(long, default_value = "2")]
    missing: usize,

    /// Times the whole set is loaded and released.
    #[arg(long, default_value = "4")]
    rounds: usize,

    /// Also load every png/tga/dds file found in this directory.
    #[arg(long)]
    assets: Option<PathBuf>,
}

#[derive(Default)]
struct RoundStats {
    valid: AtomicUsize,
    invalid: AtomicUsize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    ember_graphics::profiling::start();

    let args = Args::parse();
    log::info!("ember texture stress v{}", ember_demos::VERSION);

    let generated = MemorySource::new();
    let mut paths: Vec<String> = generate_textures(&generated, args.textures, args.size)?
        .into_iter()
        .map(|name| format!("{GENERATED_MOUNT}/{name}"))
        .collect();
    paths.extend((0..args.missing).map(|i| format!("{GENERATED_MOUNT}/missing_{i:03}.png")));

    let mut vfs = Vfs::new();
    vfs.mount(GENERATED_MOUNT, generated.clone());
    if let Some(dir) = &args.assets {
        let found = texture_files(dir)?;
        log::info!("found {} texture files in {}", found.len(), dir.display());
        paths.extend(found.into_iter().map(|name| format!("{DISK_MOUNT}/{name}")));
        vfs.mount(DISK_MOUNT, DirectorySource::new(dir));
    }

    let config = GraphicsConfig::new()
        .with_backend(args.backend.into())
        .with_validation(args.validation)
        .with_application_name("texture_stress")
        .with_texture_root("");
    let core = GraphicsCore::new(config, vfs)?;
    log::info!("device: {}", core.device().raw().name());

    let started = Instant::now();
    for round in 0..args.rounds {
        let loads_before = core.textures().load_count();
        let stats = RoundStats::default();
        let barrier = Barrier::new(usize::from(args.threads));

        thread::scope(|scope| {
            for worker in 0..usize::from(args.threads) {
                let (core, paths, stats, barrier) = (&core, &paths, &stats, &barrier);
                scope.spawn(move || {
                    ember_graphics::set_thread_name!("texture worker");
                    let held = load_all(core, paths, worker, stats);
                    // Every worker holds its references until all have loaded.
                    barrier.wait();
                    log::trace!("worker {worker} releases {} textures", held.len());
                });
            }
        });

        let loads = core.textures().load_count() - loads_before;
        let cached = core.textures().cache().len();
        log::info!(
            "round {}: {} loads, {} valid / {} invalid references, {} left cached",
            round,
            loads,
            stats.valid.load(Ordering::Relaxed),
            stats.invalid.load(Ordering::Relaxed),
            cached
        );
        if loads != paths.len() || cached != 0 {
            log::warn!("round {round} expected {} loads and an empty cache", paths.len());
        }
        ember_graphics::profile_plot!("texture loads", loads);
        ember_graphics::frame_mark!();
    }

    log::info!(
        "{} rounds in {:.2?}, {} file reads, {} evictions",
        args.rounds,
        started.elapsed(),
        generated.read_count(),
        core.textures().cache().eviction_count()
    );

    core.shutdown()?;
    Ok(())
}

/// Load every path, starting at an offset so threads collide on different keys.
fn load_all(
    core: &GraphicsCore,
    paths: &[String],
    worker: usize,
    stats: &RoundStats,
) -> Vec<TextureRef> {
    ember_graphics::profile_function!();

    let start = worker % paths.len().max(1);
    let order = paths[start..].iter().chain(&paths[..start]);

    order
        .map(|path| {
            let texture = core.textures().load_from_file(path, DefaultTexture::Magenta2D, false);
            match texture.state() {
                TextureLoadState::Valid => stats.valid.fetch_add(1, Ordering::Relaxed),
                _ => stats.invalid.fetch_add(1, Ordering::Relaxed),
            };
            texture
        })
        .collect()
}

fn texture_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if matches!(
            ember_vfs::path::extension(&name).as_deref(),
            Some("png" | "tga" | "dds")
        ) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
