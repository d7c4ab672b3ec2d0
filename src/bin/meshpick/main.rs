//! meshpick CLI - Build mesh BVHs from a scene file and cast picking rays.

use anyhow::{bail, Context};
use meshpick::prelude::*;
use std::env;
use std::time::Instant;

const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

fn env_filter(level: u8) -> tracing_subscriber::EnvFilter {
    let default = match level {
        LOG_QUIET => "error",
        LOG_INFO => "info",
        LOG_DEBUG => "debug",
        _ => "trace",
    };
    tracing_subscriber::EnvFilter::try_from_env("MESHPICK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
}

/// Console logging on stderr; `MESHPICK_LOG` overrides the verbosity flags.
/// `MESHPICK_TRACE=1` also writes trace.json.
#[cfg(feature = "chrome-trace")]
fn init_tracing(level: u8) -> Option<tracing_chrome::FlushGuard> {
    use tracing_subscriber::prelude::*;

    let (chrome_layer, guard) = if env::var("MESHPICK_TRACE").ok().as_deref() == Some("1") {
        let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(chrome_layer);
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    guard
}

/// Console logging on stderr; `MESHPICK_LOG` overrides the verbosity flags.
#[cfg(not(feature = "chrome-trace"))]
fn init_tracing(level: u8) {
    use tracing_subscriber::prelude::*;

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = LOG_INFO;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = LOG_DEBUG,
            "-vv" | "--trace" => level = LOG_TRACE,
            "-q" | "--quiet" => level = LOG_QUIET,
            _ => filtered_args.push(arg),
        }
    }
    #[cfg(feature = "chrome-trace")]
    let _guard = init_tracing(level);
    #[cfg(not(feature = "chrome-trace"))]
    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "stats" | "s" => cmd_stats(&filtered_args[1..]),
        "pick" | "p" => cmd_pick(&filtered_args[1..]),
        "demo" | "d" => cmd_demo(&filtered_args[1..]),
        "--version" | "-V" => {
            println!(
                "meshpick {} (built {} {})",
                env!("CARGO_PKG_VERSION"),
                env!("MESHPICK_BUILD_DATE"),
                env!("MESHPICK_BUILD_TIME")
            );
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("meshpick - BVH build and ray picking toolkit");
    println!();
    println!("USAGE:");
    println!("    meshpick-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    s, stats <scene.json> [--leaf N]                 Build trees and print their shape");
    println!("    p, pick  <scene.json> <ox oy oz> <dx dy dz>      Cast one ray and print the closest hit");
    println!("    d, demo  [cells]                                 Pick against a generated grid");
    println!("    h, help                                          Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Debug output");
    println!("    -vv, --trace     Trace output");
    println!("    -q, --quiet      Errors only");
    println!("    -V, --version    Show version and build date");
    println!();
    println!("ENVIRONMENT:");
    println!("    MESHPICK_LOG     tracing filter, overrides -v/-q (e.g. meshpick=trace)");
    println!("    MESHPICK_TRACE   1 = write trace.json (chrome-trace builds)");
}

/// Settings from the config dir, with an optional `--leaf N` override.
fn settings_from_args(args: &[&str]) -> anyhow::Result<Settings> {
    let mut settings = Settings::load();
    if let Some(pos) = args.iter().position(|&a| a == "--leaf") {
        let value = args.get(pos + 1).context("--leaf needs a value")?;
        settings.leaf_threshold = value.parse().with_context(|| format!("bad leaf threshold '{}'", value))?;
    }
    settings.validate()?;
    Ok(settings)
}

fn load_scene(path: &str, settings: &Settings) -> anyhow::Result<Model> {
    let scene = SceneDesc::from_path(path).with_context(|| format!("reading {}", path))?;

    let start = Instant::now();
    let (model, report) = ModelLoader::from_settings(settings).load(scene.into_sources());
    tracing::info!(
        "Loaded {} meshes, {} instances in {:.2?}",
        model.meshes().len(),
        model.instance_count(),
        start.elapsed()
    );
    for (name, err) in &report.rejected {
        tracing::warn!("Rejected mesh '{}': {}", name, err);
    }
    if report.skipped_instances > 0 {
        tracing::warn!("Skipped {} singular instances", report.skipped_instances);
    }
    Ok(model)
}

fn parse_vec3(args: &[&str]) -> anyhow::Result<Vec3> {
    if args.len() < 3 {
        bail!("expected three numbers, got {}", args.len());
    }
    let mut v = [0.0f32; 3];
    for (slot, arg) in v.iter_mut().zip(args) {
        *slot = arg.parse().with_context(|| format!("bad number '{}'", arg))?;
    }
    Ok(Vec3::from(v))
}

fn cmd_stats(args: &[&str]) -> anyhow::Result<()> {
    let Some(&path) = args.first() else {
        bail!("missing scene file\nUsage: meshpick-cli stats <scene.json> [--leaf N]");
    };
    let settings = settings_from_args(args)?;
    let model = load_scene(path, &settings)?;

    println!("Scene: {}", path);
    println!("Leaf threshold: {}", settings.leaf_threshold);
    println!("Bounds: {:?}", model.bounds());
    println!();
    for (i, mesh) in model.meshes().iter().enumerate() {
        println!("  [{}] {} x{} instances", i, mesh.name(), mesh.instance_count());
        println!("      {}", mesh.mesh().stats());
    }
    Ok(())
}

fn cmd_pick(args: &[&str]) -> anyhow::Result<()> {
    if args.len() < 7 {
        bail!("missing arguments\nUsage: meshpick-cli pick <scene.json> <ox oy oz> <dx dy dz>");
    }
    let origin = parse_vec3(&args[1..4])?;
    let direction = parse_vec3(&args[4..7])?;
    if direction == Vec3::ZERO {
        bail!("ray direction must not be zero");
    }
    let settings = settings_from_args(&args[7..])?;
    let model = load_scene(args[0], &settings)?;

    print_hit(&model, &Ray::new(origin, direction));
    Ok(())
}

fn cmd_demo(args: &[&str]) -> anyhow::Result<()> {
    let cells: u32 = match args.first() {
        Some(arg) => arg.parse().with_context(|| format!("bad cell count '{}'", arg))?,
        None => 64,
    };
    let scene = SceneDesc::grid(cells);

    let start = Instant::now();
    let (model, _) = ModelLoader::default().load(scene.into_sources());
    tracing::info!("Built {}x{} grid in {:.2?}", cells, cells, start.elapsed());
    for mesh in model.meshes() {
        println!("{}: {}", mesh.name(), mesh.mesh().stats());
    }

    let extent = cells as f32;
    let rays = [
        Ray::new(Vec3::new(extent * 0.5 + 0.1, extent * 0.5 + 0.2, 10.0), Vec3::NEG_Z),
        Ray::new(Vec3::new(0.3, 0.6, -10.0), Vec3::Z),
        Ray::new(Vec3::new(-5.0, -5.0, 5.0), Vec3::new(1.0, 1.0, -1.0)),
        Ray::new(Vec3::new(extent + 5.0, 0.5, 1.0), Vec3::NEG_Z),
    ];
    for ray in &rays {
        print_hit(&model, ray);
    }
    Ok(())
}

fn print_hit(model: &Model, ray: &Ray) {
    match model.pick(ray) {
        Some(hit) => println!(
            "hit t={:.4} mesh={} instance={} triangle={} uv=({:.3}, {:.3}) point=({:.3}, {:.3}, {:.3})",
            hit.t,
            model.meshes()[hit.mesh].name(),
            hit.instance,
            hit.triangle,
            hit.u,
            hit.v,
            hit.point.x,
            hit.point.y,
            hit.point.z
        ),
        None => println!("miss (origin {:?}, direction {:?})", ray.origin, ray.direction),
    }
}
