use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use glam::{Mat4, Vec2};
use tessera_assets::AssetLibrary;
use tessera_input::{FixedTimestep, InputState, MoveKey};
use tessera_render::domain::{quad_point, triangle_point};
use tessera_render::factors::pow2_factor;
use tessera_render::{
    FlyCamera, PatchLayout, PatchSummary, PatchTopology, SceneConfig, SceneReport,
    check_max_factor, factor_from_slider,
};
use tessera_render_wgpu::{
    FramebufferDescriptor, GpuContext, SceneRenderer, TessellatedMesh, TessellatedMeshRenderer,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tessera-cli", about = "CLI tool for tessellation scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory searched for `<name>.obj` meshes and `<name>.png` ramps
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Validate a mesh as a patch list and summarize it
    Inspect {
        /// Built-in primitive, asset name, or OBJ path
        mesh: String,
        /// Fetch control points through the mesh's index buffer
        #[arg(long)]
        indexed: bool,
    },
    /// Tabulate slider positions, factors and emitted triangles
    Factors {
        /// Maximum tessellation factor
        #[arg(long, default_value = "16")]
        max_factor: u32,
        /// Slider positions sampled across [0, 1]
        #[arg(long, default_value = "5")]
        steps: u32,
    },
    /// Integrate the fly camera for a number of ticks and report the scene
    Fly {
        /// Number of 60 Hz ticks to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u32,
        /// Held keys, any of `wasdeq`
        #[arg(short, long, default_value = "")]
        keys: String,
        /// Cursor drag per tick, `dx,dy`
        #[arg(long, value_parser = parse_drag, allow_hyphen_values = true)]
        drag: Option<Vec2>,
    },
    /// Render the scene headless into a PNG
    Render {
        /// Output image path
        #[arg(short, long, default_value = "tessera.png")]
        output: PathBuf,
        #[arg(long, default_value = "800")]
        width: u32,
        #[arg(long, default_value = "600")]
        height: u32,
        /// Frames rendered before the capture
        #[arg(long, default_value = "3")]
        frames: u32,
    },
}

fn parse_drag(s: &str) -> Result<Vec2, String> {
    let (x, y) = s.split_once(',').ok_or("expected `dx,dy`")?;
    let x = x.trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f32>().map_err(|e| e.to_string())?;
    Ok(Vec2::new(x, y))
}

fn parse_keys(keys: &str) -> Result<Vec<MoveKey>> {
    keys.chars()
        .map(|c| match c.to_ascii_lowercase() {
            'w' => Ok(MoveKey::Forward),
            's' => Ok(MoveKey::Back),
            'a' => Ok(MoveKey::Left),
            'd' => Ok(MoveKey::Right),
            'e' => Ok(MoveKey::Up),
            'q' => Ok(MoveKey::Down),
            other => bail!("unknown movement key `{other}`"),
        })
        .collect()
}

fn summarize(library: &AssetLibrary, name: &str, indexed: bool) -> Result<PatchSummary> {
    let asset = library.load_mesh(name)?;
    let layout = PatchLayout::from_asset(&asset, indexed)
        .with_context(|| format!("mesh `{name}` is not a patch list"))?;
    Ok(PatchSummary::from(&layout))
}

/// Count the non-degenerate triangles one patch emits at `factor`.
fn emitted_triangles(topology: PatchTopology, factor: f32, max_factor: u32) -> u32 {
    let level = factor as u32;
    let budget = topology.vertices_per_patch(max_factor);
    let live = (0..budget)
        .filter(|&i| match topology {
            PatchTopology::Triangle => triangle_point(i, level, [factor; 3]).is_some(),
            PatchTopology::Quad => quad_point(i, [level, level], [factor; 4]).is_some(),
        })
        .count() as u32;
    live / 3
}

fn render_headless(
    config: &SceneConfig,
    library: &AssetLibrary,
    output: &Path,
    (width, height): (u32, u32),
    frames: u32,
) -> Result<()> {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    let ctx = GpuContext::headless()?;
    let framebuffer = FramebufferDescriptor::new(FORMAT)
        .with_sample_count(config.framebuffer.sample_count)
        .supported_by(&ctx);
    let ramp = library.load_texture(&config.color_ramp)?;
    let mut scene = SceneRenderer::new(&ctx, framebuffer, &ramp, width, height);
    scene.camera = FlyCamera::from_config(&config.camera);
    scene.set_clear_color(config.framebuffer.clear_color);
    scene.set_acquire_timeout(config.acquire_timeout());

    let settings = config.tessellation.settings();
    for entry in &config.meshes {
        let mesh = TessellatedMesh::load(&ctx, library, &entry.name, entry.indexed)
            .with_context(|| format!("loading mesh `{}`", entry.name))?;
        mesh.set_model_transform(Mat4::from_translation(entry.translation));
        let renderer = TessellatedMeshRenderer::new(
            &ctx,
            Rc::new(mesh),
            scene.framebuffer(),
            scene.frame_layout(),
            config.tessellation.max_factor,
        )?;
        renderer.set_settings(settings);
        scene.add_mesh_renderer(Rc::new(renderer));
    }

    let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("headless_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&Default::default());
    for _ in 0..frames.max(1) {
        scene.render_frame(&ctx, &view);
    }
    ctx.wait_idle();

    let pixels = ctx.read_texture(&target)?;
    let image = image::RgbaImage::from_raw(width, height, pixels)
        .context("readback size does not match the target")?;
    image.save(output)?;
    tracing::info!(path = %output.display(), width, height, "frame written");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    let library = match &cli.assets_dir {
        Some(dir) => AssetLibrary::with_root(dir),
        None => AssetLibrary::builtin(),
    };

    match cli.command {
        Commands::Info => {
            println!("tessera-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("input: {}", tessera_input::crate_info());
            println!("assets: {}", tessera_assets::crate_info());
            println!("render: {}", tessera_render::crate_info());
            println!("render-wgpu: {}", tessera_render_wgpu::crate_info());
        }
        Commands::Inspect { mesh, indexed } => {
            let summary = summarize(&library, &mesh, indexed)?;
            println!(
                "{}: {:?} patches={} control_points={} factor_buffer={}B",
                summary.name,
                summary.topology,
                summary.patch_count,
                summary.control_points,
                summary.factor_bytes()
            );
            let mut factor = 1;
            while factor <= config.tessellation.max_factor {
                println!(
                    "  factor {factor:>3}: {} triangles",
                    summary.triangles_at(factor)
                );
                factor *= 2;
            }
        }
        Commands::Factors { max_factor, steps } => {
            check_max_factor(max_factor)?;
            println!("slider  factor  tri/patch  quad/patch");
            let steps = steps.max(2);
            for s in 0..steps {
                let t = s as f32 / (steps - 1) as f32;
                let factor = pow2_factor(factor_from_slider(t, max_factor), max_factor);
                println!(
                    "{t:>6.2}  {factor:>6}  {:>9}  {:>10}",
                    emitted_triangles(PatchTopology::Triangle, factor, max_factor),
                    emitted_triangles(PatchTopology::Quad, factor, max_factor)
                );
            }
        }
        Commands::Fly { ticks, keys, drag } => {
            let mut camera = FlyCamera::from_config(&config.camera);
            let mut input = InputState::new();
            for key in parse_keys(&keys)? {
                input.set_key(key, true);
            }
            if drag.is_some() {
                input.begin_drag();
            }

            let step = FixedTimestep::default().step();
            for _ in 0..ticks {
                if let Some(delta) = drag {
                    input.cursor_moved(delta);
                }
                let tick = input.take_tick();
                camera.integrate(step, tick.cursor_delta, tick.flags);
            }

            let meshes = config
                .meshes
                .iter()
                .map(|m| summarize(&library, &m.name, m.indexed))
                .collect::<Result<Vec<_>>>()?;
            let report = SceneReport {
                camera: &camera,
                settings: config.tessellation.settings(),
                max_factor: config.tessellation.max_factor,
                meshes: &meshes,
            };
            print!("{report}");
        }
        Commands::Render {
            output,
            width,
            height,
            frames,
        } => {
            render_headless(&config, &library, &output, (width, height), frames)?;
            println!("wrote {}", output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_parses_signed_pairs() {
        assert_eq!(parse_drag("3,-1.5").unwrap(), Vec2::new(3.0, -1.5));
        assert!(parse_drag("3").is_err());
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(
            parse_keys("wE").unwrap(),
            vec![MoveKey::Forward, MoveKey::Up]
        );
        assert!(parse_keys("x").is_err());
    }

    #[test]
    fn emitted_triangles_match_budget_formula() {
        assert_eq!(emitted_triangles(PatchTopology::Triangle, 4.0, 16), 16);
        assert_eq!(emitted_triangles(PatchTopology::Quad, 4.0, 16), 32);
        assert_eq!(emitted_triangles(PatchTopology::Quad, 1.0, 16), 2);
    }

    #[test]
    fn factors_command_rejects_oversized_max() {
        let cli = Cli::try_parse_from(["tessera-cli", "factors", "--max-factor", "65536"]).unwrap();
        let Commands::Factors { max_factor, .. } = cli.command else {
            panic!("expected the factors subcommand");
        };
        assert!(check_max_factor(max_factor).is_err());
        assert!(check_max_factor(64).is_ok());
        assert_eq!(emitted_triangles(PatchTopology::Quad, 64.0, 64), 2 * 64 * 64);
    }
}
