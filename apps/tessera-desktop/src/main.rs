use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::{Mat4, Vec2};
use tessera_assets::AssetLibrary;
use tessera_input::{FixedTimestep, InputState, MoveKey};
use tessera_render::{FlyCamera, SceneConfig, TessellationSettings};
use tessera_render_wgpu::{
    FramebufferDescriptor, GpuContext, SceneRenderer, TessellatedMesh, TessellatedMeshRenderer,
};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "tessera-desktop", about = "Interactive adaptive tessellation viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (JSON). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory searched for `<name>.obj` meshes and `<name>.png` ramps
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Override the maximum tessellation factor (power of two)
    #[arg(long)]
    max_factor: Option<u32>,

    /// Override the MSAA sample count
    #[arg(long)]
    samples: Option<u32>,
}

fn move_key(code: KeyCode) -> Option<MoveKey> {
    match code {
        KeyCode::KeyW => Some(MoveKey::Forward),
        KeyCode::KeyS => Some(MoveKey::Back),
        KeyCode::KeyA => Some(MoveKey::Left),
        KeyCode::KeyD => Some(MoveKey::Right),
        KeyCode::KeyE => Some(MoveKey::Up),
        KeyCode::KeyQ => Some(MoveKey::Down),
        _ => None,
    }
}

/// Window-independent application state.
struct AppState {
    config: SceneConfig,
    library: AssetLibrary,
    input: InputState,
    ticks: FixedTimestep,
    last_frame: Instant,
    slider: f32,
    settings: TessellationSettings,
    show_panel: bool,
}

impl AppState {
    fn new(config: SceneConfig, library: AssetLibrary) -> Self {
        let settings = config.tessellation.settings();
        Self {
            slider: config.tessellation.slider,
            settings,
            config,
            library,
            input: InputState::new(),
            ticks: FixedTimestep::default(),
            last_frame: Instant::now(),
            show_panel: true,
        }
    }

    /// Run the camera ticks owed since the last frame.
    fn update(&mut self, camera: &mut FlyCamera) {
        let now = Instant::now();
        let elapsed = now - self.last_frame;
        self.last_frame = now;

        let step = self.ticks.step();
        for _ in 0..self.ticks.advance(elapsed) {
            let tick = self.input.take_tick();
            camera.integrate(step, tick.cursor_delta, tick.flags);
        }
    }

    /// Draw the tessellation panel. Returns true when settings changed.
    fn draw_ui(&mut self, ctx: &EguiContext, camera: &FlyCamera, meshes: &[Rc<TessellatedMeshRenderer>]) -> bool {
        if !self.show_panel {
            return false;
        }

        let max_factor = self.config.tessellation.max_factor;
        let mut changed = false;
        egui::SidePanel::left("tessellation")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Tessellation");
                ui.separator();
                if ui
                    .add(egui::Slider::new(&mut self.slider, 0.0..=1.0).text("level"))
                    .changed()
                {
                    self.settings = self.settings.with_slider(self.slider, max_factor);
                    changed = true;
                }
                ui.label(self.settings.label());
                changed |= ui.checkbox(&mut self.settings.wireframe, "Wireframe").changed();
                changed |= ui.checkbox(&mut self.settings.spherify, "Spherify").changed();

                ui.separator();
                ui.heading("Scene");
                ui.label(format!(
                    "Camera: ({:.1}, {:.1}, {:.1})",
                    camera.eye.x, camera.eye.y, camera.eye.z
                ));
                for mesh in meshes {
                    let mesh = mesh.mesh();
                    ui.label(format!(
                        "{}: {} {:?} patches",
                        mesh.name(),
                        mesh.patch_count(),
                        mesh.topology()
                    ));
                }

                ui.separator();
                ui.small("F1: Toggle Panel | LMB drag: Look | WASD/QE: Move");
            });
        changed
    }
}

/// Everything that exists only once the window and device are up.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    ctx: GpuContext,
    surface_config: wgpu::SurfaceConfiguration,
    scene: SceneRenderer,
    meshes: Vec<Rc<TessellatedMeshRenderer>>,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    egui_ctx: EguiContext,
    gpu: Option<Gpu>,
}

impl GpuApp {
    fn new(state: AppState) -> Self {
        Self {
            state,
            egui_ctx: EguiContext::default(),
            gpu: None,
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("Tessera")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no adapter compatible with the window surface")?;
        let ctx = pollster::block_on(GpuContext::from_adapter(adapter))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&ctx.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);

        let config = &self.state.config;
        let framebuffer = FramebufferDescriptor::new(surface_format)
            .with_sample_count(config.framebuffer.sample_count)
            .supported_by(&ctx);
        let ramp = self.state.library.load_texture(&config.color_ramp)?;
        let mut scene = SceneRenderer::new(
            &ctx,
            framebuffer,
            &ramp,
            surface_config.width,
            surface_config.height,
        );
        scene.camera = FlyCamera::from_config(&config.camera);
        scene.set_clear_color(config.framebuffer.clear_color);
        scene.set_acquire_timeout(config.acquire_timeout());

        let mut meshes = Vec::with_capacity(config.meshes.len());
        for entry in &config.meshes {
            let mesh = TessellatedMesh::load(&ctx, &self.state.library, &entry.name, entry.indexed)
                .with_context(|| format!("loading mesh `{}`", entry.name))?;
            mesh.set_model_transform(Mat4::from_translation(entry.translation));
            let renderer = Rc::new(TessellatedMeshRenderer::new(
                &ctx,
                Rc::new(mesh),
                scene.framebuffer(),
                scene.frame_layout(),
                config.tessellation.max_factor,
            )?);
            renderer.set_settings(self.state.settings);
            scene.add_mesh_renderer(renderer.clone());
            meshes.push(renderer);
        }

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&ctx.device, surface_format, None, 1, false);

        tracing::info!(
            meshes = meshes.len(),
            samples = framebuffer.sample_count,
            "viewer initialized"
        );

        Ok(Gpu {
            window,
            surface,
            ctx,
            surface_config,
            scene,
            meshes,
            egui_winit,
            egui_renderer,
        })
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode, pressed: bool) {
        if let Some(action) = move_key(key) {
            self.state.input.set_key(action, pressed);
            return;
        }
        if !pressed {
            return;
        }
        match key {
            KeyCode::F1 => self.state.show_panel = !self.state.show_panel,
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        self.state.update(&mut gpu.scene.camera);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.ctx.device, &gpu.surface_config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.scene.render_frame(&gpu.ctx, &view);

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let camera = gpu.scene.camera.clone();
        let mut changed = false;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            changed = self.state.draw_ui(ctx, &camera, &gpu.meshes);
        });
        if changed {
            for renderer in &gpu.meshes {
                renderer.set_settings(self.state.settings);
            }
            tracing::debug!(settings = ?self.state.settings, "tessellation settings changed");
        }
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.surface_config.width, gpu.surface_config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let (device, queue) = (&gpu.ctx.device, &gpu.ctx.queue);
        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        gpu.egui_renderer.update_buffers(
            device,
            queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                tracing::error!("failed to initialize viewer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.surface_config.width = new_size.width.max(1);
                    gpu.surface_config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.ctx.device, &gpu.surface_config);
                    gpu.scene.resize(
                        &gpu.ctx,
                        gpu.surface_config.width,
                        gpu.surface_config.height,
                    );
                }
            }
            WindowEvent::Focused(false) => {
                self.state.input.clear();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.handle_key(event_loop, key, key_state == ElementState::Pressed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                if btn_state == ElementState::Pressed {
                    self.state.input.begin_drag();
                } else {
                    self.state.input.end_drag();
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            // Screen y grows downward; pitch grows upward.
            self.state
                .input
                .cursor_moved(Vec2::new(delta.0 as f32, -delta.1 as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn load_config(cli: &Cli) -> Result<SceneConfig> {
    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    if let Some(max_factor) = cli.max_factor {
        config.tessellation.max_factor = max_factor;
    }
    if let Some(samples) = cli.samples {
        config.framebuffer.sample_count = samples;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("tessera-desktop starting");

    let config = load_config(&cli)?;
    let library = match &cli.assets_dir {
        Some(dir) => AssetLibrary::with_root(dir),
        None => AssetLibrary::builtin(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(AppState::new(config, library));
    event_loop.run_app(&mut app)?;

    Ok(())
}
