use std::sync::Arc;

use anyhow::Context;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::chart::Chart;
use crate::config::{Config, ShutdownPolicy};

use super::axes::AxesPipeline;
use super::cube::CubePipeline;
use super::depth::DepthResources;
use super::gui::{GuiRenderer, HudStats};
use super::pipeline::Drawable;

const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.2, g: 0.3, b: 0.3, a: 1.0 };

/// Outcome of one `render` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus
{
  Presented,
  /// Surface was stale and has been reconfigured; draw again next frame.
  Skipped,
  /// The surface or device is gone. The window cannot draw anymore.
  Lost,
}

//
// ──────────────────────────────────────────────────────────────
//   Renderer
//
//   One per chart window. Fields are declared in teardown order so
//   an implicit drop releases pipelines before the depth target,
//   the surface before the device, and the device before the
//   instance.
// ──────────────────────────────────────────────────────────────
//

pub struct Renderer
{
  drawables: Vec<Box<dyn Drawable>>,
  gui: GuiRenderer,
  depth: DepthResources,
  surface: wgpu::Surface<'static>,
  config: wgpu::SurfaceConfiguration,
  queue: wgpu::Queue,
  device: wgpu::Device,
  instance: wgpu::Instance,

  window: Arc<Window>,
  tag: String,
  last_submission: Option<wgpu::SubmissionIndex>,
}

//
// ──────────────────────────────────────────────────────────────
//   Public API
// ──────────────────────────────────────────────────────────────
//

impl Renderer
{
  pub fn new(window: Arc<Window>, chart: &Chart, settings: &Config) -> anyhow::Result<Self>
  {
    let tag = chart.name().to_owned();

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor { backends: wgpu::Backends::PRIMARY, ..Default::default() });
    let surface = instance.create_surface(window.clone()).context("creating window surface")?;

    let adapter = pollster::block_on(request_adapter(&instance, &surface))?;
    let info = adapter.get_info();
    log::info!("[{tag}] adapter: {} ({:?})", info.name, info.backend);

    let (device, queue) = pollster::block_on(request_device(&adapter))?;

    let config = configure_surface(&window, &surface, &adapter, &device, settings.vsync)?;
    let depth = DepthResources::create(&device, &config);

    let drawables: Vec<Box<dyn Drawable>> = vec![
      Box::new(AxesPipeline::new(&device, config.format, chart.axes()).context("building axes pipeline")?),
      Box::new(CubePipeline::new(&device, config.format, chart.cubes().capacity()).context("building cube pipeline")?),
    ];

    let gui = GuiRenderer::new(&device, config.format, &window, settings.show_hud);

    log::info!("[{tag}] renderer ready {}x{} {:?}", config.width, config.height, config.format);

    Ok(Self {
      drawables,
      gui,
      depth,
      surface,
      config,
      queue,
      device,
      instance,
      window,
      tag,
      last_submission: None,
    })
  }

  pub fn toggle_hud(&mut self)
  {
    self.gui.visible = !self.gui.visible;
  }

  /// Returns true when the overlay consumed the event.
  pub fn gui_event(&mut self, event: &WindowEvent) -> bool
  {
    self.gui.handle_event(&self.window, event)
  }

  /// Rebuild the surface and depth attachment for a new size.
  /// Blocks until the GPU is idle. Pipelines are kept.
  pub fn resize(&mut self, width: u32, height: u32)
  {
    if width == 0 || height == 0
    {
      return;
    }

    self.wait_idle();

    self.config.width = width;
    self.config.height = height;
    self.reconfigure();

    log::info!("[{}] surface reconfigured to {}x{}", self.tag, width, height);
  }

  pub fn render(&mut self, chart: &Chart, hud: &HudStats) -> FrameStatus
  {
    // The previous frame must finish before its resources are rewritten
    if let Some(index) = self.last_submission.take()
    {
      if let Err(err) = self.device.poll(wgpu::PollType::Wait { submission_index: Some(index), timeout: None })
      {
        log::warn!("[{}] waiting on previous frame: {err}", self.tag);
      }
    }

    let frame = match self.surface.get_current_texture()
    {
      Ok(frame) if frame.suboptimal =>
      {
        drop(frame);
        log::debug!("[{}] suboptimal surface, reconfiguring", self.tag);
        self.reconfigure();
        return FrameStatus::Skipped;
      }

      Ok(frame) => frame,

      Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) =>
      {
        log::warn!("[{}] surface outdated, skipping frame", self.tag);
        self.reconfigure();
        return FrameStatus::Skipped;
      }

      Err(wgpu::SurfaceError::Timeout) =>
      {
        log::warn!("[{}] surface timeout, skipping frame", self.tag);
        return FrameStatus::Skipped;
      }

      Err(err) =>
      {
        log::error!("[{}] surface unusable: {err}", self.tag);
        return FrameStatus::Lost;
      }
    };

    for drawable in &mut self.drawables
    {
      drawable.prepare(&self.queue, chart);
    }

    let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder =
      self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Chart Encoder") });

    record_scene_pass(&mut encoder, &view, &self.depth.view, &self.drawables);

    self.gui.render(&self.device, &self.queue, &mut encoder, &self.window, &view, hud);

    self.last_submission = Some(self.queue.submit(Some(encoder.finish())));

    self.window.pre_present_notify();
    frame.present();

    FrameStatus::Presented
  }

  /// Release GPU objects in dependency order, or leak them on purpose.
  pub fn shutdown(self, policy: ShutdownPolicy)
  {
    let Self { drawables, gui, depth, surface, config: _, queue, device, instance, window, tag, last_submission: _ } =
      self;

    if policy == ShutdownPolicy::Skip
    {
      log::warn!("[{tag}] skipping GPU teardown");
      window.set_visible(false);
      std::mem::forget((drawables, gui, depth, surface, queue, device, instance));
      return;
    }

    if let Err(err) = device.poll(wgpu::PollType::wait_indefinitely())
    {
      log::warn!("[{tag}] device idle wait failed: {err}");
    }

    for drawable in drawables
    {
      log::debug!("[{tag}] releasing {} pipeline", drawable.name());
      drop(drawable);
    }
    drop(gui);

    log::debug!("[{tag}] releasing depth attachment");
    depth.destroy();

    log::debug!("[{tag}] releasing surface");
    drop(surface);

    log::debug!("[{tag}] releasing device");
    drop(queue);
    device.destroy();
    drop(device);

    log::debug!("[{tag}] releasing instance");
    drop(instance);
    drop(window);

    log::info!("[{tag}] renderer shut down");
  }

  fn wait_idle(&mut self)
  {
    self.last_submission = None;

    if let Err(err) = self.device.poll(wgpu::PollType::wait_indefinitely())
    {
      log::warn!("[{}] device idle wait failed: {err}", self.tag);
    }
  }

  fn reconfigure(&mut self)
  {
    self.surface.configure(&self.device, &self.config);

    let depth = DepthResources::create(&self.device, &self.config);
    std::mem::replace(&mut self.depth, depth).destroy();
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Initialization Helpers
// ──────────────────────────────────────────────────────────────
//

async fn request_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> anyhow::Result<wgpu::Adapter>
{
  instance
    .request_adapter(&wgpu::RequestAdapterOptions {
      power_preference: wgpu::PowerPreference::HighPerformance,
      compatible_surface: Some(surface),
      force_fallback_adapter: false,
    })
    .await
    .context("no suitable GPU adapter found")
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)>
{
  adapter
    .request_device(&wgpu::DeviceDescriptor {
      label: Some("Chart Device"),
      required_features: wgpu::Features::empty(),
      required_limits: wgpu::Limits::default(),
      memory_hints: Default::default(),
      trace: Default::default(),
      experimental_features: Default::default(),
    })
    .await
    .context("creating GPU device")
}

fn configure_surface(
  window: &Window,
  surface: &wgpu::Surface<'_>,
  adapter: &wgpu::Adapter,
  device: &wgpu::Device,
  vsync: bool,
) -> anyhow::Result<wgpu::SurfaceConfiguration>
{
  let size = window.inner_size();
  let caps = surface.get_capabilities(adapter);
  let format = caps
    .formats
    .iter()
    .copied()
    .find(|f| f.is_srgb())
    .or_else(|| caps.formats.first().copied())
    .context("surface reports no supported formats")?;
  let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);

  let config = wgpu::SurfaceConfiguration {
    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
    format,
    width: size.width.max(1),
    height: size.height.max(1),
    present_mode: if vsync { wgpu::PresentMode::Fifo } else { wgpu::PresentMode::AutoNoVsync },
    alpha_mode,
    view_formats: vec![],
    desired_maximum_frame_latency: 2,
  };

  surface.configure(device, &config);
  Ok(config)
}

//
// ──────────────────────────────────────────────────────────────
//   Render Pass
// ──────────────────────────────────────────────────────────────
//

fn record_scene_pass(
  encoder: &mut wgpu::CommandEncoder,
  color_view: &wgpu::TextureView,
  depth_view: &wgpu::TextureView,
  drawables: &[Box<dyn Drawable>],
)
{
  let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
    label: Some("Chart Pass"),
    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
      view: color_view,
      resolve_target: None,
      ops: wgpu::Operations { load: wgpu::LoadOp::Clear(CLEAR_COLOR), store: wgpu::StoreOp::Store },
      depth_slice: None,
    })],
    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
      view: depth_view,
      depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
      stencil_ops: None,
    }),
    occlusion_query_set: None,
    timestamp_writes: None,
  });

  for drawable in drawables
  {
    drawable.draw(&mut pass);
  }
}
