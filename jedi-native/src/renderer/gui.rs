use egui_wgpu::{Renderer, RendererOptions, ScreenDescriptor};
use egui_winit::State;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::chart::Chart;
use crate::input::selection::SelectionRect;

//
// ──────────────────────────────────────────────────────────────
//   Heads-up overlay
// ──────────────────────────────────────────────────────────────
//

/// Numbers shown in the overlay, gathered from the chart once per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HudStats
{
  pub ticker: String,
  pub eye: [f32; 3],
  pub pitch_deg: f32,
  pub yaw_deg: f32,
  pub viewport: [u32; 2],
  pub free_look: bool,
  pub selection: Option<SelectionRect>,
  pub dragging: bool,
  pub cubes: usize,
  pub cube_capacity: usize,
  pub frame_ms: f32,
}

impl HudStats
{
  pub fn gather(chart: &Chart, dt: f32) -> Self
  {
    let camera = chart.camera();
    let viewport = chart.viewport();
    let live = chart.selection().rect();

    Self {
      ticker: chart.name().to_owned(),
      eye: camera.eye.to_array(),
      pitch_deg: camera.pitch.to_degrees(),
      yaw_deg: camera.yaw.to_degrees(),
      viewport: [viewport.width, viewport.height],
      free_look: chart.free_look(),
      selection: live.or(chart.last_selection()),
      dragging: live.is_some(),
      cubes: chart.cubes().count(),
      cube_capacity: chart.cubes().capacity(),
      frame_ms: dt * 1000.0,
    }
  }

  fn selection_line(&self) -> String
  {
    match self.selection
    {
      Some(rect) =>
      {
        let tag = if self.dragging { "selecting" } else { "selected" };
        format!(
          "{tag}: x {:.2}..{:.2}  y {:.2}..{:.2}",
          rect.min.x, rect.max.x, rect.min.y, rect.max.y
        )
      }
      None => "no selection".to_owned(),
    }
  }
}

fn draw_hud(ctx: &egui::Context, stats: &HudStats)
{
  egui::Window::new(stats.ticker.as_str())
    .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
    .resizable(false)
    .collapsible(false)
    .show(ctx, |ui| {
      ui.monospace(format!("eye   {:>8.2} {:>8.2} {:>8.2}", stats.eye[0], stats.eye[1], stats.eye[2]));
      ui.monospace(format!("pitch {:>8.1}°  yaw {:>8.1}°", stats.pitch_deg, stats.yaw_deg));
      ui.monospace(stats.selection_line());
      ui.monospace(format!("cubes {} / {}", stats.cubes, stats.cube_capacity));
      ui.monospace(format!("frame {:.2} ms  {}x{}", stats.frame_ms, stats.viewport[0], stats.viewport[1]));

      if stats.free_look
      {
        ui.colored_label(egui::Color32::LIGHT_GREEN, "free-look");
      }
    });
}

//
// ──────────────────────────────────────────────────────────────
//   GuiRenderer
// ──────────────────────────────────────────────────────────────
//

pub struct GuiRenderer
{
  context: egui::Context,
  state: State,
  renderer: Renderer,
  pub visible: bool,
}

impl GuiRenderer
{
  pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Window, visible: bool) -> Self
  {
    let context = egui::Context::default();
    let state = State::new(
      context.clone(),
      egui::viewport::ViewportId::ROOT,
      window,
      Some(window.scale_factor() as f32),
      None,
      None,
    );

    let renderer = Renderer::new(
      device,
      output_format,
      RendererOptions {
        depth_stencil_format: None,
        msaa_samples: 1,
        predictable_texture_filtering: false,
        dithering: true,
      },
    );

    Self { context, state, renderer, visible }
  }

  /// Feed a window event to egui. Returns true when egui consumed it.
  pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool
  {
    self.visible && self.state.on_window_event(window, event).consumed
  }

  pub fn render(
    &mut self,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    window: &Window,
    view: &wgpu::TextureView,
    stats: &HudStats,
  )
  {
    if !self.visible
    {
      return;
    }

    let raw_input = self.state.take_egui_input(window);
    let full_output = self.context.run(raw_input, |ctx| draw_hud(ctx, stats));
    self.state.handle_platform_output(window, full_output.platform_output);

    let size = window.inner_size();
    let ppp = window.scale_factor() as f32;
    let screen_descriptor = ScreenDescriptor { size_in_pixels: [size.width, size.height], pixels_per_point: ppp };

    for (id, delta) in full_output.textures_delta.set
    {
      self.renderer.update_texture(device, queue, id, &delta);
    }

    let tris = self.context.tessellate(full_output.shapes, ppp);
    self.renderer.update_buffers(device, queue, encoder, &tris, &screen_descriptor);

    {
      let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Egui Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
          view,
          resolve_target: None,
          ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
          depth_slice: None,
        })],
        ..Default::default()
      });

      // The pass is dropped before `encoder` is touched again
      let mut pass = pass.forget_lifetime();

      self.renderer.render(&mut pass, &tris, &screen_descriptor);
    }

    for id in full_output.textures_delta.free
    {
      self.renderer.free_texture(&id);
    }
  }
}
