use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::{
  application::ApplicationHandler,
  dpi::{PhysicalPosition, PhysicalSize},
  event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
  event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
  keyboard::{KeyCode, PhysicalKey},
  window::{CursorGrabMode, Window, WindowId},
};

use crate::chart::Chart;
use crate::config::{Config, ShutdownPolicy};
use crate::input::camera_control::CursorRequest;
use crate::input::InputState;
use crate::math::ClipSpace;
use crate::renderer::gui::HudStats;
use crate::renderer::{FrameStatus, Renderer};

/// Longest frame step fed to the camera, in seconds. Stalls beyond this
/// (window drags, breakpoints) would otherwise fling the camera.
const MAX_FRAME_DT: f32 = 0.25;

const HUD_KEY: KeyCode = KeyCode::F1;

fn window_title(ticker: &str) -> String
{
  format!("jeditrader: {ticker}")
}

pub fn run(tickers: Vec<String>, config: Config) -> anyhow::Result<()>
{
  let event_loop = EventLoop::new().context("creating event loop")?;
  let mut app = JediApp::new(tickers, config);

  event_loop.run_app(&mut app).context("running event loop")?;

  match app.fatal.take()
  {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

//
// ──────────────────────────────────────────────────────────────
//   ChartWindow
//
//   Everything one ticker owns. Nothing is shared between windows.
// ──────────────────────────────────────────────────────────────
//

struct ChartWindow
{
  window: Arc<Window>,
  chart: Chart,
  renderer: Renderer,
  input: InputState,
  last_frame: Instant,
  minimized: bool,
}

impl ChartWindow
{
  /// Window first, then the chart sized to it, then the renderer wired to both.
  fn open(event_loop: &ActiveEventLoop, ticker: &str, config: &Config) -> anyhow::Result<Self>
  {
    let attrs = Window::default_attributes()
      .with_title(window_title(ticker))
      .with_inner_size(PhysicalSize::new(config.window_width, config.window_height));

    let window = Arc::new(event_loop.create_window(attrs).with_context(|| format!("[{ticker}] creating window"))?);
    let size = window.inner_size();

    let chart = Chart::new(ticker, size.width, size.height, config, ClipSpace::WGPU)
      .with_context(|| format!("[{ticker}] creating chart"))?;

    let renderer =
      Renderer::new(window.clone(), &chart, config).with_context(|| format!("[{ticker}] creating renderer"))?;

    log::info!("[{ticker}] window open at {}x{}", size.width, size.height);

    Ok(Self {
      window,
      chart,
      renderer,
      input: InputState::new(size.width, size.height),
      last_frame: Instant::now(),
      minimized: size.width == 0 || size.height == 0,
    })
  }

  fn tag(&self) -> &str
  {
    self.chart.name()
  }

  fn handle_resize(&mut self, size: PhysicalSize<u32>)
  {
    self.minimized = size.width == 0 || size.height == 0;
    if self.minimized
    {
      log::debug!("[{}] minimized, drawing paused", self.tag());
      return;
    }

    if self.chart.resize(size.width, size.height)
    {
      self.renderer.resize(size.width, size.height);
    }
  }

  /// One full frame: input → camera/selection → scene → draw.
  fn frame(&mut self) -> FrameStatus
  {
    let now = Instant::now();
    let dt = (now - self.last_frame).as_secs_f32().min(MAX_FRAME_DT);
    self.last_frame = now;

    if self.minimized
    {
      self.input.skip_frame();
      return FrameStatus::Skipped;
    }

    let snapshot = self.input.snapshot();
    let request = self.chart.frame(&snapshot, dt);
    self.apply_cursor(request);

    let hud = HudStats::gather(&self.chart, dt);
    let status = self.renderer.render(&self.chart, &hud);

    self.input.end_frame();
    status
  }

  fn apply_cursor(&self, request: CursorRequest)
  {
    match request
    {
      CursorRequest::Keep =>
      {}

      CursorRequest::Capture =>
      {
        let grabbed = self
          .window
          .set_cursor_grab(CursorGrabMode::Locked)
          .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));

        if let Err(err) = grabbed
        {
          log::warn!("[{}] cursor grab unavailable: {err}", self.tag());
        }
        self.window.set_cursor_visible(false);
      }

      CursorRequest::Release { warp_to } =>
      {
        if let Err(err) = self.window.set_cursor_grab(CursorGrabMode::None)
        {
          log::warn!("[{}] cursor release failed: {err}", self.tag());
        }
        self.window.set_cursor_visible(true);

        let position = PhysicalPosition::new(warp_to.x as f64, warp_to.y as f64);
        if let Err(err) = self.window.set_cursor_position(position)
        {
          log::debug!("[{}] cursor warp unsupported: {err}", self.tag());
        }
      }
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   JediApp
// ──────────────────────────────────────────────────────────────
//

struct JediApp
{
  tickers: Vec<String>,
  config: Config,
  windows: HashMap<WindowId, ChartWindow>,
  focused: Option<WindowId>,
  started: bool,
  fatal: Option<anyhow::Error>,
}

impl JediApp
{
  fn new(tickers: Vec<String>, config: Config) -> Self
  {
    Self { tickers, config, windows: HashMap::new(), focused: None, started: false, fatal: None }
  }

  fn open_windows(&mut self, event_loop: &ActiveEventLoop)
  {
    if self.started
    {
      return;
    }
    self.started = true;

    for ticker in &self.tickers
    {
      match ChartWindow::open(event_loop, ticker, &self.config)
      {
        Ok(chart_window) =>
        {
          self.windows.insert(chart_window.window.id(), chart_window);
        }

        Err(err) =>
        {
          log::error!("{err:#}");
          self.fatal = Some(err);
          event_loop.exit();
          return;
        }
      }
    }
  }

  fn close_window(&mut self, event_loop: &ActiveEventLoop, id: WindowId)
  {
    let Some(chart_window) = self.windows.remove(&id)
    else
    {
      return;
    };

    if self.focused == Some(id)
    {
      self.focused = None;
    }

    log::info!("[{}] closing", chart_window.tag());

    // Other windows keep the process alive, so their memory matters
    let policy = if self.windows.is_empty() { self.config.shutdown } else { ShutdownPolicy::Full };
    chart_window.renderer.shutdown(policy);

    if self.windows.is_empty()
    {
      event_loop.exit();
    }
  }

  fn handle_window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent)
  {
    let Some(chart_window) = self.windows.get_mut(&id)
    else
    {
      return;
    };

    let consumed = chart_window.renderer.gui_event(&event);

    match event
    {
      WindowEvent::CloseRequested =>
      {
        self.close_window(event_loop, id);
      }

      WindowEvent::Resized(size) =>
      {
        chart_window.input.handle_event(&event);
        chart_window.handle_resize(size);
      }

      WindowEvent::Focused(focused) =>
      {
        chart_window.input.handle_event(&event);
        if focused
        {
          self.focused = Some(id);
        }
        else if self.focused == Some(id)
        {
          self.focused = None;
        }
      }

      WindowEvent::KeyboardInput {
        event: KeyEvent { physical_key: PhysicalKey::Code(HUD_KEY), state: ElementState::Pressed, repeat: false, .. },
        ..
      } =>
      {
        chart_window.renderer.toggle_hud();
      }

      WindowEvent::RedrawRequested =>
      {
        if chart_window.frame() == FrameStatus::Lost
        {
          log::error!("[{}] lost its surface, closing", chart_window.tag());
          self.close_window(event_loop, id);
        }
      }

      _ =>
      {
        if !consumed
        {
          chart_window.input.handle_event(&event);
        }
      }
    }
  }
}

impl ApplicationHandler for JediApp
{
  fn resumed(&mut self, event_loop: &ActiveEventLoop)
  {
    event_loop.set_control_flow(ControlFlow::Poll);
    self.open_windows(event_loop);
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    self.handle_window_event(event_loop, window_id, event);
  }

  fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent)
  {
    // Raw motion has no window; it belongs to whichever chart has focus
    if let Some(chart_window) = self.focused.and_then(|id| self.windows.get_mut(&id))
    {
      chart_window.input.handle_device_event(&event);
    }
  }

  fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop)
  {
    for chart_window in self.windows.values()
    {
      if !chart_window.minimized
      {
        chart_window.window.request_redraw();
      }
    }
  }

  fn exiting(&mut self, _event_loop: &ActiveEventLoop)
  {
    for (_, chart_window) in self.windows.drain()
    {
      chart_window.renderer.shutdown(self.config.shutdown);
    }
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn window_title_names_ticker_in_plain_ascii()
  {
    let title = window_title("SPY");

    assert_eq!(title, "jeditrader: SPY");
    assert!(title.is_ascii());
  }
}
