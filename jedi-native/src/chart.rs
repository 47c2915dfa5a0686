use glam::Mat4;

use crate::camera::Camera;
use crate::config::Config;
use crate::error::ChartError;
use crate::input::camera_control::{CameraController, ControlSettings, CursorRequest};
use crate::input::selection::{Selection, SelectionEvent, SelectionRect};
use crate::input::InputSnapshot;
use crate::math::{self, ClipSpace};
use crate::renderer::axes::AxesGeometry;
use crate::renderer::cube::CubeInstances;

//
// ──────────────────────────────────────────────────────────────
//   Viewport
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport
{
  pub width: u32,
  pub height: u32,
  pub aspect: f32,
}

impl Viewport
{
  pub fn new(width: u32, height: u32) -> Self
  {
    let width = width.max(1);
    let height = height.max(1);
    Self { width, height, aspect: width as f32 / height as f32 }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Chart
//
//   Per-window scene state. Per frame, in order:
//     camera controller → selection → outline → update()
//   after which the renderer reads matrices and geometry.
// ──────────────────────────────────────────────────────────────
//

pub struct Chart
{
  name: String,
  viewport: Viewport,
  clip: ClipSpace,

  camera: Camera,
  controller: CameraController,
  selection: Selection,
  last_selection: Option<SelectionRect>,

  axes: AxesGeometry,
  cubes: CubeInstances,

  view_proj: Mat4,
}

impl Chart
{
  pub fn new(name: &str, width: u32, height: u32, config: &Config, clip: ClipSpace) -> Result<Self, ChartError>
  {
    let viewport = Viewport::new(width, height);

    let mut camera = Camera::new(config.fov_degrees, config.z_near, config.z_far);
    camera.rebuild_projection(viewport.aspect, clip);

    let mut chart = Self {
      name: name.to_owned(),
      viewport,
      clip,
      camera,
      controller: CameraController::new(ControlSettings::from_config(config)),
      selection: Selection::new(),
      last_selection: None,
      axes: AxesGeometry::new(),
      cubes: CubeInstances::new(config.cube_capacity),
      view_proj: Mat4::IDENTITY,
    };

    chart.write_cubes(config.initial_cubes)?;
    chart.update();
    Ok(chart)
  }

  /// Returns true when the size actually changed and the surface must be rebuilt.
  pub fn resize(&mut self, width: u32, height: u32) -> bool
  {
    if width == 0 || height == 0
    {
      return false;
    }

    if width == self.viewport.width && height == self.viewport.height
    {
      return false;
    }

    self.viewport = Viewport::new(width, height);
    self.camera.rebuild_projection(self.viewport.aspect, self.clip);
    self.update();

    log::debug!("[{}] resized to {}x{}", self.name, width, height);
    true
  }

  /// Rebuild the view and the combined matrix. Call after every camera change.
  pub fn update(&mut self)
  {
    self.camera.rebuild_view();
    self.view_proj = math::view_projection(self.camera.proj(), self.camera.view());
  }

  /// Run one frame of camera and selection input. `dt` is in seconds.
  pub fn frame(&mut self, input: &InputSnapshot, dt: f32) -> CursorRequest
  {
    let request = self.controller.update(input, &mut self.camera, self.viewport.aspect, dt);

    match self.selection.update(input, &self.camera)
    {
      SelectionEvent::Started =>
      {
        log::debug!("[{}] selection started at {:?}", self.name, self.selection.start());
      }

      SelectionEvent::Dragged =>
      {
        log::trace!("[{}] selection corner at {:?}", self.name, self.selection.end());
      }

      SelectionEvent::Finished(rect) if rect.is_degenerate() =>
      {
        log::debug!("[{}] click at {:?}, no area selected", self.name, rect.min);
        self.last_selection = None;
      }

      SelectionEvent::Finished(rect) =>
      {
        log::info!("[{}] selected {:?} .. {:?}", self.name, rect.min, rect.max);
        self.last_selection = Some(rect);
      }

      SelectionEvent::None =>
      {}
    }

    self.axes.set_outline(self.selection.outline());
    self.update();

    request
  }

  pub fn write_cubes(&mut self, n: usize) -> Result<(), ChartError>
  {
    self.cubes.write_cubes(n)
  }

  pub fn name(&self) -> &str
  {
    &self.name
  }

  pub fn viewport(&self) -> Viewport
  {
    self.viewport
  }

  pub fn clip_space(&self) -> ClipSpace
  {
    self.clip
  }

  pub fn camera(&self) -> &Camera
  {
    &self.camera
  }

  pub fn view_proj(&self) -> Mat4
  {
    self.view_proj
  }

  pub fn axes(&self) -> &AxesGeometry
  {
    &self.axes
  }

  pub fn cubes(&self) -> &CubeInstances
  {
    &self.cubes
  }

  pub fn selection(&self) -> &Selection
  {
    &self.selection
  }

  pub fn last_selection(&self) -> Option<SelectionRect>
  {
    self.last_selection
  }

  pub fn free_look(&self) -> bool
  {
    self.controller.free_look()
  }
}

#[cfg(test)]
mod tests
{
  use super::*;
  use crate::renderer::cube::MAX_CUBES_PER_CHART;
  use glam::{Vec2, Vec3};
  use winit::event::MouseButton;
  use winit::keyboard::KeyCode;

  fn chart() -> Chart
  {
    Chart::new("TEST", 800, 600, &Config::default(), ClipSpace::WGPU).unwrap()
  }

  #[test]
  fn resize_twice_is_idempotent()
  {
    let mut c = chart();

    assert!(c.resize(1024, 512));
    let proj = c.camera().proj();
    let view_proj = c.view_proj();

    assert!(!c.resize(1024, 512));
    assert_eq!(c.camera().proj(), proj);
    assert_eq!(c.view_proj(), view_proj);
    assert_eq!(c.viewport().aspect, 2.0);
  }

  #[test]
  fn zero_size_resize_is_ignored()
  {
    let mut c = chart();
    let before = c.viewport();

    assert!(!c.resize(0, 300));
    assert_eq!(c.viewport(), before);
  }

  #[test]
  fn view_proj_matches_camera_after_update()
  {
    let c = chart();
    let expected = c.camera().proj() * c.camera().view();

    assert_eq!(c.view_proj(), expected);
  }

  #[test]
  fn capacity_plus_one_is_rejected()
  {
    let mut c = chart();
    let before = c.cubes().revision();

    let err = c.write_cubes(MAX_CUBES_PER_CHART + 1).unwrap_err();

    assert!(matches!(err, ChartError::CapacityExceeded { .. }));
    assert_eq!(c.cubes().count(), 1);
    assert_eq!(c.cubes().revision(), before);
  }

  #[test]
  fn initial_cubes_over_capacity_fails_construction()
  {
    let config = Config { cube_capacity: 4, initial_cubes: 5, ..Config::default() };

    assert!(Chart::new("TEST", 800, 600, &config, ClipSpace::WGPU).is_err());
  }

  #[test]
  fn frame_moves_camera_before_recomputing_matrices()
  {
    let mut c = chart();
    let before = c.view_proj();

    let mut input = InputSnapshot { width: 800, height: 600, ..Default::default() };
    input.keyboard_current.insert(KeyCode::KeyW);

    c.frame(&input, 0.1);

    assert_ne!(c.view_proj(), before);
    assert_eq!(c.view_proj(), c.camera().proj() * c.camera().view());
  }

  #[test]
  fn drag_selection_feeds_outline_and_records_rect()
  {
    let mut c = chart();
    let centre = Vec2::new(400.0, 300.0);

    let mut press = InputSnapshot { cursor: centre, width: 800, height: 600, ..Default::default() };
    press.mouse_current.insert(MouseButton::Left);
    c.frame(&press, 0.016);

    let mut drag = press.clone();
    drag.mouse_previous.insert(MouseButton::Left);
    drag.cursor = Vec2::new(700.0, 450.0);
    c.frame(&drag, 0.016);

    assert!(c.selection().active());
    assert!(c.axes().revision() > 0);
    assert!(c.axes().outline().iter().any(|v| v[..3] != [0.0, 0.0, 0.0]));

    let mut release = InputSnapshot { cursor: drag.cursor, width: 800, height: 600, ..Default::default() };
    release.mouse_previous.insert(MouseButton::Left);
    c.frame(&release, 0.016);

    assert!(!c.selection().active());
    assert!(c.last_selection().is_some_and(|r| !r.is_degenerate()));
    assert!(c.axes().outline().iter().all(|v| Vec3::from_slice(&v[..3]) == Vec3::ZERO));
  }

  #[test]
  fn click_without_drag_clears_last_selection()
  {
    let mut c = chart();
    let at = Vec2::new(400.0, 300.0);

    let mut press = InputSnapshot { cursor: at, width: 800, height: 600, ..Default::default() };
    press.mouse_current.insert(MouseButton::Left);
    c.frame(&press, 0.016);

    let mut release = InputSnapshot { cursor: at, width: 800, height: 600, ..Default::default() };
    release.mouse_previous.insert(MouseButton::Left);
    c.frame(&release, 0.016);

    assert!(!c.selection().active());
    assert_eq!(c.last_selection(), None);
  }
}
