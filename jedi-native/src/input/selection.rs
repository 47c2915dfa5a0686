use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::InputSnapshot;
use crate::math::Ray;

//
// ──────────────────────────────────────────────────────────────
//   Screen → ground-plane ray cast
//
//   The chart lives on the world z = 0 plane. Chart X runs opposite
//   to world X: the left-handed view basis mirrors world X on
//   screen, and chart coordinates undo that mirror so chart X grows
//   toward screen-right.
// ──────────────────────────────────────────────────────────────
//

const SELECT_BUTTON: MouseButton = MouseButton::Left;

const GROUND_POINT: Vec3 = Vec3::ZERO;
const GROUND_NORMAL: Vec3 = Vec3::Z;

/// World-space ray through a window pixel.
pub fn screen_ray(cursor: Vec2, width: u32, height: u32, view: Mat4, proj: Mat4, eye: Vec3) -> Option<Ray>
{
  if width == 0 || height == 0
  {
    return None;
  }

  // Viewport → NDC (screen Y grows downward, NDC Y upward)
  let x_ndc = 2.0 * cursor.x / width as f32 - 1.0;
  let y_ndc = 1.0 - 2.0 * cursor.y / height as f32;

  let clip = Vec4::new(x_ndc, y_ndc, -1.0, 1.0);

  // Clip → eye. Only the direction matters from here on.
  let eye_space = proj.inverse() * clip;
  let eye_dir = Vec4::new(eye_space.x, eye_space.y, 1.0, 0.0);

  // Eye → world
  let world_dir = (view.inverse() * eye_dir).truncate();
  if !world_dir.is_finite() || world_dir == Vec3::ZERO
  {
    return None;
  }

  Some(Ray::new(eye, world_dir))
}

/// Chart-plane point under the cursor, or `None` when the ray misses the plane.
pub fn cast_to_chart(cursor: Vec2, width: u32, height: u32, camera: &Camera) -> Option<Vec2>
{
  let ray = screen_ray(cursor, width, height, camera.view(), camera.proj(), camera.eye)?;
  let hit = ray.intersect_plane(GROUND_POINT, GROUND_NORMAL)?;

  Some(Vec2::new(-hit.x, hit.y))
}

//
// ──────────────────────────────────────────────────────────────
//   Rubber-band selection
// ──────────────────────────────────────────────────────────────
//

/// Axis-aligned rectangle in chart coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionRect
{
  pub min: Vec2,
  pub max: Vec2,
}

impl SelectionRect
{
  pub fn from_corners(a: Vec2, b: Vec2) -> Self
  {
    Self { min: a.min(b), max: a.max(b) }
  }

  pub fn is_degenerate(&self) -> bool
  {
    self.min.x == self.max.x || self.min.y == self.max.y
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionEvent
{
  None,
  Started,
  Dragged,
  Finished(SelectionRect),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SelectState
{
  Idle,
  Dragging,
}

pub struct Selection
{
  state: SelectState,
  start: Vec2,
  end: Vec2,
  outline: [Vec3; 8],
}

impl Selection
{
  pub fn new() -> Self
  {
    Self { state: SelectState::Idle, start: Vec2::ZERO, end: Vec2::ZERO, outline: [Vec3::ZERO; 8] }
  }

  pub fn active(&self) -> bool
  {
    self.state == SelectState::Dragging
  }

  pub fn start(&self) -> Vec2
  {
    self.start
  }

  pub fn end(&self) -> Vec2
  {
    self.end
  }

  pub fn rect(&self) -> Option<SelectionRect>
  {
    self.active().then(|| SelectionRect::from_corners(self.start, self.end))
  }

  /// Outline as four line segments in display space (chart Y mirrored).
  pub fn outline(&self) -> &[Vec3; 8]
  {
    &self.outline
  }

  pub fn update(&mut self, input: &InputSnapshot, camera: &Camera) -> SelectionEvent
  {
    let cast = || cast_to_chart(input.cursor, input.width, input.height, camera);

    match self.state
    {
      SelectState::Idle =>
      {
        if !input.button_pressed(SELECT_BUTTON)
        {
          return SelectionEvent::None;
        }

        let Some(point) = cast()
        else
        {
          return SelectionEvent::None;
        };

        self.state = SelectState::Dragging;
        self.start = point;
        self.end = point;
        self.outline = outline_vertices(self.start, self.end);
        SelectionEvent::Started
      }

      SelectState::Dragging =>
      {
        if input.button_released(SELECT_BUTTON)
        {
          let rect = SelectionRect::from_corners(self.start, self.end);
          self.clear();
          return SelectionEvent::Finished(rect);
        }

        // A miss (ray above the horizon) keeps the last good corner
        if let Some(point) = cast()
        {
          self.end = point;
          self.outline = outline_vertices(self.start, self.end);
        }

        SelectionEvent::Dragged
      }
    }
  }

  fn clear(&mut self)
  {
    self.state = SelectState::Idle;
    self.start = Vec2::ZERO;
    self.end = Vec2::ZERO;
    self.outline = [Vec3::ZERO; 8];
  }
}

impl Default for Selection
{
  fn default() -> Self
  {
    Self::new()
  }
}

/// Rectangle edges as line-list pairs, Y negated for display.
pub fn outline_vertices(start: Vec2, end: Vec2) -> [Vec3; 8]
{
  let min = start.min(end);
  let max = start.max(end);

  let a = Vec3::new(min.x, -min.y, 0.0);
  let b = Vec3::new(max.x, -min.y, 0.0);
  let c = Vec3::new(max.x, -max.y, 0.0);
  let d = Vec3::new(min.x, -max.y, 0.0);

  [a, b, b, c, c, d, d, a]
}

#[cfg(test)]
mod tests
{
  use super::*;
  use crate::math::ClipSpace;

  const W: u32 = 800;
  const H: u32 = 600;

  fn overhead_camera() -> Camera
  {
    let mut cam = Camera::new(45.0, 0.01, 100.0);
    cam.eye = Vec3::new(0.0, 0.0, 5.0);
    cam.direction = Vec3::NEG_Z;
    cam.up = Vec3::Y;
    cam.rebuild_view();
    cam.rebuild_projection(W as f32 / H as f32, ClipSpace::WGPU);
    cam
  }

  fn snapshot(cursor: Vec2, held: bool, was_held: bool) -> InputSnapshot
  {
    let mut snap = InputSnapshot { cursor, width: W, height: H, ..Default::default() };
    if held
    {
      snap.mouse_current.insert(MouseButton::Left);
    }
    if was_held
    {
      snap.mouse_previous.insert(MouseButton::Left);
    }
    snap
  }

  #[test]
  fn centre_pixel_hits_origin()
  {
    let cam = overhead_camera();
    let hit = cast_to_chart(Vec2::new(W as f32 / 2.0, H as f32 / 2.0), W, H, &cam).unwrap();

    assert!(hit.length() < 1e-4, "{hit:?}");
  }

  #[test]
  fn hit_point_reprojects_under_cursor()
  {
    let mut cam = Camera::new(45.0, 0.01, 100.0);
    cam.rebuild_projection(W as f32 / H as f32, ClipSpace::WGPU);

    let cursor = Vec2::new(610.0, 420.0);
    let chart = cast_to_chart(cursor, W, H, &cam).unwrap();
    let world = Vec3::new(-chart.x, chart.y, 0.0);

    let clip = cam.proj() * cam.view() * world.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    let px = (ndc.x + 1.0) / 2.0 * W as f32;
    let py = (1.0 - ndc.y) / 2.0 * H as f32;

    assert!((px - cursor.x).abs() < 0.5 && (py - cursor.y).abs() < 0.5, "{px} {py}");
  }

  #[test]
  fn chart_x_grows_toward_screen_right()
  {
    let cam = overhead_camera();
    let left = cast_to_chart(Vec2::new(100.0, 300.0), W, H, &cam).unwrap();
    let right = cast_to_chart(Vec2::new(700.0, 300.0), W, H, &cam).unwrap();

    assert!(right.x > left.x);
  }

  #[test]
  fn ray_above_horizon_misses()
  {
    let mut cam = Camera::new(45.0, 0.01, 100.0);
    cam.orient(0.5, 0.0);
    cam.rebuild_view();
    cam.rebuild_projection(W as f32 / H as f32, ClipSpace::WGPU);

    assert!(cast_to_chart(Vec2::new(400.0, 0.0), W, H, &cam).is_none());
  }

  #[test]
  fn zero_sized_viewport_has_no_ray()
  {
    let cam = overhead_camera();
    assert!(cast_to_chart(Vec2::ZERO, 0, H, &cam).is_none());
  }

  #[test]
  fn outline_spans_min_max_for_any_order()
  {
    let corners = [
      (Vec2::new(1.0, 2.0), Vec2::new(-3.0, 5.0)),
      (Vec2::new(-3.0, 5.0), Vec2::new(1.0, 2.0)),
      (Vec2::new(4.0, -1.0), Vec2::new(4.0, -1.0)),
      (Vec2::new(-2.0, -7.0), Vec2::new(6.0, 0.5)),
    ];

    for (start, end) in corners
    {
      let verts = outline_vertices(start, end);
      let xs = verts.iter().map(|v| v.x);
      let ys = verts.iter().map(|v| v.y);

      let (x_lo, x_hi) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
      let (y_lo, y_hi) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));

      assert_eq!((x_lo, x_hi), (start.x.min(end.x), start.x.max(end.x)));
      assert_eq!((y_lo, y_hi), (-start.y.max(end.y), -start.y.min(end.y)));
      assert!(verts.iter().all(|v| v.z == 0.0));
    }
  }

  #[test]
  fn press_drag_release_records_one_rectangle()
  {
    let cam = overhead_camera();
    let mut sel = Selection::new();

    let centre = Vec2::new(W as f32 / 2.0, H as f32 / 2.0);
    let corner = Vec2::new(W as f32 - 1.0, 1.0);

    assert_eq!(sel.update(&snapshot(centre, true, false), &cam), SelectionEvent::Started);
    assert!(sel.active());

    let mut drag = snapshot(centre, true, true);
    for step in 1..=4
    {
      drag.cursor = centre + (corner - centre) * (step as f32 / 4.0);
      assert_eq!(sel.update(&drag, &cam), SelectionEvent::Dragged);
    }

    let live = sel.rect().unwrap();
    assert!(!live.is_degenerate());

    let finished = match sel.update(&snapshot(corner, false, true), &cam)
    {
      SelectionEvent::Finished(rect) => rect,
      other => panic!("expected Finished, got {other:?}"),
    };

    assert_eq!(finished, live);
    assert!(!sel.active());
    assert_eq!(sel.start(), Vec2::ZERO);
    assert_eq!(sel.end(), Vec2::ZERO);
    assert!(sel.outline().iter().all(|v| *v == Vec3::ZERO));

    // Nothing further until the next press edge
    assert_eq!(sel.update(&snapshot(corner, false, false), &cam), SelectionEvent::None);
  }

  #[test]
  fn click_without_drag_is_a_point()
  {
    let cam = overhead_camera();
    let mut sel = Selection::new();
    let at = Vec2::new(200.0, 150.0);

    sel.update(&snapshot(at, true, false), &cam);
    let rect = sel.rect().unwrap();

    assert!(rect.is_degenerate());
    assert_eq!(rect.min, rect.max);
  }

  #[test]
  fn held_button_without_press_edge_does_not_start()
  {
    let cam = overhead_camera();
    let mut sel = Selection::new();

    assert_eq!(sel.update(&snapshot(Vec2::new(10.0, 10.0), true, true), &cam), SelectionEvent::None);
    assert!(!sel.active());
  }
}
