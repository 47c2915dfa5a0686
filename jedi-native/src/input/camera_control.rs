use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::camera::Camera;
use crate::config::Config;
use crate::input::InputSnapshot;

//
// ──────────────────────────────────────────────────────────────
//   Key bindings
// ──────────────────────────────────────────────────────────────
//

const KEY_FORWARD: KeyCode = KeyCode::KeyW;
const KEY_BACK: KeyCode = KeyCode::KeyS;
const KEY_LEFT: KeyCode = KeyCode::KeyA;
const KEY_RIGHT: KeyCode = KeyCode::KeyD;
const KEY_UP: KeyCode = KeyCode::Space;
const KEY_DOWN: KeyCode = KeyCode::ShiftLeft;
const KEY_RESET: KeyCode = KeyCode::KeyR;

const LOOK_BUTTON: MouseButton = MouseButton::Right;

//
// ──────────────────────────────────────────────────────────────
//   Controller
//
//   Movement keys always act. Looking (pitch/yaw) only happens in
//   free-look, entered on the look button's press edge and left
//   on its release edge.
//   All speeds are per second of frame time.
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug)]
pub struct ControlSettings
{
  /// World units per second.
  pub move_speed: f32,
  /// Radians per pixel of mouse travel per second.
  pub look_speed: f32,
  /// Multiply strafe speed by the viewport aspect ratio.
  pub couple_strafe_to_aspect: bool,
}

impl ControlSettings
{
  pub fn from_config(config: &Config) -> Self
  {
    Self {
      move_speed: config.move_speed,
      look_speed: config.look_speed,
      couple_strafe_to_aspect: config.couple_strafe_to_aspect,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum LookMode
{
  Idle,
  FreeLook
  {
    anchor: Vec2
  },
}

/// What the window should do with the OS cursor after this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CursorRequest
{
  Keep,
  /// Hide and lock the cursor for relative motion.
  Capture,
  /// Show the cursor again and put it back where free-look began.
  Release
  {
    warp_to: Vec2
  },
}

pub struct CameraController
{
  settings: ControlSettings,
  mode: LookMode,
}

impl CameraController
{
  pub fn new(settings: ControlSettings) -> Self
  {
    Self { settings, mode: LookMode::Idle }
  }

  pub fn free_look(&self) -> bool
  {
    matches!(self.mode, LookMode::FreeLook { .. })
  }

  /// Apply one frame of input. `dt` is in seconds.
  pub fn update(&mut self, input: &InputSnapshot, camera: &mut Camera, aspect: f32, dt: f32) -> CursorRequest
  {
    if input.key_pressed(KEY_RESET)
    {
      camera.reset();
    }

    apply_movement(input, camera, &self.settings, aspect, dt);

    let request = self.update_mode(input);

    if self.free_look() && request != CursorRequest::Capture
    {
      apply_look(input, camera, &self.settings, dt);
    }

    camera.orient(camera.pitch, camera.yaw);
    camera.rebuild_view();

    request
  }

  fn update_mode(&mut self, input: &InputSnapshot) -> CursorRequest
  {
    match self.mode
    {
      LookMode::Idle if input.button_pressed(LOOK_BUTTON) =>
      {
        self.mode = LookMode::FreeLook { anchor: input.cursor };
        CursorRequest::Capture
      }

      LookMode::FreeLook { anchor } if input.button_released(LOOK_BUTTON) =>
      {
        self.mode = LookMode::Idle;
        CursorRequest::Release { warp_to: anchor }
      }

      _ => CursorRequest::Keep,
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Input handlers
// ──────────────────────────────────────────────────────────────
//

fn apply_movement(input: &InputSnapshot, camera: &mut Camera, settings: &ControlSettings, aspect: f32, dt: f32)
{
  let step = settings.move_speed * dt;
  let strafe_step = if settings.couple_strafe_to_aspect { step * aspect } else { step };

  let forward = camera.direction;
  let right = camera.right();
  let up = camera.up;

  if input.key_down(KEY_FORWARD)
  {
    camera.eye += forward * step;
  }
  if input.key_down(KEY_BACK)
  {
    camera.eye -= forward * step;
  }
  if input.key_down(KEY_LEFT)
  {
    camera.eye -= right * strafe_step;
  }
  if input.key_down(KEY_RIGHT)
  {
    camera.eye += right * strafe_step;
  }
  if input.key_down(KEY_UP)
  {
    camera.eye += up * step;
  }
  if input.key_down(KEY_DOWN)
  {
    camera.eye -= up * step;
  }
}

fn apply_look(input: &InputSnapshot, camera: &mut Camera, settings: &ControlSettings, dt: f32)
{
  if input.mouse_delta == Vec2::ZERO
  {
    return;
  }

  let scale = settings.look_speed * dt;

  // Mouse right turns toward screen-right, mouse down looks down
  let yaw = camera.yaw - input.mouse_delta.x * scale;
  let pitch = camera.pitch - input.mouse_delta.y * scale;

  camera.orient(pitch, yaw);
}
