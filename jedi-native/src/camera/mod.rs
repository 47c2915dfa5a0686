pub mod uniform;

use glam::{Mat4, Vec3};

use crate::math::{self, ClipSpace};

//
// ──────────────────────────────────────────────────────────────
//   Camera (free-look, Z-up right-hand world)
//
//   Coordinate system:
//     X → screen-left when facing +Y (the view basis is
//         left-handed; `right()` is −X at yaw 0)
//     Y → forward (in-plane)
//     Z → up (normal to XY ground)
//
//   Orientation is stored as pitch/yaw; `direction` is always
//   derived from them:
//     yaw   = angle in the XY plane, measured from +Y toward +X
//     pitch = angle above the XY plane
// ──────────────────────────────────────────────────────────────
//

pub const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.1;

const DEFAULT_EYE: Vec3 = Vec3::new(0.0, -12.0, 9.0);
const DEFAULT_PITCH: f32 = -0.643_501_1; // asin(-0.6): looking at the origin
const DEFAULT_YAW: f32 = 0.0;

#[derive(Clone, Debug)]
pub struct Camera
{
  pub eye: Vec3,
  pub direction: Vec3,
  pub up: Vec3,
  pub pitch: f32,
  pub yaw: f32,

  pub fov_deg: f32,
  pub znear: f32,
  pub zfar: f32,

  view: Mat4,
  proj: Mat4,
}

impl Camera
{
  pub fn new(fov_deg: f32, znear: f32, zfar: f32) -> Self
  {
    let mut cam = Self {
      eye: DEFAULT_EYE,
      direction: Vec3::Y,
      up: Vec3::Z,
      pitch: DEFAULT_PITCH,
      yaw: DEFAULT_YAW,
      fov_deg,
      znear,
      zfar,
      view: Mat4::IDENTITY,
      proj: Mat4::IDENTITY,
    };

    cam.orient(DEFAULT_PITCH, DEFAULT_YAW);
    cam.rebuild_view();
    cam
  }

  /// Restore the default pose. Lens settings are kept.
  pub fn reset(&mut self)
  {
    self.eye = DEFAULT_EYE;
    self.up = Vec3::Z;
    self.orient(DEFAULT_PITCH, DEFAULT_YAW);
    self.rebuild_view();
  }

  /// Set pitch/yaw (pitch is clamped) and re-derive `direction`.
  pub fn orient(&mut self, pitch: f32, yaw: f32)
  {
    self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    self.yaw = yaw;
    self.direction = direction_from_angles(self.pitch, self.yaw);
  }

  pub fn rebuild_view(&mut self)
  {
    self.view = math::look_at(self.eye, self.direction, self.up);
  }

  pub fn rebuild_projection(&mut self, aspect: f32, clip: ClipSpace)
  {
    self.proj = math::perspective_project(self.fov_deg, aspect, self.znear, self.zfar, clip);
  }

  pub fn view(&self) -> Mat4
  {
    self.view
  }

  pub fn proj(&self) -> Mat4
  {
    self.proj
  }

  /// Screen-right in world space.
  pub fn right(&self) -> Vec3
  {
    math::normalize(self.up.cross(self.direction))
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Spherical → cartesian
// ──────────────────────────────────────────────────────────────
//

pub fn direction_from_angles(pitch: f32, yaw: f32) -> Vec3
{
  let cos_pitch = pitch.cos();
  math::normalize(Vec3::new(yaw.sin() * cos_pitch, yaw.cos() * cos_pitch, pitch.sin()))
}
