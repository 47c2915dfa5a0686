use glam::{Mat4, Vec3, Vec4};

//
// ──────────────────────────────────────────────────────────────
//   Linear algebra kernel
//
//   Conventions:
//     matrices are column-major (glam), vectors are columns
//     clip = projection * view * model
//     view space is left-handed: +X right, +Y up, +Z forward
//
//   The depth range and the upload layout belong to the backend
//   and travel together as a ClipSpace value. The binary only
//   draws through wgpu; the OpenGL convention is built for tests.
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthRange
{
  /// wgpu / Vulkan / Metal / D3D
  ZeroToOne,
  /// OpenGL
  #[cfg(test)]
  NegOneToOne,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixLayout
{
  /// Upload columns as-is (WGSL, GLSL without transpose).
  ColumnMajor,
  /// Upload transposed (GL uniform uploads with transpose = true).
  #[cfg(test)]
  RowMajor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipSpace
{
  pub depth: DepthRange,
  pub layout: MatrixLayout,
}

impl ClipSpace
{
  pub const WGPU: ClipSpace =
    ClipSpace { depth: DepthRange::ZeroToOne, layout: MatrixLayout::ColumnMajor };

  #[cfg(test)]
  pub const OPENGL: ClipSpace =
    ClipSpace { depth: DepthRange::NegOneToOne, layout: MatrixLayout::RowMajor };

  /// Matrix as the shader expects to read it.
  pub fn upload(&self, m: Mat4) -> [[f32; 4]; 4]
  {
    match self.layout
    {
      MatrixLayout::ColumnMajor => m.to_cols_array_2d(),
      #[cfg(test)]
      MatrixLayout::RowMajor => m.transpose().to_cols_array_2d(),
    }
  }

  /// Valid NDC depth interval for this backend.
  #[cfg(test)]
  pub fn depth_bounds(&self) -> (f32, f32)
  {
    match self.depth
    {
      DepthRange::ZeroToOne => (0.0, 1.0),
      DepthRange::NegOneToOne => (-1.0, 1.0),
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Vectors
// ──────────────────────────────────────────────────────────────
//

/// `v / |v|`, or the zero vector when `v` has no length.
/// Callers that need a unit vector must check for zero themselves.
pub fn normalize(v: Vec3) -> Vec3
{
  v.normalize_or_zero()
}

//
// ──────────────────────────────────────────────────────────────
//   Matrix builders
// ──────────────────────────────────────────────────────────────
//

/// View matrix from an eye position and a forward `direction` (not a target point).
pub fn look_at(eye: Vec3, direction: Vec3, up: Vec3) -> Mat4
{
  let z = normalize(direction);
  let x = normalize(up.cross(z));
  let y = z.cross(x);

  Mat4::from_cols(
    Vec4::new(x.x, y.x, z.x, 0.0),
    Vec4::new(x.y, y.y, z.y, 0.0),
    Vec4::new(x.z, y.z, z.z, 0.0),
    Vec4::new(-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0),
  )
}

/// Symmetric perspective projection, vertical field of view in degrees.
///
/// Panics when `far == near` or the field of view is a multiple of 360°,
/// both of which make the matrix singular.
pub fn perspective_project(fov_deg: f32, aspect: f32, near: f32, far: f32, clip: ClipSpace) -> Mat4
{
  assert!(far != near, "perspective_project: far plane equals near plane ({near})");

  let tan_half = (fov_deg.to_radians() / 2.0).tan();
  assert!(tan_half != 0.0, "perspective_project: degenerate field of view {fov_deg}");

  let f = 1.0 / tan_half;
  let range = far - near;

  let (a, b) = match clip.depth
  {
    DepthRange::ZeroToOne => (far / range, -near * far / range),
    #[cfg(test)]
    DepthRange::NegOneToOne => ((far + near) / range, -2.0 * far * near / range),
  };

  Mat4::from_cols(
    Vec4::new(f / aspect, 0.0, 0.0, 0.0),
    Vec4::new(0.0, f, 0.0, 0.0),
    Vec4::new(0.0, 0.0, a, 1.0),
    Vec4::new(0.0, 0.0, b, 0.0),
  )
}

/// `a * b`. Not commutative: `mat4_mult(proj, view)` applies `view` first.
pub fn mat4_mult(a: Mat4, b: Mat4) -> Mat4
{
  a * b
}

/// Combined world-to-clip transform in the fixed `projection * view` order.
pub fn view_projection(projection: Mat4, view: Mat4) -> Mat4
{
  mat4_mult(projection, view)
}

//
// ──────────────────────────────────────────────────────────────
//   Rays
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug)]
pub struct Ray
{
  pub origin: Vec3,
  pub direction: Vec3,
}

impl Ray
{
  pub fn new(origin: Vec3, direction: Vec3) -> Self
  {
    Self { origin, direction: normalize(direction) }
  }

  pub fn point_at(&self, t: f32) -> Vec3
  {
    self.origin + self.direction * t
  }

  /// Hit point on the plane through `plane_point` with normal `plane_normal`.
  ///
  /// `None` when the ray is parallel to the plane, has no direction, or the
  /// plane lies behind the origin.
  pub fn intersect_plane(&self, plane_point: Vec3, plane_normal: Vec3) -> Option<Vec3>
  {
    let denom = self.direction.dot(plane_normal);
    if denom.abs() <= f32::EPSILON
    {
      return None;
    }

    let t = plane_normal.dot(plane_point - self.origin) / denom;
    if !t.is_finite() || t < 0.0
    {
      return None;
    }

    Some(self.point_at(t))
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Tests
// ──────────────────────────────────────────────────────────────
//
