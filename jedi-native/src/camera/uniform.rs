use glam::Mat4;

use crate::math::ClipSpace;

use super::Camera;

//
// ──────────────────────────────────────────────────────────────
//   Per-pipeline camera payloads (GPU side)
//
//   WGSL layout (axes.vert.wgsl):
//     view  : mat4x4<f32>   → 64 bytes
//     proj  : mat4x4<f32>   → 64 bytes
//     model : mat4x4<f32>   → 64 bytes
//
//   WGSL layout (cube.vert.wgsl):
//     mvp   : mat4x4<f32>   → 64 bytes
// ──────────────────────────────────────────────────────────────
//

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AxesUniform
{
  pub view: [[f32; 4]; 4],
  pub proj: [[f32; 4]; 4],
  pub model: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CubeUniform
{
  pub mvp: [[f32; 4]; 4],
}

// Catch CPU/GPU layout mismatches at compile time
const _: () = assert!(std::mem::size_of::<AxesUniform>() == 192);
const _: () = assert!(std::mem::size_of::<CubeUniform>() == 64);

impl AxesUniform
{
  /// `model` places chart-space geometry into the world.
  pub fn new(camera: &Camera, model: Mat4, clip: ClipSpace) -> Self
  {
    Self {
      view: clip.upload(camera.view()),
      proj: clip.upload(camera.proj()),
      model: clip.upload(model),
    }
  }
}

impl CubeUniform
{
  pub fn new(view_proj: Mat4, clip: ClipSpace) -> Self
  {
    Self { mvp: clip.upload(view_proj) }
  }
}
